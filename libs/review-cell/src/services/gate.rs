// libs/review-cell/src/services/gate.rs
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus};
use appointment_cell::store::AppointmentStore;
use shared_config::{SchedulingConfig, MAX_REVIEW_EDIT_WINDOW_HOURS};
use shared_models::auth::{Actor, Role};
use shared_utils::clock::Clock;
use shared_utils::pagination::{Page, PageRequest};

use crate::models::{
    CreateReviewRequest, Rating, Review, ReviewError, ReviewFilter, ReviewQuery,
    UpdateReviewRequest, MAX_COMMENT_LENGTH,
};
use crate::store::ReviewStore;

/// Decides who may review what, and owns review creation and edits.
/// Appointments are only read here.
pub struct ReviewGate {
    reviews: Arc<dyn ReviewStore>,
    appointments: Arc<dyn AppointmentStore>,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
}

impl ReviewGate {
    pub fn new(
        reviews: Arc<dyn ReviewStore>,
        appointments: Arc<dyn AppointmentStore>,
        clock: Arc<dyn Clock>,
        config: SchedulingConfig,
    ) -> Self {
        Self { reviews, appointments, clock, config }
    }

    fn edit_window(&self) -> Duration {
        Duration::hours(self.config.review_edit_window_hours.clamp(0, MAX_REVIEW_EDIT_WINDOW_HOURS))
    }

    /// True only for a completed appointment of `client_id` that has no review yet.
    pub async fn can_review(&self, appointment_id: Uuid, client_id: Uuid) -> Result<bool, ReviewError> {
        let Some(appointment) = self.load_appointment(appointment_id).await? else {
            return Ok(false);
        };

        if appointment.client_id != client_id || appointment.status != AppointmentStatus::Completed {
            return Ok(false);
        }

        Ok(self.find_by_appointment(appointment_id).await?.is_none())
    }

    #[instrument(skip(self, actor, request), fields(appointment_id = %request.appointment_id))]
    pub async fn create_review(
        &self,
        actor: &Actor,
        request: CreateReviewRequest,
    ) -> Result<Review, ReviewError> {
        debug!("Creating review for appointment {}", request.appointment_id);

        let rating = Rating::try_from(request.rating)?;
        let comment = normalize_comment(request.comment)?;

        match actor.role {
            Role::Admin => {}
            Role::Client if actor.id == request.client_id => {}
            _ => {
                return Err(ReviewError::Forbidden(
                    "Only the client of an appointment can review it".to_string()
                ));
            }
        }

        let appointment = self
            .load_appointment(request.appointment_id)
            .await?
            .ok_or(ReviewError::AppointmentNotFound)?;

        if appointment.client_id != request.client_id {
            return Err(ReviewError::Forbidden(
                "Appointment belongs to a different client".to_string()
            ));
        }
        if appointment.provider_id != request.provider_id {
            return Err(ReviewError::ValidationError(
                "Provider does not match the appointment".to_string()
            ));
        }
        if appointment.status != AppointmentStatus::Completed {
            return Err(ReviewError::NotReviewable(format!(
                "appointment is {}", appointment.status
            )));
        }
        if self.find_by_appointment(request.appointment_id).await?.is_some() {
            return Err(ReviewError::AlreadyReviewed);
        }

        let now = self.clock.now();
        let review = Review {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            client_id: appointment.client_id,
            provider_id: appointment.provider_id,
            rating,
            comment,
            created_at: now,
            updated_at: now,
        };

        // A concurrent submission may have slipped in after the check above
        let created = self.reviews.insert(review).await.map_err(|e| {
            if e.is_unique_violation() {
                warn!("Duplicate review rejected for appointment {}", appointment.id);
                ReviewError::AlreadyReviewed
            } else {
                ReviewError::DatabaseError(e.to_string())
            }
        })?;

        info!("Review {} created for provider {} with rating {}", created.id, created.provider_id, created.rating);
        Ok(created)
    }

    pub async fn update_review(
        &self,
        review_id: Uuid,
        request: UpdateReviewRequest,
        actor: &Actor,
    ) -> Result<Review, ReviewError> {
        let review = self.get_review(review_id).await?;
        authorize_author(actor, &review)?;

        let rating = match request.rating {
            Some(value) => Rating::try_from(value)?,
            None => review.rating,
        };
        let comment = match request.comment {
            Some(text) => normalize_comment(Some(text))?,
            None => review.comment.clone(),
        };

        let now = self.clock.now();
        if !review.can_be_edited(now, self.edit_window()) {
            warn!("Edit window closed for review {} (created {})", review_id, review.created_at);
            return Err(ReviewError::EditWindowExpired);
        }

        let updated = self.reviews
            .update(review_id, rating, comment, now)
            .await
            .map_err(|e| ReviewError::DatabaseError(e.to_string()))?
            .ok_or(ReviewError::NotFound)?;

        info!("Review {} updated", review_id);
        Ok(updated)
    }

    pub async fn delete_review(&self, review_id: Uuid, actor: &Actor) -> Result<(), ReviewError> {
        let review = self.get_review(review_id).await?;
        authorize_author(actor, &review)?;

        let deleted = self.reviews
            .delete(review_id)
            .await
            .map_err(|e| ReviewError::DatabaseError(e.to_string()))?;

        if !deleted {
            return Err(ReviewError::NotFound);
        }

        info!("Review {} deleted", review_id);
        Ok(())
    }

    pub async fn get_review(&self, review_id: Uuid) -> Result<Review, ReviewError> {
        self.reviews
            .get(review_id)
            .await
            .map_err(|e| ReviewError::DatabaseError(e.to_string()))?
            .ok_or(ReviewError::NotFound)
    }

    pub async fn get_review_by_appointment(&self, appointment_id: Uuid) -> Result<Review, ReviewError> {
        self.find_by_appointment(appointment_id).await?.ok_or(ReviewError::NotFound)
    }

    /// Newest first.
    pub async fn list_reviews(&self, query: ReviewQuery) -> Result<Page<Review>, ReviewError> {
        let filter = ReviewFilter::try_from(&query)?;
        let page = PageRequest::normalize(query.limit, query.offset, &self.config);

        let rows = self.reviews
            .search(&filter, page)
            .await
            .map_err(|e| ReviewError::DatabaseError(e.to_string()))?;

        Ok(Page::from_overfetch(rows, page))
    }

    async fn find_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Review>, ReviewError> {
        self.reviews
            .get_by_appointment(appointment_id)
            .await
            .map_err(|e| ReviewError::DatabaseError(e.to_string()))
    }

    async fn load_appointment(&self, appointment_id: Uuid) -> Result<Option<Appointment>, ReviewError> {
        self.appointments
            .get(appointment_id)
            .await
            .map_err(|e| ReviewError::DatabaseError(e.to_string()))
    }
}

fn authorize_author(actor: &Actor, review: &Review) -> Result<(), ReviewError> {
    if actor.role.is_admin() || (actor.role == Role::Client && actor.id == review.client_id) {
        return Ok(());
    }
    Err(ReviewError::Forbidden("Only the author can change this review".to_string()))
}

fn normalize_comment(comment: Option<String>) -> Result<Option<String>, ReviewError> {
    let Some(raw) = comment else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ReviewError::ValidationError(format!(
            "Comment must be at most {} characters", MAX_COMMENT_LENGTH
        )));
    }

    Ok(Some(trimmed.to_string()))
}
