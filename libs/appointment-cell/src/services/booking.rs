// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use provider_cell::WorkingHoursSource;
use shared_config::SchedulingConfig;
use shared_database::DatabaseError;
use shared_models::auth::{Actor, Role};
use shared_utils::clock::Clock;
use shared_utils::pagination::{Page, PageRequest};

use crate::models::{
    Appointment, AppointmentError, AppointmentFilter, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest, FreeSlot, RescheduleAppointmentRequest, SlotCheckResponse,
    MAX_LOCATION_LENGTH, MAX_NOTES_LENGTH,
};
use crate::services::availability::AvailabilityChecker;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::store::AppointmentStore;

pub struct AppointmentBookingService {
    store: Arc<dyn AppointmentStore>,
    availability: AvailabilityChecker,
    working_hours: Arc<dyn WorkingHoursSource>,
    lifecycle_service: AppointmentLifecycleService,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
}

impl AppointmentBookingService {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        working_hours: Arc<dyn WorkingHoursSource>,
        clock: Arc<dyn Clock>,
        config: SchedulingConfig,
    ) -> Self {
        let availability = AvailabilityChecker::new(
            Arc::clone(&store),
            Arc::clone(&working_hours),
            config.clone(),
        );

        Self {
            store,
            availability,
            working_hours,
            lifecycle_service: AppointmentLifecycleService::new(),
            clock,
            config,
        }
    }

    pub fn availability(&self) -> &AvailabilityChecker {
        &self.availability
    }

    /// Book a new appointment in `Pending`.
    #[instrument(skip(self, request), fields(provider_id = %request.provider_id, client_id = %request.client_id))]
    pub async fn book_appointment(
        &self,
        actor: &Actor,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment on {} at {}", request.scheduled_date, request.scheduled_time);

        self.lifecycle_service.authorize_booking(actor, request.client_id, request.provider_id)?;

        let duration_minutes = request.duration_minutes.unwrap_or(self.config.default_slot_minutes);
        self.lifecycle_service.validate_duration(duration_minutes)?;

        let location = normalize_text(request.location, "Location", MAX_LOCATION_LENGTH)?;
        let notes = normalize_text(request.notes, "Notes", MAX_NOTES_LENGTH)?;

        let now = self.clock.now();
        self.lifecycle_service.validate_appointment_timing(
            request.scheduled_date,
            request.scheduled_time,
            duration_minutes,
            now,
        )?;

        self.ensure_active_provider(request.provider_id).await?;

        let available = self.availability.is_available(
            request.provider_id,
            request.scheduled_date,
            request.scheduled_time,
            Some(duration_minutes),
        ).await?;

        if !available {
            warn!("Slot {} {} already taken for provider {}",
                  request.scheduled_date, request.scheduled_time, request.provider_id);
            return Err(AppointmentError::SchedulingConflict);
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            client_id: request.client_id,
            provider_id: request.provider_id,
            service_id: request.service_id,
            scheduled_date: request.scheduled_date,
            scheduled_time: request.scheduled_time,
            duration_minutes,
            status: AppointmentStatus::Pending,
            location,
            notes,
            created_at: now,
            updated_at: now,
        };

        // The unique slot constraint settles races the pre-check cannot see
        let created = self.store.insert(appointment).await.map_err(slot_write_error)?;

        info!("Appointment {} booked for provider {}", created.id, created.provider_id);
        Ok(created)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;

        if !actor.role.is_admin() && !appointment.involves(actor.id) {
            return Err(AppointmentError::Forbidden(
                "Not authorized to view this appointment".to_string()
            ));
        }

        Ok(appointment)
    }

    /// Move an appointment to `new_status`.
    ///
    /// Checks run in a fixed order: existence, transition legality, actor
    /// authority. The write itself is conditioned on the status that was
    /// read, so a concurrent transition makes this one fail instead of
    /// silently overwriting it.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn transition(
        &self,
        appointment_id: Uuid,
        new_status: AppointmentStatus,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;
        let current = appointment.status;

        self.lifecycle_service.validate_status_transition(&current, &new_status)?;
        self.lifecycle_service.authorize_transition(actor, &appointment, &new_status)?;

        let updated = self.store
            .compare_and_set_status(appointment_id, current, new_status, self.clock.now())
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        match updated {
            Some(appointment) => {
                info!("Appointment {} moved from {} to {}", appointment_id, current, new_status);
                Ok(appointment)
            }
            None => {
                warn!("Appointment {} changed while moving from {} to {}", appointment_id, current, new_status);
                Err(AppointmentError::ConcurrentModification)
            }
        }
    }

    pub async fn accept_appointment(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Accepted, actor).await
    }

    pub async fn complete_appointment(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Completed, actor).await
    }

    pub async fn cancel_appointment(&self, appointment_id: Uuid, actor: &Actor) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Cancelled, actor).await
    }

    /// Move a pending or accepted appointment to another slot. The status is
    /// left untouched.
    #[instrument(skip(self, actor, request), fields(actor_id = %actor.id))]
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        actor: &Actor,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.load(appointment_id).await?;

        if !appointment.status.allows_reschedule() {
            return Err(AppointmentError::InvalidStatusTransition {
                from: appointment.status,
                to: appointment.status,
            });
        }

        self.lifecycle_service.authorize_reschedule(actor, &appointment)?;

        let now = self.clock.now();
        self.lifecycle_service.validate_appointment_timing(
            request.new_date,
            request.new_time,
            appointment.duration_minutes,
            now,
        )?;

        let available = self.availability.is_available_excluding(
            appointment.provider_id,
            request.new_date,
            request.new_time,
            Some(appointment.duration_minutes),
            appointment_id,
        ).await?;

        if !available {
            return Err(AppointmentError::SchedulingConflict);
        }

        let updated = self.store
            .compare_and_set_slot(appointment_id, appointment.status, request.new_date, request.new_time, now)
            .await
            .map_err(slot_write_error)?;

        match updated {
            Some(appointment) => {
                info!("Appointment {} rescheduled to {} {}", appointment_id, request.new_date, request.new_time);
                Ok(appointment)
            }
            None => Err(AppointmentError::ConcurrentModification),
        }
    }

    pub async fn list_client_appointments(
        &self,
        client_id: Uuid,
        actor: &Actor,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Page<Appointment>, AppointmentError> {
        self.search_appointments(AppointmentSearchQuery {
            client_id: Some(client_id),
            limit,
            offset,
            ..Default::default()
        }, actor).await
    }

    pub async fn list_provider_appointments(
        &self,
        provider_id: Uuid,
        actor: &Actor,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Page<Appointment>, AppointmentError> {
        self.search_appointments(AppointmentSearchQuery {
            provider_id: Some(provider_id),
            limit,
            offset,
            ..Default::default()
        }, actor).await
    }

    /// Filtered listing ordered by date then time. Non-admin actors are
    /// scoped to appointments on their own side.
    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
        actor: &Actor,
    ) -> Result<Page<Appointment>, AppointmentError> {
        debug!("Searching appointments with query: {:?}", query);

        let mut filter = AppointmentFilter::from(&query);
        scope_to_actor(&mut filter, actor)?;

        if let (Some(from), Some(to)) = (filter.from_date, filter.to_date) {
            if from > to {
                return Err(AppointmentError::ValidationError(
                    "from_date must not be after to_date".to_string()
                ));
            }
        }

        let page = PageRequest::normalize(query.limit, query.offset, &self.config);
        self.fetch_page(&filter, page).await
    }

    /// Pending and accepted appointments that have not started yet.
    pub async fn get_upcoming_appointments(
        &self,
        actor: &Actor,
        limit: Option<i64>,
    ) -> Result<Page<Appointment>, AppointmentError> {
        let mut filter = AppointmentFilter {
            starts_at_or_after: Some(self.clock.now().naive_utc()),
            upcoming_only: true,
            ..Default::default()
        };
        scope_to_actor(&mut filter, actor)?;

        let page = PageRequest::normalize(limit, None, &self.config);
        self.fetch_page(&filter, page).await
    }

    pub async fn check_availability(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: Option<i32>,
    ) -> Result<SlotCheckResponse, AppointmentError> {
        self.availability.check_slot(provider_id, date, time, duration_minutes, None).await
    }

    pub async fn free_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        duration_minutes: Option<i32>,
    ) -> Result<Vec<FreeSlot>, AppointmentError> {
        self.availability.free_slots(provider_id, date, duration_minutes).await
    }

    async fn fetch_page(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Page<Appointment>, AppointmentError> {
        let rows = self.store
            .search(filter, page)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(Page::from_overfetch(rows, page))
    }

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get(appointment_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::NotFound)
    }

    async fn ensure_active_provider(&self, provider_id: Uuid) -> Result<(), AppointmentError> {
        match self.working_hours.provider(provider_id).await? {
            Some(provider) if provider.is_active => Ok(()),
            Some(_) => {
                warn!("Booking attempted against inactive provider {}", provider_id);
                Err(AppointmentError::ProviderNotFound)
            }
            None => Err(AppointmentError::ProviderNotFound),
        }
    }
}

fn slot_write_error(error: DatabaseError) -> AppointmentError {
    if error.is_unique_violation() {
        AppointmentError::SchedulingConflict
    } else {
        AppointmentError::DatabaseError(error.to_string())
    }
}

fn scope_to_actor(filter: &mut AppointmentFilter, actor: &Actor) -> Result<(), AppointmentError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Client => scope_field(&mut filter.client_id, actor.id),
        Role::Professional | Role::CompanyEmployee => scope_field(&mut filter.provider_id, actor.id),
    }
}

fn scope_field(field: &mut Option<Uuid>, actor_id: Uuid) -> Result<(), AppointmentError> {
    match field {
        Some(id) if *id != actor_id => Err(AppointmentError::Forbidden(
            "Not authorized to list these appointments".to_string()
        )),
        _ => {
            *field = Some(actor_id);
            Ok(())
        }
    }
}

/// Trim free text; blank becomes `None`.
fn normalize_text(
    value: Option<String>,
    field: &str,
    max_length: usize,
) -> Result<Option<String>, AppointmentError> {
    let Some(raw) = value else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max_length {
        return Err(AppointmentError::ValidationError(format!(
            "{} must be at most {} characters", field, max_length
        )));
    }

    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(None, "Notes", 10).unwrap(), None);
        assert_eq!(normalize_text(Some("   ".to_string()), "Notes", 10).unwrap(), None);
        assert_eq!(normalize_text(Some(" hi ".to_string()), "Notes", 10).unwrap(), Some("hi".to_string()));
        assert_matches!(
            normalize_text(Some("x".repeat(11)), "Notes", 10),
            Err(AppointmentError::ValidationError(_))
        );
    }

    #[test]
    fn test_scope_to_actor() {
        let client = Actor::client(Uuid::new_v4());
        let mut filter = AppointmentFilter::default();
        scope_to_actor(&mut filter, &client).unwrap();
        assert_eq!(filter.client_id, Some(client.id));

        let mut foreign = AppointmentFilter { client_id: Some(Uuid::new_v4()), ..Default::default() };
        assert_matches!(scope_to_actor(&mut foreign, &client), Err(AppointmentError::Forbidden(_)));

        let admin = Actor::admin(Uuid::new_v4());
        let mut open = AppointmentFilter::default();
        scope_to_actor(&mut open, &admin).unwrap();
        assert_eq!(open, AppointmentFilter::default());
    }
}
