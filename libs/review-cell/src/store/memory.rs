use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_utils::pagination::PageRequest;

use crate::models::{Rating, Review, ReviewFilter};
use crate::store::ReviewStore;

#[derive(Default)]
pub struct InMemoryReviewStore {
    reviews: RwLock<HashMap<Uuid, Review>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.reviews.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reviews.read().await.is_empty()
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn insert(&self, review: Review) -> Result<Review, DatabaseError> {
        let mut reviews = self.reviews.write().await;

        if reviews.values().any(|existing| existing.appointment_id == review.appointment_id) {
            return Err(DatabaseError::UniqueViolation(format!(
                "reviews_appointment_idx: appointment {} already reviewed",
                review.appointment_id
            )));
        }
        if reviews.contains_key(&review.id) {
            return Err(DatabaseError::UniqueViolation(format!("review {} exists", review.id)));
        }

        reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Review>, DatabaseError> {
        Ok(self.reviews.read().await.get(&id).cloned())
    }

    async fn get_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Review>, DatabaseError> {
        Ok(self.reviews
            .read()
            .await
            .values()
            .find(|review| review.appointment_id == appointment_id)
            .cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        rating: Rating,
        comment: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Review>, DatabaseError> {
        let mut reviews = self.reviews.write().await;

        Ok(reviews.get_mut(&id).map(|review| {
            review.rating = rating;
            review.comment = comment;
            review.updated_at = updated_at;
            review.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.reviews.write().await.remove(&id).is_some())
    }

    async fn search(&self, filter: &ReviewFilter, page: PageRequest) -> Result<Vec<Review>, DatabaseError> {
        let reviews = self.reviews.read().await;

        let mut matching: Vec<Review> = reviews
            .values()
            .filter(|review| filter.matches(review))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(matching
            .into_iter()
            .skip(usize::try_from(page.offset).unwrap_or(0))
            .take(usize::try_from(page.fetch_limit()).unwrap_or(usize::MAX))
            .collect())
    }

    async fn ratings(&self, filter: &ReviewFilter) -> Result<Vec<Rating>, DatabaseError> {
        Ok(self.reviews
            .read()
            .await
            .values()
            .filter(|review| filter.matches(review))
            .map(|review| review.rating)
            .collect())
    }
}
