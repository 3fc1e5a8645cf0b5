// libs/review-cell/src/store/mod.rs
pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_utils::pagination::PageRequest;

use crate::models::{Rating, Review, ReviewFilter};

pub use memory::InMemoryReviewStore;
pub use supabase::SupabaseReviewStore;

/// Persistence contract for reviews. `appointment_id` is unique; a second
/// insert for the same appointment answers [`DatabaseError::UniqueViolation`].
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn insert(&self, review: Review) -> Result<Review, DatabaseError>;

    async fn get(&self, id: Uuid) -> Result<Option<Review>, DatabaseError>;

    async fn get_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Review>, DatabaseError>;

    /// Replace the editable fields. `Ok(None)` when the review is gone.
    async fn update(
        &self,
        id: Uuid,
        rating: Rating,
        comment: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Review>, DatabaseError>;

    /// `true` when a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Newest first. Returns up to `page.fetch_limit()` rows.
    async fn search(&self, filter: &ReviewFilter, page: PageRequest) -> Result<Vec<Review>, DatabaseError>;

    /// Every rating in scope of the filter, read at call time.
    async fn ratings(&self, filter: &ReviewFilter) -> Result<Vec<Rating>, DatabaseError>;
}
