pub mod models;
pub mod services;
pub mod store;

pub use models::*;
pub use services::{RatingAggregator, ReviewGate};
pub use store::{InMemoryReviewStore, ReviewStore, SupabaseReviewStore};
