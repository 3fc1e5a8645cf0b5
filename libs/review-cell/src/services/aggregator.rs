use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::models::{RatingStats, RatingStatsFilter, ReviewError, ReviewFilter};
use crate::store::ReviewStore;

/// Rating statistics computed straight from the review store on every call.
pub struct RatingAggregator {
    reviews: Arc<dyn ReviewStore>,
}

impl RatingAggregator {
    pub fn new(reviews: Arc<dyn ReviewStore>) -> Self {
        Self { reviews }
    }

    pub async fn stats(&self, filter: &RatingStatsFilter) -> Result<RatingStats, ReviewError> {
        let review_filter = ReviewFilter::try_from(filter)?;

        let ratings = self.reviews
            .ratings(&review_filter)
            .await
            .map_err(|e| ReviewError::DatabaseError(e.to_string()))?;

        let stats = RatingStats::from_ratings(ratings);
        debug!("Rating stats for {:?}: total={} average={}", filter, stats.total, stats.average_rating);
        Ok(stats)
    }

    pub async fn average_rating(&self, provider_id: Uuid) -> Result<f64, ReviewError> {
        Ok(self.stats(&RatingStatsFilter::for_provider(provider_id)).await?.average_rating)
    }

    pub async fn rating_distribution(&self, provider_id: Uuid) -> Result<BTreeMap<u8, u64>, ReviewError> {
        Ok(self.stats(&RatingStatsFilter::for_provider(provider_id)).await?.rating_distribution)
    }
}
