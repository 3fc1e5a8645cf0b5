use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::models::{day_of_week, ProviderError, ProviderProfile, WorkingWindow};
use crate::services::directory::ProviderDirectory;

/// The provider capability the scheduling core depends on: identity plus
/// the bookable window for a given day.
#[async_trait]
pub trait WorkingHoursSource: Send + Sync {
    async fn provider(&self, provider_id: Uuid) -> Result<Option<ProviderProfile>, ProviderError>;

    /// Effective window for `date`, or `None` when the provider does not work that day.
    async fn window_for(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<WorkingWindow>, ProviderError>;
}

pub struct WorkingHoursService {
    directory: Arc<dyn ProviderDirectory>,
}

impl WorkingHoursService {
    pub fn new(directory: Arc<dyn ProviderDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl WorkingHoursSource for WorkingHoursService {
    async fn provider(&self, provider_id: Uuid) -> Result<Option<ProviderProfile>, ProviderError> {
        self.directory.get_provider(provider_id).await
    }

    async fn window_for(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<WorkingWindow>, ProviderError> {
        // A date override always wins over the weekly schedule
        if let Some(entry) = self.directory.schedule_override(provider_id, date).await? {
            debug!("Provider {} has schedule override for {}: open={}", provider_id, date, entry.is_open);
            if !entry.is_open {
                return Ok(None);
            }
            if let (Some(start), Some(end)) = (entry.start_time, entry.end_time) {
                return Ok(WorkingWindow::new(start, end));
            }
        }

        let hours = self.directory.weekly_hours(provider_id, day_of_week(date)).await?;
        Ok(hours.and_then(|h| h.window()))
    }
}
