use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::{ProviderError, ProviderProfile, ScheduleOverride, WorkingHours};

/// Read access to provider profiles and their schedules.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn get_provider(&self, provider_id: Uuid) -> Result<Option<ProviderProfile>, ProviderError>;

    async fn weekly_hours(
        &self,
        provider_id: Uuid,
        day_of_week: i32,
    ) -> Result<Option<WorkingHours>, ProviderError>;

    async fn schedule_override(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<ScheduleOverride>, ProviderError>;
}

#[derive(Default)]
pub struct InMemoryProviderDirectory {
    providers: RwLock<HashMap<Uuid, ProviderProfile>>,
    hours: RwLock<HashMap<(Uuid, i32), WorkingHours>>,
    overrides: RwLock<HashMap<(Uuid, NaiveDate), ScheduleOverride>>,
}

impl InMemoryProviderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_provider(&self, profile: ProviderProfile) {
        debug!("Registering {} provider {}", profile.kind, profile.id);
        self.providers.write().await.insert(profile.id, profile);
    }

    pub async fn set_working_hours(&self, hours: WorkingHours) -> Result<(), ProviderError> {
        if !(0..=6).contains(&hours.day_of_week) {
            return Err(ProviderError::ValidationError(
                "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string()
            ));
        }
        if hours.is_open && hours.start_time >= hours.end_time {
            return Err(ProviderError::ValidationError(
                "Start time must be before end time".to_string()
            ));
        }
        if !self.providers.read().await.contains_key(&hours.provider_id) {
            return Err(ProviderError::NotFound);
        }

        self.hours.write().await.insert((hours.provider_id, hours.day_of_week), hours);
        Ok(())
    }

    pub async fn add_override(&self, entry: ScheduleOverride) -> Result<(), ProviderError> {
        if let (Some(start), Some(end)) = (entry.start_time, entry.end_time) {
            if start >= end {
                return Err(ProviderError::ValidationError(
                    "Start time must be before end time".to_string()
                ));
            }
        }

        let key = (entry.provider_id, entry.override_date);
        let mut overrides = self.overrides.write().await;
        if overrides.contains_key(&key) {
            return Err(ProviderError::ValidationError(
                "Schedule override already exists for this date".to_string()
            ));
        }
        overrides.insert(key, entry);
        Ok(())
    }
}

#[async_trait]
impl ProviderDirectory for InMemoryProviderDirectory {
    async fn get_provider(&self, provider_id: Uuid) -> Result<Option<ProviderProfile>, ProviderError> {
        Ok(self.providers.read().await.get(&provider_id).cloned())
    }

    async fn weekly_hours(
        &self,
        provider_id: Uuid,
        day_of_week: i32,
    ) -> Result<Option<WorkingHours>, ProviderError> {
        Ok(self.hours.read().await.get(&(provider_id, day_of_week)).cloned())
    }

    async fn schedule_override(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<ScheduleOverride>, ProviderError> {
        Ok(self.overrides.read().await.get(&(provider_id, date)).cloned())
    }
}
