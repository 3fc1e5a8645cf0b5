use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use shared_database::{DatabaseError, SupabaseClient};

use crate::models::{ProviderError, ProviderProfile, ScheduleOverride, WorkingHours};
use crate::services::directory::ProviderDirectory;

/// Provider directory backed by the `providers`, `provider_working_hours`
/// and `provider_schedule_overrides` tables.
pub struct SupabaseProviderDirectory {
    supabase: Arc<SupabaseClient>,
    auth_token: Option<String>,
}

impl SupabaseProviderDirectory {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: Option<String>) -> Self {
        Self { supabase, auth_token }
    }

    async fn first_row<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ProviderError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            self.auth_token.as_deref(),
            None,
        ).await.map_err(database_error)?;

        result.into_iter()
            .next()
            .map(|row| serde_json::from_value(row))
            .transpose()
            .map_err(|e| ProviderError::DatabaseError(format!("Failed to parse row: {}", e)))
    }
}

fn database_error(error: DatabaseError) -> ProviderError {
    ProviderError::DatabaseError(error.to_string())
}

#[async_trait]
impl ProviderDirectory for SupabaseProviderDirectory {
    async fn get_provider(&self, provider_id: Uuid) -> Result<Option<ProviderProfile>, ProviderError> {
        let path = format!("/rest/v1/providers?id=eq.{}", provider_id);
        self.first_row(&path).await
    }

    async fn weekly_hours(
        &self,
        provider_id: Uuid,
        day_of_week: i32,
    ) -> Result<Option<WorkingHours>, ProviderError> {
        let path = format!(
            "/rest/v1/provider_working_hours?provider_id=eq.{}&day_of_week=eq.{}",
            provider_id, day_of_week
        );
        self.first_row(&path).await
    }

    async fn schedule_override(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<ScheduleOverride>, ProviderError> {
        let path = format!(
            "/rest/v1/provider_schedule_overrides?provider_id=eq.{}&override_date=eq.{}",
            provider_id, date
        );
        self.first_row(&path).await
    }
}
