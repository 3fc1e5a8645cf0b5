use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::{DatabaseError, SupabaseClient};
use shared_utils::pagination::PageRequest;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus};
use crate::store::AppointmentStore;

const TABLE: &str = "/rest/v1/appointments";

/// PostgREST-backed store. Slot uniqueness comes from the partial unique
/// index `appointments_active_slot_idx`; compare-and-set writes are PATCHes
/// filtered on both `id` and `status`.
pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
    auth_token: Option<String>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: Option<String>) -> Self {
        Self { supabase, auth_token }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Appointment>, DatabaseError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            self.auth_token.as_deref(),
            None,
        ).await?;

        parse_appointments(result)
    }

    async fn write(&self, method: Method, path: &str, body: Value) -> Result<Vec<Appointment>, DatabaseError> {
        let result: Vec<Value> = self.supabase.request_with_headers(
            method,
            path,
            self.auth_token.as_deref(),
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        parse_appointments(result)
    }
}

fn parse_appointments(rows: Vec<Value>) -> Result<Vec<Appointment>, DatabaseError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Appointment>, _>>()
        .map_err(|e| DatabaseError::Decode(format!("Failed to parse appointments: {}", e)))
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, DatabaseError> {
    serde_json::to_value(value).map_err(|e| DatabaseError::Decode(e.to_string()))
}

/// PostgREST query string for a filter, without pagination.
pub(crate) fn filter_query(filter: &AppointmentFilter) -> Vec<String> {
    let mut query_parts = Vec::new();

    if let Some(client_id) = filter.client_id {
        query_parts.push(format!("client_id=eq.{}", client_id));
    }
    if let Some(provider_id) = filter.provider_id {
        query_parts.push(format!("provider_id=eq.{}", provider_id));
    }
    if let Some(status) = filter.status {
        query_parts.push(format!("status=eq.{}", status));
    }
    if filter.upcoming_only {
        query_parts.push(format!(
            "status=in.({},{})",
            AppointmentStatus::Pending, AppointmentStatus::Accepted
        ));
    }
    if let Some(from_date) = filter.from_date {
        query_parts.push(format!("scheduled_date=gte.{}", from_date));
    }
    if let Some(to_date) = filter.to_date {
        query_parts.push(format!("scheduled_date=lte.{}", to_date));
    }
    if let Some(start) = filter.starts_at_or_after {
        let expression = format!(
            "(scheduled_date.gt.{date},and(scheduled_date.eq.{date},scheduled_time.gte.{time}))",
            date = start.date(),
            time = start.time().format("%H:%M:%S"),
        );
        query_parts.push(format!("or={}", urlencoding::encode(&expression)));
    }

    query_parts
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, DatabaseError> {
        debug!("Inserting appointment {} for provider {}", appointment.id, appointment.provider_id);

        let body = to_body(&appointment)?;
        self.write(Method::POST, TABLE, body).await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::Decode("Appointment insert returned no rows".to_string()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError> {
        let path = format!("{}?id=eq.{}", TABLE, id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn compare_and_set_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let path = format!("{}?id=eq.{}&status=eq.{}", TABLE, id, expected);
        let body = json!({
            "status": next,
            "updated_at": updated_at.to_rfc3339(),
        });

        Ok(self.write(Method::PATCH, &path, body).await?.into_iter().next())
    }

    async fn compare_and_set_slot(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        date: NaiveDate,
        time: NaiveTime,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let path = format!("{}?id=eq.{}&status=eq.{}", TABLE, id, expected);
        let body = json!({
            "scheduled_date": date,
            "scheduled_time": time,
            "updated_at": updated_at.to_rfc3339(),
        });

        Ok(self.write(Method::PATCH, &path, body).await?.into_iter().next())
    }

    async fn occupying(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let mut query_parts = vec![
            format!("provider_id=eq.{}", provider_id),
            format!("scheduled_date=eq.{}", date),
            format!("status=neq.{}", AppointmentStatus::Cancelled),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!("{}?{}&order=scheduled_time.asc", TABLE, query_parts.join("&"));
        self.fetch(&path).await
    }

    async fn search(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let mut query_parts = filter_query(filter);
        query_parts.push("order=scheduled_date.asc,scheduled_time.asc,created_at.asc".to_string());
        query_parts.push(format!("limit={}", page.fetch_limit()));
        query_parts.push(format!("offset={}", page.offset));

        let path = format!("{}?{}", TABLE, query_parts.join("&"));
        self.fetch(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_filter_query_for_upcoming() {
        let client_id = Uuid::new_v4();
        let filter = AppointmentFilter {
            client_id: Some(client_id),
            starts_at_or_after: NaiveDate::from_ymd_opt(2024, 12, 31)
                .and_then(|d| d.and_hms_opt(14, 0, 0)),
            upcoming_only: true,
            ..Default::default()
        };

        let parts = filter_query(&filter);

        assert_eq!(parts[0], format!("client_id=eq.{}", client_id));
        assert_eq!(parts[1], "status=in.(pending,accepted)");
        assert!(parts[2].starts_with("or="));
        assert!(parts[2].contains("2024-12-31"));
    }
}
