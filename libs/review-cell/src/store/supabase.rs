use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::{DatabaseError, SupabaseClient};
use shared_utils::pagination::PageRequest;

use crate::models::{Rating, Review, ReviewFilter};
use crate::store::ReviewStore;

const TABLE: &str = "/rest/v1/reviews";
const RATINGS_PAGE_SIZE: usize = 1000;

/// PostgREST-backed store; `reviews_appointment_idx` enforces one review
/// per appointment.
pub struct SupabaseReviewStore {
    supabase: Arc<SupabaseClient>,
    auth_token: Option<String>,
}

#[derive(Deserialize)]
struct RatingRow {
    rating: Rating,
}

impl SupabaseReviewStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: Option<String>) -> Self {
        Self { supabase, auth_token }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Review>, DatabaseError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            self.auth_token.as_deref(),
            None,
        ).await?;

        parse_reviews(result)
    }

    async fn write(&self, method: Method, path: &str, body: Value) -> Result<Vec<Review>, DatabaseError> {
        let result: Vec<Value> = self.supabase.request_with_headers(
            method,
            path,
            self.auth_token.as_deref(),
            Some(body),
            Some(SupabaseClient::return_representation()),
        ).await?;

        parse_reviews(result)
    }
}

fn parse_reviews(rows: Vec<Value>) -> Result<Vec<Review>, DatabaseError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Review>, _>>()
        .map_err(|e| DatabaseError::Decode(format!("Failed to parse reviews: {}", e)))
}

/// PostgREST filters for a review filter, without ordering or pagination.
pub(crate) fn filter_query(filter: &ReviewFilter) -> Vec<String> {
    let mut query_parts = Vec::new();

    if let Some(provider_id) = filter.provider_id {
        query_parts.push(format!("provider_id=eq.{}", provider_id));
    }
    if let Some(client_id) = filter.client_id {
        query_parts.push(format!("client_id=eq.{}", client_id));
    }
    if let Some(min) = filter.min_rating {
        query_parts.push(format!("rating=gte.{}", min));
    }
    if let Some(max) = filter.max_rating {
        query_parts.push(format!("rating=lte.{}", max));
    }
    if let Some(from) = filter.date_from {
        query_parts.push(format!("created_at=gte.{}T00:00:00Z", from));
    }
    if let Some(next_day) = filter.date_to.and_then(|to| to.succ_opt()) {
        query_parts.push(format!("created_at=lt.{}T00:00:00Z", next_day));
    }

    query_parts
}

fn with_query(base: &str, parts: &[String]) -> String {
    if parts.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, parts.join("&"))
    }
}

#[async_trait]
impl ReviewStore for SupabaseReviewStore {
    async fn insert(&self, review: Review) -> Result<Review, DatabaseError> {
        debug!("Inserting review {} for appointment {}", review.id, review.appointment_id);

        let body = serde_json::to_value(&review).map_err(|e| DatabaseError::Decode(e.to_string()))?;
        self.write(Method::POST, TABLE, body).await?
            .into_iter()
            .next()
            .ok_or_else(|| DatabaseError::Decode("Review insert returned no rows".to_string()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Review>, DatabaseError> {
        let path = format!("{}?id=eq.{}", TABLE, id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn get_by_appointment(&self, appointment_id: Uuid) -> Result<Option<Review>, DatabaseError> {
        let path = format!("{}?appointment_id=eq.{}", TABLE, appointment_id);
        Ok(self.fetch(&path).await?.into_iter().next())
    }

    async fn update(
        &self,
        id: Uuid,
        rating: Rating,
        comment: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Review>, DatabaseError> {
        let path = format!("{}?id=eq.{}", TABLE, id);
        let body = json!({
            "rating": rating,
            "comment": comment,
            "updated_at": updated_at.to_rfc3339(),
        });

        Ok(self.write(Method::PATCH, &path, body).await?.into_iter().next())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let path = format!("{}?id=eq.{}", TABLE, id);
        let deleted: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            self.auth_token.as_deref(),
            None,
            Some(SupabaseClient::return_representation()),
        ).await?;

        Ok(!deleted.is_empty())
    }

    async fn search(&self, filter: &ReviewFilter, page: PageRequest) -> Result<Vec<Review>, DatabaseError> {
        let mut query_parts = filter_query(filter);
        query_parts.push("order=created_at.desc,id.asc".to_string());
        query_parts.push(format!("limit={}", page.fetch_limit()));
        query_parts.push(format!("offset={}", page.offset));

        self.fetch(&with_query(TABLE, &query_parts)).await
    }

    async fn ratings(&self, filter: &ReviewFilter) -> Result<Vec<Rating>, DatabaseError> {
        let mut query_parts = vec!["select=rating".to_string()];
        query_parts.extend(filter_query(filter));
        query_parts.push("order=id.asc".to_string());
        query_parts.push(format!("limit={}", RATINGS_PAGE_SIZE));

        // PostgREST may cap a response below the requested limit, so only an
        // empty page ends the scan.
        let mut ratings = Vec::new();
        loop {
            let path = format!("{}&offset={}", with_query(TABLE, &query_parts), ratings.len());
            let rows: Vec<RatingRow> = self.supabase.request(
                Method::GET,
                &path,
                self.auth_token.as_deref(),
                None,
            ).await?;

            if rows.is_empty() {
                break;
            }
            ratings.extend(rows.into_iter().map(|row| row.rating));
        }

        debug!("Fetched {} ratings", ratings.len());
        Ok(ratings)
    }
}
