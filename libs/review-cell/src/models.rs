// libs/review-cell/src/models.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

pub const MAX_COMMENT_LENGTH: usize = 2000;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

// ==============================================================================
// RATING
// ==============================================================================

/// Star rating, always an integer in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = ReviewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if !(MIN_RATING..=MAX_RATING).contains(&value) {
            return Err(ReviewError::InvalidRating(format!(
                "Rating must be between {} and {}, got {}", MIN_RATING, MAX_RATING, value
            )));
        }
        Ok(Self(value))
    }
}

/// Ratings arrive as plain numbers from callers; anything that is not a
/// whole number in range is rejected rather than rounded or clamped.
impl TryFrom<f64> for Rating {
    type Error = ReviewError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(ReviewError::InvalidRating(format!(
                "Rating must be a whole number, got {}", value
            )));
        }
        if value < f64::from(MIN_RATING) || value > f64::from(MAX_RATING) {
            return Err(ReviewError::InvalidRating(format!(
                "Rating must be between {} and {}, got {}", MIN_RATING, MAX_RATING, value
            )));
        }
        // In range and integral, so the cast is exact
        Ok(Self(value as u8))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ==============================================================================
// REVIEW MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Editable while `now - created_at < window`.
    pub fn can_be_edited(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now - self.created_at < window
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub appointment_id: Uuid,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub rating: f64,
    pub comment: Option<String>,
}

/// `None` leaves a field unchanged. A blank comment clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<f64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewQuery {
    pub provider_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub min_rating: Option<u8>,
    pub max_rating: Option<u8>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Store-level filter. Dates bound `created_at` (UTC calendar date), inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewFilter {
    pub provider_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub min_rating: Option<Rating>,
    pub max_rating: Option<Rating>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl ReviewFilter {
    pub fn matches(&self, review: &Review) -> bool {
        let created = review.created_at.date_naive();

        self.provider_id.map_or(true, |id| review.provider_id == id)
            && self.client_id.map_or(true, |id| review.client_id == id)
            && self.min_rating.map_or(true, |min| review.rating >= min)
            && self.max_rating.map_or(true, |max| review.rating <= max)
            && self.date_from.map_or(true, |from| created >= from)
            && self.date_to.map_or(true, |to| created <= to)
    }
}

impl TryFrom<&ReviewQuery> for ReviewFilter {
    type Error = ReviewError;

    fn try_from(query: &ReviewQuery) -> Result<Self, Self::Error> {
        let min_rating = query.min_rating.map(Rating::try_from).transpose()?;
        let max_rating = query.max_rating.map(Rating::try_from).transpose()?;

        if let (Some(min), Some(max)) = (min_rating, max_rating) {
            if min > max {
                return Err(ReviewError::ValidationError(
                    "min_rating must not exceed max_rating".to_string()
                ));
            }
        }

        let filter = Self {
            provider_id: query.provider_id,
            client_id: query.client_id,
            min_rating,
            max_rating,
            date_from: query.date_from,
            date_to: query.date_to,
        };
        filter.validate_dates()?;
        Ok(filter)
    }
}

impl ReviewFilter {
    fn validate_dates(&self) -> Result<(), ReviewError> {
        if let (Some(from), Some(to)) = (self.date_from, self.date_to) {
            if from > to {
                return Err(ReviewError::ValidationError(
                    "date_from must not be after date_to".to_string()
                ));
            }
        }
        Ok(())
    }
}

// ==============================================================================
// RATING STATISTICS
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingStatsFilter {
    pub provider_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl RatingStatsFilter {
    pub fn for_provider(provider_id: Uuid) -> Self {
        Self { provider_id: Some(provider_id), ..Default::default() }
    }
}

impl TryFrom<&RatingStatsFilter> for ReviewFilter {
    type Error = ReviewError;

    fn try_from(filter: &RatingStatsFilter) -> Result<Self, Self::Error> {
        let review_filter = Self {
            provider_id: filter.provider_id,
            client_id: filter.client_id,
            date_from: filter.date_from,
            date_to: filter.date_to,
            ..Default::default()
        };
        review_filter.validate_dates()?;
        Ok(review_filter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingStats {
    pub total: u64,
    /// Rounded to two decimals; 0 when there are no reviews.
    pub average_rating: f64,
    /// Every star value 1 through 5 is present, zero counts included.
    pub rating_distribution: BTreeMap<u8, u64>,
}

impl RatingStats {
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = Rating>,
    {
        let mut rating_distribution: BTreeMap<u8, u64> =
            (MIN_RATING..=MAX_RATING).map(|star| (star, 0)).collect();

        let mut total = 0u64;
        let mut sum = 0u64;
        for rating in ratings {
            *rating_distribution.entry(rating.value()).or_insert(0) += 1;
            total += 1;
            sum += u64::from(rating.value());
        }

        let average_rating = if total == 0 {
            0.0
        } else {
            ((sum as f64 / total as f64) * 100.0).round() / 100.0
        };

        Self { total, average_rating, rating_distribution }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReviewError {
    #[error("Review not found")]
    NotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Invalid rating: {0}")]
    InvalidRating(String),

    #[error("A review already exists for this appointment")]
    AlreadyReviewed,

    #[error("Appointment cannot be reviewed: {0}")]
    NotReviewable(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Review can no longer be edited")]
    EditWindowExpired,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<ReviewError> for AppError {
    fn from(error: ReviewError) -> Self {
        let message = error.to_string();
        match error {
            ReviewError::NotFound | ReviewError::AppointmentNotFound => AppError::NotFound(message),
            ReviewError::InvalidRating(_)
            | ReviewError::AlreadyReviewed
            | ReviewError::NotReviewable(_)
            | ReviewError::ValidationError(_) => AppError::BadRequest(message),
            ReviewError::Forbidden(msg) => AppError::Forbidden(msg),
            ReviewError::EditWindowExpired => AppError::Expired(message),
            ReviewError::DatabaseError(msg) => AppError::Storage(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use shared_models::error::ErrorKind;

    #[test]
    fn test_rating_rejects_out_of_range_and_fractions() {
        for value in [0.0, 6.0, 3.5, -1.0, f64::NAN, f64::INFINITY] {
            assert_matches!(Rating::try_from(value), Err(ReviewError::InvalidRating(_)), "{}", value);
        }
        for value in 1..=5u8 {
            assert_eq!(Rating::try_from(f64::from(value)).unwrap().value(), value);
        }
    }

    #[test]
    fn test_rating_deserialization_is_validated() {
        assert_eq!(serde_json::from_str::<Rating>("4").unwrap().value(), 4);
        assert!(serde_json::from_str::<Rating>("9").is_err());
        assert_eq!(serde_json::to_string(&Rating::try_from(3u8).unwrap()).unwrap(), "3");
    }

    #[test]
    fn test_stats_from_ratings() {
        let ratings = [5u8, 5, 4, 3, 1].map(|r| Rating::try_from(r).unwrap());
        let stats = RatingStats::from_ratings(ratings);

        assert_eq!(stats.total, 5);
        assert_eq!(stats.average_rating, 3.6);
        assert_eq!(
            stats.rating_distribution,
            BTreeMap::from([(1, 1), (2, 0), (3, 1), (4, 1), (5, 2)])
        );
    }

    #[test]
    fn test_empty_stats() {
        let stats = RatingStats::from_ratings(Vec::new());

        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_rating, 0.0);
        assert_eq!(stats.rating_distribution.len(), 5);
        assert!(stats.rating_distribution.values().all(|count| *count == 0));
    }

    #[test]
    fn test_average_is_rounded() {
        let ratings = [5u8, 4, 4].map(|r| Rating::try_from(r).unwrap());
        assert_eq!(RatingStats::from_ratings(ratings).average_rating, 4.33);
    }

    #[test]
    fn test_edit_window() {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let review = Review {
            id: Uuid::new_v4(),
            appointment_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            rating: Rating::try_from(5u8).unwrap(),
            comment: None,
            created_at: created,
            updated_at: created,
        };
        let window = Duration::hours(24);

        assert!(review.can_be_edited(created + Duration::hours(23) + Duration::minutes(59), window));
        assert!(!review.can_be_edited(created + Duration::hours(24), window));
        assert!(!review.can_be_edited(created + Duration::hours(24) + Duration::minutes(1), window));
    }

    #[test]
    fn test_query_rating_bounds() {
        let query = ReviewQuery { min_rating: Some(4), max_rating: Some(2), ..Default::default() };
        assert_matches!(ReviewFilter::try_from(&query), Err(ReviewError::ValidationError(_)));

        let query = ReviewQuery { min_rating: Some(0), ..Default::default() };
        assert_matches!(ReviewFilter::try_from(&query), Err(ReviewError::InvalidRating(_)));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(AppError::from(ReviewError::AlreadyReviewed).kind(), ErrorKind::BadRequest);
        assert_eq!(AppError::from(ReviewError::EditWindowExpired).kind(), ErrorKind::Expired);
        assert_eq!(AppError::from(ReviewError::AppointmentNotFound).kind(), ErrorKind::NotFound);
    }
}
