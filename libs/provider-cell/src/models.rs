use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// PROVIDER PROFILES
// ==============================================================================

/// Independent professionals and company employees share one code path;
/// the kind only matters for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Professional,
    CompanyEmployee,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Professional => write!(f, "professional"),
            ProviderKind::CompanyEmployee => write!(f, "company_employee"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderProfile {
    pub id: Uuid,
    pub kind: ProviderKind,
    pub company_id: Option<Uuid>,
    pub display_name: String,
    pub is_active: bool,
}

impl ProviderProfile {
    pub fn professional(id: Uuid, display_name: &str) -> Self {
        Self {
            id,
            kind: ProviderKind::Professional,
            company_id: None,
            display_name: display_name.to_string(),
            is_active: true,
        }
    }

    pub fn company_employee(id: Uuid, company_id: Uuid, display_name: &str) -> Self {
        Self {
            id,
            kind: ProviderKind::CompanyEmployee,
            company_id: Some(company_id),
            display_name: display_name.to_string(),
            is_active: true,
        }
    }
}

// ==============================================================================
// WORKING HOURS
// ==============================================================================

/// Recurring hours for one weekday (0 = Sunday ... 6 = Saturday).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub provider_id: Uuid,
    pub day_of_week: i32,
    pub is_open: bool,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl WorkingHours {
    pub fn window(&self) -> Option<WorkingWindow> {
        if !self.is_open {
            return None;
        }
        WorkingWindow::new(self.start_time, self.end_time)
    }
}

/// One-off change for a specific date: a day off, or different hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOverride {
    pub provider_id: Uuid,
    pub override_date: NaiveDate,
    pub is_open: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
}

/// Half-open `[start, end)` interval of bookable time on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl WorkingWindow {
    /// `None` for empty or inverted windows.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.start <= time && time < self.end
    }
}

/// Weekday index used by the working-hours tables.
pub fn day_of_week(date: NaiveDate) -> i32 {
    match date.weekday() {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<ProviderError> for AppError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::NotFound => AppError::NotFound("Provider not found".to_string()),
            ProviderError::ValidationError(msg) => AppError::BadRequest(msg),
            ProviderError::DatabaseError(msg) => AppError::Storage(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_day_of_week_starts_on_sunday() {
        let sunday = NaiveDate::from_ymd_opt(2024, 12, 29).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

        assert_eq!(day_of_week(sunday), 0);
        assert_eq!(day_of_week(tuesday), 2);
    }

    #[test]
    fn test_closed_or_inverted_hours_have_no_window() {
        let mut hours = WorkingHours {
            provider_id: Uuid::new_v4(),
            day_of_week: 1,
            is_open: true,
            start_time: t(9, 0),
            end_time: t(17, 0),
        };
        assert_eq!(hours.window(), WorkingWindow::new(t(9, 0), t(17, 0)));

        hours.is_open = false;
        assert!(hours.window().is_none());

        hours.is_open = true;
        hours.end_time = t(9, 0);
        assert!(hours.window().is_none());
    }

    #[test]
    fn test_window_is_half_open() {
        let window = WorkingWindow::new(t(9, 0), t(12, 0)).unwrap();

        assert!(window.contains(t(9, 0)));
        assert!(window.contains(t(11, 59)));
        assert!(!window.contains(t(12, 0)));
    }
}
