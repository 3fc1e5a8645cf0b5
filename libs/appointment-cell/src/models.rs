// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;

use shared_models::error::AppError;

/// Shortest and longest service duration accepted for a booking.
pub const MIN_DURATION_MINUTES: i32 = 5;
pub const MAX_DURATION_MINUTES: i32 = 480;

pub const MAX_NOTES_LENGTH: usize = 2000;
pub const MAX_LOCATION_LENGTH: usize = 500;

const MINUTES_PER_DAY: i64 = 24 * 60;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn scheduled_start(&self) -> NaiveDateTime {
        self.scheduled_date.and_time(self.scheduled_time)
    }

    /// Occupied interval in minutes from midnight, `[start, end)`.
    pub fn occupied_minutes(&self) -> (i64, i64) {
        slot_minutes(self.scheduled_time, self.duration_minutes)
    }

    pub fn overlaps(&self, time: NaiveTime, duration_minutes: i32) -> bool {
        let (start, end) = self.occupied_minutes();
        let (other_start, other_end) = slot_minutes(time, duration_minutes);
        start < other_end && other_start < end
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.provider_id == user_id
    }
}

/// `[start, end)` minutes from midnight for a slot starting at `time`.
pub fn slot_minutes(time: NaiveTime, duration_minutes: i32) -> (i64, i64) {
    let start = i64::from(time.num_seconds_from_midnight() / 60);
    (start, start + i64::from(duration_minutes))
}

/// Whether a slot starting at `time` ends by midnight.
pub fn fits_in_day(time: NaiveTime, duration_minutes: i32) -> bool {
    slot_minutes(time, duration_minutes).1 <= MINUTES_PER_DAY
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Accepted,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Every status except `Cancelled` keeps the slot taken.
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Date and time may only change before the service happens.
    pub fn allows_reschedule(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Accepted)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Accepted => write!(f, "accepted"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub client_id: Uuid,
    pub provider_id: Uuid,
    pub service_id: Uuid,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: NaiveTime,
    /// Service-specific length; the configured slot length when absent.
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_date: NaiveDate,
    pub new_time: NaiveTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub client_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Store-level filter; pagination travels separately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentFilter {
    pub client_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    /// Only appointments starting at or after this instant.
    pub starts_at_or_after: Option<NaiveDateTime>,
    /// Only pending and accepted appointments.
    pub upcoming_only: bool,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.client_id.map_or(true, |id| appointment.client_id == id)
            && self.provider_id.map_or(true, |id| appointment.provider_id == id)
            && self.status.map_or(true, |status| appointment.status == status)
            && self.from_date.map_or(true, |date| appointment.scheduled_date >= date)
            && self.to_date.map_or(true, |date| appointment.scheduled_date <= date)
            && self.starts_at_or_after.map_or(true, |start| appointment.scheduled_start() >= start)
            && (!self.upcoming_only || appointment.status.allows_reschedule())
    }
}

impl From<&AppointmentSearchQuery> for AppointmentFilter {
    fn from(query: &AppointmentSearchQuery) -> Self {
        Self {
            client_id: query.client_id,
            provider_id: query.provider_id,
            status: query.status,
            from_date: query.from_date,
            to_date: query.to_date,
            starts_at_or_after: None,
            upcoming_only: false,
        }
    }
}

// ==============================================================================
// AVAILABILITY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotCheckResponse {
    pub is_available: bool,
    pub conflicting_appointments: Vec<Appointment>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Provider not found")]
    ProviderNotFound,

    #[error("Appointment slot conflicts with existing booking")]
    SchedulingConflict,

    #[error("Cannot move appointment from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Appointment was modified concurrently")]
    ConcurrentModification,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        let message = error.to_string();
        match error {
            AppointmentError::NotFound | AppointmentError::ProviderNotFound => AppError::NotFound(message),
            AppointmentError::SchedulingConflict => AppError::SchedulingConflict(message),
            AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::ConcurrentModification => AppError::InvalidTransition(message),
            AppointmentError::Forbidden(msg) => AppError::Forbidden(msg),
            AppointmentError::InvalidTime(msg) | AppointmentError::ValidationError(msg) => AppError::BadRequest(msg),
            AppointmentError::DatabaseError(msg) => AppError::Storage(msg),
        }
    }
}

impl From<provider_cell::ProviderError> for AppointmentError {
    fn from(error: provider_cell::ProviderError) -> Self {
        match error {
            provider_cell::ProviderError::NotFound => AppointmentError::ProviderNotFound,
            provider_cell::ProviderError::ValidationError(msg) => AppointmentError::ValidationError(msg),
            provider_cell::ProviderError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
        }
    }
}
