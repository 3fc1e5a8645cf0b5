// libs/appointment-cell/src/store/mod.rs
pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_utils::pagination::PageRequest;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus};

pub use memory::InMemoryAppointmentStore;
pub use supabase::SupabaseAppointmentStore;

/// Persistence contract for appointments.
///
/// Implementations must enforce a unique `(provider_id, scheduled_date,
/// scheduled_time)` among non-cancelled rows on both insert and slot
/// updates, answering [`DatabaseError::UniqueViolation`] when it trips.
/// That constraint, not the availability pre-check, is what guarantees a
/// slot is never double-booked.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, DatabaseError>;

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError>;

    /// Write `next` only if the row is still in `expected`. `Ok(None)` means
    /// the row moved on (or vanished) in the meantime.
    async fn compare_and_set_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Appointment>, DatabaseError>;

    /// Move the appointment to a new slot, conditioned on `expected` status.
    async fn compare_and_set_slot(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        date: NaiveDate,
        time: NaiveTime,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Appointment>, DatabaseError>;

    /// Non-cancelled appointments of a provider on a date, ordered by time.
    async fn occupying(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, DatabaseError>;

    /// Filtered listing ordered by date then time. Returns up to
    /// `page.fetch_limit()` rows.
    async fn search(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Vec<Appointment>, DatabaseError>;
}
