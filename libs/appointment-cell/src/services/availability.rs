// libs/appointment-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::{debug, instrument};
use uuid::Uuid;

use provider_cell::WorkingHoursSource;
use shared_config::SchedulingConfig;

use crate::models::{slot_minutes, Appointment, AppointmentError, FreeSlot, SlotCheckResponse};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::store::AppointmentStore;

/// Free/busy answers for a provider's day.
///
/// Every non-cancelled appointment occupies `[time, time + duration)`. A
/// candidate without an explicit duration is checked with the configured
/// slot length. These answers are advisory: the store's unique slot
/// constraint is what finally decides between two racing bookings.
pub struct AvailabilityChecker {
    store: Arc<dyn AppointmentStore>,
    working_hours: Arc<dyn WorkingHoursSource>,
    config: SchedulingConfig,
}

impl AvailabilityChecker {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        working_hours: Arc<dyn WorkingHoursSource>,
        config: SchedulingConfig,
    ) -> Self {
        Self { store, working_hours, config }
    }

    /// A caller-supplied duration must be a bookable one; anything shorter
    /// would make an occupied start look free.
    fn effective_duration(&self, duration_minutes: Option<i32>) -> Result<i32, AppointmentError> {
        match duration_minutes {
            Some(minutes) => {
                AppointmentLifecycleService::new().validate_duration(minutes)?;
                Ok(minutes)
            }
            None => Ok(self.config.default_slot_minutes),
        }
    }

    pub async fn is_available(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: Option<i32>,
    ) -> Result<bool, AppointmentError> {
        let result = self.check_slot(provider_id, date, time, duration_minutes, None).await?;
        Ok(result.is_available)
    }

    /// Same as [`Self::is_available`] but ignores one appointment, which is
    /// what a reschedule needs to avoid conflicting with itself.
    pub async fn is_available_excluding(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: Option<i32>,
        exclude_appointment_id: Uuid,
    ) -> Result<bool, AppointmentError> {
        let result = self
            .check_slot(provider_id, date, time, duration_minutes, Some(exclude_appointment_id))
            .await?;
        Ok(result.is_available)
    }

    #[instrument(skip(self))]
    pub async fn check_slot(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        duration_minutes: Option<i32>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<SlotCheckResponse, AppointmentError> {
        let duration = self.effective_duration(duration_minutes)?;

        let occupying = self.occupying(provider_id, date, exclude_appointment_id).await?;
        let conflicting_appointments: Vec<Appointment> = occupying
            .into_iter()
            .filter(|apt| apt.overlaps(time, duration))
            .collect();

        if !conflicting_appointments.is_empty() {
            debug!(
                "Provider {} busy on {} at {}: {} conflicting appointment(s)",
                provider_id, date, time, conflicting_appointments.len()
            );
        }

        Ok(SlotCheckResponse {
            is_available: conflicting_appointments.is_empty(),
            conflicting_appointments,
        })
    }

    /// Candidate start times inside the provider's working window for
    /// `date`, stepping by the configured slot length. Each slot lasts
    /// `duration_minutes` (slot length when absent) and must end by the
    /// window's close. Recomputed on every call.
    #[instrument(skip(self))]
    pub async fn free_slots(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        duration_minutes: Option<i32>,
    ) -> Result<Vec<FreeSlot>, AppointmentError> {
        let duration = self.effective_duration(duration_minutes)?;

        let window = match self.working_hours.window_for(provider_id, date).await? {
            Some(window) => window,
            None => {
                debug!("Provider {} has no working hours on {}", provider_id, date);
                return Ok(Vec::new());
            }
        };

        let step = i64::from(self.config.default_slot_minutes.max(1));
        let occupying = self.occupying(provider_id, date, None).await?;

        let (window_start, _) = slot_minutes(window.start, 0);
        let (window_end, _) = slot_minutes(window.end, 0);

        let mut slots = Vec::new();
        let mut candidate = window_start;

        while candidate + i64::from(duration) <= window_end {
            let start_time = window.start + Duration::minutes(candidate - window_start);
            let end_time = start_time + Duration::minutes(i64::from(duration));

            if !occupying.iter().any(|apt| apt.overlaps(start_time, duration)) {
                slots.push(FreeSlot { start_time, end_time });
            }

            candidate += step;
        }

        debug!("Found {} free slots for provider {} on {}", slots.len(), provider_id, date);
        Ok(slots)
    }

    async fn occupying(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        self.store
            .occupying(provider_id, date, exclude_appointment_id)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))
    }
}
