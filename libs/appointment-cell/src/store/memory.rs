use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_database::DatabaseError;
use shared_utils::pagination::PageRequest;

use crate::models::{Appointment, AppointmentFilter, AppointmentStatus};
use crate::store::AppointmentStore;

/// Process-local store with the same uniqueness and compare-and-set
/// guarantees as the database schema. Every write holds the lock for its
/// whole check-then-write.
#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.appointments.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.appointments.read().await.is_empty()
    }
}

fn slot_taken(
    appointments: &HashMap<Uuid, Appointment>,
    provider_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
    except: Uuid,
) -> bool {
    appointments.values().any(|existing| {
        existing.id != except
            && existing.provider_id == provider_id
            && existing.scheduled_date == date
            && existing.scheduled_time == time
            && existing.status.occupies_slot()
    })
}

fn slot_violation(provider_id: Uuid, date: NaiveDate, time: NaiveTime) -> DatabaseError {
    DatabaseError::UniqueViolation(format!(
        "appointments_active_slot_idx: provider {} already booked at {} {}",
        provider_id, date, time
    ))
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, DatabaseError> {
        let mut appointments = self.appointments.write().await;

        if appointments.contains_key(&appointment.id) {
            return Err(DatabaseError::UniqueViolation(format!("appointment {} exists", appointment.id)));
        }
        if appointment.status.occupies_slot()
            && slot_taken(
                &appointments,
                appointment.provider_id,
                appointment.scheduled_date,
                appointment.scheduled_time,
                appointment.id,
            )
        {
            return Err(slot_violation(
                appointment.provider_id,
                appointment.scheduled_date,
                appointment.scheduled_time,
            ));
        }

        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, DatabaseError> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn compare_and_set_status(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let mut appointments = self.appointments.write().await;

        match appointments.get_mut(&id) {
            Some(appointment) if appointment.status == expected => {
                appointment.status = next;
                appointment.updated_at = updated_at;
                Ok(Some(appointment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn compare_and_set_slot(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        date: NaiveDate,
        time: NaiveTime,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Appointment>, DatabaseError> {
        let mut appointments = self.appointments.write().await;

        let provider_id = match appointments.get(&id) {
            Some(appointment) if appointment.status == expected => appointment.provider_id,
            _ => return Ok(None),
        };

        if expected.occupies_slot() && slot_taken(&appointments, provider_id, date, time, id) {
            return Err(slot_violation(provider_id, date, time));
        }

        Ok(appointments.get_mut(&id).map(|appointment| {
            appointment.scheduled_date = date;
            appointment.scheduled_time = time;
            appointment.updated_at = updated_at;
            appointment.clone()
        }))
    }

    async fn occupying(
        &self,
        provider_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let appointments = self.appointments.read().await;

        let mut result: Vec<Appointment> = appointments.values()
            .filter(|apt| apt.provider_id == provider_id && apt.scheduled_date == date)
            .filter(|apt| apt.status.occupies_slot())
            .filter(|apt| Some(apt.id) != exclude_appointment_id)
            .cloned()
            .collect();

        result.sort_by_key(|apt| apt.scheduled_time);
        Ok(result)
    }

    async fn search(
        &self,
        filter: &AppointmentFilter,
        page: PageRequest,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let appointments = self.appointments.read().await;

        let mut result: Vec<Appointment> = appointments.values()
            .filter(|apt| filter.matches(apt))
            .cloned()
            .collect();

        result.sort_by(|a, b| {
            a.scheduled_start().cmp(&b.scheduled_start())
                .then(a.created_at.cmp(&b.created_at))
        });

        let offset = usize::try_from(page.offset).unwrap_or(0);
        let take = usize::try_from(page.fetch_limit()).unwrap_or(usize::MAX);
        Ok(result.into_iter().skip(offset).take(take).collect())
    }
}
