// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use tracing::{debug, warn};

use shared_models::auth::{Actor, Role};

use crate::models::{
    fits_in_day, Appointment, AppointmentError, AppointmentStatus, MAX_DURATION_MINUTES,
    MIN_DURATION_MINUTES,
};

/// Transition table and actor rules for appointments. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &AppointmentStatus,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: *current_status,
                to: *new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Accepted,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Accepted => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed => vec![],
            AppointmentStatus::Cancelled => vec![],
        }
    }

    /// Provider-side actors may accept, complete and cancel their own
    /// appointments; clients may only cancel their own.
    pub fn authorize_transition(
        &self,
        actor: &Actor,
        appointment: &Appointment,
        new_status: &AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Professional | Role::CompanyEmployee => {
                if appointment.provider_id != actor.id {
                    return Err(AppointmentError::Forbidden(
                        "Only the assigned provider can change this appointment".to_string()
                    ));
                }
                Ok(())
            }
            Role::Client => {
                if appointment.client_id != actor.id {
                    return Err(AppointmentError::Forbidden(
                        "Clients can only change their own appointments".to_string()
                    ));
                }
                if *new_status != AppointmentStatus::Cancelled {
                    return Err(AppointmentError::Forbidden(
                        format!("Clients cannot move an appointment to {}", new_status)
                    ));
                }
                Ok(())
            }
        }
    }

    /// Either party of the appointment, or an admin, may move it.
    pub fn authorize_reschedule(
        &self,
        actor: &Actor,
        appointment: &Appointment,
    ) -> Result<(), AppointmentError> {
        let allowed = match actor.role {
            Role::Admin => true,
            Role::Client => appointment.client_id == actor.id,
            Role::Professional | Role::CompanyEmployee => appointment.provider_id == actor.id,
        };

        if !allowed {
            return Err(AppointmentError::Forbidden(
                "Not authorized to reschedule this appointment".to_string()
            ));
        }
        Ok(())
    }

    /// Clients book for themselves, providers book into their own calendar.
    pub fn authorize_booking(
        &self,
        actor: &Actor,
        client_id: uuid::Uuid,
        provider_id: uuid::Uuid,
    ) -> Result<(), AppointmentError> {
        let allowed = match actor.role {
            Role::Admin => true,
            Role::Client => client_id == actor.id,
            Role::Professional | Role::CompanyEmployee => provider_id == actor.id,
        };

        if !allowed {
            return Err(AppointmentError::Forbidden(
                "Not authorized to book appointment for this client or provider".to_string()
            ));
        }
        Ok(())
    }

    pub fn validate_duration(&self, duration_minutes: i32) -> Result<(), AppointmentError> {
        if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
            return Err(AppointmentError::ValidationError(format!(
                "Duration must be between {} and {} minutes",
                MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
            )));
        }
        Ok(())
    }

    /// Validate appointment timing constraints
    pub fn validate_appointment_timing(
        &self,
        scheduled_date: NaiveDate,
        scheduled_time: NaiveTime,
        duration_minutes: i32,
        current_time: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        if scheduled_time.second() != 0 || scheduled_time.nanosecond() != 0 {
            return Err(AppointmentError::InvalidTime(
                "Appointment time must be given in whole minutes".to_string()
            ));
        }

        // Appointment must be in the future
        if scheduled_date.and_time(scheduled_time) <= current_time.naive_utc() {
            return Err(AppointmentError::InvalidTime(
                "Appointment must be scheduled for a future time".to_string()
            ));
        }

        if !fits_in_day(scheduled_time, duration_minutes) {
            return Err(AppointmentError::InvalidTime(
                "Appointment must end on the day it starts".to_string()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use uuid::Uuid;

    const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Accepted,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    fn appointment(client_id: Uuid, provider_id: Uuid) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            client_id,
            provider_id,
            service_id: Uuid::new_v4(),
            scheduled_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            scheduled_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            duration_minutes: 30,
            status: AppointmentStatus::Pending,
            location: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_transition_table() {
        let service = AppointmentLifecycleService::new();

        let legal = [
            (AppointmentStatus::Pending, AppointmentStatus::Accepted),
            (AppointmentStatus::Pending, AppointmentStatus::Cancelled),
            (AppointmentStatus::Accepted, AppointmentStatus::Completed),
            (AppointmentStatus::Accepted, AppointmentStatus::Cancelled),
        ];

        for from in ALL {
            for to in ALL {
                let result = service.validate_status_transition(&from, &to);
                if legal.contains(&(from, to)) {
                    assert!(result.is_ok(), "{} -> {} should be legal", from, to);
                } else {
                    assert_matches!(result, Err(AppointmentError::InvalidStatusTransition { .. }));
                }
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let service = AppointmentLifecycleService::new();

        assert!(service.get_valid_transitions(&AppointmentStatus::Completed).is_empty());
        assert!(service.get_valid_transitions(&AppointmentStatus::Cancelled).is_empty());
    }

    #[test]
    fn test_client_may_only_cancel_own() {
        let service = AppointmentLifecycleService::new();
        let client_id = Uuid::new_v4();
        let apt = appointment(client_id, Uuid::new_v4());

        let owner = Actor::client(client_id);
        assert!(service.authorize_transition(&owner, &apt, &AppointmentStatus::Cancelled).is_ok());
        assert_matches!(
            service.authorize_transition(&owner, &apt, &AppointmentStatus::Accepted),
            Err(AppointmentError::Forbidden(_))
        );

        let stranger = Actor::client(Uuid::new_v4());
        assert_matches!(
            service.authorize_transition(&stranger, &apt, &AppointmentStatus::Cancelled),
            Err(AppointmentError::Forbidden(_))
        );
    }

    #[test]
    fn test_provider_side_actors() {
        let service = AppointmentLifecycleService::new();
        let provider_id = Uuid::new_v4();
        let apt = appointment(Uuid::new_v4(), provider_id);

        for actor in [Actor::professional(provider_id), Actor::company_employee(provider_id)] {
            assert!(service.authorize_transition(&actor, &apt, &AppointmentStatus::Accepted).is_ok());
            assert!(service.authorize_transition(&actor, &apt, &AppointmentStatus::Completed).is_ok());
        }

        let other_provider = Actor::professional(Uuid::new_v4());
        assert_matches!(
            service.authorize_transition(&other_provider, &apt, &AppointmentStatus::Accepted),
            Err(AppointmentError::Forbidden(_))
        );

        let admin = Actor::admin(Uuid::new_v4());
        assert!(service.authorize_transition(&admin, &apt, &AppointmentStatus::Completed).is_ok());
    }

    #[test]
    fn test_timing_rules() {
        let service = AppointmentLifecycleService::new();
        let now = Utc.with_ymd_and_hms(2024, 12, 1, 8, 0, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

        assert!(service.validate_appointment_timing(date, NaiveTime::from_hms_opt(14, 0, 0).unwrap(), 30, now).is_ok());

        let past = NaiveDate::from_ymd_opt(2024, 11, 30).unwrap();
        assert_matches!(
            service.validate_appointment_timing(past, NaiveTime::from_hms_opt(14, 0, 0).unwrap(), 30, now),
            Err(AppointmentError::InvalidTime(_))
        );

        assert_matches!(
            service.validate_appointment_timing(date, NaiveTime::from_hms_opt(14, 0, 30).unwrap(), 30, now),
            Err(AppointmentError::InvalidTime(_))
        );

        assert_matches!(
            service.validate_appointment_timing(date, NaiveTime::from_hms_opt(23, 45, 0).unwrap(), 30, now),
            Err(AppointmentError::InvalidTime(_))
        );
    }

    #[test]
    fn test_duration_bounds() {
        let service = AppointmentLifecycleService::new();

        assert!(service.validate_duration(30).is_ok());
        assert!(service.validate_duration(MAX_DURATION_MINUTES).is_ok());
        assert_matches!(service.validate_duration(0), Err(AppointmentError::ValidationError(_)));
        assert_matches!(service.validate_duration(600), Err(AppointmentError::ValidationError(_)));
    }
}
