use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentError, AppointmentStatus, FreeSlot};
use appointment_cell::services::AvailabilityChecker;
use appointment_cell::store::{AppointmentStore, InMemoryAppointmentStore};
use provider_cell::models::{ProviderProfile, ScheduleOverride, WorkingHours};
use provider_cell::services::{InMemoryProviderDirectory, WorkingHoursService};
use shared_config::SchedulingConfig;
use shared_utils::test_utils::{date, fixture_now, init_test_tracing, time};

async fn checker(
    provider_id: Uuid,
    config: SchedulingConfig,
) -> (AvailabilityChecker, Arc<InMemoryAppointmentStore>, Arc<InMemoryProviderDirectory>) {
    init_test_tracing();

    let directory = Arc::new(InMemoryProviderDirectory::new());
    directory.add_provider(ProviderProfile::professional(provider_id, "Ana Stylist")).await;
    // Tuesdays only, 09:00-12:00
    directory.set_working_hours(WorkingHours {
        provider_id,
        day_of_week: 2,
        is_open: true,
        start_time: time(9, 0),
        end_time: time(12, 0),
    }).await.unwrap();

    let store = Arc::new(InMemoryAppointmentStore::new());
    let checker = AvailabilityChecker::new(
        store.clone(),
        Arc::new(WorkingHoursService::new(directory.clone())),
        config,
    );

    (checker, store, directory)
}

fn appointment(provider_id: Uuid, hour: u32, minute: u32, duration_minutes: i32, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        provider_id,
        service_id: Uuid::new_v4(),
        scheduled_date: date(2024, 12, 31),
        scheduled_time: time(hour, minute),
        duration_minutes,
        status,
        location: None,
        notes: None,
        created_at: fixture_now(),
        updated_at: fixture_now(),
    }
}

fn starts(slots: &[FreeSlot]) -> Vec<String> {
    slots.iter().map(|s| s.start_time.format("%H:%M").to_string()).collect()
}

#[tokio::test]
async fn test_free_slots_subtract_occupied_intervals() {
    let provider_id = Uuid::new_v4();
    let (checker, store, _) = checker(provider_id, SchedulingConfig::default()).await;

    store.insert(appointment(provider_id, 9, 30, 30, AppointmentStatus::Accepted)).await.unwrap();
    store.insert(appointment(provider_id, 10, 30, 60, AppointmentStatus::Pending)).await.unwrap();
    store.insert(appointment(provider_id, 9, 0, 30, AppointmentStatus::Cancelled)).await.unwrap();

    let slots = checker.free_slots(provider_id, date(2024, 12, 31), None).await.unwrap();

    assert_eq!(starts(&slots), vec!["09:00", "10:00", "11:30"]);
    assert_eq!(slots[0].end_time, time(9, 30));
}

#[tokio::test]
async fn test_free_slots_with_longer_duration() {
    let provider_id = Uuid::new_v4();
    let (checker, store, _) = checker(provider_id, SchedulingConfig::default()).await;

    store.insert(appointment(provider_id, 10, 0, 30, AppointmentStatus::Pending)).await.unwrap();

    let slots = checker.free_slots(provider_id, date(2024, 12, 31), Some(60)).await.unwrap();

    // 60-minute slots must clear the 10:00 booking and end by 12:00
    assert_eq!(starts(&slots), vec!["09:00", "10:30", "11:00"]);
    assert_eq!(slots[0].end_time, time(10, 0));
}

#[tokio::test]
async fn test_free_slots_empty_without_hours_or_when_full() {
    let provider_id = Uuid::new_v4();
    let (checker, store, directory) = checker(provider_id, SchedulingConfig::default()).await;

    // Monday: no working hours configured
    assert!(checker.free_slots(provider_id, date(2024, 12, 30), None).await.unwrap().is_empty());

    // Unknown provider behaves the same
    assert!(checker.free_slots(Uuid::new_v4(), date(2024, 12, 31), None).await.unwrap().is_empty());

    store.insert(appointment(provider_id, 9, 0, 180, AppointmentStatus::Accepted)).await.unwrap();
    assert!(checker.free_slots(provider_id, date(2024, 12, 31), None).await.unwrap().is_empty());

    directory.add_override(ScheduleOverride {
        provider_id,
        override_date: date(2025, 1, 7),
        is_open: false,
        start_time: None,
        end_time: None,
        reason: Some("Holiday".to_string()),
    }).await.unwrap();
    assert!(checker.free_slots(provider_id, date(2025, 1, 7), None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_free_slots_follow_configured_step() {
    let provider_id = Uuid::new_v4();
    let config = SchedulingConfig { default_slot_minutes: 60, ..Default::default() };
    let (checker, _, _) = checker(provider_id, config).await;

    let slots = checker.free_slots(provider_id, date(2024, 12, 31), None).await.unwrap();

    assert_eq!(starts(&slots), vec!["09:00", "10:00", "11:00"]);
}

#[tokio::test]
async fn test_is_available() {
    let provider_id = Uuid::new_v4();
    let (checker, store, _) = checker(provider_id, SchedulingConfig::default()).await;
    let day = date(2024, 12, 31);

    let booked = store.insert(appointment(provider_id, 14, 0, 30, AppointmentStatus::Pending)).await.unwrap();

    assert!(!checker.is_available(provider_id, day, time(14, 0), None).await.unwrap());
    assert!(checker.is_available(provider_id, day, time(14, 30), None).await.unwrap());
    assert!(checker.is_available(provider_id, day, time(13, 30), None).await.unwrap());
    assert!(!checker.is_available(provider_id, day, time(13, 30), Some(45)).await.unwrap());

    // Working hours do not matter for a point check
    assert!(checker.is_available(provider_id, day, time(20, 0), None).await.unwrap());

    // Another provider's calendar is independent
    assert!(checker.is_available(Uuid::new_v4(), day, time(14, 0), None).await.unwrap());

    assert!(checker
        .is_available_excluding(provider_id, day, time(14, 0), None, booked.id)
        .await
        .unwrap());

    let response = checker.check_slot(provider_id, day, time(14, 0), None, None).await.unwrap();
    assert!(!response.is_available);
    assert_eq!(response.conflicting_appointments.len(), 1);
    assert_eq!(response.conflicting_appointments[0].id, booked.id);
}

#[tokio::test]
async fn test_cancelled_never_blocks() {
    let provider_id = Uuid::new_v4();
    let (checker, store, _) = checker(provider_id, SchedulingConfig::default()).await;

    store.insert(appointment(provider_id, 9, 0, 30, AppointmentStatus::Cancelled)).await.unwrap();

    assert!(checker.is_available(provider_id, date(2024, 12, 31), time(9, 0), None).await.unwrap());
    let slots = checker.free_slots(provider_id, date(2024, 12, 31), None).await.unwrap();
    assert_eq!(slots.len(), 6);
}

#[tokio::test]
async fn test_unbookable_durations_are_rejected() {
    let provider_id = Uuid::new_v4();
    let (checker, store, _) = checker(provider_id, SchedulingConfig::default()).await;
    let day = date(2024, 12, 31);

    store.insert(appointment(provider_id, 10, 0, 30, AppointmentStatus::Accepted)).await.unwrap();

    for duration in [0, -30, 481] {
        assert_matches!(
            checker.is_available(provider_id, day, time(10, 0), Some(duration)).await,
            Err(AppointmentError::ValidationError(_))
        );
        assert_matches!(
            checker.check_slot(provider_id, day, time(10, 0), Some(duration), None).await,
            Err(AppointmentError::ValidationError(_))
        );
    }

    for duration in [0, -60] {
        assert_matches!(
            checker.free_slots(provider_id, day, Some(duration)).await,
            Err(AppointmentError::ValidationError(_))
        );
    }

    // A closed day still validates the request first
    assert_matches!(
        checker.free_slots(provider_id, date(2024, 12, 30), Some(0)).await,
        Err(AppointmentError::ValidationError(_))
    );

    assert!(!checker.is_available(provider_id, day, time(10, 0), Some(5)).await.unwrap());
    let slots = checker.free_slots(provider_id, day, Some(30)).await.unwrap();
    assert!(slots.iter().all(|slot| slot.start_time != time(10, 0) && slot.end_time <= time(12, 0)));
}
