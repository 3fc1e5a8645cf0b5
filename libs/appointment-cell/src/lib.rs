pub mod models;
pub mod services;
pub mod store;

pub use models::*;
pub use services::{AppointmentBookingService, AppointmentLifecycleService, AvailabilityChecker};
pub use store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
