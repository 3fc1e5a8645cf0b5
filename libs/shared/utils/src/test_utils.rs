use std::sync::Once;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use shared_models::auth::{Actor, Role, User};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Safe to call from every test.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into()),
            ))
            .with_test_writer()
            .try_init();
    });
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl TestUser {
    pub fn new(email: &str, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
        }
    }

    pub fn client(email: &str) -> Self {
        Self::new(email, Role::Client)
    }

    pub fn professional(email: &str) -> Self {
        Self::new(email, Role::Professional)
    }

    pub fn company_employee(email: &str) -> Self {
        Self::new(email, Role::CompanyEmployee)
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, Role::Admin)
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.to_string(),
            email: Some(self.email.clone()),
            role: Some(self.role.to_string()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

/// 2024-12-01 08:00 UTC, a Sunday well before the fixture booking dates.
pub fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 1, 8, 0, 0).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}
