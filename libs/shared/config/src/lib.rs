use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_token: Option<String>,
    pub scheduling: SchedulingConfig,
}

/// Largest accepted review edit window: about a hundred years.
pub const MAX_REVIEW_EDIT_WINDOW_HOURS: i64 = 24 * 365 * 100;
/// Largest accepted page size.
pub const MAX_PAGE_SIZE_LIMIT: i64 = 10_000;
/// A slot can not be longer than a day.
pub const MAX_SLOT_MINUTES: i32 = 24 * 60;

/// Tunables for the scheduling and review core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    pub default_slot_minutes: i32,
    pub review_edit_window_hours: i64,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_slot_minutes: 30,
            review_edit_window_hours: 24,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            default_slot_minutes: bounded_from_env(
                "SCHEDULING_SLOT_MINUTES", defaults.default_slot_minutes, MAX_SLOT_MINUTES,
            ),
            review_edit_window_hours: bounded_from_env(
                "REVIEW_EDIT_WINDOW_HOURS", defaults.review_edit_window_hours, MAX_REVIEW_EDIT_WINDOW_HOURS,
            ),
            default_page_size: bounded_from_env("DEFAULT_PAGE_SIZE", defaults.default_page_size, MAX_PAGE_SIZE_LIMIT),
            max_page_size: bounded_from_env("MAX_PAGE_SIZE", defaults.max_page_size, MAX_PAGE_SIZE_LIMIT),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_token: env::var("SUPABASE_SERVICE_TOKEN").ok()
                .filter(|token| !token.is_empty()),
            scheduling: SchedulingConfig::from_env(),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - stores will run in memory");
        }

        config
    }

    /// Config with no persistence backend, used for in-memory setups and tests.
    pub fn in_memory(scheduling: SchedulingConfig) -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_token: None,
            scheduling,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

/// Positive value from `key`, capped at `max`.
fn bounded_from_env<T>(key: &str, default: T, max: T) -> T
where
    T: FromStr + PartialOrd + Default + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value > max => {
                warn!("{} value {} is above the limit, using {}", key, value, max);
                max
            }
            Ok(value) if value > T::default() => value,
            _ => {
                warn!("{} has invalid value '{}', using default {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
