// libs/marketplace-core/src/lib.rs
use std::sync::Arc;

use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use appointment_cell::services::AppointmentBookingService;
use appointment_cell::store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};
use provider_cell::services::{
    InMemoryProviderDirectory, ProviderDirectory, SupabaseProviderDirectory, WorkingHoursService,
    WorkingHoursSource,
};
use review_cell::services::{RatingAggregator, ReviewGate};
use review_cell::store::{InMemoryReviewStore, ReviewStore, SupabaseReviewStore};
use shared_config::{AppConfig, SchedulingConfig};
use shared_database::SupabaseClient;
use shared_utils::clock::{Clock, SystemClock};

pub use shared_models::error::{AppError, ErrorKind};

/// Install the global `tracing` subscriber, filtered by `RUST_LOG`
/// (default `info`). Fails if a subscriber is already set.
pub fn init_tracing() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

/// The scheduling and review core, wired against one storage backend.
pub struct Marketplace {
    pub config: AppConfig,
    pub appointments: AppointmentBookingService,
    pub reviews: ReviewGate,
    pub ratings: RatingAggregator,
    pub working_hours: Arc<dyn WorkingHoursSource>,
    provider_registry: Option<Arc<InMemoryProviderDirectory>>,
}

impl Marketplace {
    /// Load `.env`, read the environment and wire with the system clock.
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::new(AppConfig::from_env(), Arc::new(SystemClock))
    }

    /// Supabase-backed when `config` is configured, in memory otherwise.
    pub fn new(config: AppConfig, clock: Arc<dyn Clock>) -> Self {
        if !config.is_configured() {
            return Self::in_memory(config.scheduling.clone(), clock);
        }

        info!("Wiring marketplace core against Supabase at {}", config.supabase_url);

        let supabase = Arc::new(SupabaseClient::new(&config));
        let token = config.supabase_service_token.clone();

        let directory: Arc<dyn ProviderDirectory> =
            Arc::new(SupabaseProviderDirectory::new(Arc::clone(&supabase), token.clone()));
        let appointments: Arc<dyn AppointmentStore> =
            Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase), token.clone()));
        let reviews: Arc<dyn ReviewStore> = Arc::new(SupabaseReviewStore::new(supabase, token));

        Self::assemble(config, directory, appointments, reviews, clock, None)
    }

    /// Everything in process memory. Providers are registered through
    /// [`Self::provider_registry`].
    pub fn in_memory(scheduling: SchedulingConfig, clock: Arc<dyn Clock>) -> Self {
        info!("Wiring marketplace core with in-memory stores");

        let registry = Arc::new(InMemoryProviderDirectory::new());
        let directory: Arc<dyn ProviderDirectory> = registry.clone();

        Self::assemble(
            AppConfig::in_memory(scheduling),
            directory,
            Arc::new(InMemoryAppointmentStore::new()),
            Arc::new(InMemoryReviewStore::new()),
            clock,
            Some(registry),
        )
    }

    fn assemble(
        config: AppConfig,
        directory: Arc<dyn ProviderDirectory>,
        appointment_store: Arc<dyn AppointmentStore>,
        review_store: Arc<dyn ReviewStore>,
        clock: Arc<dyn Clock>,
        provider_registry: Option<Arc<InMemoryProviderDirectory>>,
    ) -> Self {
        let working_hours: Arc<dyn WorkingHoursSource> = Arc::new(WorkingHoursService::new(directory));

        let appointments = AppointmentBookingService::new(
            Arc::clone(&appointment_store),
            Arc::clone(&working_hours),
            Arc::clone(&clock),
            config.scheduling.clone(),
        );
        let reviews = ReviewGate::new(
            Arc::clone(&review_store),
            appointment_store,
            clock,
            config.scheduling.clone(),
        );
        let ratings = RatingAggregator::new(review_store);

        Self {
            config,
            appointments,
            reviews,
            ratings,
            working_hours,
            provider_registry,
        }
    }

    /// The writable provider directory, present only for in-memory setups.
    pub fn provider_registry(&self) -> Option<&Arc<InMemoryProviderDirectory>> {
        self.provider_registry.as_ref()
    }
}
