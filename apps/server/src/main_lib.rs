use std::sync::Arc;

use crate::config::Config;
use signalgate_core::{
    exclusions::ExclusionRegistry,
    scanner::{ScanOrchestrator, ScanScheduler, SymbolUniverse},
    signals::{AlertSink, LogAlertSink, NullAnalyzer, SignalCooldownArbiter, SignalPipeline},
    utils::{Clock, SystemClock},
};
use signalgate_market_data::{
    MarketDataProvider, RateBudgetGovernor, TierFallbackFetcher, TwelveDataProvider,
};
use signalgate_storage_sqlite::{db, CooldownRepository, ExclusionRepository};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub governor: Arc<RateBudgetGovernor>,
    pub orchestrator: Arc<ScanOrchestrator>,
    pub pipeline: Arc<SignalPipeline>,
    pub scheduler: Arc<ScanScheduler>,
    pub db_path: String,
}

impl AppState {
    pub fn registry(&self) -> &Arc<ExclusionRegistry> {
        self.orchestrator.registry()
    }
}

pub fn init_tracing() {
    let log_format = std::env::var("SG_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // `init` also installs the log bridge, so the library crates' `log` records land here.
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);
    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;

    let exclusion_store = Arc::new(ExclusionRepository::new(pool.clone()));
    let cooldown_store = Arc::new(CooldownRepository::new(pool.clone()));

    let settings = &config.scanner;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let registry = Arc::new(ExclusionRegistry::new(
        settings.exclusion_policy(),
        clock.clone(),
    ));
    let restored = registry.load_from(exclusion_store.as_ref())?;
    let arbiter = Arc::new(SignalCooldownArbiter::new(settings.cooldown, clock.clone()));
    let cooldowns = arbiter.load_from(cooldown_store.as_ref())?;
    tracing::info!(
        "Restored {} exclusion entries and {} cooldowns",
        restored,
        cooldowns
    );

    let provider: Arc<dyn MarketDataProvider> = match &config.provider_base_url {
        Some(base_url) => Arc::new(TwelveDataProvider::with_base_url(
            base_url.clone(),
            config.provider_api_key.clone(),
        )),
        None => Arc::new(TwelveDataProvider::new(config.provider_api_key.clone())),
    };
    let governor = Arc::new(RateBudgetGovernor::new(settings.rate_budget()));
    let fetcher = Arc::new(TierFallbackFetcher::new(
        provider,
        governor.clone(),
        settings.tier_timeout,
    ));

    let orchestrator = Arc::new(
        ScanOrchestrator::new(
            fetcher,
            registry,
            clock,
            settings.fetch_concurrency,
            settings.bulk_batch_size,
        )
        .with_store(exclusion_store),
    );

    let sink: Arc<dyn AlertSink> = Arc::new(LogAlertSink);
    let pipeline = Arc::new(SignalPipeline::new(arbiter, sink).with_store(cooldown_store));

    let universe = match &config.symbols_file {
        Some(path) => SymbolUniverse::from_file(path)?,
        None => {
            tracing::warn!("SG_SYMBOLS_FILE not set; scanning an empty universe");
            SymbolUniverse::default()
        }
    };
    tracing::info!("Loaded {} symbols", universe.len());

    let scheduler = Arc::new(ScanScheduler::new(
        orchestrator.clone(),
        Arc::new(NullAnalyzer),
        pipeline.clone(),
        universe,
        settings.scan_interval,
    ));

    Ok(Arc::new(AppState {
        governor,
        orchestrator,
        pipeline,
        scheduler,
        db_path,
    }))
}
