mod aggregate;
mod classifier;
mod config;
mod errors;
mod judge;
mod llm_client;
mod models;
mod prompt;
mod resume;
mod routes;
mod site;
mod state;
mod store;
mod workflow;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::judge::JudgeInvoker;
use crate::models::{category::developer_categories, CategoryRegistry};
use crate::prompt::RubricPromptBuilder;
use crate::routes::build_router;
use crate::site::{AdapterRegistry, BoardConfig, BoardSelectors, HttpFetcher, JobBoardAdapter};
use crate::state::AppState;
use crate::store::{FileJobStore, FingerprintedJobStore, JobStore, RedisJobStore};
use crate::workflow::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing or malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume evaluator v{}", env!("CARGO_PKG_VERSION"));

    // Posting cache: Redis when configured, JSON files otherwise
    let backend: Arc<dyn JobStore> = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.as_str()).context("Invalid REDIS_URL")?;
            info!("Posting cache: redis");
            Arc::new(RedisJobStore::new(client))
        }
        None => {
            let store = FileJobStore::new(&config.data_dir)
                .with_context(|| format!("Cannot use data dir {}", config.data_dir.display()))?;
            info!("Posting cache: files under {}", config.data_dir.display());
            Arc::new(store)
        }
    };
    let store = FingerprintedJobStore::new(backend);

    match &config.resume_dir {
        Some(dir) => info!("Resume paths resolved under {}", dir.display()),
        None => info!("Resume path input disabled (RESUME_DIR unset)"),
    }

    // Judge providers, in configured fallback order
    let providers = llm_client::build_providers(&config.providers)?;
    let judge = Arc::new(JudgeInvoker::new(providers, config.workflow.judge_timeout));
    info!(
        "Judge providers: {:?} (order {:?}, timeout {}s)",
        judge.provider_names(),
        config.workflow.provider_order,
        config.workflow.judge_timeout.as_secs()
    );

    // Categories and the site adapter for the configured board
    let mut registry = CategoryRegistry::new();
    registry.register_site(config.site.site_id.clone(), developer_categories());

    let board = BoardConfig {
        site_id: config.site.site_id.clone(),
        base_url: config.site.base_url.clone(),
        list_path: config.site.list_path.clone(),
        years_min: config.workflow.years_min,
        years_max: config.workflow.years_max,
        max_pages: config.site.max_pages,
        selectors: BoardSelectors::default(),
    };
    let fetcher = Arc::new(HttpFetcher::new().context("Failed to build HTTP client")?);
    let mut adapters = AdapterRegistry::new();
    adapters.register(Arc::new(JobBoardAdapter::new(
        board,
        fetcher,
        config.workflow.fetch_delay,
    )));
    info!("Site adapters: {:?}", adapters.site_ids());

    let orchestrator = Arc::new(Orchestrator::new(
        config.workflow.clone(),
        Arc::new(registry),
        adapters,
        Arc::new(RubricPromptBuilder::default()),
        store,
        judge,
    ));

    let state = AppState {
        orchestrator,
        config: config.clone(),
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
