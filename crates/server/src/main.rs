use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use alembic_core::{
    load_config, metrics, validate_config, AnthropicClient, DistillationStore, Distiller,
    DistillerProvider, Extractor, FeedResolver, HttpExtractor, LlmClient, LlmDistiller,
    OllamaClient, Orchestrator, PlaylistResolver, SqliteDistillationStore,
};

use alembic_server::api::create_router;
use alembic_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("ALEMBIC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);

    // Log a config fingerprint so deployments are distinguishable in logs
    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Config hash: {}", &config_hash[..16]);

    // Create SQLite distillation store
    let store: Arc<dyn DistillationStore> = Arc::new(
        SqliteDistillationStore::new(&config.database.path)
            .context("Failed to create distillation store")?,
    );
    info!("Distillation store initialized");

    // Create extractor
    let extractor: Arc<dyn Extractor> = Arc::new(HttpExtractor::new(Duration::from_secs(
        config.extractor.timeout_secs as u64,
    )));

    // Create AI provider
    let llm_client: Arc<dyn LlmClient> = match config.distiller.provider {
        DistillerProvider::Anthropic => {
            let api_key = config
                .distiller
                .api_key
                .clone()
                .context("anthropic provider requires an API key")?;
            let mut client = AnthropicClient::new(api_key, config.distiller.model.clone());
            if let Some(ref api_base) = config.distiller.api_base {
                client = client.with_api_base(api_base.clone());
            }
            info!("Using Anthropic provider ({})", config.distiller.model);
            Arc::new(client)
        }
        DistillerProvider::Ollama => {
            let mut client = OllamaClient::new(config.distiller.model.clone());
            if let Some(ref api_base) = config.distiller.api_base {
                client = client.with_api_base(api_base.clone());
            }
            info!("Using Ollama provider ({})", config.distiller.model);
            Arc::new(client)
        }
    };
    let distiller: Arc<dyn Distiller> = Arc::new(
        LlmDistiller::new(llm_client).with_max_input_chars(config.distiller.max_input_chars),
    );

    // Create playlist resolver
    let resolver: Arc<dyn PlaylistResolver> = Arc::new(FeedResolver::default());

    // Create orchestrator
    let orchestrator = Orchestrator::new(
        config.orchestrator.clone(),
        Arc::clone(&store),
        extractor,
        distiller,
        resolver,
    );
    info!(
        "Orchestrator initialized (concurrency {})",
        config.orchestrator.max_concurrency
    );

    // Register metrics
    let registry = prometheus::Registry::new();
    metrics::register_all(&registry).context("Failed to register metrics")?;

    // Create app state and router
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        orchestrator,
        registry,
    ));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
