//! Holocron - movie catalog service mirrored from the Star Wars films API

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::Config;
use holocron_api::{AppState, create_router};
use holocron_auth::{AuthService, JwtManager};
use holocron_core::{CancellationToken, CatalogService, SyncConfig, SyncEngine};
use holocron_db::Database;
use holocron_proxy::{SwapiClient, SwapiClientConfig};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Holocron - movie catalog service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "HOLOCRON_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "HOLOCRON_PORT")]
    port: Option<u16>,

    /// Token signing secret
    #[arg(long, env = "HOLOCRON_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Skip the catalog sync at startup
    #[arg(long)]
    skip_sync: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;
    if let Some(secret) = args.jwt_secret {
        config.auth.jwt_secret = secret;
    }
    if args.skip_sync {
        config.upstream.sync_on_startup = false;
    }

    // Initialize logging
    init_logging(&config.logging.level, &config.logging.format);
    config.validate()?;

    info!("Starting Holocron v{}", env!("CARGO_PKG_VERSION"));

    // Metrics recorder must exist before any counter is touched
    let metrics_handle = if config.metrics.enabled {
        Some(Arc::new(PrometheusBuilder::new().install_recorder()?))
    } else {
        None
    };

    // Initialize database
    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let db_path = format!("sqlite:{}?mode=rwc", config.database.path);
    let db = Database::new(&db_path).await?;

    // Signing secret is fixed for the life of the process
    let jwt = Arc::new(JwtManager::new(
        &config.auth.jwt_secret,
        chrono::Duration::seconds(config.auth.token_ttl_secs),
    ));
    let auth = Arc::new(AuthService::new(Arc::new(db.clone()), jwt)?);

    let catalog = Arc::new(CatalogService::new(Arc::new(db.clone())));

    // Initialize upstream client and sync engine
    let upstream = Arc::new(SwapiClient::new(SwapiClientConfig {
        request_timeout: Duration::from_secs(config.upstream.request_timeout_secs),
        skip_tls_verify: config.upstream.skip_tls_verify,
    })?);
    let sync = Arc::new(SyncEngine::new(
        Arc::new(db.clone()),
        upstream,
        SyncConfig {
            root_url: config.upstream.url.clone(),
            max_pages: config.upstream.max_pages,
            ..SyncConfig::default()
        },
    ));

    // Startup sync runs once storage is ready; shutdown cancels it between pages
    let shutdown = CancellationToken::new();
    if config.upstream.sync_on_startup {
        let sync = sync.clone();
        let cancel = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = sync.run_until_cancelled(&cancel).await {
                warn!(
                    "Startup catalog sync did not complete (retryable: {}): {}",
                    e.is_retryable(),
                    e
                );
            }
        });
    } else {
        info!("Startup catalog sync disabled");
    }

    // Create application state
    let state = AppState::new(auth, catalog, sync);

    // Create router
    let app = create_router(state, metrics_handle).layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);
    info!("Upstream: {}", config.upstream.url);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Wait for shutdown signal
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
