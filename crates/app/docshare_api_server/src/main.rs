//! Docshare API server binary.
//!
//! Reads configuration from the environment (and `.env`), runs migrations,
//! then serves the document API until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use docshare_api::AppState;
use docshare_api::config::ApiConfig;
use docshare_core::files::reconcile::reconcile_orphans;
use docshare_core::storage::{S3ObjectStore, StorageResolver};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Upper bound for `--reconcile-grace-secs`: one year.
const MAX_GRACE_SECS: i64 = 365 * 24 * 60 * 60;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "docshare_api_server", about = "Docshare document API server")]
struct Args {
    /// Address to listen on. Overrides the configured default.
    #[arg(long, env = "BIND_ADDR")]
    bind_addr: Option<String>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Seconds between orphan reconciliation passes (0 = disabled).
    #[arg(long, default_value_t = 0)]
    reconcile_interval_secs: u64,

    /// Minimum age in seconds before an unregistered object counts as orphaned.
    #[arg(
        long,
        default_value_t = 3600,
        value_parser = clap::value_parser!(i64).range(0..=MAX_GRACE_SECS)
    )]
    reconcile_grace_secs: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new("info,docshare_api=debug,docshare_core=debug")
    })?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut config = ApiConfig::from_env()?;
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }

    info!(
        version = docshare_core::version(),
        bind_addr = %config.bind_addr,
        bucket = %config.s3.bucket,
        max_connections = args.max_connections,
        "starting docshare_api_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.pg_connection_url)
        .await?;

    info!("running database migrations");
    docshare_api::migrate(&pool).await?;

    let store = Arc::new(S3ObjectStore::from_settings(&config.s3));
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(pool, config, store)?;

    let grace = chrono::Duration::try_seconds(args.reconcile_grace_secs)
        .ok_or("--reconcile-grace-secs is out of range")?;

    let shutdown = CancellationToken::new();
    let reconcile_handle = (args.reconcile_interval_secs > 0).then(|| {
        tokio::spawn(run_reconciler(
            state.pool.clone(),
            state.storage.clone(),
            Duration::from_secs(args.reconcile_interval_secs),
            grace,
            shutdown.clone(),
        ))
    });

    let app = docshare_api::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
            shutdown.cancel();
        }
    })
    .await;

    shutdown.cancel();
    if let Some(handle) = reconcile_handle {
        let _ = handle.await;
    }

    result?;
    Ok(())
}

/// Periodically remove stored objects that no file record references.
async fn run_reconciler(
    pool: PgPool,
    storage: StorageResolver,
    interval: Duration,
    grace: chrono::Duration,
    shutdown: CancellationToken,
) {
    info!(interval_secs = interval.as_secs(), "orphan reconciliation enabled");
    let mut ticker = tokio::time::interval(interval);
    // First tick fires immediately; skip it so startup is not slowed by a scan.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                match reconcile_orphans(&pool, &storage, grace).await {
                    Ok(report) => info!(?report, "orphan reconciliation pass complete"),
                    Err(e) => warn!(error = %e, "orphan reconciliation pass failed"),
                }
            }
        }
    }
}
