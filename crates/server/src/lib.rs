//! Process bootstrap shared by the scrapjobs binaries.
//!
//! Each binary loads [`Config`], installs tracing, connects what it needs and
//! runs until SIGINT or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use fred::clients::Client as RedisClient;
use fred::interfaces::ClientLike;
use scrapjobs_common::{AppError, AppResult, Config, Metrics};
use sea_orm::DatabaseConnection;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the log format; `json` switches to JSON lines.
pub const LOG_FORMAT_ENV: &str = "SCRAPJOBS_LOG_FORMAT";

const DEFAULT_LOG_FILTER: &str = "scrapjobs=info,apalis=info";

/// Install the global tracing subscriber.
pub fn init_tracing() {
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();
}

/// Load `.env` and the layered configuration.
pub fn load_config() -> AppResult<Config> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(AppError::Config(format!("failed to read .env: {e}")));
        }
    }
    Ok(Config::load()?)
}

/// Connect to Postgres, running migrations when enabled.
pub async fn connect_database(config: &Config) -> AppResult<Arc<DatabaseConnection>> {
    let db = scrapjobs_db::init(config).await?;
    info!("Connected to database");

    if config.database.run_migrations {
        info!("Running database migrations...");
        scrapjobs_db::migrate(&db).await?;
        info!("Migrations completed");
    }
    Ok(Arc::new(db))
}

/// Connect a fred client.
pub async fn connect_redis(url: &str) -> AppResult<Arc<RedisClient>> {
    let config = fred::types::config::Config::from_url(url)
        .map_err(|e| AppError::Config(format!("invalid redis url: {e}")))?;
    let client = RedisClient::new(config, None, None, None);
    client.connect();
    client
        .wait_for_connect()
        .await
        .map_err(|e| AppError::Redis(format!("failed to connect to redis: {e}")))?;
    Ok(Arc::new(client))
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// A token cancelled on SIGINT or SIGTERM.
#[must_use]
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });
    token
}

async fn render_metrics(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.to_prometheus(),
    )
}

async fn health() -> &'static str {
    "ok"
}

/// `/metrics` and `/health` routes.
pub fn metrics_router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}

/// Serve the metrics routes until `shutdown` is cancelled.
pub async fn serve_metrics(
    addr: &str,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
) -> AppResult<()> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| AppError::Config(format!("invalid metrics.listen_addr {addr:?}: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Internal(format!("failed to bind {addr}: {e}")))?;
    info!(%addr, "Serving metrics");

    axum::serve(listener, metrics_router(metrics))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Internal(format!("metrics server failed: {e}")))
}

/// Spawn the metrics server when `metrics.listen_addr` is set.
pub fn spawn_metrics_server(config: &Config, metrics: Arc<Metrics>, shutdown: CancellationToken) {
    let Some(addr) = config.metrics.listen_addr.clone() else {
        return;
    };
    tokio::spawn(async move {
        if let Err(e) = serve_metrics(&addr, metrics, shutdown).await {
            error!(error = %e, "Metrics server stopped");
        }
    });
}
