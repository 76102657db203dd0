use crate::config::Config;
use crate::playback::{DurationProber, PlaybackResolver, ProgressStore};
use crate::reconcile::Reconciler;
use crate::scanner::ScanLimits;
use crate::streaming::CompatTranscoder;
use crate::tools::{ToolRegistry, FFMPEG, FFPROBE};
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use reelhouse_common::{Clock, SystemClock};
use reelhouse_db::pool::DbPool;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod routes_library;
pub mod routes_playback;

pub use error::AppError;

/// File name of the progress store inside the data directory.
pub const PROGRESS_FILE_NAME: &str = "playback-progress.json";

/// Shared application context. Every service is built once at startup and
/// shared by handle.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub pool: DbPool,
    pub reconciler: Arc<Reconciler>,
    pub resolver: Arc<PlaybackResolver>,
    pub progress: Arc<ProgressStore>,
    pub prober: Arc<DurationProber>,
    pub tools: Arc<ToolRegistry>,
    pub transcoder: Arc<CompatTranscoder>,
    /// Cancelled when the server shuts down; encoder streams hold child tokens.
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Wire up the services over an open pool.
    pub fn new(
        config: Config,
        pool: DbPool,
        data_dir: &Path,
        tools: ToolRegistry,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let progress_path = config
            .playback
            .progress_file
            .clone()
            .unwrap_or_else(|| data_dir.join(PROGRESS_FILE_NAME));

        let reconciler = Reconciler::new(pool.clone(), &config, clock.clone());
        let resolver = PlaybackResolver::new(
            pool.clone(),
            config.library.clone(),
            ScanLimits::from(&config.scan),
        );
        let progress = ProgressStore::new(
            Some(progress_path),
            config.playback.max_progress_entries,
            config.playback.completion_threshold_secs,
            clock,
        );
        let prober = DurationProber::new(tools.get(FFPROBE).map(|t| t.path.clone()));
        let transcoder = CompatTranscoder::new(
            tools.get(FFMPEG).map(|t| t.path.clone()),
            config.transcode.clone(),
        );

        Self {
            config: Arc::new(config),
            pool,
            reconciler: Arc::new(reconciler),
            resolver: Arc::new(resolver),
            progress: Arc::new(progress),
            prober: Arc::new(prober),
            tools: Arc::new(tools),
            transcoder: Arc::new(transcoder),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::RANGE]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn api_routes() -> Router<AppContext> {
    routes_playback::playback_routes().merge(routes_library::library_routes())
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config, pool: DbPool, data_dir: PathBuf) -> Result<()> {
    let tools = ToolRegistry::discover(&config.tools);
    start_server_with_options(config, pool, data_dir, tools, Arc::new(SystemClock)).await
}

/// Start the HTTP server with explicit tools and clock
pub async fn start_server_with_options(
    config: Config,
    pool: DbPool,
    data_dir: PathBuf,
    tools: ToolRegistry,
    clock: Arc<dyn Clock>,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    if tools.get(FFMPEG).is_none() {
        tracing::warn!("ffmpeg not found; Matroska playback will ask for an external player");
    }

    let ctx = AppContext::new(config, pool, &data_dir, tools, clock);
    let shutdown = ctx.shutdown.clone();
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // open compatibility streams would otherwise hold the server up
            shutdown.cancel();
        })
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
