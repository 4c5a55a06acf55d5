use crate::admission::{self, RateLimiter};
use crate::config::Config;
use crate::conversion::ConversionSupervisor;
use crate::files::{self, TempFileRegistry};
use crate::validate::Validator;
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod routes_download;
pub mod routes_upload;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub limiter: Arc<RateLimiter>,
    pub validator: Arc<Validator>,
    pub registry: TempFileRegistry,
    pub supervisor: ConversionSupervisor,
}

impl AppContext {
    /// Prepare storage directories and locate the encoder.
    pub fn new(config: Config) -> Result<Self> {
        for dir in [&config.storage.upload_dir, &config.storage.output_dir] {
            if config.storage.purge_on_start {
                let removed = files::prepare_dir(dir)
                    .with_context(|| format!("Failed to prepare storage dir {:?}", dir))?;
                if removed > 0 {
                    tracing::info!(dir = %dir.display(), removed, "Purged stale files");
                }
            } else {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create storage dir {:?}", dir))?;
            }
        }

        let registry = TempFileRegistry::new();
        let supervisor = ConversionSupervisor::from_config(
            &config.encoder,
            config.storage.output_dir.clone(),
            registry.clone(),
        );
        let validator = Validator::new(
            config.upload.allowed_extensions.clone(),
            config.upload.max_upload_bytes(),
        );

        Ok(Self {
            limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
            validator: Arc::new(validator),
            registry,
            supervisor,
            config: Arc::new(config),
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.storage.upload_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.storage.output_dir
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let body_limit = ctx.validator.max_request_bytes();

    let mut upload = Router::new()
        .route("/upload", post(routes_upload::upload))
        .layer(DefaultBodyLimit::max(
            usize::try_from(body_limit).unwrap_or(usize::MAX),
        ));

    // Admission runs before the body is read
    if ctx.config.rate_limit.enabled {
        upload = upload.route_layer(middleware::from_fn_with_state(
            ctx.limiter.clone(),
            admission::rate_limit_middleware,
        ));
    }

    Router::new()
        .route("/", get(index))
        .route("/download/{filename}", get(routes_download::download))
        .merge(upload)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn index(State(ctx): State<AppContext>) -> Response {
    let path = ctx.config.server.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Client page unavailable");
            (StatusCode::NOT_FOUND, "index.html not found").into_response()
        }
    }
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let sweep_interval = config.rate_limit.sweep_interval();
    let ctx = AppContext::new(config)?;

    let cancel = CancellationToken::new();
    let sweeper = admission::spawn_sweeper(ctx.limiter.clone(), sweep_interval, cancel.clone());

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cancel.clone()))
    .await;

    cancel.cancel();
    let _ = sweeper.await;

    served?;
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
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
        _ = cancel.cancelled() => {},
    }

    tracing::info!("Shutdown signal received");
}
