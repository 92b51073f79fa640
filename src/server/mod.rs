// Analysis server - Axum HTTP API
// Accepts an uploaded audio file and answers with the rendered plots as base64 PNGs.

pub mod routes;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{AnalysisConfig, ServerConfig};
use crate::error::{Error, Result};

/// Shared state for the analysis server
pub struct AnalysisServerState {
    pub config: AnalysisConfig,
    /// Number of analyses currently running
    pub active_jobs: AtomicUsize,
    /// Max concurrent analyses allowed
    pub max_queue: usize,
}

impl AnalysisServerState {
    pub fn new(config: AnalysisConfig, max_queue: usize) -> Self {
        AnalysisServerState {
            config,
            active_jobs: AtomicUsize::new(0),
            max_queue,
        }
    }

    /// Get current active job count
    pub fn active_job_count(&self) -> usize {
        self.active_jobs.load(Ordering::Relaxed)
    }

    /// Reserve a job slot. `None` when `max_queue` analyses are already running.
    pub fn try_acquire(self: &Arc<Self>) -> Option<JobGuard> {
        let mut current = self.active_jobs.load(Ordering::Acquire);
        loop {
            if current >= self.max_queue {
                return None;
            }
            match self.active_jobs.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(JobGuard {
                        state: Arc::clone(self),
                    })
                }
                Err(actual) => current = actual,
            }
        }
    }
}

/// Releases its job slot when dropped, including when the handler is cancelled.
pub struct JobGuard {
    state: Arc<AnalysisServerState>,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.state.active_jobs.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Holds the running server's shutdown mechanism
pub struct RunningServer {
    pub shutdown_tx: oneshot::Sender<()>,
    pub addr: SocketAddr,
    pub handle: JoinHandle<()>,
}

impl RunningServer {
    /// Signal shutdown and wait for in-flight requests to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            warn!(error = %e, "server task failed");
        }
    }
}

/// Build the router with every layer applied.
pub fn router(state: Arc<AnalysisServerState>, max_upload_bytes: usize) -> Router {
    // Any origin may call the API; there is nothing to authenticate
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    routes::api_routes()
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the analysis HTTP server on the configured port.
/// Returns the running server handle (for shutdown) or an error.
pub async fn start_server(
    server_config: ServerConfig,
    analysis_config: AnalysisConfig,
) -> Result<RunningServer> {
    analysis_config.validate()?;
    if server_config.max_upload_bytes == 0 {
        return Err(Error::Config("max_upload_bytes must be > 0".to_string()));
    }

    let state = Arc::new(AnalysisServerState::new(
        analysis_config,
        server_config.max_queue,
    ));
    let app = router(state, server_config.max_upload_bytes);

    let listener = try_bind(server_config.port).await?;
    let actual_addr = listener
        .local_addr()
        .map_err(|e| Error::Config(format!("failed to get local addr: {}", e)))?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    info!(addr = %actual_addr, max_queue = server_config.max_queue, "server starting");

    let handle = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("shutdown signal received, draining connections");
            })
            .await;
        if let Err(e) = result {
            warn!(error = %e, "server error");
        }
        info!("server stopped");
    });

    Ok(RunningServer {
        shutdown_tx,
        addr: actual_addr,
        handle,
    })
}

/// Bind the given port, falling back to nearby ports then an OS-assigned one.
async fn try_bind(preferred_port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], preferred_port));
    if let Ok(listener) = TcpListener::bind(addr).await {
        return Ok(listener);
    }

    for offset in 1..=10u16 {
        let port = preferred_port.saturating_add(offset);
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        if let Ok(listener) = TcpListener::bind(addr).await {
            warn!(preferred_port, port, "preferred port unavailable");
            return Ok(listener);
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], 0u16));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Config(format!("failed to bind to any port: {}", e)))?;
    warn!(preferred_port, "all preferred ports unavailable, using OS-assigned port");
    Ok(listener)
}
