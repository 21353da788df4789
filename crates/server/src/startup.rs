use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use configs::AppConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;
use service::auth::{InMemoryUserStore, PasswordHasher};
use service::session::{sweeper, InMemorySessionStore, SessionStore};
use service::tasks::{InMemoryTaskStore, SimulatedProcessor, TaskWorkerPool, UuidGenerator};

/// Background units owned by the process: the session GC and the task workers.
pub struct Background {
    cancel: CancellationToken,
    gc: JoinHandle<()>,
    workers: TaskWorkerPool,
}

impl Background {
    /// Signal every background unit and wait for them to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.gc.await {
            warn!(error = %e, "session gc join error");
        }
        self.workers.join().await;
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Wire stores, workers and the GC sweep from configuration.
///
/// Must be called inside a tokio runtime; background units stop when
/// `cancel` fires.
pub fn build_state(cfg: &AppConfig, cancel: &CancellationToken) -> Result<(AppState, Background), StartupError> {
    let sessions: Arc<dyn SessionStore> = match cfg.session.ttl() {
        Some(ttl) => Arc::new(InMemorySessionStore::with_ttl(ttl)),
        None => Arc::new(InMemorySessionStore::new()),
    };
    let hasher = PasswordHasher::new(cfg.auth.memory_kib, cfg.auth.iterations, cfg.auth.parallelism)
        .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let users = Arc::new(InMemoryUserStore::new(Arc::clone(&sessions), hasher));
    let tasks = Arc::new(InMemoryTaskStore::new(Arc::new(UuidGenerator)));

    let gc = sweeper::spawn_gc_sweeper(
        Arc::clone(&sessions),
        cfg.session.gc_interval(),
        cfg.session.max_idle(),
        cancel.child_token(),
    );
    let processor = Arc::new(SimulatedProcessor::new(cfg.tasks.processing_delay(), cfg.tasks.result_payload.clone()));
    let (queue, workers) = TaskWorkerPool::spawn(
        tasks.clone(),
        processor,
        cfg.tasks.workers,
        cfg.tasks.queue_capacity,
        cancel.child_token(),
    );

    let state = AppState { users, tasks, queue };
    Ok((state, Background { cancel: cancel.clone(), gc, workers }))
}

/// Build the full application router plus its background units.
pub fn build_app(cfg: &AppConfig, cancel: &CancellationToken) -> Result<(Router, Background), StartupError> {
    let (state, background) = build_state(cfg, cancel)?;
    Ok((routes::build_router(state, build_cors()), background))
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Public entry: build the app and serve until `shutdown` fires.
pub async fn run(cfg: AppConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let (app, background) = build_app(&cfg, &shutdown)?;

    let addr = bind_addr(&cfg)?;
    info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .await?;

    info!("http listener closed, stopping background units");
    if tokio::time::timeout(Duration::from_secs(10), background.shutdown()).await.is_err() {
        warn!("background units did not stop within 10s");
    }
    Ok(())
}
