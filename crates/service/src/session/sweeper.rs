//! Periodic session garbage collection.
//!
//! The sweep runs on a fixed interval until its [`CancellationToken`] fires.
//! The owner (process startup) cancels the token on shutdown and may await the
//! returned handle.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::SessionStore;

/// Spawn the recurring `gc(max_idle)` sweep onto the current runtime.
pub fn spawn_gc_sweeper(
    store: Arc<dyn SessionStore>,
    every: Duration,
    max_idle: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so a fresh process
        // does not sweep before any session exists.
        interval.tick().await;
        info!(every_secs = every.as_secs_f64(), max_idle_secs = max_idle.as_secs(), "session_gc_started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let removed = store.gc(max_idle).await;
                    if removed > 0 {
                        debug!(removed, "swept expired sessions");
                    }
                    crate::metrics::record_sessions_swept(removed);
                    crate::metrics::record_sessions_active(store.len().await);
                }
            }
        }
        info!("session_gc_stopped");
    })
}
