//! Background completion of tasks.
//!
//! Creation pushes the task id onto a bounded queue; a fixed pool of workers
//! pulls ids, runs the [`TaskProcessor`], then writes the result followed by
//! the `Ready` status through the [`TaskStore`]. Callers never wait on a job.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::domain::TaskStatus;
use super::errors::TaskError;
use super::store::TaskStore;
use crate::metrics;

/// The work behind a task; returns its result payload.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    async fn process(&self, task_id: &str) -> String;
}

/// Sleeps for a fixed delay, then yields a fixed payload.
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    delay: Duration,
    payload: String,
}

impl SimulatedProcessor {
    pub fn new(delay: Duration, payload: impl Into<String>) -> Self {
        Self { delay, payload: payload.into() }
    }
}

#[async_trait]
impl TaskProcessor for SimulatedProcessor {
    async fn process(&self, task_id: &str) -> String {
        debug!(task_id, "processing task");
        tokio::time::sleep(self.delay).await;
        self.payload.clone()
    }
}

/// Producer handle: clone freely, one per request handler.
#[derive(Clone)]
pub struct TaskQueue {
    tx: mpsc::Sender<String>,
}

impl TaskQueue {
    /// Queue a created task for completion. Waits for room when the queue is full.
    pub async fn enqueue(&self, task_id: String) -> Result<(), TaskError> {
        self.tx.send(task_id).await.map_err(|_| TaskError::QueueClosed)
    }
}

pub struct TaskWorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl TaskWorkerPool {
    /// Spawn `workers` consumers sharing one queue of `capacity` slots.
    ///
    /// Workers exit when `cancel` fires or every [`TaskQueue`] is dropped.
    /// A job already being processed is finished before its worker exits.
    pub fn spawn(
        store: Arc<dyn TaskStore>,
        processor: Arc<dyn TaskProcessor>,
        workers: usize,
        capacity: usize,
        cancel: CancellationToken,
    ) -> (TaskQueue, Self) {
        let (tx, rx) = mpsc::channel::<String>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let handles = (0..workers.max(1))
            .map(|worker| {
                let store = Arc::clone(&store);
                let processor = Arc::clone(&processor);
                let rx = Arc::clone(&rx);
                let cancel = cancel.clone();
                tokio::spawn(async move { run_worker(worker, store, processor, rx, cancel).await })
            })
            .collect();
        info!(workers = workers.max(1), capacity, "task_workers_started");
        (TaskQueue { tx }, Self { handles })
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "task worker join error");
            }
        }
        info!("task_workers_stopped");
    }
}

async fn run_worker(
    worker: usize,
    store: Arc<dyn TaskStore>,
    processor: Arc<dyn TaskProcessor>,
    rx: Arc<Mutex<mpsc::Receiver<String>>>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => None,
            job = async { rx.lock().await.recv().await } => job,
        };
        let Some(task_id) = next else { break };

        match store.get_status(&task_id).await {
            Ok(TaskStatus::InProgress) => {}
            Ok(TaskStatus::Ready) => {
                debug!(worker, task_id = %task_id, "task already ready, skipping");
                continue;
            }
            Err(e) => {
                warn!(worker, task_id = %task_id, error = %e, "dropping job for unknown task");
                continue;
            }
        }

        let result = processor.process(&task_id).await;
        // Result first, then the status flip readers gate on.
        if let Err(e) = store.set_result(&task_id, result).await {
            warn!(worker, task_id = %task_id, error = %e, "set_result failed");
            continue;
        }
        if let Err(e) = store.set_status(&task_id, TaskStatus::Ready).await {
            warn!(worker, task_id = %task_id, error = %e, "set_status failed");
            continue;
        }
        metrics::record_task_completed();
        info!(worker, task_id = %task_id, "task ready");
    }
    debug!(worker, "task worker exiting");
}
