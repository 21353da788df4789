use async_trait::async_trait;

use super::domain::{Task, TaskStatus};
use super::errors::TaskError;

/// Task records keyed by generated id.
///
/// Status and result are written independently; readers only ever see a
/// result once the status they observe in the same read is `Ready`.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self) -> Result<String, TaskError>;
    async fn set_status(&self, id: &str, status: TaskStatus) -> Result<(), TaskError>;
    async fn set_result(&self, id: &str, result: String) -> Result<(), TaskError>;
    async fn get_status(&self, id: &str) -> Result<TaskStatus, TaskError>;
    /// [`TaskError::NotReady`] unless the task is `Ready`, even if a result was written.
    async fn get_result(&self, id: &str) -> Result<String, TaskError>;
    /// Snapshot of the record; `result` is blanked while not ready.
    async fn get_task(&self, id: &str) -> Result<Task, TaskError>;
}
