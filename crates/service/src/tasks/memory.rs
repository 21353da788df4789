use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, error, instrument};

use super::domain::{Task, TaskStatus};
use super::errors::TaskError;
use super::id_gen::IdGenerator;
use super::store::TaskStore;
use crate::metrics;

/// Process-local task store guarded by a single read/write lock.
#[derive(Clone)]
pub struct InMemoryTaskStore {
    inner: Arc<RwLock<HashMap<String, Task>>>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryTaskStore {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self { inner: Arc::default(), ids }
    }

    async fn update<F>(&self, id: &str, f: F) -> Result<(), TaskError>
    where
        F: FnOnce(&mut Task),
    {
        let mut map = self.inner.write().await;
        let task = map.get_mut(id).ok_or(TaskError::NotFound)?;
        f(task);
        task.touch(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    /// Create an `in_progress` task.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::tasks::{InMemoryTaskStore, TaskStore, TaskStatus, TaskError, UuidGenerator};
    /// let store = InMemoryTaskStore::new(Arc::new(UuidGenerator));
    /// let id = tokio_test::block_on(store.create_task()).unwrap();
    /// assert_eq!(tokio_test::block_on(store.get_status(&id)), Ok(TaskStatus::InProgress));
    /// assert_eq!(tokio_test::block_on(store.get_result(&id)), Err(TaskError::NotReady));
    /// ```
    #[instrument(skip(self))]
    async fn create_task(&self) -> Result<String, TaskError> {
        let id = self.ids.generate();
        let mut map = self.inner.write().await;
        if map.contains_key(&id) {
            error!(task_id = %id, "id generator returned a live id");
            return Err(TaskError::DuplicateId(id));
        }
        map.insert(id.clone(), Task::new(id.clone(), Utc::now()));
        drop(map);
        metrics::record_task_created();
        debug!(task_id = %id, "task_created");
        Ok(id)
    }

    async fn set_status(&self, id: &str, status: TaskStatus) -> Result<(), TaskError> {
        self.update(id, |t| t.status = status).await
    }

    async fn set_result(&self, id: &str, result: String) -> Result<(), TaskError> {
        self.update(id, |t| t.result = result).await
    }

    async fn get_status(&self, id: &str) -> Result<TaskStatus, TaskError> {
        let map = self.inner.read().await;
        map.get(id).map(|t| t.status).ok_or(TaskError::NotFound)
    }

    async fn get_result(&self, id: &str) -> Result<String, TaskError> {
        let map = self.inner.read().await;
        let task = map.get(id).ok_or(TaskError::NotFound)?;
        if task.status != TaskStatus::Ready {
            return Err(TaskError::NotReady);
        }
        Ok(task.result.clone())
    }

    async fn get_task(&self, id: &str) -> Result<Task, TaskError> {
        let map = self.inner.read().await;
        let mut task = map.get(id).cloned().ok_or(TaskError::NotFound)?;
        if task.status != TaskStatus::Ready {
            task.result.clear();
        }
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::id_gen::fixed::{ConstantGenerator, SequentialGenerator};
    use crate::tasks::UuidGenerator;
    use std::collections::HashSet;

    fn store() -> InMemoryTaskStore {
        InMemoryTaskStore::new(Arc::new(SequentialGenerator::default()))
    }

    #[tokio::test]
    async fn new_task_is_in_progress_with_empty_result() {
        let s = store();
        let id = s.create_task().await.unwrap();
        assert_eq!(id, "task-1");
        let task = s.get_task(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.created_at, task.updated_at);
        assert!(task.result.is_empty());
    }

    #[tokio::test]
    async fn result_hidden_until_ready_even_if_written() {
        let s = store();
        let id = s.create_task().await.unwrap();
        assert_eq!(s.get_result(&id).await, Err(TaskError::NotReady));

        s.set_result(&id, "payload".into()).await.unwrap();
        assert_eq!(s.get_status(&id).await, Ok(TaskStatus::InProgress));
        assert_eq!(s.get_result(&id).await, Err(TaskError::NotReady));
        assert!(s.get_task(&id).await.unwrap().result.is_empty());

        s.set_status(&id, TaskStatus::Ready).await.unwrap();
        assert_eq!(s.get_result(&id).await.as_deref(), Ok("payload"));
        assert_eq!(s.get_task(&id).await.unwrap().result, "payload");
    }

    #[tokio::test]
    async fn writes_get_ordered_timestamps() {
        let s = store();
        let id = s.create_task().await.unwrap();
        let created = s.get_task(&id).await.unwrap().updated_at;
        s.set_result(&id, "r".into()).await.unwrap();
        let after_result = s.get_task(&id).await.unwrap().updated_at;
        s.set_status(&id, TaskStatus::Ready).await.unwrap();
        let after_status = s.get_task(&id).await.unwrap().updated_at;
        assert!(created < after_result);
        assert!(after_result < after_status);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let s = store();
        assert_eq!(s.get_status("missing").await, Err(TaskError::NotFound));
        assert_eq!(s.get_result("missing").await, Err(TaskError::NotFound));
        assert_eq!(s.get_task("missing").await, Err(TaskError::NotFound));
        assert_eq!(s.set_status("missing", TaskStatus::Ready).await, Err(TaskError::NotFound));
        assert_eq!(s.set_result("missing", "r".into()).await, Err(TaskError::NotFound));
    }

    #[tokio::test]
    async fn duplicate_generated_id_is_rejected() {
        let s = InMemoryTaskStore::new(Arc::new(ConstantGenerator("same")));
        s.create_task().await.unwrap();
        s.set_status("same", TaskStatus::Ready).await.unwrap();
        assert_eq!(s.create_task().await, Err(TaskError::DuplicateId("same".into())));
        // The live record is untouched.
        assert_eq!(s.get_status("same").await, Ok(TaskStatus::Ready));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_yield_distinct_records() {
        let s = InMemoryTaskStore::new(Arc::new(UuidGenerator));
        let mut handles = Vec::new();
        for _ in 0..200 {
            let s = s.clone();
            handles.push(tokio::spawn(async move { s.create_task().await }));
        }
        let mut ids = HashSet::new();
        for h in handles {
            ids.insert(h.await.unwrap().unwrap());
        }
        assert_eq!(ids.len(), 200);
        for id in &ids {
            assert_eq!(s.get_status(id).await, Ok(TaskStatus::InProgress));
        }
        assert_eq!(s.inner.read().await.len(), 200);
    }
}
