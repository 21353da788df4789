use std::sync::Arc;

use service::auth::UserStore;
use service::tasks::{TaskQueue, TaskStore};

/// Shared handles injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub queue: TaskQueue,
}
