use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use service::tasks::TaskStatus;

use crate::errors::JsonApiError;
use crate::routes::auth::CurrentUser;
use crate::state::AppState;

#[derive(Serialize)]
pub struct CreateTaskOutput {
    pub task_id: String,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct StatusOutput {
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct ResultOutput {
    pub result: String,
}

#[utoipa::path(post, path = "/task", tag = "tasks", responses((status = 201, description = "Created", body = crate::openapi::CreateTaskDoc), (status = 401, description = "Unauthorized"), (status = 500, description = "Create Failed")), security(("bearer" = [])))]
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<(StatusCode, Json<CreateTaskOutput>), JsonApiError> {
    let task_id = state.tasks.create_task().await?;
    state.queue.enqueue(task_id.clone()).await?;
    info!(task_id = %task_id, user_id = user.id, "task queued");
    Ok((StatusCode::CREATED, Json(CreateTaskOutput { task_id, status: "created" })))
}

#[utoipa::path(get, path = "/status/{task_id}", tag = "tasks", params(("task_id" = String, Path, description = "Task identifier")), responses((status = 200, description = "Status", body = crate::openapi::StatusDoc), (status = 401, description = "Unauthorized"), (status = 404, description = "Not Found")), security(("bearer" = [])))]
pub async fn status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<StatusOutput>, JsonApiError> {
    let task = state.tasks.get_task(&task_id).await?;
    Ok(Json(StatusOutput { status: task.status, created_at: task.created_at, updated_at: task.updated_at }))
}

#[utoipa::path(get, path = "/result/{task_id}", tag = "tasks", params(("task_id" = String, Path, description = "Task identifier")), responses((status = 200, description = "Result", body = crate::openapi::ResultDoc), (status = 401, description = "Unauthorized"), (status = 404, description = "Not Found"), (status = 409, description = "Not Ready")), security(("bearer" = [])))]
pub async fn result(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<ResultOutput>, JsonApiError> {
    let result = state.tasks.get_result(&task_id).await?;
    Ok(Json(ResultOutput { result }))
}
