/// Task endpoints
///
/// All routes sit behind the JWT layer and receive the caller's `Identity`.
///
/// - `POST   /api/tasks`        - create a task owned by the caller
/// - `GET    /api/tasks`        - list the caller's tasks
/// - `POST   /api/tasks/assign` - create a task for an email address
/// - `GET    /api/tasks/:tid`   - fetch a task
/// - `PUT    /api/tasks/:tid`   - edit owner, detail or deadline
/// - `DELETE /api/tasks/:tid`   - delete a task

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskassign_shared::{
    auth::middleware::Identity,
    models::task::{NewTask, Task, TaskPatch},
};
use validator::Validate;

/// Body for create and assign
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TaskRequest {
    #[serde(default)]
    #[validate(length(max = 10000, message = "Detail must be at most 10000 characters"))]
    pub detail: String,

    #[serde(default)]
    pub complete_by: Option<DateTime<Utc>>,

    #[serde(default)]
    pub assigned_to: Option<String>,
}

impl From<TaskRequest> for NewTask {
    fn from(req: TaskRequest) -> Self {
        NewTask {
            detail: req.detail,
            complete_by: req.complete_by,
            assigned_to: req.assigned_to,
        }
    }
}

/// Body for edits; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct EditTaskRequest {
    #[serde(default)]
    pub owner_id: Option<i64>,

    #[serde(default)]
    #[validate(length(max = 10000, message = "Detail must be at most 10000 characters"))]
    pub detail: Option<String>,

    #[serde(default)]
    pub complete_by: Option<DateTime<Utc>>,
}

impl From<EditTaskRequest> for TaskPatch {
    fn from(req: EditTaskRequest) -> Self {
        TaskPatch {
            owner_id: req.owner_id,
            detail: req.detail,
            complete_by: req.complete_by,
        }
    }
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state
        .assignments
        .create_task(identity.user_id, req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state
        .assignments
        .list_tasks_for_owner(identity.user_id)
        .await?;
    Ok(Json(tasks))
}

/// Assign a task by email
///
/// The task is claimed immediately when the address belongs to an account;
/// otherwise it stays pending and the address receives an invitation.
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    tracing::debug!(assigner = identity.user_id, "Assigning task");
    let task = state.assignments.assign_task(req.into()).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(tid): Path<i64>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.assignments.get_task(tid).await?))
}

pub async fn edit_task(
    State(state): State<AppState>,
    Path(tid): Path<i64>,
    Json(req): Json<EditTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    Ok(Json(state.assignments.edit_task(tid, req.into()).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(tid): Path<i64>,
) -> ApiResult<StatusCode> {
    state.assignments.delete_task(tid).await?;
    Ok(StatusCode::NO_CONTENT)
}
