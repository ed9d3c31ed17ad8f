use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crate::app::AppState;
use crate::errors::AppResult;
use crate::extractors::AppJson;
use crate::models::{CreateTaskRequest, UpdateTaskRequest};
use crate::services::Claims;

pub async fn create_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    AppJson(form): AppJson<CreateTaskRequest>,
) -> AppResult<Response> {
    tracing::debug!("Creating task for user: {}", claims.username);

    let task = state.tasks.create(&claims.sub, form).await?;
    Ok((StatusCode::CREATED, Json(task)).into_response())
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(task_id): Path<String>,
) -> AppResult<Response> {
    let task = state.tasks.get(&claims.sub, &task_id).await?;

    tracing::trace!("Task {} status: {:?}", task_id, task.status);
    Ok(Json(task).into_response())
}

pub async fn list_my_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Response> {
    let tasks = state.tasks.list_mine(&claims.sub).await?;

    tracing::debug!("User {} has {} task(s)", claims.username, tasks.len());
    Ok(Json(tasks).into_response())
}

pub async fn list_tasks_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<Response> {
    let tasks = state.tasks.list_by_category(&category).await?;
    Ok(Json(tasks).into_response())
}

pub async fn list_my_tasks_by_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(category): Path<String>,
) -> AppResult<Response> {
    let tasks = state.tasks.list_mine_by_category(&claims.sub, &category).await?;
    Ok(Json(tasks).into_response())
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(task_id): Path<String>,
    AppJson(form): AppJson<UpdateTaskRequest>,
) -> AppResult<Response> {
    let task = state.tasks.update(&claims.sub, &task_id, form).await?;
    Ok(Json(task).into_response())
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(task_id): Path<String>,
) -> AppResult<Response> {
    tracing::info!("Attempting to delete task {} for user {}", task_id, claims.username);

    state.tasks.delete(&claims.sub, &task_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn complete_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(task_id): Path<String>,
) -> AppResult<Response> {
    let task = state.tasks.mark_complete(&claims.sub, &task_id).await?;
    Ok(Json(task).into_response())
}
