mod auth;
mod task;

use axum::Json;
use serde_json::{json, Value};

pub use auth::{change_password, login, logout, profile, refresh_token, register};
pub use task::{
    complete_task, create_task, delete_task, get_task, list_my_tasks, list_my_tasks_by_category,
    list_tasks_by_category, update_task,
};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
