use chrono::Utc;
use std::sync::Arc;
use crate::errors::{AppError, AppResult};
use crate::models::{CreateTaskRequest, Task, TaskStatus, UpdateTaskRequest};
use crate::repositories::TaskRepository;
use super::task_factory::{validate_category, validate_description, validate_title, TaskFactory};

/// Task use cases. Every operation is scoped to the calling user except
/// [`TaskService::list_by_category`], which spans all users.
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>) -> Self {
        Self { tasks }
    }

    pub async fn create(&self, user_id: &str, request: CreateTaskRequest) -> AppResult<Task> {
        let task = TaskFactory::create(user_id, request, Utc::now())?;
        self.tasks.insert(&task).await?;
        tracing::info!("Created task {} for user {}", task.id, user_id);
        Ok(task)
    }

    /// Tasks owned by someone else are reported as missing.
    pub async fn get(&self, user_id: &str, task_id: &str) -> AppResult<Task> {
        self.tasks.find_by_id(task_id).await?
            .filter(|task| task.user_id == user_id)
            .ok_or_else(|| {
                tracing::warn!("Task {} not found for user {}", task_id, user_id);
                AppError::task_not_found()
            })
    }

    pub async fn list_mine(&self, user_id: &str) -> AppResult<Vec<Task>> {
        let tasks = self.tasks.find_by_user(user_id).await?;
        Ok(newest_first(tasks))
    }

    pub async fn list_by_category(&self, category: &str) -> AppResult<Vec<Task>> {
        let tasks = self.tasks.find_by_category(category).await?;
        Ok(newest_first(tasks))
    }

    pub async fn list_mine_by_category(&self, user_id: &str, category: &str) -> AppResult<Vec<Task>> {
        let tasks = self.tasks.find_by_user(user_id).await?
            .into_iter()
            .filter(|task| task.category.name == category)
            .collect();
        Ok(newest_first(tasks))
    }

    pub async fn update(
        &self,
        user_id: &str,
        task_id: &str,
        request: UpdateTaskRequest,
    ) -> AppResult<Task> {
        let mut task = self.get(user_id, task_id).await?;

        if let Some(title) = request.title {
            task.title = validate_title(&title)?;
        }
        if let Some(description) = request.description {
            task.description = validate_description(&description)?;
        }
        if let Some(category) = request.category {
            task.category = validate_category(category)?;
        }
        if let Some(status) = request.status {
            task.status = status;
        }
        if let Some(priority) = request.priority {
            task.priority = priority;
        }
        if let Some(due_date) = request.due_date {
            task.due_date = due_date;
        }
        task.updated_at = Utc::now();

        self.tasks.update(&task).await?;
        tracing::info!("Updated task {} for user {}", task.id, user_id);
        Ok(task)
    }

    pub async fn delete(&self, user_id: &str, task_id: &str) -> AppResult<()> {
        // Ownership check before touching storage
        self.get(user_id, task_id).await?;
        if !self.tasks.delete(task_id).await? {
            return Err(AppError::task_not_found());
        }
        tracing::info!("Deleted task {} for user {}", task_id, user_id);
        Ok(())
    }

    pub async fn mark_complete(&self, user_id: &str, task_id: &str) -> AppResult<Task> {
        let mut task = self.get(user_id, task_id).await?;
        task.status = TaskStatus::Done;
        task.updated_at = Utc::now();
        self.tasks.update(&task).await?;
        tracing::info!("Task {} marked complete", task.id);
        Ok(task)
    }
}

fn newest_first(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    tasks
}
