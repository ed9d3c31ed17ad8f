use chrono::{DateTime, Utc};
use crate::errors::{AppError, AppResult};
use crate::models::{Category, CreateTaskRequest, Task, TaskStatus};

/// Builds tasks that satisfy the field constraints.
pub struct TaskFactory;

impl TaskFactory {
    pub fn create(user_id: &str, request: CreateTaskRequest, now: DateTime<Utc>) -> AppResult<Task> {
        if user_id.trim().is_empty() {
            return Err(AppError::Validation("User id cannot be empty".into()));
        }
        let title = validate_title(&request.title)?;
        let description = validate_description(&request.description)?;
        let category = validate_category(request.category)?;

        if request.due_date < now {
            return Err(AppError::Validation("Due date cannot be in the past".into()));
        }

        Ok(Task {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            description,
            status: TaskStatus::Todo,
            priority: request.priority,
            due_date: request.due_date,
            user_id: user_id.to_string(),
            category,
            created_at: now,
            updated_at: now,
        })
    }
}

pub fn validate_title(title: &str) -> AppResult<String> {
    non_empty(title, "Title cannot be empty")
}

pub fn validate_description(description: &str) -> AppResult<String> {
    non_empty(description, "Description cannot be empty")
}

pub fn validate_category(category: Category) -> AppResult<Category> {
    Ok(Category {
        name: non_empty(&category.name, "Category name cannot be empty")?,
        description: category.description,
    })
}

fn non_empty(value: &str, message: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(message.into()));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::models::Priority;

    fn request() -> CreateTaskRequest {
        CreateTaskRequest {
            title: "Write report".into(),
            description: "Quarterly numbers".into(),
            priority: Priority::High,
            due_date: Utc::now() + Duration::days(3),
            category: Category { name: "work".into(), description: Some("Office".into()) },
        }
    }

    #[test]
    fn creates_todo_task_owned_by_user() {
        let now = Utc::now();
        let task = TaskFactory::create("user-1", request(), now).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.user_id, "user-1");
        assert_eq!(task.category.name, "work");
        assert_eq!(task.created_at, now);
        assert_eq!(task.updated_at, now);
        assert!(!task.id.is_empty());
    }

    #[test]
    fn rejects_past_due_date() {
        let mut req = request();
        req.due_date = Utc::now() - Duration::minutes(1);
        let err = TaskFactory::create("user-1", req, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Due date cannot be in the past");
    }

    #[test]
    fn due_date_equal_to_now_is_accepted() {
        let now = Utc::now();
        let mut req = request();
        req.due_date = now;
        assert!(TaskFactory::create("user-1", req, now).is_ok());
    }

    #[test]
    fn rejects_blank_title_and_description() {
        let mut req = request();
        req.title = "   ".into();
        let err = TaskFactory::create("user-1", req, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Title cannot be empty");

        let mut req = request();
        req.description = String::new();
        let err = TaskFactory::create("user-1", req, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Description cannot be empty");
    }

    #[test]
    fn rejects_missing_owner_and_category() {
        let err = TaskFactory::create("", request(), Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "User id cannot be empty");

        let mut req = request();
        req.category.name = " ".into();
        let err = TaskFactory::create("user-1", req, Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Category name cannot be empty");
    }

    #[test]
    fn trims_text_fields() {
        let mut req = request();
        req.title = "  Write report ".into();
        let task = TaskFactory::create("user-1", req, Utc::now()).unwrap();
        assert_eq!(task.title, "Write report");
    }
}
