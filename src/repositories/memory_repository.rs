use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::errors::{AppError, AppResult};
use crate::models::{Task, User};
use super::{normalize_email, TaskRepository, TokenRepository, UserRepository};

/// In-process storage for development and tests. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    users: Arc<RwLock<HashMap<String, User>>>,
    tasks: Arc<RwLock<HashMap<String, Task>>>,
    revoked: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn create(&self, user: &User) -> AppResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(AppError::Duplicate("Username already exists".into()));
        }
        let email = normalize_email(&user.email);
        if users.values().any(|u| normalize_email(&u.email) == email) {
            return Err(AppError::Duplicate("Email already exists".into()));
        }
        users.insert(user.id.clone(), user.clone());
        tracing::debug!("Stored user {} in memory", user.id);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.values().find(|u| normalize_email(&u.email) == email).cloned())
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        self.users.write().await.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for MemoryRepository {
    async fn insert(&self, task: &Task) -> AppResult<()> {
        self.tasks.write().await.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Task>> {
        Ok(self.tasks.read().await.get(id).cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().filter(|t| t.user_id == user_id).cloned().collect())
    }

    async fn find_by_category(&self, name: &str) -> AppResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().filter(|t| t.category.name == name).cloned().collect())
    }

    async fn update(&self, task: &Task) -> AppResult<()> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(stored) => {
                *stored = task.clone();
                Ok(())
            }
            None => Err(AppError::task_not_found()),
        }
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        Ok(self.tasks.write().await.remove(id).is_some())
    }
}

#[async_trait]
impl TokenRepository for MemoryRepository {
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> AppResult<bool> {
        let ttl = ttl_secs.clamp(1, u32::MAX as u64) as i64;
        let now = Utc::now();
        let mut revoked = self.revoked.write().await;
        // Drop markers whose tokens have expired anyway
        revoked.retain(|_, until| *until > now);
        if revoked.contains_key(jti) {
            return Ok(false);
        }
        revoked.insert(jti.to_string(), now + Duration::seconds(ttl));
        Ok(true)
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        let revoked = self.revoked.read().await;
        Ok(revoked.get(jti).is_some_and(|until| *until > Utc::now()))
    }
}
