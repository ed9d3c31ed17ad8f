//! Storage seams for users, tasks and revoked tokens.
//!
//! Services only see these traits. [`RedisRepository`] keeps JSON documents
//! in Redis; [`MemoryRepository`] keeps them in process and backs the tests.

mod memory_repository;
mod redis_repository;

use async_trait::async_trait;
use crate::errors::AppResult;
use crate::models::{Task, User};

pub use self::memory_repository::MemoryRepository;
pub use self::redis_repository::{wait_for_redis, RedisRepository};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts a new user, failing with `Duplicate` if the username or email is taken.
    async fn create(&self, user: &User) -> AppResult<()>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Replaces the stored document. Username and email are immutable.
    async fn update(&self, user: &User) -> AppResult<()>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, task: &Task) -> AppResult<()>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Task>>;
    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<Task>>;
    async fn find_by_category(&self, name: &str) -> AppResult<Vec<Task>>;
    /// Replaces the stored task, moving it between category indexes if needed.
    async fn update(&self, task: &Task) -> AppResult<()>;
    /// Returns false when no task had this id.
    async fn delete(&self, id: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Marks a token id as revoked for `ttl_secs` seconds.
    ///
    /// Returns false if it was already revoked, so a token can be spent once.
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> AppResult<bool>;
    async fn is_revoked(&self, jti: &str) -> AppResult<bool>;
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
