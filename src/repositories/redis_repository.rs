use async_trait::async_trait;
use redis::{AsyncCommands, Client, Script};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use crate::config::RedisConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{Task, User};
use super::{normalize_email, TaskRepository, TokenRepository, UserRepository};

// Key layout:
//   user:{id}                JSON user document
//   user:username:{name}     -> user id (unique index)
//   user:email:{email}       -> user id (unique index)
//   task:{id}                JSON task document
//   user:{id}:tasks          set of task ids
//   category:{name}:tasks    set of task ids
//   revoked:{jti}            revoked token marker, expires with the token

fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

fn username_key(username: &str) -> String {
    format!("user:username:{}", username)
}

fn email_key(email: &str) -> String {
    format!("user:email:{}", normalize_email(email))
}

fn task_key(id: &str) -> String {
    format!("task:{}", id)
}

fn user_tasks_key(user_id: &str) -> String {
    format!("user:{}:tasks", user_id)
}

fn category_key(name: &str) -> String {
    format!("category:{}:tasks", name)
}

fn revoked_key(jti: &str) -> String {
    format!("revoked:{}", jti)
}

// Scripts run atomically on the server, so no caller sees a half-written user
// or task and a write never lands on a key another request just deleted.
// Index key formats below must match the helpers above.

// KEYS: username index, email index, user document. ARGV: user id, user JSON.
const CREATE_USER_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then return 1 end
if redis.call('EXISTS', KEYS[2]) == 1 then return 2 end
redis.call('SET', KEYS[1], ARGV[1])
redis.call('SET', KEYS[2], ARGV[1])
redis.call('SET', KEYS[3], ARGV[2])
return 0
"#;

// KEYS: task document. ARGV: task id, task JSON, new category name.
const UPDATE_TASK_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then return 0 end
local old = cjson.decode(current).category.name
redis.call('SET', KEYS[1], ARGV[2])
if old ~= ARGV[3] then
  redis.call('SREM', 'category:' .. old .. ':tasks', ARGV[1])
  redis.call('SADD', 'category:' .. ARGV[3] .. ':tasks', ARGV[1])
end
return 1
"#;

// KEYS: task document. ARGV: task id.
const DELETE_TASK_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
if not current then return 0 end
local task = cjson.decode(current)
redis.call('DEL', KEYS[1])
redis.call('SREM', 'user:' .. task.user_id .. ':tasks', ARGV[1])
redis.call('SREM', 'category:' .. task.category.name .. ':tasks', ARGV[1])
return 1
"#;

/// Maps the create-user script's reply onto the duplicate errors.
fn user_reservation(code: i64) -> AppResult<()> {
    match code {
        0 => Ok(()),
        1 => Err(AppError::Duplicate("Username already exists".into())),
        2 => Err(AppError::Duplicate("Email already exists".into())),
        other => Err(AppError::Internal(format!("Unexpected create-user reply {}", other))),
    }
}

/// Delay before the next connection attempt.
fn next_delay(delay: Duration, max_delay: Duration) -> Duration {
    delay.saturating_mul(2).min(max_delay)
}

/// Pings Redis until it answers, doubling the delay after every failure.
///
/// Gives up after `max_retries` attempts and returns the last error.
pub async fn wait_for_redis(client: &Client, config: &RedisConfig) -> AppResult<()> {
    let mut delay = Duration::from_millis(config.initial_backoff_ms);
    let max_delay = Duration::from_millis(config.max_backoff_ms);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = async {
            let mut conn = client.get_async_connection().await?;
            redis::cmd("PING").query_async::<_, String>(&mut conn).await
        }
        .await;

        match result {
            Ok(_) => {
                tracing::info!("Connected to Redis after {} attempt(s)", attempt);
                return Ok(());
            }
            Err(e) if attempt >= config.max_retries => {
                tracing::error!("Giving up on Redis after {} attempts: {}", attempt, e);
                return Err(AppError::Redis(e));
            }
            Err(e) => {
                tracing::warn!(
                    "Redis connection attempt {}/{} failed: {}; retrying in {:?}",
                    attempt, config.max_retries, e, delay
                );
                sleep(delay).await;
                delay = next_delay(delay, max_delay);
            }
        }
    }
}

#[derive(Clone)]
pub struct RedisRepository {
    client: Arc<Client>,
}

impl RedisRepository {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    async fn connection(&self) -> AppResult<redis::aio::Connection> {
        Ok(self.client.get_async_connection().await?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.connection().await?;
        let data: Option<String> = conn.get(key).await?;
        data.map(|data| serde_json::from_str(&data))
            .transpose()
            .map_err(AppError::from)
    }

    async fn lookup_user(&self, index_key: String) -> AppResult<Option<User>> {
        let mut conn = self.connection().await?;
        let id: Option<String> = conn.get(&index_key).await?;
        match id {
            Some(id) => self.get_json(&user_key(&id)).await,
            None => Ok(None),
        }
    }

    async fn load_tasks(&self, set_key: String) -> AppResult<Vec<Task>> {
        let mut conn = self.connection().await?;
        let ids: Vec<String> = conn.smembers(&set_key).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| task_key(id)).collect();
        let documents: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;

        let mut tasks = Vec::with_capacity(documents.len());
        for (id, document) in ids.iter().zip(documents) {
            match document {
                Some(data) => tasks.push(serde_json::from_str(&data)?),
                None => tracing::warn!("Index {} references missing task {}", set_key, id),
            }
        }
        Ok(tasks)
    }
}

#[async_trait]
impl UserRepository for RedisRepository {
    async fn create(&self, user: &User) -> AppResult<()> {
        let document = serde_json::to_string(user)?;
        let mut conn = self.connection().await?;

        let code: i64 = Script::new(CREATE_USER_SCRIPT)
            .key(username_key(&user.username))
            .key(email_key(&user.email))
            .key(user_key(&user.id))
            .arg(&user.id)
            .arg(document)
            .invoke_async(&mut conn)
            .await?;
        user_reservation(code)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        self.get_json(&user_key(id)).await
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.lookup_user(username_key(username)).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.lookup_user(email_key(email)).await
    }

    async fn update(&self, user: &User) -> AppResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set(user_key(&user.id), serde_json::to_string(user)?).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for RedisRepository {
    async fn insert(&self, task: &Task) -> AppResult<()> {
        let mut conn = self.connection().await?;
        redis::pipe()
            .atomic()
            .set(task_key(&task.id), serde_json::to_string(task)?).ignore()
            .sadd(user_tasks_key(&task.user_id), &task.id).ignore()
            .sadd(category_key(&task.category.name), &task.id).ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Task>> {
        self.get_json(&task_key(id)).await
    }

    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<Task>> {
        self.load_tasks(user_tasks_key(user_id)).await
    }

    async fn find_by_category(&self, name: &str) -> AppResult<Vec<Task>> {
        self.load_tasks(category_key(name)).await
    }

    async fn update(&self, task: &Task) -> AppResult<()> {
        let document = serde_json::to_string(task)?;
        let mut conn = self.connection().await?;

        let updated: i64 = Script::new(UPDATE_TASK_SCRIPT)
            .key(task_key(&task.id))
            .arg(&task.id)
            .arg(document)
            .arg(&task.category.name)
            .invoke_async(&mut conn)
            .await?;
        if updated == 0 {
            // Deleted since the caller read it
            return Err(AppError::task_not_found());
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        let deleted: i64 = Script::new(DELETE_TASK_SCRIPT)
            .key(task_key(id))
            .arg(id)
            .invoke_async(&mut conn)
            .await?;
        Ok(deleted == 1)
    }
}

#[async_trait]
impl TokenRepository for RedisRepository {
    async fn revoke(&self, jti: &str, ttl_secs: u64) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        // SET NX replies nil when the marker already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(revoked_key(jti))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn is_revoked(&self, jti: &str) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        Ok(conn.exists(revoked_key(jti)).await?)
    }
}
