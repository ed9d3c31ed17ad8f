use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub environment: Environment,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,  // in bytes
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub level: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // APP_AUTH__JWT_SECRET -> auth.jwt_secret
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.app.environment == Environment::Development
    }
}

#[cfg(test)]
impl Config {
    /// In-memory configuration with a cheap bcrypt cost for tests.
    pub fn for_tests() -> Self {
        Self {
            app: AppConfig { environment: Environment::Development },
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
                max_body_size: 64 * 1024,
            },
            storage: StorageConfig { backend: StorageBackend::Memory },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".into(),
                max_retries: 1,
                initial_backoff_ms: 1,
                max_backoff_ms: 1,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret".into(),
                access_token_ttl_secs: 900,
                refresh_token_ttl_secs: 3600,
                bcrypt_cost: 4,
            },
            log: LogConfig { level: "debug".into() },
        }
    }
}
