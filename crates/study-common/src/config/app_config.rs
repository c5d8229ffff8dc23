//! Application configuration structs
//!
//! Loads configuration from environment variables and config files.

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    pub database: DatabaseConfig,
    /// Realtime runs in-process when no Redis is configured
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub invites: InviteConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub query_cache: QueryCacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            env: default_env(),
        }
    }
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Access-token verification
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Invite issuing settings
#[derive(Debug, Clone, Deserialize)]
pub struct InviteConfig {
    #[serde(default = "default_invite_ttl_hours")]
    pub default_ttl_hours: i64,
    #[serde(default = "default_token_length")]
    pub token_length: usize,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            default_ttl_hours: default_invite_ttl_hours(),
            token_length: default_token_length(),
        }
    }
}

impl InviteConfig {
    #[must_use]
    pub fn default_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.default_ttl_hours)
    }
}

/// Retry policy for transient remote failures
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_retry_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            base_delay_ms: default_retry_base_delay_ms(),
            max_delay_ms: default_retry_max_delay_ms(),
            multiplier: default_retry_multiplier(),
        }
    }
}

/// Client-side query cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct QueryCacheConfig {
    #[serde(default = "default_stale_time_secs")]
    pub stale_time_secs: u64,
    #[serde(default = "default_refetch_delay_ms")]
    pub refetch_delay_ms: u64,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: default_stale_time_secs(),
            refetch_delay_ms: default_refetch_delay_ms(),
        }
    }
}

impl QueryCacheConfig {
    #[must_use]
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    #[must_use]
    pub fn refetch_delay(&self) -> Duration {
        Duration::from_millis(self.refetch_delay_ms)
    }
}

// Default value functions
fn default_app_name() -> String {
    "study-groups".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    10
}

fn default_invite_ttl_hours() -> i64 {
    168 // 7 days
}

fn default_token_length() -> usize {
    32
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

fn default_retry_max_delay_ms() -> u64 {
    5000
}

fn default_retry_multiplier() -> f64 {
    2.0
}

fn default_stale_time_secs() -> u64 {
    30
}

fn default_refetch_delay_ms() -> u64 {
    250
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let redis = match env::var("REDIS_URL") {
            Ok(url) => Some(RedisConfig {
                url,
                max_connections: parse_var("REDIS_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_redis_max_connections),
            }),
            Err(_) => None,
        };

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: parse_var("DATABASE_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
            },
            redis,
            auth: AuthConfig {
                jwt_secret: env::var("AUTH_JWT_SECRET")
                    .map_err(|_| ConfigError::MissingVar("AUTH_JWT_SECRET"))?,
            },
            invites: InviteConfig {
                default_ttl_hours: parse_var("INVITE_DEFAULT_TTL_HOURS")?
                    .unwrap_or_else(default_invite_ttl_hours),
                token_length: parse_var("INVITE_TOKEN_LENGTH")?
                    .unwrap_or_else(default_token_length),
            },
            retry: RetryConfig {
                max_attempts: parse_var("RETRY_MAX_ATTEMPTS")?
                    .unwrap_or_else(default_retry_max_attempts),
                base_delay_ms: parse_var("RETRY_BASE_DELAY_MS")?
                    .unwrap_or_else(default_retry_base_delay_ms),
                max_delay_ms: parse_var("RETRY_MAX_DELAY_MS")?
                    .unwrap_or_else(default_retry_max_delay_ms),
                multiplier: default_retry_multiplier(),
            },
            query_cache: QueryCacheConfig {
                stale_time_secs: parse_var("QUERY_STALE_TIME_SECS")?
                    .unwrap_or_else(default_stale_time_secs),
                refetch_delay_ms: parse_var("QUERY_REFETCH_DELAY_MS")?
                    .unwrap_or_else(default_refetch_delay_ms),
            },
        })
    }

    /// Load layered configuration: `config/default.toml` (optional) overridden
    /// by `STUDY_`-prefixed environment variables (`STUDY_DATABASE__URL`).
    /// Falls back to [`AppConfig::from_env`] when the layered sources are
    /// incomplete.
    ///
    /// # Errors
    /// Returns an error if neither source yields a complete configuration
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let layered = ::config::Config::builder()
            .add_source(::config::File::with_name("config/default").required(false))
            .add_source(
                ::config::Environment::with_prefix("STUDY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(::config::Config::try_deserialize::<Self>);

        match layered {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::debug!(error = %e, "Layered config incomplete, reading plain environment");
                Self::from_env()
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
