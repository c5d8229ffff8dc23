//! Pooled Redis connections for publishing change events.

use deadpool_redis::{Config, Connection, Pool, PoolError, Runtime};
use study_common::RedisConfig;
use study_core::DomainError;

/// Error type for Redis pool operations
#[derive(Debug, thiserror::Error)]
pub enum RedisPoolError {
    #[error("Failed to create Redis pool: {0}")]
    CreatePool(String),

    #[error("Failed to get connection from pool: {0}")]
    GetConnection(#[from] PoolError),

    #[error("Redis command error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Unreachable Redis is transient, anything else is a cache fault
impl From<RedisPoolError> for DomainError {
    fn from(err: RedisPoolError) -> Self {
        let transient = match &err {
            RedisPoolError::GetConnection(_) => true,
            RedisPoolError::Redis(e) => e.is_io_error() || e.is_timeout(),
            _ => false,
        };
        if transient {
            Self::TransientNetwork(err.to_string())
        } else {
            Self::CacheError(err.to_string())
        }
    }
}

/// Result type for Redis pool operations
pub type RedisResult<T> = Result<T, RedisPoolError>;

/// Shared deadpool of Redis connections
#[derive(Clone)]
pub struct RedisPool {
    pool: Pool,
}

impl std::fmt::Debug for RedisPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisPool")
            .field("status", &self.pool.status())
            .finish()
    }
}

impl RedisPool {
    pub fn from_config(config: &RedisConfig) -> RedisResult<Self> {
        let pool = Config::from_url(&config.url)
            .builder()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?
            .max_size(config.max_connections.max(1) as usize)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| RedisPoolError::CreatePool(e.to_string()))?;

        tracing::info!(
            host = %redacted(&config.url),
            max_connections = config.max_connections,
            "Redis pool created"
        );
        Ok(Self { pool })
    }

    pub async fn get(&self) -> RedisResult<Connection> {
        Ok(self.pool.get().await?)
    }

    /// Round-trip a PING; pool creation itself never connects
    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.get().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

/// Connection URL without credentials
fn redacted(url: &str) -> &str {
    url.rsplit_once('@').map_or(url, |(_, host)| host)
}
