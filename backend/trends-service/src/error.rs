use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrendsError>;

#[derive(Debug, Error)]
pub enum TrendsError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for TrendsError {
    fn from(err: sqlx::Error) -> Self {
        TrendsError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for TrendsError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        TrendsError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for TrendsError {
    fn from(err: redis::RedisError) -> Self {
        TrendsError::Redis(err.to_string())
    }
}

impl From<anyhow::Error> for TrendsError {
    fn from(err: anyhow::Error) -> Self {
        TrendsError::Internal(err.to_string())
    }
}
