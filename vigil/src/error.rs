use vigil_query::QueryError;
use vigil_store::StoreError;

use crate::processors::LimiterScope;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A malformed entity or pipeline definition. Raised while loading, never
    /// while serving queries.
    #[error("configuration `{0}`")]
    Configuration(String),

    #[error("{scope} rate limit exceeded for `{key}`: {current} of {limit} per {window}s")]
    RateLimitExceeded {
        scope: LimiterScope,
        key: String,
        current: u64,
        limit: u64,
        window: u64,
    },

    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    #[error("vigil_query `{0}`")]
    Query(#[from] QueryError),

    #[error("vigil_store `{0}`")]
    Store(#[from] StoreError),

    #[cfg(feature = "pg")]
    #[error("sqlx `{0}`")]
    Sqlx(#[from] sqlx::Error),

    #[error("serde_json `{0}`")]
    SerdeJson(#[from] serde_json::Error),

    #[error("io `{0}`")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Any(#[from] anyhow::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the same request may succeed later. Rejections by admission
    /// control should be retried with backoff, a failed allocation by creating
    /// the subscription again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded { .. } | Self::Store(StoreError::Allocation(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
