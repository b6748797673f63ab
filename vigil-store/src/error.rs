#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("allocation `{0}`")]
    Allocation(String),

    #[error("invalid subscription `{0}`")]
    InvalidSubscription(#[from] validator::ValidationErrors),

    #[error("invalid subscription identifier `{0}`")]
    InvalidIdentifier(String),

    #[error("partitions number must be greater than zero")]
    NoPartitions,

    #[error("subscription for `{found}` can not be stored in `{expected}`")]
    EntityMismatch { expected: String, found: String },

    #[cfg(feature = "pg")]
    #[error("sqlx `{0}`")]
    Sqlx(#[from] sqlx::Error),

    #[error("serde_json `{0}`")]
    SerdeJson(#[from] serde_json::Error),

    #[error("std::num `{0}`")]
    TryFromInt(#[from] std::num::TryFromIntError),

    #[error("vigil_query `{0}`")]
    Query(#[from] vigil_query::QueryError),

    #[error("{0}")]
    Any(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
