/// Errors raised while parsing, checking or validating a semantic query.
///
/// `MissingRequiredFilter`, `DisallowedClause` and `TooManyAggregations` are
/// client errors: the same query will fail again, so callers should not retry.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The query text could not be parsed.
    #[error("parse: {0}")]
    Parse(String),

    /// The query parsed but is not well formed for the requested operation.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The query does not filter on every column the entity requires.
    #[error("missing required conditions for {}", columns.join(", "))]
    MissingRequiredFilter { columns: Vec<String> },

    /// The query uses a clause the entity subscription does not accept.
    #[error("{0} is not allowed for this query")]
    DisallowedClause(String),

    /// The query selects more aggregations than the entity subscription accepts.
    #[error("a maximum of {max} aggregations is allowed, found {found}")]
    TooManyAggregations { max: usize, found: usize },
}

impl QueryError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidQuery(message.into())
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
