use serde::Deserialize;

use crate::{
    conditions::has_filter_on,
    error::{QueryError, Result},
    query::Query,
};

pub trait QueryValidator: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, query: &Query) -> Result<()>;
}

/// Rejects queries that do not pin every required column with a top-level
/// `equals` or `in` filter. Keeps unscoped scans away from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntityRequiredColumnValidator {
    pub required_filter_columns: Vec<String>,
}

impl EntityRequiredColumnValidator {
    pub fn new<I, S>(required_filter_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_filter_columns: required_filter_columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl QueryValidator for EntityRequiredColumnValidator {
    fn name(&self) -> &'static str {
        "entity_required_column_validator"
    }

    fn validate(&self, query: &Query) -> Result<()> {
        let missing = self
            .required_filter_columns
            .iter()
            .filter(|column| {
                query
                    .condition
                    .as_ref()
                    .map(|condition| !has_filter_on(condition, column))
                    .unwrap_or(true)
            })
            .cloned()
            .collect::<Vec<_>>();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(QueryError::MissingRequiredFilter { columns: missing })
        }
    }
}
