use async_trait::async_trait;
use vigil_query::Query;

use crate::{context::RequestContext, error::Result, processors::LimiterScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorKind {
    /// Deterministically rewrites the query and never fails.
    Rewrite,
    /// Passes the query through unchanged or rejects it.
    Admission(LimiterScope),
}

/// One step of an entity pipeline. Later processors observe the changes made
/// by earlier ones on the same query.
#[async_trait]
pub trait QueryProcessor: Send + Sync {
    fn name(&self) -> &'static str;

    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Rewrite
    }

    async fn process(&self, query: &mut Query, ctx: &RequestContext) -> Result<()>;
}
