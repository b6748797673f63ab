use async_trait::async_trait;
use tracing::debug;
use vigil_query::{
    conditions::{binary_condition, EQ},
    Expression, GranularityMapper, Query,
};

use crate::{context::RequestContext, error::Result, processor::QueryProcessor};

/// Pins a query to one of the precomputed granularity tiers of its storage
/// by filtering on the `granularity` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedGranularityProcessor {
    pub mapper: GranularityMapper,
}

impl MappedGranularityProcessor {
    pub fn new(mapper: GranularityMapper) -> Self {
        Self { mapper }
    }
}

#[async_trait]
impl QueryProcessor for MappedGranularityProcessor {
    fn name(&self) -> &'static str {
        "mapped_granularity_processor"
    }

    async fn process(&self, query: &mut Query, _ctx: &RequestContext) -> Result<()> {
        let code = query
            .granularity
            .map(|requested| self.mapper.map(requested))
            .unwrap_or(self.mapper.default_granularity());

        debug!(
            "granularity {:?} of {} mapped to {code}",
            query.granularity, query.entity
        );

        query.add_condition(binary_condition(
            EQ,
            Expression::column("granularity"),
            Expression::literal(code),
        ));

        Ok(())
    }
}
