use serde::{Deserialize, Serialize};
use vigil_query::{
    conditions::{binary_condition, EQ},
    Expression, Query, QueryError,
};

/// Maximum number of selected aggregations on a metrics subscription.
pub const METRICS_MAX_AGGREGATIONS: usize = 3;

/// Entity specific augmentation of a subscription query.
///
/// Metrics entities are scoped to an organization on top of the project and
/// restrict the shape of the query they evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EntitySubscription {
    Events,
    Transactions,
    MetricsCounters { organization: u64 },
    MetricsSets { organization: u64 },
    GenericMetricsSets { organization: u64 },
    GenericMetricsDistributions { organization: u64 },
}

impl EntitySubscription {
    /// Name of the entity queried by this subscription.
    pub fn entity_key(&self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Transactions => "transactions",
            Self::MetricsCounters { .. } => "metrics_counters",
            Self::MetricsSets { .. } => "metrics_sets",
            Self::GenericMetricsSets { .. } => "generic_metrics_sets",
            Self::GenericMetricsDistributions { .. } => "generic_metrics_distributions",
        }
    }

    pub fn organization(&self) -> Option<u64> {
        match self {
            Self::Events | Self::Transactions => None,
            Self::MetricsCounters { organization }
            | Self::MetricsSets { organization }
            | Self::GenericMetricsSets { organization }
            | Self::GenericMetricsDistributions { organization } => Some(*organization),
        }
    }

    pub fn max_allowed_aggregations(&self) -> Option<usize> {
        self.organization().map(|_| METRICS_MAX_AGGREGATIONS)
    }

    pub fn disallowed_clauses(&self) -> &'static [&'static str] {
        match self.organization() {
            Some(_) => &["having", "orderby"],
            None => &[],
        }
    }

    /// Filters appended to every query evaluated for this subscription.
    pub fn conditions(&self) -> Vec<Expression> {
        self.organization()
            .map(|organization| {
                binary_condition(EQ, Expression::column("org_id"), Expression::literal(organization))
            })
            .into_iter()
            .collect()
    }

    pub fn validate_query(&self, query: &Query) -> vigil_query::Result<()> {
        if query.entity != self.entity_key() {
            return Err(QueryError::invalid(format!(
                "query targets {} but the subscription is for {}",
                query.entity,
                self.entity_key()
            )));
        }

        for clause in self.disallowed_clauses() {
            let used = match *clause {
                "having" => query.having.is_some(),
                "orderby" => !query.order_by.is_empty(),
                _ => false,
            };

            if used {
                return Err(QueryError::DisallowedClause(clause.to_string()));
            }
        }

        if let Some(max) = self.max_allowed_aggregations() {
            let found = query.selected_columns.len();

            if found > max {
                return Err(QueryError::TooManyAggregations { max, found });
            }
        }

        Ok(())
    }
}
