use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
use vigil_query::{
    conditions::{binary_condition, EQ, GTE, LT},
    parse_query, Expression, Query,
};

use crate::{entity_subscription::EntitySubscription, identifier::SubscriptionIdentifier};

/// A recurring query over a bounded time window, evaluated every
/// `resolution_sec` seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SubscriptionData {
    pub project_id: u64,
    #[validate(length(min = 1))]
    pub query: String,
    #[validate(range(min = 1))]
    pub time_window_sec: u32,
    #[validate(range(min = 1))]
    pub resolution_sec: u32,
    pub entity_subscription: EntitySubscription,
}

impl SubscriptionData {
    pub fn new(
        project_id: u64,
        query: impl Into<String>,
        time_window_sec: u32,
        resolution_sec: u32,
        entity_subscription: EntitySubscription,
    ) -> Self {
        Self {
            project_id,
            query: query.into(),
            time_window_sec,
            resolution_sec,
            entity_subscription,
        }
    }

    pub fn time_window(&self) -> Duration {
        Duration::seconds(i64::from(self.time_window_sec))
    }

    pub fn resolution(&self) -> Duration {
        Duration::seconds(i64::from(self.resolution_sec))
    }

    /// Parses the query text and checks it against the entity subscription.
    pub fn parse(&self) -> vigil_query::Result<Query> {
        let query = parse_query(&self.query)?;
        self.entity_subscription.validate_query(&query)?;

        Ok(query)
    }

    /// The query evaluated at `timestamp`: scoped to the project, augmented
    /// with the entity filters and restricted to
    /// `[timestamp - time_window, timestamp)` on `time_column`.
    pub fn build_query(
        &self,
        timestamp: DateTime<Utc>,
        time_column: &str,
    ) -> vigil_query::Result<Query> {
        let mut query = self.parse()?;

        query.add_condition(binary_condition(
            EQ,
            Expression::column("project_id"),
            Expression::literal(self.project_id),
        ));

        for condition in self.entity_subscription.conditions() {
            query.add_condition(condition);
        }

        let start = timestamp
            .checked_sub_signed(self.time_window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        query.add_condition(binary_condition(
            GTE,
            Expression::column(time_column),
            Expression::literal(start),
        ));
        query.add_condition(binary_condition(
            LT,
            Expression::column(time_column),
            Expression::literal(timestamp),
        ));

        Ok(query)
    }
}

/// A stored subscription together with its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub identifier: SubscriptionIdentifier,
    pub data: SubscriptionData,
}
