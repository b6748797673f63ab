use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt};
use tracing::{debug, warn};
use vigil_query::{conditions::get_column_values, Literal, Query};

use crate::{
    context::RequestContext,
    error::{Error, Result},
    processor::{ProcessorKind, QueryProcessor},
};

/// Key of the resource quota when it is not scoped to a project column.
pub const GLOBAL_QUOTA_KEY: &str = "global";

/// What an admission-control processor counts requests by.
///
/// Variants are declared in the order limiters run in a pipeline: broad,
/// cheap checks first, the absolute capacity check last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimiterScope {
    Referrer,
    Organization,
    ProjectReferrer,
    Project,
    ResourceQuota,
}

impl fmt::Display for LimiterScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Referrer => "referrer",
            Self::Organization => "organization",
            Self::ProjectReferrer => "project_referrer",
            Self::Project => "project",
            Self::ResourceQuota => "resource_quota",
        };

        f.write_str(name)
    }
}

/// First instant of the fixed window of `window_secs` seconds containing
/// `timestamp`. Windows are aligned to the Unix epoch.
pub fn window_start(timestamp: DateTime<Utc>, window_secs: u64) -> i64 {
    let window = i64::try_from(window_secs.max(1)).unwrap_or(i64::MAX);

    timestamp.timestamp().div_euclid(window) * window
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrganizationRateLimit {
    pub org_column: String,
    pub limit: u64,
    pub window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectRateLimit {
    pub project_column: String,
    pub limit: u64,
    pub window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceQuota {
    #[serde(default)]
    pub project_column: Option<String>,
    pub limit: u64,
    pub window_secs: u64,
}

/// Fixed-window request counter for one scope.
///
/// Every request increments the counter of its window before the limit is
/// checked, so rejected requests count too. The scoping key comes from the
/// top-level `equals`/`in` filters on `column`, falling back to the request
/// context. A query without a key passes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiter {
    scope: LimiterScope,
    column: Option<String>,
    limit: u64,
    window_secs: u64,
}

impl RateLimiter {
    pub fn referrer(args: RateLimit) -> Self {
        Self {
            scope: LimiterScope::Referrer,
            column: None,
            limit: args.limit,
            window_secs: args.window_secs,
        }
    }

    pub fn organization(args: OrganizationRateLimit) -> Self {
        Self {
            scope: LimiterScope::Organization,
            column: Some(args.org_column),
            limit: args.limit,
            window_secs: args.window_secs,
        }
    }

    pub fn project_referrer(args: ProjectRateLimit) -> Self {
        Self {
            scope: LimiterScope::ProjectReferrer,
            column: Some(args.project_column),
            limit: args.limit,
            window_secs: args.window_secs,
        }
    }

    pub fn project(args: ProjectRateLimit) -> Self {
        Self {
            scope: LimiterScope::Project,
            column: Some(args.project_column),
            limit: args.limit,
            window_secs: args.window_secs,
        }
    }

    pub fn resource_quota(args: ResourceQuota) -> Self {
        Self {
            scope: LimiterScope::ResourceQuota,
            column: args.project_column,
            limit: args.limit,
            window_secs: args.window_secs,
        }
    }

    pub fn scope(&self) -> LimiterScope {
        self.scope
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    fn column_keys(&self, query: &Query, fallback: Option<u64>) -> Vec<String> {
        let from_query = match (self.column.as_deref(), query.condition.as_ref()) {
            (Some(column), Some(condition)) => get_column_values(condition, column)
                .into_iter()
                .map(|literal| match literal {
                    Literal::String(value) => value,
                    other => other.to_string(),
                })
                .collect::<BTreeSet<_>>(),
            _ => BTreeSet::new(),
        };

        if from_query.is_empty() {
            fallback.map(|id| id.to_string()).into_iter().collect()
        } else {
            from_query.into_iter().collect()
        }
    }

    /// Keys whose counters this request increments.
    pub fn keys(&self, query: &Query, ctx: &RequestContext) -> Vec<String> {
        match self.scope {
            LimiterScope::Referrer => vec![ctx.referrer.to_owned()],
            LimiterScope::Organization => self.column_keys(query, ctx.organization_id),
            LimiterScope::Project => self.column_keys(query, ctx.project_id),
            LimiterScope::ProjectReferrer => self
                .column_keys(query, ctx.project_id)
                .into_iter()
                .map(|project| format!("{project}:{}", ctx.referrer))
                .collect(),
            LimiterScope::ResourceQuota => match self.column {
                Some(_) => self.column_keys(query, ctx.project_id),
                None => vec![GLOBAL_QUOTA_KEY.to_owned()],
            },
        }
    }
}

#[async_trait]
impl QueryProcessor for RateLimiter {
    fn name(&self) -> &'static str {
        match self.scope {
            LimiterScope::Referrer => "referrer_rate_limiter",
            LimiterScope::Organization => "organization_rate_limiter",
            LimiterScope::ProjectReferrer => "project_referrer_rate_limiter",
            LimiterScope::Project => "project_rate_limiter",
            LimiterScope::ResourceQuota => "resource_quota_processor",
        }
    }

    fn kind(&self) -> ProcessorKind {
        ProcessorKind::Admission(self.scope)
    }

    async fn process(&self, query: &mut Query, ctx: &RequestContext) -> Result<()> {
        let keys = self.keys(query, ctx);

        if keys.is_empty() {
            debug!("no {} key for {}, passing through", self.scope, query.entity);

            return Ok(());
        }

        let start = window_start(ctx.timestamp, self.window_secs);
        let end = start.saturating_add(i64::try_from(self.window_secs.max(1)).unwrap_or(i64::MAX));
        let expires_at = DateTime::<Utc>::from_timestamp(end, 0).unwrap_or(DateTime::<Utc>::MAX_UTC);

        for key in keys {
            let counter_key = format!("{}:{key}:{start}", self.scope);
            let current = ctx.counters.increment(&counter_key, expires_at).await?;

            if current > self.limit {
                warn!(
                    "{} limit reached for {key}: {current} > {} in {}s",
                    self.scope, self.limit, self.window_secs
                );

                return Err(Error::RateLimitExceeded {
                    scope: self.scope,
                    key,
                    current,
                    limit: self.limit,
                    window: self.window_secs,
                });
            }

            debug!("{counter_key} at {current} of {}", self.limit);
        }

        Ok(())
    }
}
