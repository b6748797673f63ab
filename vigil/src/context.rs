use chrono::{DateTime, Utc};

use crate::{config::DEFAULT_REFERRER, engine::CounterStore};

/// Caller information and shared services available to every processor of a
/// pipeline run.
#[derive(Clone)]
pub struct RequestContext {
    pub referrer: String,
    pub organization_id: Option<u64>,
    pub project_id: Option<u64>,
    /// Instant used to pick admission-control windows.
    pub timestamp: DateTime<Utc>,
    pub counters: CounterStore,
}

impl RequestContext {
    pub fn new(counters: CounterStore) -> Self {
        Self {
            referrer: DEFAULT_REFERRER.to_owned(),
            organization_id: None,
            project_id: None,
            timestamp: Utc::now(),
            counters,
        }
    }

    pub fn referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    pub fn organization(mut self, organization_id: u64) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    pub fn project(mut self, project_id: u64) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
