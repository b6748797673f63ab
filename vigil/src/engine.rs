use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dyn_clone::DynClone;

use crate::error::Result;

#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "pg")]
mod pg;

#[cfg(feature = "memory")]
pub use memory::*;
#[cfg(feature = "pg")]
pub use pg::*;

/// Shared counters backing admission control.
///
/// Counter keys are unique per time window, so expiry only reclaims space:
/// it never resets a counter that is still being incremented.
#[async_trait]
pub trait CounterEngine: DynClone + Send + Sync {
    /// Atomically adds one to `key` and returns the new count. A missing
    /// counter is created at one, expiring at `expires_at`.
    async fn increment(&self, key: &'_ str, expires_at: DateTime<Utc>) -> Result<u64>;

    async fn read(&self, key: &'_ str) -> Result<u64>;

    /// Drops counters that expired before `before` and returns how many.
    async fn expire(&self, before: DateTime<Utc>) -> Result<u64>;
}

dyn_clone::clone_trait_object!(CounterEngine);

#[derive(Clone)]
pub struct CounterStore {
    engine: Box<dyn CounterEngine>,
}

impl CounterStore {
    pub fn new<E: CounterEngine + 'static>(engine: E) -> Self {
        Self {
            engine: Box::new(engine),
        }
    }

    pub async fn increment(&self, key: &str, expires_at: DateTime<Utc>) -> Result<u64> {
        self.engine.increment(key, expires_at).await
    }

    pub async fn read(&self, key: &str) -> Result<u64> {
        self.engine.read(key).await
    }

    pub async fn expire(&self, before: DateTime<Utc>) -> Result<u64> {
        self.engine.expire(before).await
    }
}
