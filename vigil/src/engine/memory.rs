use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

use crate::{
    engine::{CounterEngine, CounterStore},
    error::Result,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryCounter(Arc<RwLock<HashMap<String, (u64, DateTime<Utc>)>>>);

impl MemoryCounter {
    pub fn new() -> CounterStore {
        CounterStore::new(Self::default())
    }
}

#[async_trait]
impl CounterEngine for MemoryCounter {
    async fn increment(&self, key: &'_ str, expires_at: DateTime<Utc>) -> Result<u64> {
        let mut counters = self.0.write();
        let (count, _) = counters.entry(key.to_owned()).or_insert((0, expires_at));
        *count += 1;

        Ok(*count)
    }

    async fn read(&self, key: &'_ str) -> Result<u64> {
        Ok(self.0.read().get(key).map(|(count, _)| *count).unwrap_or(0))
    }

    async fn expire(&self, before: DateTime<Utc>) -> Result<u64> {
        let mut counters = self.0.write();
        let len = counters.len();
        counters.retain(|_, (_, expires_at)| *expires_at >= before);

        Ok(u64::try_from(len - counters.len()).unwrap_or(u64::MAX))
    }
}
