use async_trait::async_trait;
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap},
    ops::Bound,
    sync::Arc,
};
use uuid::Uuid;

use crate::{
    data::SubscriptionData, engine::Engine, error::Result, identifier::PartitionId, store::Store,
};

type Partition = BTreeMap<Uuid, SubscriptionData>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore(Arc<RwLock<HashMap<(String, PartitionId), Partition>>>);

impl MemoryStore {
    pub fn new() -> Store {
        Store::new(Self::default())
    }
}

#[async_trait]
impl Engine for MemoryStore {
    async fn insert(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        key: Uuid,
        data: &SubscriptionData,
    ) -> Result<bool> {
        let mut partitions = self.0.write();
        let entries = partitions
            .entry((entity.to_owned(), partition))
            .or_default();

        if entries.contains_key(&key) {
            return Ok(false);
        }

        entries.insert(key, data.clone());

        Ok(true)
    }

    async fn upsert(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        key: Uuid,
        data: &SubscriptionData,
    ) -> Result<()> {
        self.0
            .write()
            .entry((entity.to_owned(), partition))
            .or_default()
            .insert(key, data.clone());

        Ok(())
    }

    async fn get(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        key: Uuid,
    ) -> Result<Option<SubscriptionData>> {
        Ok(self
            .0
            .read()
            .get(&(entity.to_owned(), partition))
            .and_then(|entries| entries.get(&key))
            .cloned())
    }

    async fn delete(&self, entity: &'_ str, partition: PartitionId, key: Uuid) -> Result<()> {
        if let Some(entries) = self.0.write().get_mut(&(entity.to_owned(), partition)) {
            entries.remove(&key);
        }

        Ok(())
    }

    async fn read(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        first: u16,
        after: Option<Uuid>,
    ) -> Result<Vec<(Uuid, SubscriptionData)>> {
        let partitions = self.0.read();

        let Some(entries) = partitions.get(&(entity.to_owned(), partition)) else {
            return Ok(vec![]);
        };

        let start = match after {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };

        Ok(entries
            .range((start, Bound::Unbounded))
            .take(usize::from(first))
            .map(|(key, data)| (*key, data.clone()))
            .collect())
    }
}
