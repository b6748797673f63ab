#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::TryStreamExt;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use uuid::Uuid;
use vigil_store::{
    Engine, PartitionId, Result, Store, StoreError, SubscriptionCreator, SubscriptionData,
};

use super::{events, PARTITIONS};

#[derive(Clone, Copy)]
pub enum Fault {
    /// Every write fails.
    Unavailable,
    /// Every key is already taken.
    Collision,
}

/// Engine whose inserts never succeed. Nothing is ever stored.
#[derive(Clone)]
pub struct FaultyEngine {
    fault: Fault,
    inserts: Arc<AtomicUsize>,
}

impl FaultyEngine {
    pub fn new(fault: Fault) -> (Store, Arc<AtomicUsize>) {
        let inserts = Arc::new(AtomicUsize::new(0));
        let engine = Self {
            fault,
            inserts: inserts.clone(),
        };

        (Store::new(engine), inserts)
    }
}

#[async_trait]
impl Engine for FaultyEngine {
    async fn insert(
        &self,
        _entity: &'_ str,
        _partition: PartitionId,
        _key: Uuid,
        _data: &SubscriptionData,
    ) -> Result<bool> {
        self.inserts.fetch_add(1, Ordering::SeqCst);

        match self.fault {
            Fault::Unavailable => Err(StoreError::Any(anyhow::anyhow!("connection refused"))),
            Fault::Collision => Ok(false),
        }
    }

    async fn upsert(
        &self,
        _entity: &'_ str,
        _partition: PartitionId,
        _key: Uuid,
        _data: &SubscriptionData,
    ) -> Result<()> {
        Err(StoreError::Any(anyhow::anyhow!("connection refused")))
    }

    async fn get(
        &self,
        _entity: &'_ str,
        _partition: PartitionId,
        _key: Uuid,
    ) -> Result<Option<SubscriptionData>> {
        Ok(None)
    }

    async fn delete(&self, _entity: &'_ str, _partition: PartitionId, _key: Uuid) -> Result<()> {
        Ok(())
    }

    async fn read(
        &self,
        _entity: &'_ str,
        _partition: PartitionId,
        _first: u16,
        _after: Option<Uuid>,
    ) -> Result<Vec<(Uuid, SubscriptionData)>> {
        Ok(Vec::new())
    }
}

pub async fn test_store_failure() -> anyhow::Result<()> {
    let (store, inserts) = FaultyEngine::new(Fault::Unavailable);
    let creator = SubscriptionCreator::new(store.partitioned("events"), PARTITIONS).max_attempts(5);

    match creator.create(events(7)).await {
        Err(StoreError::Allocation(message)) => assert!(message.contains("connection refused")),
        other => anyhow::bail!("expected an allocation error, got {other:?}"),
    }

    assert_eq!(inserts.load(Ordering::SeqCst), 1);

    let partition = PartitionId::for_project(7, PARTITIONS)?;
    let live = store
        .partitioned("events")
        .all(partition)
        .try_collect::<Vec<_>>()
        .await?;
    assert!(live.is_empty());

    Ok(())
}

pub async fn test_collisions_exhaust_attempts() -> anyhow::Result<()> {
    let (store, inserts) = FaultyEngine::new(Fault::Collision);
    let creator = SubscriptionCreator::new(store.partitioned("events"), PARTITIONS).max_attempts(4);

    match creator.create(events(8)).await {
        Err(StoreError::Allocation(message)) => assert!(message.contains("after 4 attempts")),
        other => anyhow::bail!("expected an allocation error, got {other:?}"),
    }

    assert_eq!(inserts.load(Ordering::SeqCst), 4);

    let partition = PartitionId::for_project(8, PARTITIONS)?;
    let live = store
        .partitioned("events")
        .all(partition)
        .try_collect::<Vec<_>>()
        .await?;
    assert!(live.is_empty());

    Ok(())
}
