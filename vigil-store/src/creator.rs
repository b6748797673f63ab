use futures_util::TryStreamExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    data::{Subscription, SubscriptionData},
    error::{Result, StoreError},
    identifier::{PartitionId, SubscriptionIdentifier},
    store::PartitionedStore,
};

/// Keys drawn before giving up on a partition.
pub const DEFAULT_ALLOCATION_ATTEMPTS: u8 = 3;

/// Issues identifiers for new subscriptions and persists them.
///
/// Keys are random UUIDv4 values written with insert-if-absent, so
/// concurrent creators never share a key: a collision is detected by the
/// store and a fresh key is drawn.
#[derive(Clone)]
pub struct SubscriptionCreator {
    store: PartitionedStore,
    partitions_number: u16,
    max_attempts: u8,
}

impl SubscriptionCreator {
    pub fn new(store: PartitionedStore, partitions_number: u16) -> Self {
        Self {
            store,
            partitions_number,
            max_attempts: DEFAULT_ALLOCATION_ATTEMPTS,
        }
    }

    pub fn max_attempts(mut self, max_attempts: u8) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn create(&self, data: SubscriptionData) -> Result<SubscriptionIdentifier> {
        data.validate()?;

        let entity = data.entity_subscription.entity_key();

        if entity != self.store.entity() {
            return Err(StoreError::EntityMismatch {
                expected: self.store.entity().to_owned(),
                found: entity.to_owned(),
            });
        }

        data.parse()?;

        let partition = PartitionId::for_project(data.project_id, self.partitions_number)?;

        debug!(
            "project {} of {entity} routed to partition {partition}",
            data.project_id
        );

        for _ in 0..self.max_attempts {
            let key = Uuid::new_v4();

            match self.store.insert(partition, key, &data).await {
                Ok(true) => {
                    let identifier = SubscriptionIdentifier::new(partition, key);
                    info!("created {entity} subscription {identifier}");

                    return Ok(identifier);
                }
                Ok(false) => {
                    warn!("key {key} already live in {entity} partition {partition}, retrying");
                }
                Err(e) => {
                    error!("failed to store {entity} subscription: {e}");

                    return Err(StoreError::Allocation(e.to_string()));
                }
            }
        }

        Err(StoreError::Allocation(format!(
            "no free key in {entity} partition {partition} after {} attempts",
            self.max_attempts
        )))
    }
}

#[derive(Clone)]
pub struct SubscriptionDeleter {
    store: PartitionedStore,
}

impl SubscriptionDeleter {
    pub fn new(store: PartitionedStore) -> Self {
        Self { store }
    }

    /// Removes the subscription. Deleting an unknown identifier succeeds.
    pub async fn delete(&self, identifier: &SubscriptionIdentifier) -> Result<()> {
        self.store
            .delete(identifier.partition, identifier.key)
            .await?;

        info!("deleted {} subscription {identifier}", self.store.entity());

        Ok(())
    }
}

/// Live subscriptions of every partition, in partition order.
pub async fn list_per_partition(
    store: &PartitionedStore,
    partitions_number: u16,
) -> Result<Vec<(PartitionId, Vec<Subscription>)>> {
    let mut partitions = Vec::with_capacity(usize::from(partitions_number));

    for partition in PartitionId::all(partitions_number) {
        let subscriptions = store.all(partition).try_collect::<Vec<_>>().await?;
        partitions.push((partition, subscriptions));
    }

    Ok(partitions)
}

/// Number of live subscriptions of every partition, in partition order.
pub async fn count_per_partition(
    store: &PartitionedStore,
    partitions_number: u16,
) -> Result<Vec<(PartitionId, usize)>> {
    let mut counts = Vec::with_capacity(usize::from(partitions_number));

    for partition in PartitionId::all(partitions_number) {
        let count = store
            .all(partition)
            .try_fold(0, |count, _| async move { Ok(count + 1) })
            .await?;

        counts.push((partition, count));
    }

    Ok(counts)
}
