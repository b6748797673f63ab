use async_trait::async_trait;
use dyn_clone::DynClone;
use uuid::Uuid;

use crate::{data::SubscriptionData, error::Result, identifier::PartitionId};

#[cfg(feature = "memory")]
mod memory;
#[cfg(feature = "pg")]
mod pg;

#[cfg(feature = "memory")]
pub use memory::*;
#[cfg(feature = "pg")]
pub use pg::*;

/// Key-value persistence of subscriptions, addressed by
/// `(entity, partition, key)`. Partitions are independent of each other.
#[async_trait]
pub trait Engine: DynClone + Send + Sync {
    /// Writes `data` only if `key` is not live yet. Returns `false` when the
    /// key already exists, in which case nothing is written.
    async fn insert(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        key: Uuid,
        data: &SubscriptionData,
    ) -> Result<bool>;

    async fn upsert(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        key: Uuid,
        data: &SubscriptionData,
    ) -> Result<()>;

    async fn get(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        key: Uuid,
    ) -> Result<Option<SubscriptionData>>;

    async fn delete(&self, entity: &'_ str, partition: PartitionId, key: Uuid) -> Result<()>;

    /// Reads at most `first` entries ordered by key, strictly after `after`.
    async fn read(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        first: u16,
        after: Option<Uuid>,
    ) -> Result<Vec<(Uuid, SubscriptionData)>>;
}

dyn_clone::clone_trait_object!(Engine);
