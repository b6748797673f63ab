use futures_util::{
    stream::{self, BoxStream},
    StreamExt,
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    data::{Subscription, SubscriptionData},
    engine::Engine,
    error::Result,
    identifier::{PartitionId, SubscriptionIdentifier},
};

/// Number of entries fetched per round trip while enumerating a partition.
pub const DEFAULT_PAGE_SIZE: u16 = 100;

#[derive(Clone)]
pub struct Store {
    pub(crate) engine: Box<dyn Engine>,
}

impl Store {
    pub fn new<E: Engine + 'static>(engine: E) -> Self {
        Self {
            engine: Box::new(engine),
        }
    }

    /// The subscriptions of one entity.
    pub fn partitioned(&self, entity: impl Into<String>) -> PartitionedStore {
        PartitionedStore {
            engine: self.engine.clone(),
            entity: entity.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Per-(entity, partition) key to [`SubscriptionData`] mapping.
#[derive(Clone)]
pub struct PartitionedStore {
    pub(crate) engine: Box<dyn Engine>,
    entity: String,
    page_size: u16,
}

impl PartitionedStore {
    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn page_size(mut self, page_size: u16) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub async fn get(&self, partition: PartitionId, key: Uuid) -> Result<Option<SubscriptionData>> {
        self.engine.get(&self.entity, partition, key).await
    }

    pub async fn get_by_identifier(
        &self,
        identifier: &SubscriptionIdentifier,
    ) -> Result<Option<SubscriptionData>> {
        self.get(identifier.partition, identifier.key).await
    }

    /// Overwrites the entry, creating it when absent.
    pub async fn set(&self, partition: PartitionId, key: Uuid, data: &SubscriptionData) -> Result<()> {
        self.engine.upsert(&self.entity, partition, key, data).await
    }

    /// Removes the entry. Deleting an absent key succeeds.
    pub async fn delete(&self, partition: PartitionId, key: Uuid) -> Result<()> {
        self.engine.delete(&self.entity, partition, key).await
    }

    pub(crate) async fn insert(
        &self,
        partition: PartitionId,
        key: Uuid,
        data: &SubscriptionData,
    ) -> Result<bool> {
        self.engine.insert(&self.entity, partition, key, data).await
    }

    /// Lazily enumerates the live subscriptions of `partition`, one page at a
    /// time in key order.
    ///
    /// Entries written while the stream is consumed may or may not show up.
    /// The stream ends after the first error.
    pub fn all(&self, partition: PartitionId) -> BoxStream<'static, Result<Subscription>> {
        let engine = self.engine.clone();
        let entity = self.entity.clone();
        let first = self.page_size;

        debug!("enumerate {entity} partition {partition}");

        stream::unfold(Some(None), move |cursor: Option<Option<Uuid>>| {
            let engine = engine.clone();
            let entity = entity.clone();

            async move {
                let after = cursor?;

                match engine.read(&entity, partition, first, after).await {
                    Ok(page) => {
                        let next = match page.last() {
                            Some((key, _)) if page.len() == usize::from(first) => Some(Some(*key)),
                            _ => None,
                        };

                        let subscriptions = page
                            .into_iter()
                            .map(|(key, data)| {
                                Ok(Subscription {
                                    identifier: SubscriptionIdentifier::new(partition, key),
                                    data,
                                })
                            })
                            .collect::<Vec<_>>();

                        Some((stream::iter(subscriptions), next))
                    }
                    Err(e) => Some((stream::iter(vec![Err(e)]), None)),
                }
            }
        })
        .flatten()
        .boxed()
    }
}
