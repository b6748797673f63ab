use chrono::{DateTime, Utc};
use std::sync::Arc;
use vigil_store::{
    count_per_partition, list_per_partition, PartitionId, PartitionedStore, Store, Subscription,
    SubscriptionCreator, SubscriptionData, SubscriptionDeleter, SubscriptionIdentifier,
};

use crate::{
    config::VigilConfig,
    context::RequestContext,
    entity::Entity,
    error::Result,
    pipeline::{evaluate, BackendQuery},
    registry::EntityRegistry,
};

/// Entry point for managing the subscriptions of registered entities.
#[derive(Clone)]
pub struct Subscriptions {
    registry: Arc<EntityRegistry>,
    store: Store,
    config: VigilConfig,
}

impl Subscriptions {
    pub fn new(registry: Arc<EntityRegistry>, store: Store, config: VigilConfig) -> Self {
        Self {
            registry,
            store,
            config,
        }
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    fn partitioned(&self, entity: &str) -> Result<(&Entity, PartitionedStore)> {
        let entity = self.registry.get(entity)?;
        let store = self
            .store
            .partitioned(entity.name())
            .page_size(self.config.page_size);

        Ok((entity, store))
    }

    /// Registers a subscription. Its query must pass the validators of its
    /// entity once scoped to the subscription's project.
    pub async fn create(&self, data: SubscriptionData) -> Result<SubscriptionIdentifier> {
        let (entity, store) = self.partitioned(data.entity_subscription.entity_key())?;

        let query = data.build_query(Utc::now(), entity.required_time_column())?;
        entity.pipeline().validate(&query)?;

        let identifier = SubscriptionCreator::new(store, entity.partitions_number())
            .max_attempts(self.config.allocation_attempts)
            .create(data)
            .await?;

        Ok(identifier)
    }

    pub async fn get(
        &self,
        entity: &str,
        identifier: &SubscriptionIdentifier,
    ) -> Result<Option<SubscriptionData>> {
        let (_, store) = self.partitioned(entity)?;

        Ok(store.get_by_identifier(identifier).await?)
    }

    pub async fn delete(&self, entity: &str, identifier: &SubscriptionIdentifier) -> Result<()> {
        let (_, store) = self.partitioned(entity)?;

        Ok(SubscriptionDeleter::new(store).delete(identifier).await?)
    }

    pub async fn count_per_partition(&self, entity: &str) -> Result<Vec<(PartitionId, usize)>> {
        let (entity, store) = self.partitioned(entity)?;

        Ok(count_per_partition(&store, entity.partitions_number()).await?)
    }

    pub async fn list_per_partition(
        &self,
        entity: &str,
    ) -> Result<Vec<(PartitionId, Vec<Subscription>)>> {
        let (entity, store) = self.partitioned(entity)?;

        Ok(list_per_partition(&store, entity.partitions_number()).await?)
    }

    /// Runs `subscription` through its entity pipeline for the window ending
    /// at `timestamp`.
    pub async fn evaluate(
        &self,
        subscription: &Subscription,
        timestamp: DateTime<Utc>,
        ctx: &RequestContext,
    ) -> Result<BackendQuery> {
        evaluate(&self.registry, &subscription.data, timestamp, ctx).await
    }
}
