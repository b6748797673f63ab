use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    data::SubscriptionData, engine::Engine, error::Result, identifier::PartitionId, store::Store,
};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    prefix: Option<String>,
}

impl PgStore {
    pub fn new(pool: &PgPool) -> Store {
        Store::new(Self {
            pool: pool.clone(),
            prefix: None,
        })
    }

    pub fn with_prefix(pool: &PgPool, prefix: impl Into<String>) -> Store {
        Store::new(Self {
            pool: pool.clone(),
            prefix: Some(prefix.into()),
        })
    }

    pub fn table(&self, name: impl Into<String>) -> String {
        format!(
            "{}_{}",
            self.prefix.as_deref().unwrap_or("vigil"),
            name.into()
        )
    }

    pub fn table_subscription(&self) -> String {
        self.table("subscription")
    }
}

#[async_trait]
impl Engine for PgStore {
    async fn insert(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        key: Uuid,
        data: &SubscriptionData,
    ) -> Result<bool> {
        let table_subscription = self.table_subscription();

        let result = sqlx::query(
            format!(
                r#"
                INSERT INTO {table_subscription} (entity, partition, key, data, created_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT DO NOTHING
                "#
            )
            .as_str(),
        )
        .bind(entity)
        .bind(i32::from(partition.0))
        .bind(key)
        .bind(serde_json::to_value(data)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn upsert(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        key: Uuid,
        data: &SubscriptionData,
    ) -> Result<()> {
        let table_subscription = self.table_subscription();

        sqlx::query(
            format!(
                r#"
                INSERT INTO {table_subscription} (entity, partition, key, data, created_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (entity, partition, key) DO UPDATE SET data = EXCLUDED.data
                "#
            )
            .as_str(),
        )
        .bind(entity)
        .bind(i32::from(partition.0))
        .bind(key)
        .bind(serde_json::to_value(data)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        key: Uuid,
    ) -> Result<Option<SubscriptionData>> {
        let table_subscription = self.table_subscription();

        let row = sqlx::query_as::<_, (Value,)>(
            format!(
                "SELECT data FROM {table_subscription} WHERE entity = $1 AND partition = $2 AND key = $3"
            )
            .as_str(),
        )
        .bind(entity)
        .bind(i32::from(partition.0))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((data,)) => Ok(Some(serde_json::from_value(data)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, entity: &'_ str, partition: PartitionId, key: Uuid) -> Result<()> {
        let table_subscription = self.table_subscription();

        sqlx::query(
            format!(
                "DELETE FROM {table_subscription} WHERE entity = $1 AND partition = $2 AND key = $3"
            )
            .as_str(),
        )
        .bind(entity)
        .bind(i32::from(partition.0))
        .bind(key)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn read(
        &self,
        entity: &'_ str,
        partition: PartitionId,
        first: u16,
        after: Option<Uuid>,
    ) -> Result<Vec<(Uuid, SubscriptionData)>> {
        let table_subscription = self.table_subscription();

        let rows = sqlx::query_as::<_, (Uuid, Value)>(
            format!(
                r#"
                SELECT key, data FROM {table_subscription}
                WHERE entity = $1 AND partition = $2 AND ($3::uuid IS NULL OR key > $3)
                ORDER BY key ASC
                LIMIT $4
                "#
            )
            .as_str(),
        )
        .bind(entity)
        .bind(i32::from(partition.0))
        .bind(after)
        .bind(i64::from(first))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(key, data)| Ok((key, serde_json::from_value(data)?)))
            .collect()
    }
}
