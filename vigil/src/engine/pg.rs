use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::{
    engine::{CounterEngine, CounterStore},
    error::Result,
};

#[derive(Debug, Clone)]
pub struct PgCounter {
    pool: PgPool,
    prefix: Option<String>,
}

impl PgCounter {
    pub fn new(pool: &PgPool) -> CounterStore {
        CounterStore::new(Self {
            pool: pool.clone(),
            prefix: None,
        })
    }

    pub fn with_prefix(pool: &PgPool, prefix: impl Into<String>) -> CounterStore {
        CounterStore::new(Self {
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

    pub fn table_quota_counter(&self) -> String {
        self.table("quota_counter")
    }
}

#[async_trait]
impl CounterEngine for PgCounter {
    async fn increment(&self, key: &'_ str, expires_at: DateTime<Utc>) -> Result<u64> {
        let table_quota_counter = self.table_quota_counter();

        let (count,) = sqlx::query_as::<_, (i64,)>(
            format!(
                r#"
                INSERT INTO {table_quota_counter} AS c (key, count, expires_at)
                VALUES ($1, 1, $2)
                ON CONFLICT (key) DO UPDATE SET count = c.count + 1
                RETURNING count
                "#
            )
            .as_str(),
        )
        .bind(key)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn read(&self, key: &'_ str) -> Result<u64> {
        let table_quota_counter = self.table_quota_counter();

        let count = sqlx::query_as::<_, (i64,)>(
            format!("SELECT count FROM {table_quota_counter} WHERE key = $1").as_str(),
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .map(|(count,)| count)
        .unwrap_or(0);

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn expire(&self, before: DateTime<Utc>) -> Result<u64> {
        let table_quota_counter = self.table_quota_counter();

        let result = sqlx::query(
            format!("DELETE FROM {table_quota_counter} WHERE expires_at < $1").as_str(),
        )
        .bind(before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
