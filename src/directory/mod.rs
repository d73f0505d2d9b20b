pub mod filter;

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;

use crate::error::{Error, Result};

/// Identity lookup the leave and attendance flows depend on: user id in,
/// display name out. Lookup failures are propagated to the caller, never
/// masked.
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve(&self, user_id: &str) -> Result<String>;
}

/// Directory backed by the users table, with a cuckoo-filter fast-negative
/// check in front of a TTL cache in front of the database.
pub struct DbDirectory {
    pool: MySqlPool,
    cache: Cache<String, String>,
}

impl DbDirectory {
    pub fn new(pool: MySqlPool) -> Self {
        let cache = Cache::builder()
            .max_capacity(500_000)
            .time_to_live(Duration::from_secs(86400)) // 24h TTL
            .build();
        Self { pool, cache }
    }

    /// Load recently seen users into the in-memory cache (batched).
    pub async fn warmup_cache(&self, days: u32, batch_size: usize) -> anyhow::Result<()> {
        let mut stream = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT id, display_name
            FROM users
            WHERE last_seen_at >= NOW() - INTERVAL ? DAY
            ORDER BY last_seen_at DESC
            "#,
        )
        .bind(days)
        .fetch(&self.pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total_count = 0usize;

        while let Some(row) = stream.next().await {
            let (id, name) = row?;
            batch.push((id, name));
            total_count += 1;

            if batch.len() >= batch_size {
                self.insert_batch(&batch).await;
                batch.clear();
            }
        }

        if !batch.is_empty() {
            self.insert_batch(&batch).await;
        }

        log::info!(
            "Directory cache warmup complete: {} recent users (last {} days)",
            total_count,
            days
        );

        Ok(())
    }

    async fn insert_batch(&self, entries: &[(String, String)]) {
        let futures: Vec<_> = entries
            .iter()
            .map(|(id, name)| self.cache.insert(id.clone(), name.clone()))
            .collect();

        futures::future::join_all(futures).await;
    }
}

#[async_trait]
impl NameResolver for DbDirectory {
    async fn resolve(&self, user_id: &str) -> Result<String> {
        if user_id.is_empty() {
            return Err(Error::Validation("user id is required".to_string()));
        }

        if !filter::might_exist(user_id) {
            return Err(Error::Upstream(format!("unknown user {}", user_id)));
        }

        if let Some(name) = self.cache.get(user_id).await {
            return Ok(name);
        }

        let row = sqlx::query_as::<_, (String,)>(
            "SELECT display_name FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Upstream(format!("directory lookup failed: {}", e)))?;

        match row {
            Some((name,)) => {
                self.cache.insert(user_id.to_string(), name.clone()).await;
                Ok(name)
            }
            None => Err(Error::Upstream(format!("unknown user {}", user_id))),
        }
    }
}

