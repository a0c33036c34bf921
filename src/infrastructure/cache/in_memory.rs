use crate::core::errors::SplitError;
use crate::core::models::balance::GroupBalance;
use crate::infrastructure::cache::{Cache, cache_keys::group_balances_key};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryCache {
    cache: Arc<RwLock<HashMap<String, (Vec<GroupBalance>, DateTime<Utc>)>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        InMemoryCache::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_group_balances(&self, group_id: &str) -> Result<Option<Vec<GroupBalance>>, SplitError> {
        let cache = self.cache.read().await;
        let now = Utc::now();
        Ok(cache
            .get(&group_balances_key(group_id))
            .filter(|(_, expiry)| *expiry > now)
            .map(|(balances, _)| balances.clone()))
    }

    async fn save_group_balances(
        &self,
        group_id: &str,
        balances: &[GroupBalance],
        ttl: std::time::Duration,
    ) -> Result<(), SplitError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| SplitError::CacheError(format!("Failed to convert TTL: {}", e)))?;
        let mut cache = self.cache.write().await;
        cache.insert(group_balances_key(group_id), (balances.to_vec(), Utc::now() + ttl));
        Ok(())
    }

    async fn invalidate_group_balances(&self, group_id: &str) -> Result<(), SplitError> {
        let mut cache = self.cache.write().await;
        cache.remove(&group_balances_key(group_id));
        let now = Utc::now();
        cache.retain(|_, (_, expiry)| *expiry > now);
        Ok(())
    }
}
