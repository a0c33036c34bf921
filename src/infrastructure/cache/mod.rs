pub mod cache_keys;
pub mod in_memory;

use crate::core::errors::SplitError;
use crate::core::models::balance::GroupBalance;
use async_trait::async_trait;

/// Read-side projection of pairwise group balances. Entries are dropped
/// after every committed ledger change.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_group_balances(&self, group_id: &str) -> Result<Option<Vec<GroupBalance>>, SplitError>;
    async fn save_group_balances(
        &self,
        group_id: &str,
        balances: &[GroupBalance],
        ttl: std::time::Duration,
    ) -> Result<(), SplitError>;
    async fn invalidate_group_balances(&self, group_id: &str) -> Result<(), SplitError>;
}
