use crate::auth::jwt::{Claims, JwtService};
use crate::config::CONFIG;
use crate::core::errors::SplitError;
use crate::core::models::group::Group;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::receipts::ReceiptStore;
use crate::infrastructure::storage::Storage;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub mod accounts;
pub mod drafts;
pub mod groups;
pub mod transactions;

pub use accounts::{Profile, RegisterInput};
pub use drafts::DraftInput;
pub use transactions::{TagInput, TransactionInput};

pub const MAX_NAME_LENGTH: usize = 256;
pub const MAX_URL_LENGTH: usize = 2048;

pub struct SplitService<S: Storage, C: Cache, R: ReceiptStore> {
    storage: S,
    cache: C,
    receipts: R,
    jwt_service: JwtService,
    bcrypt_cost: u32,
    unit_of_work_timeout: Duration,
    balance_cache_ttl: Duration,
}

impl<S: Storage, C: Cache, R: ReceiptStore> SplitService<S, C, R> {
    pub fn new(storage: S, cache: C, receipts: R, jwt_secret: String) -> Self {
        SplitService {
            storage,
            cache,
            receipts,
            jwt_service: JwtService::new(jwt_secret, CONFIG.token_ttl),
            bcrypt_cost: CONFIG.bcrypt_cost,
            unit_of_work_timeout: CONFIG.unit_of_work_timeout,
            balance_cache_ttl: CONFIG.balance_cache_ttl,
        }
    }

    pub fn with_unit_of_work_timeout(mut self, timeout: Duration) -> Self {
        self.unit_of_work_timeout = timeout;
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, SplitError> {
        self.jwt_service.validate_token(token)
    }

    /// Loads the group and checks `user_id` belongs to it.
    async fn validate_group_membership(&self, group_id: &str, user_id: &str) -> Result<Group, SplitError> {
        let group = self
            .storage
            .get_group(group_id)
            .await?
            .ok_or_else(|| SplitError::GroupNotFound(group_id.to_string()))?;
        if !group.is_member(user_id) {
            warn!(group_id, user_id, "access by non-member rejected");
            return Err(SplitError::Unauthorized(user_id.to_string()));
        }
        Ok(group)
    }

    fn validate_string_input(&self, field: &str, value: &str, max_length: usize) -> Result<(), SplitError> {
        if value.trim().is_empty() {
            return Err(SplitError::invalid_input(
                field,
                format!("Invalid {}", field),
                format!("{} cannot be empty", field),
            ));
        }
        if value.chars().count() > max_length {
            return Err(SplitError::invalid_input(
                field,
                format!("{} Too Long", field),
                format!("{} cannot exceed {} characters", field, max_length),
            ));
        }
        if value.chars().any(|c| c.is_control() || "<>{}[]".contains(c)) {
            return Err(SplitError::invalid_input(
                field,
                format!("Invalid {}", field),
                format!("{} contains invalid characters", field),
            ));
        }
        Ok(())
    }

    fn validate_optional_input(&self, field: &str, value: Option<&str>, max_length: usize) -> Result<(), SplitError> {
        match value {
            Some(value) => self.validate_string_input(field, value, max_length),
            None => Ok(()),
        }
    }

    /// Runs a unit of work under the configured deadline. On expiry the
    /// future is dropped, and the unit with it, so nothing is committed.
    async fn within_deadline<T, F>(&self, operation: &str, work: F) -> Result<T, SplitError>
    where
        F: Future<Output = Result<T, SplitError>>,
    {
        match tokio::time::timeout(self.unit_of_work_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = self.unit_of_work_timeout.as_millis() as u64;
                warn!(operation, timeout_ms, "unit of work timed out and was rolled back");
                Err(SplitError::Timeout(timeout_ms))
            }
        }
    }

    async fn invalidate_balances(&self, group_id: &str) {
        if let Err(e) = self.cache.invalidate_group_balances(group_id).await {
            warn!(group_id, error = %e, "failed to invalidate balance cache");
        }
    }
}
