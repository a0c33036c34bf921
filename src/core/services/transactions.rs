use super::{MAX_NAME_LENGTH, MAX_URL_LENGTH, SplitService};
use crate::core::errors::SplitError;
use crate::core::ledger::GroupLedger;
use crate::core::models::{
    balance::{GroupBalance, LedgerReport},
    transaction::{Tag, Transaction},
    user::User,
};
use crate::core::money::{Currency, validate_total};
use crate::core::settlement::settle;
use crate::core::split::{SplitSpec, build_balances};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::receipts::ReceiptStore;
use crate::infrastructure::storage::Storage;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct TagInput {
    pub name: String,
    pub icon: Option<String>,
}

/// Caller-editable fields of a transaction. Balances are derived from
/// `amount` and `split`.
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct TransactionInput {
    pub group_id: String,
    pub name: String,
    pub icon: Option<String>,
    #[schema(value_type = String, example = "30.00")]
    pub amount: Decimal,
    pub currency: Currency,
    /// Defaults to the time of the request.
    pub transaction_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<TagInput>,
    pub geo_coordinate: Option<String>,
    pub photo: Option<String>,
    pub split: SplitSpec,
}

pub(super) fn build_tags(tags: Vec<TagInput>) -> Vec<Tag> {
    tags.into_iter()
        .map(|tag| Tag {
            id: Uuid::new_v4().to_string(),
            name: tag.name,
            icon: tag.icon,
        })
        .collect()
}

impl<S: Storage, C: Cache, R: ReceiptStore> SplitService<S, C, R> {
    pub(super) fn validate_tags(&self, tags: &[TagInput]) -> Result<(), SplitError> {
        for tag in tags {
            self.validate_string_input("tags", &tag.name, MAX_NAME_LENGTH)?;
            self.validate_optional_input("tags", tag.icon.as_deref(), MAX_NAME_LENGTH)?;
        }
        Ok(())
    }

    fn validate_transaction_input(&self, input: &TransactionInput) -> Result<(), SplitError> {
        self.validate_string_input("name", &input.name, MAX_NAME_LENGTH)?;
        self.validate_optional_input("icon", input.icon.as_deref(), MAX_NAME_LENGTH)?;
        self.validate_optional_input("geo_coordinate", input.geo_coordinate.as_deref(), MAX_NAME_LENGTH)?;
        self.validate_optional_input("photo", input.photo.as_deref(), MAX_URL_LENGTH)?;
        self.validate_tags(&input.tags)?;
        validate_total("amount", input.amount)
    }

    #[instrument(skip(self, input, created_by), fields(group_id = %input.group_id, user_id = %created_by.id))]
    pub async fn create_transaction(&self, input: TransactionInput, created_by: &User) -> Result<Transaction, SplitError> {
        let group = self.validate_group_membership(&input.group_id, &created_by.id).await?;
        self.validate_transaction_input(&input)?;

        let transaction_id = Uuid::new_v4().to_string();
        let balances = build_balances(&transaction_id, input.amount, &input.split, &group.members)?;
        let now = Utc::now();
        let transaction = Transaction {
            id: transaction_id,
            group_id: group.id.clone(),
            name: input.name,
            icon: input.icon,
            amount: input.amount,
            currency: input.currency,
            create_time: now,
            transaction_time: input.transaction_time.unwrap_or(now),
            tags: build_tags(input.tags),
            geo_coordinate: input.geo_coordinate,
            photo: input.photo,
            balances,
            version: 1,
        };

        let created = self
            .within_deadline("create_transaction", async {
                let mut uow = self.storage.begin(&group.id).await?;
                let mut group = uow.get_group().await?;

                settle(transaction.balances.iter().map(|b| (b.user_id.as_str(), b.amount)))?;

                let before = GroupLedger::from_positions(&group.id, uow.get_net_positions().await?)?;
                let mut after = before.clone();
                after.apply(&transaction)?;
                uow.update_positions(after.diff(&before));
                uow.save_transaction(transaction.clone());

                group.transaction_count += 1;
                group.touch();
                uow.save_group(group);
                uow.commit().await?;
                Ok(transaction)
            })
            .await?;

        self.invalidate_balances(&created.group_id).await;
        info!(
            transaction_id = %created.id,
            amount = %created.amount,
            currency = %created.currency,
            "transaction created"
        );
        Ok(created)
    }

    /// Replaces the transaction's content. When `expected_version` is given
    /// and the stored row has moved on, fails with `Conflict`.
    #[instrument(skip(self, input, edited_by), fields(user_id = %edited_by.id))]
    pub async fn edit_transaction(
        &self,
        transaction_id: &str,
        input: TransactionInput,
        expected_version: Option<u64>,
        edited_by: &User,
    ) -> Result<Transaction, SplitError> {
        let existing = self
            .storage
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| SplitError::TransactionNotFound(transaction_id.to_string()))?;
        let group = self.validate_group_membership(&existing.group_id, &edited_by.id).await?;
        if input.group_id != existing.group_id {
            warn!(
                from = %existing.group_id,
                to = %input.group_id,
                "attempt to move transaction to another group"
            );
            return Err(SplitError::GroupReassignment);
        }
        self.validate_transaction_input(&input)?;
        let balances = build_balances(transaction_id, input.amount, &input.split, &group.members)?;

        let updated = self
            .within_deadline("edit_transaction", async {
                let mut uow = self.storage.begin(&group.id).await?;
                let current = uow
                    .get_transaction(transaction_id)
                    .await?
                    .ok_or_else(|| SplitError::TransactionNotFound(transaction_id.to_string()))?;
                if let Some(expected) = expected_version {
                    if expected != current.version {
                        return Err(SplitError::Conflict {
                            id: transaction_id.to_string(),
                            expected,
                            found: current.version,
                        });
                    }
                }

                let updated = Transaction {
                    id: current.id.clone(),
                    group_id: current.group_id.clone(),
                    name: input.name,
                    icon: input.icon,
                    amount: input.amount,
                    currency: input.currency,
                    create_time: current.create_time,
                    transaction_time: input.transaction_time.unwrap_or(current.transaction_time),
                    tags: build_tags(input.tags),
                    geo_coordinate: input.geo_coordinate,
                    photo: input.photo,
                    balances,
                    version: current.version + 1,
                };
                settle(updated.balances.iter().map(|b| (b.user_id.as_str(), b.amount)))?;

                let before = GroupLedger::from_positions(&group.id, uow.get_net_positions().await?)?;
                let mut after = before.clone();
                after.revert(&current)?;
                after.apply(&updated)?;
                uow.update_positions(after.diff(&before));
                uow.save_transaction(updated.clone());

                let mut group = uow.get_group().await?;
                group.touch();
                uow.save_group(group);
                uow.commit().await?;
                Ok(updated)
            })
            .await?;

        self.invalidate_balances(&updated.group_id).await;
        info!(transaction_id, version = updated.version, "transaction edited");
        Ok(updated)
    }

    #[instrument(skip(self, deleted_by), fields(user_id = %deleted_by.id))]
    pub async fn delete_transaction(&self, transaction_id: &str, deleted_by: &User) -> Result<(), SplitError> {
        let existing = self
            .storage
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| SplitError::TransactionNotFound(transaction_id.to_string()))?;
        self.validate_group_membership(&existing.group_id, &deleted_by.id).await?;

        let removed = self
            .within_deadline("delete_transaction", async {
                let mut uow = self.storage.begin(&existing.group_id).await?;
                let current = uow
                    .get_transaction(transaction_id)
                    .await?
                    .ok_or_else(|| SplitError::TransactionNotFound(transaction_id.to_string()))?;

                let before = GroupLedger::from_positions(&existing.group_id, uow.get_net_positions().await?)?;
                let mut after = before.clone();
                after.revert(&current)?;
                uow.update_positions(after.diff(&before));
                uow.delete_transaction(&current.id, current.version);

                let mut group = uow.get_group().await?;
                group.transaction_count = group.transaction_count.saturating_sub(1);
                group.touch();
                uow.save_group(group);
                uow.commit().await?;
                Ok(current)
            })
            .await?;

        self.invalidate_balances(&removed.group_id).await;
        info!(transaction_id, group_id = %removed.group_id, "transaction deleted");

        if let Some(photo) = removed.photo.as_deref() {
            if let Err(e) = self.receipts.release(photo).await {
                warn!(transaction_id, photo, error = %e, "failed to release receipt");
            }
        }
        Ok(())
    }

    pub async fn get_transaction(&self, transaction_id: &str, requested_by: &User) -> Result<Transaction, SplitError> {
        let transaction = self
            .storage
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| SplitError::TransactionNotFound(transaction_id.to_string()))?;
        self.validate_group_membership(&transaction.group_id, &requested_by.id).await?;
        Ok(transaction)
    }

    /// Live transactions of a group, most recent `transaction_time` first.
    pub async fn list_transactions(&self, group_id: &str, requested_by: &User) -> Result<Vec<Transaction>, SplitError> {
        self.validate_group_membership(group_id, &requested_by.id).await?;
        let mut transactions = self.storage.get_group_transactions(group_id).await?;
        transactions.sort_by(|a, b| {
            b.transaction_time
                .cmp(&a.transaction_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(transactions)
    }

    pub async fn get_group_balances(&self, group_id: &str, requested_by: &User) -> Result<Vec<GroupBalance>, SplitError> {
        self.validate_group_membership(group_id, &requested_by.id).await?;
        self.group_balances(group_id).await
    }

    /// Pairwise balances from cache, or derived from the stored positions.
    /// Derivation runs inside the group's unit of work so a concurrent
    /// commit cannot slip between the read and the cache write.
    pub(super) async fn group_balances(&self, group_id: &str) -> Result<Vec<GroupBalance>, SplitError> {
        match self.cache.get_group_balances(group_id).await {
            Ok(Some(balances)) => {
                debug!(group_id, "group balances served from cache");
                return Ok(balances);
            }
            Ok(None) => {}
            Err(e) => warn!(group_id, error = %e, "balance cache read failed"),
        }

        self.within_deadline("group_balances", async {
            let mut uow = self.storage.begin(group_id).await?;
            let ledger = GroupLedger::from_positions(group_id, uow.get_net_positions().await?)?;
            let balances = ledger.pairwise_balances()?;
            if let Err(e) = self
                .cache
                .save_group_balances(group_id, &balances, self.balance_cache_ttl)
                .await
            {
                warn!(group_id, error = %e, "failed to cache group balances");
            }
            drop(uow);
            Ok(balances)
        })
        .await
    }

    /// Rebuilds the ledger from the group's transactions and compares it
    /// with the maintained positions. Nothing is written.
    #[instrument(skip(self, requested_by), fields(user_id = %requested_by.id))]
    pub async fn verify_group_ledger(&self, group_id: &str, requested_by: &User) -> Result<LedgerReport, SplitError> {
        self.validate_group_membership(group_id, &requested_by.id).await?;

        let (stored, expected) = self
            .within_deadline("verify_group_ledger", async {
                let mut uow = self.storage.begin(group_id).await?;
                let stored = GroupLedger::from_positions(group_id, uow.get_net_positions().await?)?;
                let transactions = uow.get_transactions().await?;
                Ok((stored, GroupLedger::recompute(group_id, &transactions)?))
            })
            .await?;

        let mismatches = stored.mismatches(&expected);
        if mismatches.is_empty() {
            info!(group_id, "group ledger consistent");
        } else {
            error!(group_id, mismatches = mismatches.len(), "group ledger diverged from transactions");
        }
        Ok(LedgerReport {
            group_id: group_id.to_string(),
            consistent: mismatches.is_empty(),
            mismatches,
        })
    }
}
