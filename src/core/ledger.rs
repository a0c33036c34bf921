//! Group balance ledger.
//!
//! The ledger stores each member's net position per currency and is
//! maintained incrementally: a created transaction is applied, a deleted one
//! reverted, an edited one reverted and then re-applied. Pairwise "who owes
//! whom" rows are derived on read by running the settlement resolver over the
//! positions of each currency independently.

use crate::core::errors::SplitError;
use crate::core::models::balance::{GroupBalance, NetPosition, PositionMismatch};
use crate::core::models::transaction::Transaction;
use crate::core::money::Currency;
use crate::core::settlement::settle;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// Row-level change needed to bring persisted positions in line with a
/// ledger held in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PositionChange {
    Upsert(NetPosition),
    Remove { user_id: String, currency: Currency },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupLedger {
    group_id: String,
    positions: BTreeMap<(Currency, String), Decimal>,
}

impl GroupLedger {
    pub fn new(group_id: &str) -> Self {
        GroupLedger {
            group_id: group_id.to_string(),
            positions: BTreeMap::new(),
        }
    }

    pub fn from_positions<I>(group_id: &str, positions: I) -> Result<Self, SplitError>
    where
        I: IntoIterator<Item = NetPosition>,
    {
        let mut ledger = GroupLedger::new(group_id);
        for position in positions {
            ledger.add(&position.user_id, &position.currency, position.balance)?;
        }
        Ok(ledger)
    }

    /// Rebuilds the ledger from scratch out of the group's live transactions.
    pub fn recompute<'a, I>(group_id: &str, transactions: I) -> Result<Self, SplitError>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut ledger = GroupLedger::new(group_id);
        for transaction in transactions {
            ledger.apply(transaction)?;
        }
        Ok(ledger)
    }

    pub fn apply(&mut self, transaction: &Transaction) -> Result<(), SplitError> {
        for balance in &transaction.balances {
            self.add(&balance.user_id, &transaction.currency, balance.amount)?;
        }
        Ok(())
    }

    pub fn revert(&mut self, transaction: &Transaction) -> Result<(), SplitError> {
        for balance in &transaction.balances {
            self.add(&balance.user_id, &transaction.currency, -balance.amount)?;
        }
        Ok(())
    }

    fn add(&mut self, user_id: &str, currency: &Currency, delta: Decimal) -> Result<(), SplitError> {
        if delta.is_zero() {
            return Ok(());
        }
        let key = (currency.clone(), user_id.to_string());
        let updated = self
            .positions
            .get(&key)
            .copied()
            .unwrap_or_default()
            .checked_add(delta)
            .ok_or_else(|| {
                SplitError::invalid_input(
                    "amount",
                    "Amount Too Large",
                    format!("Net position of {} in {} would leave the supported range", user_id, currency),
                )
            })?;
        if updated.is_zero() {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, updated);
        }
        Ok(())
    }

    /// Changes that turn `before` into `self`.
    pub fn diff(&self, before: &GroupLedger) -> Vec<PositionChange> {
        let mut changes = Vec::new();
        for ((currency, user_id), balance) in &self.positions {
            if before.positions.get(&(currency.clone(), user_id.clone())) != Some(balance) {
                changes.push(PositionChange::Upsert(NetPosition {
                    group_id: self.group_id.clone(),
                    user_id: user_id.clone(),
                    currency: currency.clone(),
                    balance: *balance,
                }));
            }
        }
        for (currency, user_id) in before.positions.keys() {
            if !self.positions.contains_key(&(currency.clone(), user_id.clone())) {
                changes.push(PositionChange::Remove {
                    user_id: user_id.clone(),
                    currency: currency.clone(),
                });
            }
        }
        changes
    }

    /// Positions where `self` disagrees with `expected`.
    pub fn mismatches(&self, expected: &GroupLedger) -> Vec<PositionMismatch> {
        let keys: BTreeSet<&(Currency, String)> = self.positions.keys().chain(expected.positions.keys()).collect();
        keys.into_iter()
            .filter_map(|key| {
                let stored = self.positions.get(key).copied().unwrap_or_default();
                let wanted = expected.positions.get(key).copied().unwrap_or_default();
                (stored != wanted).then(|| PositionMismatch {
                    user_id: key.1.clone(),
                    currency: key.0.clone(),
                    stored,
                    expected: wanted,
                })
            })
            .collect()
    }

    /// Pairwise balances, one direction per pair and currency, no zero rows.
    /// Ordered by currency, then creditor, then debtor.
    pub fn pairwise_balances(&self) -> Result<Vec<GroupBalance>, SplitError> {
        let mut by_currency: BTreeMap<&Currency, Vec<(&str, Decimal)>> = BTreeMap::new();
        for ((currency, user_id), balance) in &self.positions {
            by_currency
                .entry(currency)
                .or_default()
                .push((user_id.as_str(), *balance));
        }

        let mut balances = Vec::new();
        for (currency, entries) in by_currency {
            for settlement in settle(entries)? {
                balances.push(GroupBalance {
                    group_id: self.group_id.clone(),
                    user_id: settlement.creditor_id,
                    friend_user_id: settlement.debtor_id,
                    currency: currency.clone(),
                    balance: settlement.amount,
                });
            }
        }
        balances.sort_by(|a, b| {
            a.currency
                .cmp(&b.currency)
                .then_with(|| a.user_id.cmp(&b.user_id))
                .then_with(|| a.friend_user_id.cmp(&b.friend_user_id))
        });
        Ok(balances)
    }
}
