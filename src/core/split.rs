//! Builds per-participant transaction balances from a split description and
//! enforces the zero-sum rule.

use crate::core::errors::SplitError;
use crate::core::models::transaction::TransactionBalance;
use crate::core::money::{checked_sum, split_evenly, validate_entry, validate_total};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BalanceEntry {
    pub user_id: String,
    #[schema(value_type = String, example = "-10.00")]
    pub amount: Decimal,
}

/// How a transaction total is attributed to group members.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SplitSpec {
    /// Signed entries supplied by the caller. The positive entries must add
    /// up to the transaction amount.
    Balances { entries: Vec<BalanceEntry> },
    /// `payer_id` paid the total, shared equally among `participant_ids`.
    Equal {
        payer_id: String,
        participant_ids: Vec<String>,
    },
    /// `payer_id` paid the total; `shares` lists what each user consumed.
    Exact {
        payer_id: String,
        shares: BTreeMap<String, Decimal>,
    },
}

impl SplitSpec {
    /// Every user the split mentions, payer included.
    pub fn user_ids(&self) -> BTreeSet<&str> {
        match self {
            SplitSpec::Balances { entries } => entries.iter().map(|e| e.user_id.as_str()).collect(),
            SplitSpec::Equal {
                payer_id,
                participant_ids,
            } => participant_ids
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(payer_id.as_str()))
                .collect(),
            SplitSpec::Exact { payer_id, shares } => shares
                .keys()
                .map(String::as_str)
                .chain(std::iter::once(payer_id.as_str()))
                .collect(),
        }
    }
}

/// Produces the zero-sum balances of a transaction.
///
/// Equal splits truncate each share to minor units. The leftover cents are
/// added to the payer's own share when the payer participates, otherwise to
/// the first participant by id, so the entries always sum to exactly zero.
pub fn build_balances(
    transaction_id: &str,
    amount: Decimal,
    split: &SplitSpec,
    members: &BTreeSet<String>,
) -> Result<Vec<TransactionBalance>, SplitError> {
    ensure_members(split.user_ids(), members)?;
    validate_total("amount", amount)?;

    let entries: Vec<(String, Decimal)> = match split {
        SplitSpec::Balances { entries } => {
            let mut seen = HashSet::new();
            for entry in entries {
                if !seen.insert(entry.user_id.as_str()) {
                    return Err(SplitError::invalid_input(
                        "balances",
                        "Duplicate User",
                        format!("User {} appears more than once", entry.user_id),
                    ));
                }
                validate_entry("balances", entry.amount)?;
            }
            let credited = checked_sum(
                "balances",
                entries.iter().map(|e| e.amount).filter(|a| *a > Decimal::ZERO),
            )?;
            if credited != amount {
                return Err(SplitError::invalid_input(
                    "amount",
                    "Amount Mismatch",
                    format!("Positive balances add up to {} but the amount is {}", credited, amount),
                ));
            }
            entries.iter().map(|e| (e.user_id.clone(), e.amount)).collect()
        }
        SplitSpec::Equal {
            payer_id,
            participant_ids,
        } => {
            let participants: BTreeSet<&String> = participant_ids.iter().collect();
            if participants.len() != participant_ids.len() {
                return Err(SplitError::invalid_input(
                    "participant_ids",
                    "Duplicate User",
                    "Participants must be distinct",
                ));
            }
            let first = participants.iter().next().ok_or_else(|| {
                SplitError::invalid_input(
                    "participant_ids",
                    "Missing Participants",
                    "At least one participant is required",
                )
            })?;
            let (share, remainder) = split_evenly(amount, participants.len());
            let absorber = if participants.contains(payer_id) { payer_id } else { *first };

            let mut net: BTreeMap<String, Decimal> = BTreeMap::new();
            *net.entry(payer_id.clone()).or_default() += amount;
            for participant in &participants {
                let owed = if *participant == absorber { share + remainder } else { share };
                *net.entry((*participant).clone()).or_default() -= owed;
            }
            net.into_iter().collect()
        }
        SplitSpec::Exact { payer_id, shares } => {
            if shares.is_empty() {
                return Err(SplitError::invalid_input(
                    "shares",
                    "Missing Shares",
                    "At least one share is required",
                ));
            }
            for (user_id, share) in shares {
                if *share < Decimal::ZERO {
                    return Err(SplitError::invalid_input(
                        "shares",
                        "Invalid Share",
                        format!("Share of {} cannot be negative", user_id),
                    ));
                }
                validate_entry("shares", *share)?;
            }
            let total = checked_sum("shares", shares.values().copied())?;
            if total != amount {
                return Err(SplitError::UnbalancedTransaction(amount - total));
            }
            let mut net: BTreeMap<String, Decimal> = BTreeMap::new();
            *net.entry(payer_id.clone()).or_default() += amount;
            for (user_id, share) in shares {
                *net.entry(user_id.clone()).or_default() -= *share;
            }
            net.into_iter().collect()
        }
    };

    let balances: Vec<TransactionBalance> = entries
        .into_iter()
        .map(|(user_id, amount)| TransactionBalance {
            transaction_id: transaction_id.to_string(),
            user_id,
            amount,
        })
        .collect();
    validate_zero_sum(&balances)?;
    Ok(balances)
}

/// Checks precision, non-emptiness and the zero-sum rule.
pub fn validate_zero_sum(balances: &[TransactionBalance]) -> Result<(), SplitError> {
    if balances.is_empty() {
        return Err(SplitError::invalid_input(
            "balances",
            "Missing Balances",
            "A transaction needs at least one balance entry",
        ));
    }
    for balance in balances {
        validate_entry("balances", balance.amount)?;
    }
    let sum = checked_sum("balances", balances.iter().map(|b| b.amount))?;
    if !sum.is_zero() {
        return Err(SplitError::UnbalancedTransaction(sum));
    }
    Ok(())
}

/// Rejects any user id that is not in `members`.
pub fn ensure_members<'a, I>(user_ids: I, members: &BTreeSet<String>) -> Result<(), SplitError>
where
    I: IntoIterator<Item = &'a str>,
{
    for user_id in user_ids {
        if !members.contains(user_id) {
            return Err(SplitError::InvalidSplitUser(user_id.to_string()));
        }
    }
    Ok(())
}
