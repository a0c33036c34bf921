use crate::core::money::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Persisted ledger row: a user's net position in one group and currency.
/// Zero positions are never stored.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct NetPosition {
    pub group_id: String,
    pub user_id: String,
    pub currency: Currency,
    #[schema(value_type = String)]
    pub balance: Decimal,
}

/// Pairwise view: `friend_user_id` owes `user_id` the (positive) `balance`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct GroupBalance {
    pub group_id: String,
    pub user_id: String,
    pub friend_user_id: String,
    pub currency: Currency,
    #[schema(value_type = String, example = "17.50")]
    pub balance: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PositionMismatch {
    pub user_id: String,
    pub currency: Currency,
    #[schema(value_type = String)]
    pub stored: Decimal,
    #[schema(value_type = String)]
    pub expected: Decimal,
}

/// Result of comparing the maintained ledger against a full recompute.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LedgerReport {
    pub group_id: String,
    pub consistent: bool,
    pub mismatches: Vec<PositionMismatch>,
}
