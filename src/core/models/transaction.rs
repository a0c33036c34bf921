use crate::core::money::Currency;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
}

/// One participant's signed position on a transaction: positive means the
/// others owe this user, negative means this user owes.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TransactionBalance {
    pub transaction_id: String,
    pub user_id: String,
    #[schema(value_type = String, example = "-10.00")]
    pub amount: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub icon: Option<String>,
    #[schema(value_type = String, example = "30.00")]
    pub amount: Decimal,
    pub currency: Currency,
    pub create_time: DateTime<Utc>,
    pub transaction_time: DateTime<Utc>,
    pub tags: Vec<Tag>,
    pub geo_coordinate: Option<String>,
    pub photo: Option<String>,
    pub balances: Vec<TransactionBalance>,
    /// Optimistic concurrency token, bumped on every edit.
    pub version: u64,
}

impl Transaction {
    pub fn balance_sum(&self) -> Decimal {
        self.balances.iter().map(|b| b.amount).sum()
    }

    pub fn balance_of(&self, user_id: &str) -> Decimal {
        self.balances
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.amount)
            .sum()
    }
}
