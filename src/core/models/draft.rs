use super::transaction::Tag;
use crate::core::money::Currency;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DraftBalance {
    pub user_id: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

/// A partially filled transaction kept private to its author. Drafts are
/// never part of a group's ledger.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionDraft {
    pub id: String,
    pub user_id: String,
    pub group_id: Option<String>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub create_time: DateTime<Utc>,
    pub transaction_time: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    pub tags: Vec<Tag>,
    pub geo_coordinate: Option<String>,
    pub photo: Option<String>,
    pub balances: Vec<DraftBalance>,
}
