use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Directed payment instruction produced by the settlement resolver.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Settlement {
    pub debtor_id: String,
    pub creditor_id: String,
    #[schema(value_type = String)]
    pub amount: Decimal,
}
