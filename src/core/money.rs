use crate::core::errors::SplitError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Number of decimal places amounts may carry.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// Upper bound for a single transaction total.
pub const MAX_TRANSACTION_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// ISO 4217 style currency code: exactly three ASCII uppercase letters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "USD")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, SplitError> {
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Currency(code.to_string()))
        } else {
            Err(SplitError::InvalidCurrency(code.to_string()))
        }
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl FromStr for Currency {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::new(s)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Currency::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// Rejects amounts carrying more precision than the minor unit.
pub fn validate_scale(field: &str, amount: Decimal) -> Result<(), SplitError> {
    if amount.normalize().scale() > MINOR_UNIT_SCALE {
        return Err(SplitError::invalid_input(
            field,
            "Invalid Amount",
            format!("Amount cannot have more than {} decimal places", MINOR_UNIT_SCALE),
        ));
    }
    Ok(())
}

/// Validates a transaction total: positive, bounded, minor-unit precision.
pub fn validate_total(field: &str, amount: Decimal) -> Result<(), SplitError> {
    if amount <= Decimal::ZERO {
        return Err(SplitError::invalid_input(
            field,
            "Invalid Amount",
            "Amount must be greater than 0",
        ));
    }
    if amount > MAX_TRANSACTION_AMOUNT {
        return Err(SplitError::invalid_input(
            field,
            "Amount Too Large",
            format!("Amount cannot exceed {}", MAX_TRANSACTION_AMOUNT),
        ));
    }
    validate_scale(field, amount)
}

/// Validates one signed per-user amount: minor-unit precision and a
/// magnitude no larger than the largest transaction total.
pub fn validate_entry(field: &str, amount: Decimal) -> Result<(), SplitError> {
    if amount.abs() > MAX_TRANSACTION_AMOUNT {
        return Err(SplitError::invalid_input(
            field,
            "Amount Too Large",
            format!("Amount cannot exceed {} in either direction", MAX_TRANSACTION_AMOUNT),
        ));
    }
    validate_scale(field, amount)
}

/// Sums `amounts`, reporting overflow as invalid input on `field`.
pub fn checked_sum<I>(field: &str, amounts: I) -> Result<Decimal, SplitError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |total, amount| {
        total.checked_add(amount).ok_or_else(|| {
            SplitError::invalid_input(field, "Amount Too Large", "Sum of amounts is out of range")
        })
    })
}

/// Splits `total` into `parts` shares truncated to minor units. The shares
/// returned sum to `total` minus the remainder, which is returned separately.
pub fn split_evenly(total: Decimal, parts: usize) -> (Decimal, Decimal) {
    if parts == 0 {
        return (Decimal::ZERO, total);
    }
    let count = Decimal::from(parts as u64);
    let share = (total / count).round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::ToZero);
    let remainder = total - share * count;
    (share, remainder)
}
