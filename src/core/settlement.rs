//! Net settlement resolver.
//!
//! Turns signed per-user amounts (positive = owed money, negative = owes
//! money) into directed debtor -> creditor instructions using a greedy
//! two-cursor match. Input must be zero-sum; anything left unmatched is
//! reported as an invariant violation.

use crate::core::errors::SplitError;
use crate::core::models::settlement::Settlement;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::error;

/// Resolves `entries` into settlements. Entries for the same user are merged
/// first; zero entries are ignored.
///
/// Creditors and debtors are each sorted by descending magnitude, ties broken
/// by user id, so the output is deterministic for a given multiset of input.
pub fn settle<'a, I>(entries: I) -> Result<Vec<Settlement>, SplitError>
where
    I: IntoIterator<Item = (&'a str, Decimal)>,
{
    let mut net: BTreeMap<&'a str, Decimal> = BTreeMap::new();
    for (user_id, amount) in entries {
        let position = net.entry(user_id).or_default();
        *position = position
            .checked_add(amount)
            .ok_or_else(|| SplitError::InvariantViolation(format!("net position of {} is out of range", user_id)))?;
    }

    let mut creditors: Vec<(&str, Decimal)> = Vec::new();
    let mut debtors: Vec<(&str, Decimal)> = Vec::new();
    for (user_id, amount) in net {
        if amount > Decimal::ZERO {
            creditors.push((user_id, amount));
        } else if amount < Decimal::ZERO {
            debtors.push((user_id, -amount));
        }
    }
    let by_magnitude = |a: &(&str, Decimal), b: &(&str, Decimal)| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0));
    creditors.sort_by(by_magnitude);
    debtors.sort_by(by_magnitude);

    let mut settlements = Vec::with_capacity(creditors.len().max(debtors.len()));
    let (mut c, mut d) = (0, 0);
    while c < creditors.len() && d < debtors.len() {
        let amount = creditors[c].1.min(debtors[d].1);
        if creditors[c].0 != debtors[d].0 {
            settlements.push(Settlement {
                debtor_id: debtors[d].0.to_string(),
                creditor_id: creditors[c].0.to_string(),
                amount,
            });
        }
        creditors[c].1 -= amount;
        debtors[d].1 -= amount;
        if creditors[c].1.is_zero() {
            c += 1;
        }
        if debtors[d].1.is_zero() {
            d += 1;
        }
    }

    let unmatched_credit = unmatched(&creditors[c..])?;
    let unmatched_debit = unmatched(&debtors[d..])?;
    if !unmatched_credit.is_zero() || !unmatched_debit.is_zero() {
        error!(
            %unmatched_credit,
            %unmatched_debit,
            "settlement input was not zero-sum"
        );
        return Err(SplitError::InvariantViolation(format!(
            "unmatched credit {} and debit {} after settlement",
            unmatched_credit, unmatched_debit
        )));
    }

    Ok(settlements)
}

fn unmatched(rest: &[(&str, Decimal)]) -> Result<Decimal, SplitError> {
    rest.iter().try_fold(Decimal::ZERO, |total, (_, amount)| {
        total
            .checked_add(*amount)
            .ok_or_else(|| SplitError::InvariantViolation("unmatched remainder is out of range".to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn run(entries: &[(&str, Decimal)]) -> Result<Vec<Settlement>, SplitError> {
        settle(entries.iter().map(|(u, a)| (*u, *a)))
    }

    #[test]
    fn test_single_payer_split_three_ways() {
        let result = run(&[("alice", dec!(20)), ("bob", dec!(-10)), ("carol", dec!(-10))]).unwrap();
        assert_eq!(
            result,
            vec![
                Settlement {
                    debtor_id: "bob".to_string(),
                    creditor_id: "alice".to_string(),
                    amount: dec!(10),
                },
                Settlement {
                    debtor_id: "carol".to_string(),
                    creditor_id: "alice".to_string(),
                    amount: dec!(10),
                },
            ]
        );
    }

    #[test]
    fn test_largest_amounts_are_matched_first() {
        let result = run(&[
            ("alice", dec!(20)),
            ("bob", dec!(-2.5)),
            ("carol", dec!(-17.5)),
        ])
        .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].debtor_id, "carol");
        assert_eq!(result[0].amount, dec!(17.5));
        assert_eq!(result[1].debtor_id, "bob");
        assert_eq!(result[1].amount, dec!(2.5));
    }

    #[test]
    fn test_duplicate_entries_are_merged() {
        let result = run(&[("alice", dec!(5)), ("alice", dec!(-5)), ("bob", dec!(3)), ("carol", dec!(-3))]).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].debtor_id, "carol");
        assert_eq!(result[0].creditor_id, "bob");
    }

    #[test]
    fn test_empty_and_all_zero_input() {
        assert!(run(&[]).unwrap().is_empty());
        assert!(run(&[("alice", dec!(0)), ("bob", dec!(0))]).unwrap().is_empty());
    }

    #[test]
    fn test_unbalanced_input_is_invariant_violation() {
        let err = run(&[("alice", dec!(20)), ("bob", dec!(-10))]).unwrap_err();
        assert!(matches!(err, SplitError::InvariantViolation(_)));

        let err = run(&[("alice", dec!(-1))]).unwrap_err();
        assert!(matches!(err, SplitError::InvariantViolation(_)));
    }

    #[test]
    fn test_out_of_range_input_is_invariant_violation() {
        let err = run(&[("alice", Decimal::MAX), ("alice", Decimal::MAX), ("bob", -Decimal::MAX)]).unwrap_err();
        assert!(matches!(err, SplitError::InvariantViolation(_)));

        // two unmatched creditors whose remainders cannot be added up
        let err = run(&[("alice", Decimal::MAX), ("bob", Decimal::MAX), ("carol", dec!(-1))]).unwrap_err();
        assert!(matches!(err, SplitError::InvariantViolation(_)));
    }

    proptest! {
        #[test]
        fn prop_settlements_reproduce_net_positions(
            raw in prop::collection::vec((0usize..6, -100_000i64..100_000), 1..24)
        ) {
            let mut entries: Vec<(String, Decimal)> = raw
                .iter()
                .map(|(user, cents)| (format!("user{}", user), Decimal::new(*cents, 2)))
                .collect();
            let total: Decimal = entries.iter().map(|(_, a)| *a).sum();
            entries.push(("user0".to_string(), -total));

            let result = settle(entries.iter().map(|(u, a)| (u.as_str(), *a))).unwrap();

            let mut expected: BTreeMap<String, Decimal> = BTreeMap::new();
            for (user, amount) in &entries {
                *expected.entry(user.clone()).or_default() += *amount;
            }
            expected.retain(|_, amount| !amount.is_zero());

            let mut actual: BTreeMap<String, Decimal> = BTreeMap::new();
            for s in &result {
                prop_assert!(s.amount > Decimal::ZERO);
                prop_assert_ne!(&s.debtor_id, &s.creditor_id);
                *actual.entry(s.creditor_id.clone()).or_default() += s.amount;
                *actual.entry(s.debtor_id.clone()).or_default() -= s.amount;
            }
            actual.retain(|_, amount| !amount.is_zero());

            prop_assert_eq!(&actual, &expected);
            prop_assert!(result.len() <= expected.len().saturating_sub(1));
        }
    }
}
