mod account_tests;
mod draft_tests;
mod ledger_tests;

use crate::core::models::{group::Group, user::User};
use crate::core::money::Currency;
use crate::core::services::{RegisterInput, SplitService, TransactionInput};
use crate::core::split::{BalanceEntry, SplitSpec};
use crate::infrastructure::cache::in_memory::InMemoryCache;
use crate::infrastructure::receipts::in_memory::InMemoryReceiptStore;
use crate::infrastructure::storage::in_memory::InMemoryStorage;
use rust_decimal::Decimal;

pub type TestService = SplitService<InMemoryStorage, InMemoryCache, InMemoryReceiptStore>;

pub fn create_test_service() -> TestService {
    build_test_service(InMemoryStorage::new(), InMemoryReceiptStore::new())
}

/// Service over handles the test keeps, to inspect or interfere with them.
pub fn build_test_service(storage: InMemoryStorage, receipts: InMemoryReceiptStore) -> TestService {
    SplitService::new(storage, InMemoryCache::new(), receipts, "test-secret".to_string()).with_bcrypt_cost(4)
}

pub async fn register_user(service: &TestService, id: &str) -> User {
    service
        .register(RegisterInput {
            id: Some(id.to_string()),
            username: id.to_string(),
            email: format!("{}@example.com", id),
            password: "password".to_string(),
            photo: None,
        })
        .await
        .unwrap()
}

/// Registers `ids` and puts them in one group created by the first.
pub async fn setup_group(service: &TestService, ids: &[&str]) -> (Group, Vec<User>) {
    let mut users = Vec::new();
    for id in ids {
        users.push(register_user(service, id).await);
    }
    let (group, _) = service
        .create_group(
            "Trip".to_string(),
            None,
            ids[1..].iter().map(|id| id.to_string()).collect(),
            &users[0],
        )
        .await
        .unwrap();
    (group, users)
}

pub fn usd() -> Currency {
    Currency::new("USD").unwrap()
}

pub fn equal_split(group_id: &str, amount: Decimal, payer: &str, participants: &[&str]) -> TransactionInput {
    transaction_input(
        group_id,
        amount,
        usd(),
        SplitSpec::Equal {
            payer_id: payer.to_string(),
            participant_ids: participants.iter().map(|p| p.to_string()).collect(),
        },
    )
}

/// Explicit signed balances; the total is the sum of the positive entries.
pub fn explicit_split(group_id: &str, currency: Currency, entries: &[(&str, Decimal)]) -> TransactionInput {
    let amount = entries.iter().map(|(_, a)| *a).filter(|a| *a > Decimal::ZERO).sum();
    transaction_input(
        group_id,
        amount,
        currency,
        SplitSpec::Balances {
            entries: entries
                .iter()
                .map(|(user_id, amount)| BalanceEntry {
                    user_id: user_id.to_string(),
                    amount: *amount,
                })
                .collect(),
        },
    )
}

pub fn transaction_input(group_id: &str, amount: Decimal, currency: Currency, split: SplitSpec) -> TransactionInput {
    TransactionInput {
        group_id: group_id.to_string(),
        name: "Dinner".to_string(),
        icon: None,
        amount,
        currency,
        transaction_time: None,
        tags: vec![],
        geo_coordinate: None,
        photo: None,
        split,
    }
}
