use super::{build_test_service, create_test_service, equal_split, explicit_split, setup_group, usd};
use crate::core::ledger::{GroupLedger, PositionChange};
use crate::core::models::balance::{GroupBalance, NetPosition};
use crate::core::money::Currency;
use crate::infrastructure::receipts::in_memory::InMemoryReceiptStore;
use crate::infrastructure::storage::{Storage, in_memory::InMemoryStorage};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;

fn rows(balances: &[GroupBalance]) -> Vec<(String, String, String, Decimal)> {
    balances
        .iter()
        .map(|b| {
            (
                b.currency.to_string(),
                b.user_id.clone(),
                b.friend_user_id.clone(),
                b.balance,
            )
        })
        .collect()
}

fn row(currency: &str, creditor: &str, debtor: &str, amount: Decimal) -> (String, String, String, Decimal) {
    (currency.to_string(), creditor.to_string(), debtor.to_string(), amount)
}

#[tokio::test]
async fn test_single_payer_equal_split() {
    let service = create_test_service();
    let (group, users) = setup_group(&service, &["alice", "bob", "carol"]).await;

    let t1 = service
        .create_transaction(equal_split(&group.id, dec!(30), "alice", &["alice", "bob", "carol"]), &users[0])
        .await
        .unwrap();
    assert_eq!(t1.balance_of("alice"), dec!(20));
    assert_eq!(t1.balance_of("bob"), dec!(-10));
    assert_eq!(t1.balance_of("carol"), dec!(-10));
    assert_eq!(t1.balance_sum(), Decimal::ZERO);

    let balances = service.get_group_balances(&group.id, &users[1]).await.unwrap();
    assert_eq!(
        rows(&balances),
        vec![row("USD", "alice", "bob", dec!(10)), row("USD", "alice", "carol", dec!(10))]
    );
}

#[tokio::test]
async fn test_second_transaction_nets_against_first() {
    let service = create_test_service();
    let (group, users) = setup_group(&service, &["alice", "bob", "carol"]).await;

    service
        .create_transaction(equal_split(&group.id, dec!(30), "alice", &["alice", "bob", "carol"]), &users[0])
        .await
        .unwrap();
    service
        .create_transaction(
            explicit_split(&group.id, usd(), &[("bob", dec!(7.5)), ("carol", dec!(-7.5))]),
            &users[1],
        )
        .await
        .unwrap();

    let balances = service.get_group_balances(&group.id, &users[0]).await.unwrap();
    assert_eq!(
        rows(&balances),
        vec![row("USD", "alice", "bob", dec!(2.5)), row("USD", "alice", "carol", dec!(17.5))]
    );
}

#[tokio::test]
async fn test_delete_leaves_only_remaining_transaction() {
    let service = create_test_service();
    let (group, users) = setup_group(&service, &["alice", "bob", "carol"]).await;

    let t1 = service
        .create_transaction(equal_split(&group.id, dec!(30), "alice", &["alice", "bob", "carol"]), &users[0])
        .await
        .unwrap();
    service
        .create_transaction(
            explicit_split(&group.id, usd(), &[("bob", dec!(7.5)), ("carol", dec!(-7.5))]),
            &users[1],
        )
        .await
        .unwrap();
    service.delete_transaction(&t1.id, &users[2]).await.unwrap();

    let balances = service.get_group_balances(&group.id, &users[0]).await.unwrap();
    assert_eq!(rows(&balances), vec![row("USD", "bob", "carol", dec!(7.5))]);
}

#[tokio::test]
async fn test_currency_change_on_edit_splits_ledgers() {
    let service = create_test_service();
    let (group, users) = setup_group(&service, &["alice", "bob", "carol"]).await;

    service
        .create_transaction(equal_split(&group.id, dec!(30), "alice", &["alice", "bob", "carol"]), &users[0])
        .await
        .unwrap();
    let t2 = service
        .create_transaction(
            explicit_split(&group.id, usd(), &[("bob", dec!(7.5)), ("carol", dec!(-7.5))]),
            &users[1],
        )
        .await
        .unwrap();

    let eur = Currency::new("EUR").unwrap();
    let edited = service
        .edit_transaction(
            &t2.id,
            explicit_split(&group.id, eur, &[("bob", dec!(7.5)), ("carol", dec!(-7.5))]),
            Some(t2.version),
            &users[1],
        )
        .await
        .unwrap();
    assert_eq!(edited.version, 2);

    let balances = service.get_group_balances(&group.id, &users[0]).await.unwrap();
    assert_eq!(
        rows(&balances),
        vec![
            row("EUR", "bob", "carol", dec!(7.5)),
            row("USD", "alice", "bob", dec!(10)),
            row("USD", "alice", "carol", dec!(10)),
        ]
    );
    assert!(service.verify_group_ledger(&group.id, &users[0]).await.unwrap().consistent);
}

#[tokio::test]
async fn test_maintained_ledger_matches_recompute_after_mixed_history() {
    let service = create_test_service();
    let (group, users) = setup_group(&service, &["alice", "bob", "carol", "dave"]).await;
    let everyone = ["alice", "bob", "carol", "dave"];

    let mut created = Vec::new();
    for (i, payer) in everyone.iter().enumerate() {
        let amount = Decimal::new(1000 + 337 * i as i64, 2);
        created.push(
            service
                .create_transaction(equal_split(&group.id, amount, payer, &everyone), &users[i])
                .await
                .unwrap(),
        );
    }
    service
        .edit_transaction(
            &created[1].id,
            equal_split(&group.id, dec!(99.99), "carol", &["alice", "carol"]),
            None,
            &users[2],
        )
        .await
        .unwrap();
    service.delete_transaction(&created[2].id, &users[3]).await.unwrap();
    service
        .create_transaction(
            explicit_split(
                &group.id,
                Currency::new("JPY").unwrap(),
                &[("dave", dec!(500)), ("alice", dec!(-250)), ("bob", dec!(-250))],
            ),
            &users[3],
        )
        .await
        .unwrap();

    let report = service.verify_group_ledger(&group.id, &users[0]).await.unwrap();
    assert!(report.consistent);
    assert!(report.mismatches.is_empty());

    // pairwise view equals the one derived from the surviving transactions
    let remaining = service.list_transactions(&group.id, &users[0]).await.unwrap();
    assert_eq!(remaining.len(), 4);
    let expected = GroupLedger::recompute(&group.id, &remaining)
        .unwrap()
        .pairwise_balances()
        .unwrap();
    let actual = service.get_group_balances(&group.id, &users[0]).await.unwrap();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_pairwise_rows_are_one_directional_and_positive() {
    let service = create_test_service();
    let (group, users) = setup_group(&service, &["alice", "bob", "carol"]).await;

    service
        .create_transaction(explicit_split(&group.id, usd(), &[("alice", dec!(10)), ("bob", dec!(-10))]), &users[0])
        .await
        .unwrap();
    service
        .create_transaction(explicit_split(&group.id, usd(), &[("bob", dec!(4)), ("alice", dec!(-4))]), &users[1])
        .await
        .unwrap();
    service
        .create_transaction(explicit_split(&group.id, usd(), &[("carol", dec!(3)), ("bob", dec!(-3))]), &users[2])
        .await
        .unwrap();

    let balances = service.get_group_balances(&group.id, &users[0]).await.unwrap();
    let mut pairs = HashSet::new();
    for balance in &balances {
        assert!(balance.balance > Decimal::ZERO);
        assert_ne!(balance.user_id, balance.friend_user_id);
        assert!(!pairs.contains(&(balance.friend_user_id.clone(), balance.user_id.clone())));
        pairs.insert((balance.user_id.clone(), balance.friend_user_id.clone()));
    }
    // alice +6, bob -9, carol +3
    assert_eq!(
        rows(&balances),
        vec![row("USD", "alice", "bob", dec!(6)), row("USD", "carol", "bob", dec!(3))]
    );
}

#[tokio::test]
async fn test_deleting_everything_empties_the_ledger() {
    let storage = InMemoryStorage::new();
    let service = build_test_service(storage.clone(), InMemoryReceiptStore::new());
    let (group, users) = setup_group(&service, &["alice", "bob"]).await;

    let t1 = service
        .create_transaction(equal_split(&group.id, dec!(12.34), "alice", &["alice", "bob"]), &users[0])
        .await
        .unwrap();
    let t2 = service
        .create_transaction(equal_split(&group.id, dec!(5), "bob", &["alice", "bob"]), &users[1])
        .await
        .unwrap();
    service.delete_transaction(&t2.id, &users[0]).await.unwrap();
    service.delete_transaction(&t1.id, &users[0]).await.unwrap();

    assert!(storage.get_net_positions(&group.id).await.unwrap().is_empty());
    assert!(service.get_group_balances(&group.id, &users[0]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_verify_reports_tampered_positions() {
    let storage = InMemoryStorage::new();
    let service = build_test_service(storage.clone(), InMemoryReceiptStore::new());
    let (group, users) = setup_group(&service, &["alice", "bob"]).await;
    service
        .create_transaction(explicit_split(&group.id, usd(), &[("alice", dec!(10)), ("bob", dec!(-10))]), &users[0])
        .await
        .unwrap();

    let mut uow = storage.begin(&group.id).await.unwrap();
    uow.update_positions(vec![PositionChange::Upsert(NetPosition {
        group_id: group.id.clone(),
        user_id: "alice".to_string(),
        currency: usd(),
        balance: dec!(11),
    })]);
    uow.commit().await.unwrap();

    let report = service.verify_group_ledger(&group.id, &users[1]).await.unwrap();
    assert!(!report.consistent);
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].user_id, "alice");
    assert_eq!(report.mismatches[0].stored, dec!(11));
    assert_eq!(report.mismatches[0].expected, dec!(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_keep_ledger_consistent() {
    let service = Arc::new(create_test_service());
    let (group, users) = setup_group(&service, &["alice", "bob", "carol"]).await;

    let mut handles = Vec::new();
    for i in 0..24 {
        let service = service.clone();
        let group_id = group.id.clone();
        let user = users[i % 3].clone();
        handles.push(tokio::spawn(async move {
            let payer = user.id.clone();
            service
                .create_transaction(
                    equal_split(&group_id, dec!(3), &payer, &["alice", "bob", "carol"]),
                    &user,
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let details = service.get_group(&group.id, &users[0]).await.unwrap();
    assert_eq!(details.transaction_count, 24);
    // every member paid for every other member equally often
    assert!(details.balances.is_empty());
    assert!(service.verify_group_ledger(&group.id, &users[0]).await.unwrap().consistent);
}
