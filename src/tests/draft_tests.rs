use super::{create_test_service, register_user, setup_group, usd};
use crate::core::errors::SplitError;
use crate::core::models::draft::DraftBalance;
use crate::core::services::DraftInput;
use rust_decimal_macros::dec;
use std::time::Duration;

fn draft_balances(entries: &[(&str, rust_decimal::Decimal)]) -> Vec<DraftBalance> {
    entries
        .iter()
        .map(|(user_id, amount)| DraftBalance {
            user_id: user_id.to_string(),
            amount: *amount,
        })
        .collect()
}

#[tokio::test]
async fn test_draft_crud() {
    let service = create_test_service();
    let alice = register_user(&service, "alice").await;

    let draft = service
        .create_draft(
            DraftInput {
                name: Some("Groceries".to_string()),
                ..Default::default()
            },
            &alice,
        )
        .await
        .unwrap();
    assert_eq!(draft.user_id, "alice");
    assert!(draft.group_id.is_none());

    let loaded = service.get_draft(&draft.id, &alice).await.unwrap();
    assert_eq!(loaded.name.as_deref(), Some("Groceries"));

    tokio::time::sleep(Duration::from_millis(5)).await;
    let updated = service
        .update_draft(
            &draft.id,
            DraftInput {
                name: Some("Groceries and wine".to_string()),
                amount: Some(dec!(42.10)),
                currency: Some(usd()),
                ..Default::default()
            },
            &alice,
        )
        .await
        .unwrap();
    assert_eq!(updated.id, draft.id);
    assert_eq!(updated.create_time, draft.create_time);
    assert_eq!(updated.amount, Some(dec!(42.10)));

    service.delete_draft(&draft.id, &alice).await.unwrap();
    let result = service.get_draft(&draft.id, &alice).await;
    assert!(matches!(result, Err(SplitError::DraftNotFound(_))));
    let result = service.delete_draft(&draft.id, &alice).await;
    assert!(matches!(result, Err(SplitError::DraftNotFound(_))));
}

#[tokio::test]
async fn test_drafts_are_private() {
    let service = create_test_service();
    let alice = register_user(&service, "alice").await;
    let bob = register_user(&service, "bob").await;

    let draft = service.create_draft(DraftInput::default(), &alice).await.unwrap();

    let result = service.get_draft(&draft.id, &bob).await;
    assert!(matches!(result, Err(SplitError::Unauthorized(_))));
    let result = service.update_draft(&draft.id, DraftInput::default(), &bob).await;
    assert!(matches!(result, Err(SplitError::Unauthorized(_))));
    let result = service.delete_draft(&draft.id, &bob).await;
    assert!(matches!(result, Err(SplitError::Unauthorized(_))));

    assert!(service.list_drafts(&bob).await.unwrap().is_empty());
    assert_eq!(service.list_drafts(&alice).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_drafts_newest_first() {
    let service = create_test_service();
    let alice = register_user(&service, "alice").await;

    for name in ["first", "second", "third"] {
        service
            .create_draft(
                DraftInput {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
                &alice,
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let names: Vec<String> = service
        .list_drafts(&alice)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn test_draft_balances_must_reference_group_members() {
    let service = create_test_service();
    let (group, users) = setup_group(&service, &["alice", "bob"]).await;
    register_user(&service, "carol").await;

    let result = service
        .create_draft(
            DraftInput {
                group_id: Some(group.id.clone()),
                balances: draft_balances(&[("alice", dec!(10)), ("carol", dec!(-10))]),
                ..Default::default()
            },
            &users[0],
        )
        .await;
    assert!(matches!(result, Err(SplitError::InvalidSplitUser(ref id)) if id == "carol"));

    let result = service
        .create_draft(
            DraftInput {
                balances: draft_balances(&[("alice", dec!(10)), ("alice", dec!(-10))]),
                ..Default::default()
            },
            &users[0],
        )
        .await;
    assert!(matches!(result, Err(SplitError::InvalidInput(ref field, _)) if field == "balances"));
}

#[tokio::test]
async fn test_draft_in_foreign_group_is_rejected() {
    let service = create_test_service();
    let (group, _) = setup_group(&service, &["alice", "bob"]).await;
    let mallory = register_user(&service, "mallory").await;

    let result = service
        .create_draft(
            DraftInput {
                group_id: Some(group.id.clone()),
                ..Default::default()
            },
            &mallory,
        )
        .await;
    assert!(matches!(result, Err(SplitError::Unauthorized(_))));
}

#[tokio::test]
async fn test_unbalanced_draft_does_not_touch_ledger() {
    let service = create_test_service();
    let (group, users) = setup_group(&service, &["alice", "bob"]).await;

    // drafts may be incomplete, so the zero-sum rule does not apply yet
    let draft = service
        .create_draft(
            DraftInput {
                group_id: Some(group.id.clone()),
                amount: Some(dec!(20)),
                currency: Some(usd()),
                balances: draft_balances(&[("alice", dec!(20)), ("bob", dec!(-5))]),
                ..Default::default()
            },
            &users[0],
        )
        .await
        .unwrap();
    assert_eq!(draft.balances.len(), 2);

    assert!(service.get_group_balances(&group.id, &users[0]).await.unwrap().is_empty());
    let details = service.get_group(&group.id, &users[1]).await.unwrap();
    assert_eq!(details.transaction_count, 0);
}
