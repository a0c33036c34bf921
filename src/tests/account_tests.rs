use super::{create_test_service, equal_split, register_user, setup_group};
use crate::core::errors::SplitError;
use crate::core::services::RegisterInput;
use rust_decimal_macros::dec;

fn registration(email: &str) -> RegisterInput {
    RegisterInput {
        id: None,
        username: "Alice".to_string(),
        email: email.to_string(),
        password: "hunter2".to_string(),
        photo: None,
    }
}

#[tokio::test]
async fn test_register_login_and_validate_token() {
    let service = create_test_service();
    let user = service.register(registration("alice@example.com")).await.unwrap();
    assert!(!user.id.is_empty());
    assert_ne!(user.password_hash, "hunter2");

    let token = service.login("alice@example.com", "hunter2").await.unwrap();
    let claims = service.validate_token(&token).unwrap();
    assert_eq!(claims.sub, user.id);

    let loaded = service.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(loaded.email, "alice@example.com");
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let service = create_test_service();
    service.register(registration("alice@example.com")).await.unwrap();

    let result = service.register(registration("alice@example.com")).await;
    assert!(matches!(result, Err(SplitError::EmailAlreadyRegistered(ref email)) if email == "alice@example.com"));
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let service = create_test_service();
    for email in ["", "alice", "a@b"] {
        let result = service.register(registration(email)).await;
        assert!(matches!(result, Err(SplitError::InvalidEmail(_))), "{:?} accepted", email);
    }
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let service = create_test_service();
    service.register(registration("alice@example.com")).await.unwrap();

    let result = service.login("alice@example.com", "wrong").await;
    assert!(matches!(result, Err(SplitError::InvalidCredentials)));

    let result = service.login("nobody@example.com", "hunter2").await;
    assert!(matches!(result, Err(SplitError::InvalidCredentials)));
}

#[tokio::test]
async fn test_tampered_token_is_rejected() {
    let service = create_test_service();
    service.register(registration("alice@example.com")).await.unwrap();
    let token = service.login("alice@example.com", "hunter2").await.unwrap();

    let result = service.validate_token(&format!("{}x", token));
    assert!(matches!(result, Err(SplitError::InvalidToken(_))));
}

#[tokio::test]
async fn test_profile_collects_groups_and_balances() {
    let service = create_test_service();
    let (trip, users) = setup_group(&service, &["alice", "bob", "carol"]).await;
    let (flat, _) = service
        .create_group("Flat".to_string(), None, vec!["bob".to_string()], &users[0])
        .await
        .unwrap();

    service
        .create_transaction(equal_split(&trip.id, dec!(30), "alice", &["alice", "bob", "carol"]), &users[0])
        .await
        .unwrap();
    service
        .create_transaction(equal_split(&flat.id, dec!(8), "bob", &["alice", "bob"]), &users[1])
        .await
        .unwrap();

    let profile = service.get_profile(&users[1]).await.unwrap();
    assert_eq!(profile.user.id, "bob");
    assert_eq!(profile.groups.len(), 2);
    // carol's debt to alice does not involve bob
    assert_eq!(profile.balances.len(), 2);
    let in_trip = profile.balances.iter().find(|b| b.group_id == trip.id).unwrap();
    assert_eq!((in_trip.user_id.as_str(), in_trip.friend_user_id.as_str()), ("alice", "bob"));
    assert_eq!(in_trip.balance, dec!(10));
    let in_flat = profile.balances.iter().find(|b| b.group_id == flat.id).unwrap();
    assert_eq!((in_flat.user_id.as_str(), in_flat.friend_user_id.as_str()), ("bob", "alice"));
    assert_eq!(in_flat.balance, dec!(4));
}

#[tokio::test]
async fn test_update_profile() {
    let service = create_test_service();
    let alice = register_user(&service, "alice").await;

    let updated = service
        .update_profile(&alice, Some("Alice L.".to_string()), None)
        .await
        .unwrap();
    assert_eq!(updated.username, "Alice L.");
    assert_eq!(updated.email, alice.email);

    let updated = service
        .update_profile(&alice, None, Some("https://img.example.com/a.png".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.username, "Alice L.");
    assert_eq!(updated.photo.as_deref(), Some("https://img.example.com/a.png"));

    let result = service.update_profile(&alice, Some(String::new()), None).await;
    assert!(matches!(result, Err(SplitError::InvalidInput(ref field, _)) if field == "username"));
}

#[tokio::test]
async fn test_friends_lifecycle() {
    let service = create_test_service();
    let alice = register_user(&service, "alice").await;
    register_user(&service, "bob").await;

    let friend = service
        .add_friend(&alice, "bob", Some("climbing".to_string()))
        .await
        .unwrap();
    assert_eq!(friend.friend_user_id, "bob");

    // adding again keeps the original entry
    let again = service.add_friend(&alice, "bob", None).await.unwrap();
    assert_eq!(again.remark.as_deref(), Some("climbing"));

    let updated = service
        .update_friend_remark(&alice, "bob", Some("neighbour".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.remark.as_deref(), Some("neighbour"));

    let profile = service.get_profile(&alice).await.unwrap();
    assert_eq!(profile.friends.len(), 1);

    service.remove_friend(&alice, "bob").await.unwrap();
    let result = service.remove_friend(&alice, "bob").await;
    assert!(matches!(result, Err(SplitError::FriendNotFound(_))));
    let result = service.update_friend_remark(&alice, "bob", None).await;
    assert!(matches!(result, Err(SplitError::FriendNotFound(_))));
}

#[tokio::test]
async fn test_add_friend_errors() {
    let service = create_test_service();
    let alice = register_user(&service, "alice").await;

    let result = service.add_friend(&alice, "alice", None).await;
    assert!(matches!(result, Err(SplitError::InvalidInput(ref field, _)) if field == "friend_id"));

    let result = service.add_friend(&alice, "ghost", None).await;
    assert!(matches!(result, Err(SplitError::UserNotFound(_))));
}
