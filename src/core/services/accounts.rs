use super::{MAX_NAME_LENGTH, MAX_URL_LENGTH, SplitService};
use crate::core::errors::SplitError;
use crate::core::models::{
    balance::GroupBalance,
    friend::Friend,
    group::GroupSummary,
    user::User,
};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::receipts::ReceiptStore;
use crate::infrastructure::storage::Storage;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct RegisterInput {
    /// Generated when absent.
    pub id: Option<String>,
    pub username: String,
    pub email: String,
    pub password: String,
    pub photo: Option<String>,
}

/// Everything the account page needs in one read.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct Profile {
    pub user: User,
    pub friends: Vec<Friend>,
    pub groups: Vec<GroupSummary>,
    /// Pairwise balances across all groups where the user is either side.
    pub balances: Vec<GroupBalance>,
}

impl<S: Storage, C: Cache, R: ReceiptStore> SplitService<S, C, R> {
    pub async fn register(&self, input: RegisterInput) -> Result<User, SplitError> {
        if input.email.is_empty() || !input.email.contains('@') || !input.email.contains('.') || input.email.len() < 5 {
            return Err(SplitError::InvalidEmail(input.email));
        }
        if input.password.is_empty() {
            return Err(SplitError::invalid_input(
                "password",
                "Invalid password",
                "Password cannot be empty",
            ));
        }
        self.validate_string_input("username", &input.username, MAX_NAME_LENGTH)?;
        self.validate_optional_input("photo", input.photo.as_deref(), MAX_URL_LENGTH)?;
        let id = match input.id {
            Some(id) => {
                self.validate_string_input("id", &id, MAX_NAME_LENGTH)?;
                id
            }
            None => Uuid::new_v4().to_string(),
        };

        let password_hash = bcrypt::hash(&input.password, self.bcrypt_cost)
            .map_err(|e| SplitError::InternalServerError(format!("Password hashing error: {}", e)))?;
        let user = User {
            id,
            username: input.username,
            email: input.email.clone(),
            password_hash,
            photo: input.photo,
        };

        let user = self
            .storage
            .create_user_if_not_exists(user)
            .await?
            .ok_or(SplitError::EmailAlreadyRegistered(input.email))?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, SplitError> {
        let user = self
            .storage
            .get_user_by_email(email)
            .await?
            .ok_or(SplitError::InvalidCredentials)?;

        if bcrypt::verify(password, &user.password_hash)
            .map_err(|e| SplitError::InternalServerError(format!("Password verification error: {}", e)))?
        {
            self.jwt_service.generate_token(&user.id)
        } else {
            warn!(user_id = %user.id, "failed login attempt");
            Err(SplitError::InvalidCredentials)
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, SplitError> {
        self.storage.get_user(user_id).await
    }

    pub async fn get_profile(&self, user: &User) -> Result<Profile, SplitError> {
        let friends = self.storage.get_friends(&user.id).await?;
        let groups = self.list_groups(user).await?;

        let mut balances = Vec::new();
        for group in &groups {
            balances.extend(
                self.group_balances(&group.id)
                    .await?
                    .into_iter()
                    .filter(|b| b.user_id == user.id || b.friend_user_id == user.id),
            );
        }

        Ok(Profile {
            user: user.clone(),
            friends,
            groups: groups.iter().map(GroupSummary::from).collect(),
            balances,
        })
    }

    pub async fn update_profile(
        &self,
        user: &User,
        username: Option<String>,
        photo: Option<String>,
    ) -> Result<User, SplitError> {
        self.validate_optional_input("username", username.as_deref(), MAX_NAME_LENGTH)?;
        self.validate_optional_input("photo", photo.as_deref(), MAX_URL_LENGTH)?;

        let mut updated = self
            .storage
            .get_user(&user.id)
            .await?
            .ok_or_else(|| SplitError::UserNotFound(user.id.clone()))?;
        if let Some(username) = username {
            updated.username = username;
        }
        if photo.is_some() {
            updated.photo = photo;
        }
        self.storage.save_user(updated.clone()).await?;
        Ok(updated)
    }

    /// Adds `friend_id` to the user's friend list. Adding an existing friend
    /// returns the stored entry unchanged.
    pub async fn add_friend(&self, user: &User, friend_id: &str, remark: Option<String>) -> Result<Friend, SplitError> {
        if friend_id == user.id {
            return Err(SplitError::invalid_input(
                "friend_id",
                "Invalid Friend",
                "Cannot add yourself as a friend",
            ));
        }
        self.validate_optional_input("remark", remark.as_deref(), MAX_NAME_LENGTH)?;
        if self.storage.get_user(friend_id).await?.is_none() {
            return Err(SplitError::UserNotFound(friend_id.to_string()));
        }
        if let Some(existing) = self.storage.get_friend(&user.id, friend_id).await? {
            return Ok(existing);
        }

        let friend = Friend {
            user_id: user.id.clone(),
            friend_user_id: friend_id.to_string(),
            remark,
        };
        self.storage.save_friend(friend.clone()).await?;
        info!(user_id = %user.id, friend_id, "friend added");
        Ok(friend)
    }

    pub async fn update_friend_remark(
        &self,
        user: &User,
        friend_id: &str,
        remark: Option<String>,
    ) -> Result<Friend, SplitError> {
        self.validate_optional_input("remark", remark.as_deref(), MAX_NAME_LENGTH)?;
        let mut friend = self
            .storage
            .get_friend(&user.id, friend_id)
            .await?
            .ok_or_else(|| SplitError::FriendNotFound(friend_id.to_string()))?;
        friend.remark = remark;
        self.storage.save_friend(friend.clone()).await?;
        Ok(friend)
    }

    pub async fn remove_friend(&self, user: &User, friend_id: &str) -> Result<(), SplitError> {
        if !self.storage.delete_friend(&user.id, friend_id).await? {
            return Err(SplitError::FriendNotFound(friend_id.to_string()));
        }
        info!(user_id = %user.id, friend_id, "friend removed");
        Ok(())
    }
}
