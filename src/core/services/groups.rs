use super::{MAX_NAME_LENGTH, MAX_URL_LENGTH, SplitService};
use crate::core::errors::SplitError;
use crate::core::models::{
    group::{Group, GroupDetails, GroupJoinLink, GroupSummary},
    user::{User, UserSummary},
};
use crate::infrastructure::cache::Cache;
use crate::infrastructure::receipts::ReceiptStore;
use crate::infrastructure::storage::Storage;
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{debug, info};
use uuid::Uuid;

impl<S: Storage, C: Cache, R: ReceiptStore> SplitService<S, C, R> {
    async fn validate_users(&self, user_ids: &BTreeSet<String>) -> Result<(), SplitError> {
        for user_id in user_ids {
            if self.storage.get_user(user_id).await?.is_none() {
                return Err(SplitError::UserNotFound(user_id.clone()));
            }
        }
        Ok(())
    }

    /// Creates a group containing `created_by` and `member_ids`. If a group
    /// with the same name and exactly the same members exists, that group is
    /// returned instead and the flag is `false`.
    pub async fn create_group(
        &self,
        name: String,
        photo: Option<String>,
        member_ids: Vec<String>,
        created_by: &User,
    ) -> Result<(Group, bool), SplitError> {
        self.validate_string_input("name", &name, MAX_NAME_LENGTH)?;
        self.validate_optional_input("photo", photo.as_deref(), MAX_URL_LENGTH)?;

        let mut members: BTreeSet<String> = member_ids.into_iter().collect();
        members.insert(created_by.id.clone());
        self.validate_users(&members).await?;

        let group = Group::new(Uuid::new_v4().to_string(), name, photo, members);
        let (group, created) = self.storage.insert_group_if_absent(group).await?;
        if created {
            info!(group_id = %group.id, members = group.members.len(), "group created");
        } else {
            debug!(group_id = %group.id, "identical group already exists");
        }
        Ok((group, created))
    }

    /// Groups of `user`, most recently active first.
    pub async fn list_groups(&self, user: &User) -> Result<Vec<Group>, SplitError> {
        let mut groups = self.storage.get_user_groups(&user.id).await?;
        groups.sort_by(|a, b| {
            b.last_activity_time
                .cmp(&a.last_activity_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(groups)
    }

    /// Group with its roster and balances. Non-members get `GroupNotFound`
    /// so the group's existence is not revealed.
    pub async fn get_group(&self, group_id: &str, requested_by: &User) -> Result<GroupDetails, SplitError> {
        let group = self
            .storage
            .get_group(group_id)
            .await?
            .filter(|g| g.is_member(&requested_by.id))
            .ok_or_else(|| SplitError::GroupNotFound(group_id.to_string()))?;

        let lookups = group.members.iter().map(|member_id| self.storage.get_user(member_id));
        let members: Vec<UserSummary> = futures::future::try_join_all(lookups)
            .await?
            .iter()
            .flatten()
            .map(UserSummary::from)
            .collect();
        let balances = self.group_balances(group_id).await?;

        Ok(GroupDetails {
            id: group.id,
            name: group.name,
            photo: group.photo,
            members,
            balances,
            transaction_count: group.transaction_count,
            last_activity_time: group.last_activity_time,
        })
    }

    pub async fn create_join_link(&self, group_id: &str, created_by: &User) -> Result<GroupJoinLink, SplitError> {
        self.validate_group_membership(group_id, &created_by.id).await?;
        let link = GroupJoinLink {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            create_time: Utc::now(),
        };
        self.storage.save_join_link(link.clone()).await?;
        info!(group_id, link_id = %link.id, "join link created");
        Ok(link)
    }

    async fn resolve_join_link(&self, link_id: &str) -> Result<GroupJoinLink, SplitError> {
        self.storage
            .get_join_link(link_id)
            .await?
            .ok_or_else(|| SplitError::JoinLinkNotFound(link_id.to_string()))
    }

    pub async fn get_group_by_join_link(&self, link_id: &str) -> Result<GroupSummary, SplitError> {
        let link = self.resolve_join_link(link_id).await?;
        let group = self
            .storage
            .get_group(&link.group_id)
            .await?
            .ok_or_else(|| SplitError::GroupNotFound(link.group_id.clone()))?;
        Ok(GroupSummary::from(&group))
    }

    /// Adds `user` to the group behind the link. Joining twice is a no-op.
    pub async fn join_group_by_link(&self, link_id: &str, user: &User) -> Result<Group, SplitError> {
        let link = self.resolve_join_link(link_id).await?;

        let (group, joined) = self
            .within_deadline("join_group_by_link", async {
                let mut uow = self.storage.begin(&link.group_id).await?;
                let mut group = uow.get_group().await?;
                if !group.add_member(&user.id) {
                    return Ok((group, false));
                }
                group.touch();
                uow.save_group(group.clone());
                uow.commit().await?;
                Ok((group, true))
            })
            .await?;

        if joined {
            info!(group_id = %group.id, user_id = %user.id, "user joined group");
        }
        Ok(group)
    }
}
