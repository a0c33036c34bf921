use crate::core::errors::SplitError;
use crate::core::ledger::PositionChange;
use crate::core::models::{
    balance::NetPosition,
    draft::TransactionDraft,
    friend::Friend,
    group::{Group, GroupJoinLink},
    transaction::Transaction,
    user::User,
};
use async_trait::async_trait;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Inserts `user` unless the email is taken; returns `None` in that case.
    async fn create_user_if_not_exists(&self, user: User) -> Result<Option<User>, SplitError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<User>, SplitError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, SplitError>;
    async fn save_user(&self, user: User) -> Result<(), SplitError>;

    async fn save_friend(&self, friend: Friend) -> Result<(), SplitError>;
    async fn get_friend(&self, user_id: &str, friend_user_id: &str) -> Result<Option<Friend>, SplitError>;
    async fn get_friends(&self, user_id: &str) -> Result<Vec<Friend>, SplitError>;
    async fn delete_friend(&self, user_id: &str, friend_user_id: &str) -> Result<bool, SplitError>;

    /// Inserts `group` unless a group with the same member hash and name
    /// exists, in which case that one is returned with `false`.
    async fn insert_group_if_absent(&self, group: Group) -> Result<(Group, bool), SplitError>;
    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, SplitError>;
    async fn get_user_groups(&self, user_id: &str) -> Result<Vec<Group>, SplitError>;

    async fn save_join_link(&self, link: GroupJoinLink) -> Result<(), SplitError>;
    async fn get_join_link(&self, link_id: &str) -> Result<Option<GroupJoinLink>, SplitError>;

    async fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>, SplitError>;
    async fn get_group_transactions(&self, group_id: &str) -> Result<Vec<Transaction>, SplitError>;
    async fn get_net_positions(&self, group_id: &str) -> Result<Vec<NetPosition>, SplitError>;

    async fn save_draft(&self, draft: TransactionDraft) -> Result<(), SplitError>;
    async fn get_draft(&self, draft_id: &str) -> Result<Option<TransactionDraft>, SplitError>;
    async fn get_user_drafts(&self, user_id: &str) -> Result<Vec<TransactionDraft>, SplitError>;
    async fn delete_draft(&self, draft_id: &str) -> Result<(), SplitError>;

    /// Opens a unit of work over one group. Units for the same group are
    /// exclusive; the call waits until the previous one is committed or
    /// dropped.
    async fn begin(&self, group_id: &str) -> Result<Box<dyn UnitOfWork>, SplitError>;
}

/// Group-scoped read/write session. Writes are staged and only become
/// visible on [`UnitOfWork::commit`]; dropping the unit discards them.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn get_group(&mut self) -> Result<Group, SplitError>;
    async fn get_transaction(&mut self, transaction_id: &str) -> Result<Option<Transaction>, SplitError>;
    async fn get_transactions(&mut self) -> Result<Vec<Transaction>, SplitError>;
    async fn get_net_positions(&mut self) -> Result<Vec<NetPosition>, SplitError>;

    fn save_group(&mut self, group: Group);
    /// Stages an insert (version 1) or an update of the row at `version - 1`.
    fn save_transaction(&mut self, transaction: Transaction);
    /// Stages removal of the row currently at `version`.
    fn delete_transaction(&mut self, transaction_id: &str, version: u64);
    fn update_positions(&mut self, changes: Vec<PositionChange>);

    /// Applies every staged write at once. Fails with `Conflict` if a staged
    /// transaction no longer matches the stored version.
    async fn commit(self: Box<Self>) -> Result<(), SplitError>;
}

pub mod in_memory;
