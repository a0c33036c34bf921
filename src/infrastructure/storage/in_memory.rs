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
use crate::core::money::Currency;
use crate::infrastructure::storage::{Storage, UnitOfWork};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

type PositionTable = HashMap<String, BTreeMap<(Currency, String), NetPosition>>;

#[derive(Clone, Default)]
pub struct InMemoryStorage {
    users: Arc<RwLock<HashMap<String, User>>>,
    user_ids_by_email: Arc<RwLock<HashMap<String, String>>>,
    friends: Arc<RwLock<HashMap<(String, String), Friend>>>,
    groups: Arc<RwLock<HashMap<String, Group>>>,
    join_links: Arc<RwLock<HashMap<String, GroupJoinLink>>>,
    transactions: Arc<RwLock<HashMap<String, Transaction>>>,
    positions: Arc<RwLock<PositionTable>>,
    drafts: Arc<RwLock<HashMap<String, TransactionDraft>>>,
    group_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_user_if_not_exists(&self, user: User) -> Result<Option<User>, SplitError> {
        let mut user_ids_by_email = self.user_ids_by_email.write().await;
        if user_ids_by_email.contains_key(&user.email) {
            return Ok(None);
        }
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(SplitError::invalid_input(
                "id",
                "Duplicate Id",
                format!("User id {} is already taken", user.id),
            ));
        }
        user_ids_by_email.insert(user.email.clone(), user.id.clone());
        users.insert(user.id.clone(), user.clone());
        Ok(Some(user))
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, SplitError> {
        let users = self.users.read().await;
        Ok(users.get(user_id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, SplitError> {
        let user_ids_by_email = self.user_ids_by_email.read().await;
        let users = self.users.read().await;
        Ok(user_ids_by_email.get(email).and_then(|id| users.get(id).cloned()))
    }

    async fn save_user(&self, user: User) -> Result<(), SplitError> {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn save_friend(&self, friend: Friend) -> Result<(), SplitError> {
        let mut friends = self.friends.write().await;
        friends.insert((friend.user_id.clone(), friend.friend_user_id.clone()), friend);
        Ok(())
    }

    async fn get_friend(&self, user_id: &str, friend_user_id: &str) -> Result<Option<Friend>, SplitError> {
        let friends = self.friends.read().await;
        Ok(friends
            .get(&(user_id.to_string(), friend_user_id.to_string()))
            .cloned())
    }

    async fn get_friends(&self, user_id: &str) -> Result<Vec<Friend>, SplitError> {
        let friends = self.friends.read().await;
        let mut result: Vec<Friend> = friends.values().filter(|f| f.user_id == user_id).cloned().collect();
        result.sort_by(|a, b| a.friend_user_id.cmp(&b.friend_user_id));
        Ok(result)
    }

    async fn delete_friend(&self, user_id: &str, friend_user_id: &str) -> Result<bool, SplitError> {
        let mut friends = self.friends.write().await;
        Ok(friends
            .remove(&(user_id.to_string(), friend_user_id.to_string()))
            .is_some())
    }

    async fn insert_group_if_absent(&self, group: Group) -> Result<(Group, bool), SplitError> {
        let mut groups = self.groups.write().await;
        if let Some(existing) = groups
            .values()
            .find(|g| g.members_id_hash == group.members_id_hash && g.name == group.name)
        {
            return Ok((existing.clone(), false));
        }
        groups.insert(group.id.clone(), group.clone());
        Ok((group, true))
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>, SplitError> {
        let groups = self.groups.read().await;
        Ok(groups.get(group_id).cloned())
    }

    async fn get_user_groups(&self, user_id: &str) -> Result<Vec<Group>, SplitError> {
        let groups = self.groups.read().await;
        Ok(groups.values().filter(|g| g.is_member(user_id)).cloned().collect())
    }

    async fn save_join_link(&self, link: GroupJoinLink) -> Result<(), SplitError> {
        let mut join_links = self.join_links.write().await;
        join_links.insert(link.id.clone(), link);
        Ok(())
    }

    async fn get_join_link(&self, link_id: &str) -> Result<Option<GroupJoinLink>, SplitError> {
        let join_links = self.join_links.read().await;
        Ok(join_links.get(link_id).cloned())
    }

    async fn get_transaction(&self, transaction_id: &str) -> Result<Option<Transaction>, SplitError> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(transaction_id).cloned())
    }

    async fn get_group_transactions(&self, group_id: &str) -> Result<Vec<Transaction>, SplitError> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .values()
            .filter(|t| t.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn get_net_positions(&self, group_id: &str) -> Result<Vec<NetPosition>, SplitError> {
        let positions = self.positions.read().await;
        Ok(positions
            .get(group_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_draft(&self, draft: TransactionDraft) -> Result<(), SplitError> {
        let mut drafts = self.drafts.write().await;
        drafts.insert(draft.id.clone(), draft);
        Ok(())
    }

    async fn get_draft(&self, draft_id: &str) -> Result<Option<TransactionDraft>, SplitError> {
        let drafts = self.drafts.read().await;
        Ok(drafts.get(draft_id).cloned())
    }

    async fn get_user_drafts(&self, user_id: &str) -> Result<Vec<TransactionDraft>, SplitError> {
        let drafts = self.drafts.read().await;
        Ok(drafts.values().filter(|d| d.user_id == user_id).cloned().collect())
    }

    async fn delete_draft(&self, draft_id: &str) -> Result<(), SplitError> {
        let mut drafts = self.drafts.write().await;
        drafts.remove(draft_id);
        Ok(())
    }

    async fn begin(&self, group_id: &str) -> Result<Box<dyn UnitOfWork>, SplitError> {
        let lock = {
            let mut group_locks = self.group_locks.lock().await;
            group_locks.entry(group_id.to_string()).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        debug!(group_id, "unit of work opened");
        Ok(Box::new(InMemoryUnitOfWork {
            group_id: group_id.to_string(),
            storage: self.clone(),
            _guard: guard,
            group: None,
            writes: Vec::new(),
            position_changes: Vec::new(),
        }))
    }
}

enum StagedWrite {
    Save(Transaction),
    Delete { id: String, version: u64 },
}

pub struct InMemoryUnitOfWork {
    group_id: String,
    storage: InMemoryStorage,
    _guard: OwnedMutexGuard<()>,
    group: Option<Group>,
    writes: Vec<StagedWrite>,
    position_changes: Vec<PositionChange>,
}

impl InMemoryUnitOfWork {
    fn check_versions(&self, transactions: &HashMap<String, Transaction>) -> Result<(), SplitError> {
        for write in &self.writes {
            let (id, expected) = match write {
                StagedWrite::Save(transaction) => {
                    if transaction.group_id != self.group_id {
                        return Err(SplitError::StorageError(format!(
                            "transaction {} does not belong to group {}",
                            transaction.id, self.group_id
                        )));
                    }
                    (&transaction.id, transaction.version.saturating_sub(1))
                }
                StagedWrite::Delete { id, version } => (id, *version),
            };
            let found = transactions.get(id).map(|t| t.version).unwrap_or(0);
            if found != expected {
                return Err(SplitError::Conflict {
                    id: id.clone(),
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn get_group(&mut self) -> Result<Group, SplitError> {
        if let Some(group) = &self.group {
            return Ok(group.clone());
        }
        self.storage
            .get_group(&self.group_id)
            .await?
            .ok_or_else(|| SplitError::GroupNotFound(self.group_id.clone()))
    }

    async fn get_transaction(&mut self, transaction_id: &str) -> Result<Option<Transaction>, SplitError> {
        Ok(self
            .storage
            .get_transaction(transaction_id)
            .await?
            .filter(|t| t.group_id == self.group_id))
    }

    async fn get_transactions(&mut self) -> Result<Vec<Transaction>, SplitError> {
        self.storage.get_group_transactions(&self.group_id).await
    }

    async fn get_net_positions(&mut self) -> Result<Vec<NetPosition>, SplitError> {
        self.storage.get_net_positions(&self.group_id).await
    }

    fn save_group(&mut self, group: Group) {
        self.group = Some(group);
    }

    fn save_transaction(&mut self, transaction: Transaction) {
        self.writes.push(StagedWrite::Save(transaction));
    }

    fn delete_transaction(&mut self, transaction_id: &str, version: u64) {
        self.writes.push(StagedWrite::Delete {
            id: transaction_id.to_string(),
            version,
        });
    }

    fn update_positions(&mut self, changes: Vec<PositionChange>) {
        self.position_changes.extend(changes);
    }

    async fn commit(self: Box<Self>) -> Result<(), SplitError> {
        let storage = self.storage.clone();
        let mut groups = storage.groups.write().await;
        let mut transactions = storage.transactions.write().await;
        let mut positions = storage.positions.write().await;

        self.check_versions(&transactions)?;
        if let Some(group) = &self.group {
            if group.id != self.group_id {
                return Err(SplitError::StorageError(format!(
                    "unit of work for group {} cannot write group {}",
                    self.group_id, group.id
                )));
            }
        }

        let this = *self;
        let writes = this.writes.len();
        for write in this.writes {
            match write {
                StagedWrite::Save(transaction) => {
                    transactions.insert(transaction.id.clone(), transaction);
                }
                StagedWrite::Delete { id, .. } => {
                    transactions.remove(&id);
                }
            }
        }
        let rows = positions.entry(this.group_id.clone()).or_default();
        for change in this.position_changes {
            match change {
                PositionChange::Upsert(position) => {
                    rows.insert((position.currency.clone(), position.user_id.clone()), position);
                }
                PositionChange::Remove { user_id, currency } => {
                    rows.remove(&(currency, user_id));
                }
            }
        }
        if let Some(group) = this.group {
            groups.insert(group.id.clone(), group);
        }
        debug!(group_id = %this.group_id, writes, "unit of work committed");
        Ok(())
    }
}
