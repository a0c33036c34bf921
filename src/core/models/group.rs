use super::balance::GroupBalance;
use super::user::UserSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub photo: Option<String>,
    pub members: BTreeSet<String>,
    pub members_id_hash: String,
    pub transaction_count: u64,
    pub last_activity_time: DateTime<Utc>,
    pub create_time: DateTime<Utc>,
}

impl Group {
    pub fn new(id: String, name: String, photo: Option<String>, members: BTreeSet<String>) -> Self {
        let now = Utc::now();
        let members_id_hash = members_id_hash(&members);
        Group {
            id,
            name,
            photo,
            members,
            members_id_hash,
            transaction_count: 0,
            last_activity_time: now,
            create_time: now,
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.contains(user_id)
    }

    /// Adds a member and refreshes the membership hash. Returns false if the
    /// user was already a member.
    pub fn add_member(&mut self, user_id: &str) -> bool {
        let inserted = self.members.insert(user_id.to_string());
        if inserted {
            self.members_id_hash = members_id_hash(&self.members);
        }
        inserted
    }

    pub fn touch(&mut self) {
        self.last_activity_time = Utc::now();
    }
}

/// Order-independent hash of a member set: ids sorted, joined by `,`,
/// SHA-256, lowercase hex.
pub fn members_id_hash<'a, I>(members: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    let mut ids: Vec<&str> = members.into_iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids.dedup();
    let mut hasher = Sha256::new();
    hasher.update(ids.join(",").as_bytes());
    hasher.finalize().iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub photo: Option<String>,
}

impl From<&Group> for GroupSummary {
    fn from(group: &Group) -> Self {
        GroupSummary {
            id: group.id.clone(),
            name: group.name.clone(),
            photo: group.photo.clone(),
        }
    }
}

/// Group as shown to its members: roster plus current pairwise balances.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupDetails {
    pub id: String,
    pub name: String,
    pub photo: Option<String>,
    pub members: Vec<UserSummary>,
    pub balances: Vec<GroupBalance>,
    pub transaction_count: u64,
    pub last_activity_time: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupJoinLink {
    pub id: String,
    pub group_id: String,
    pub create_time: DateTime<Utc>,
}
