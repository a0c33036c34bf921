use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Directed friendship: `user_id` keeps `friend_user_id` in their list.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Friend {
    pub user_id: String,
    pub friend_user_id: String,
    pub remark: Option<String>,
}
