use super::transactions::{TagInput, build_tags};
use super::{MAX_NAME_LENGTH, MAX_URL_LENGTH, SplitService};
use crate::core::errors::SplitError;
use crate::core::models::{
    draft::{DraftBalance, TransactionDraft},
    user::User,
};
use crate::core::money::{Currency, validate_scale, validate_total};
use crate::core::split::ensure_members;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::receipts::ReceiptStore;
use crate::infrastructure::storage::Storage;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

/// A transaction in progress. Every field is optional; what is present is
/// validated the same way a transaction would be, except for the zero-sum
/// rule.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct DraftInput {
    pub group_id: Option<String>,
    pub name: Option<String>,
    pub icon: Option<String>,
    pub transaction_time: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub amount: Option<Decimal>,
    pub currency: Option<Currency>,
    #[serde(default)]
    pub tags: Vec<TagInput>,
    pub geo_coordinate: Option<String>,
    pub photo: Option<String>,
    #[serde(default)]
    pub balances: Vec<DraftBalance>,
}

impl<S: Storage, C: Cache, R: ReceiptStore> SplitService<S, C, R> {
    async fn validate_draft_input(&self, input: &DraftInput, user: &User) -> Result<(), SplitError> {
        self.validate_optional_input("name", input.name.as_deref(), MAX_NAME_LENGTH)?;
        self.validate_optional_input("icon", input.icon.as_deref(), MAX_NAME_LENGTH)?;
        self.validate_optional_input("geo_coordinate", input.geo_coordinate.as_deref(), MAX_NAME_LENGTH)?;
        self.validate_optional_input("photo", input.photo.as_deref(), MAX_URL_LENGTH)?;
        self.validate_tags(&input.tags)?;
        if let Some(amount) = input.amount {
            validate_total("amount", amount)?;
        }

        let mut seen = HashSet::new();
        for balance in &input.balances {
            validate_scale("balances", balance.amount)?;
            if !seen.insert(balance.user_id.as_str()) {
                return Err(SplitError::invalid_input(
                    "balances",
                    "Duplicate User",
                    format!("User {} appears more than once", balance.user_id),
                ));
            }
        }

        if let Some(group_id) = &input.group_id {
            let group = self.validate_group_membership(group_id, &user.id).await?;
            ensure_members(input.balances.iter().map(|b| b.user_id.as_str()), &group.members)?;
        }
        Ok(())
    }

    async fn owned_draft(&self, draft_id: &str, user: &User) -> Result<TransactionDraft, SplitError> {
        let draft = self
            .storage
            .get_draft(draft_id)
            .await?
            .ok_or_else(|| SplitError::DraftNotFound(draft_id.to_string()))?;
        if draft.user_id != user.id {
            return Err(SplitError::Unauthorized(user.id.clone()));
        }
        Ok(draft)
    }

    pub async fn create_draft(&self, input: DraftInput, user: &User) -> Result<TransactionDraft, SplitError> {
        self.validate_draft_input(&input, user).await?;
        let draft = TransactionDraft {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            group_id: input.group_id,
            name: input.name,
            icon: input.icon,
            create_time: Utc::now(),
            transaction_time: input.transaction_time,
            amount: input.amount,
            currency: input.currency,
            tags: build_tags(input.tags),
            geo_coordinate: input.geo_coordinate,
            photo: input.photo,
            balances: input.balances,
        };
        self.storage.save_draft(draft.clone()).await?;
        info!(draft_id = %draft.id, user_id = %user.id, "draft created");
        Ok(draft)
    }

    pub async fn get_draft(&self, draft_id: &str, user: &User) -> Result<TransactionDraft, SplitError> {
        self.owned_draft(draft_id, user).await
    }

    /// Replaces the draft's content, keeping its id, owner and creation time.
    pub async fn update_draft(
        &self,
        draft_id: &str,
        input: DraftInput,
        user: &User,
    ) -> Result<TransactionDraft, SplitError> {
        let existing = self.owned_draft(draft_id, user).await?;
        self.validate_draft_input(&input, user).await?;
        let draft = TransactionDraft {
            id: existing.id,
            user_id: existing.user_id,
            group_id: input.group_id,
            name: input.name,
            icon: input.icon,
            create_time: existing.create_time,
            transaction_time: input.transaction_time,
            amount: input.amount,
            currency: input.currency,
            tags: build_tags(input.tags),
            geo_coordinate: input.geo_coordinate,
            photo: input.photo,
            balances: input.balances,
        };
        self.storage.save_draft(draft.clone()).await?;
        Ok(draft)
    }

    pub async fn delete_draft(&self, draft_id: &str, user: &User) -> Result<(), SplitError> {
        self.owned_draft(draft_id, user).await?;
        self.storage.delete_draft(draft_id).await?;
        info!(draft_id, user_id = %user.id, "draft deleted");
        Ok(())
    }

    /// The user's drafts, newest first.
    pub async fn list_drafts(&self, user: &User) -> Result<Vec<TransactionDraft>, SplitError> {
        let mut drafts = self.storage.get_user_drafts(&user.id).await?;
        drafts.sort_by(|a, b| b.create_time.cmp(&a.create_time).then_with(|| a.id.cmp(&b.id)));
        Ok(drafts)
    }
}
