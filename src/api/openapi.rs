use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    api::models::{
        CreateGroupRequest, CreateGroupResponse, EditTransactionRequest, ErrorResponse, FriendRequest, LoginRequest,
        LoginResponse, UpdateProfileRequest,
    },
    core::{
        models::{
            balance::{GroupBalance, LedgerReport, NetPosition, PositionMismatch},
            draft::{DraftBalance, TransactionDraft},
            friend::Friend,
            group::{Group, GroupDetails, GroupJoinLink, GroupSummary},
            transaction::{Tag, Transaction, TransactionBalance},
            user::{User, UserSummary},
        },
        money::Currency,
        services::{DraftInput, Profile, RegisterInput, TagInput, TransactionInput},
        split::{BalanceEntry, SplitSpec},
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "Bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::login,
        super::handlers::create_user,
        super::handlers::get_profile,
        super::handlers::update_profile,
        super::handlers::add_friend,
        super::handlers::update_friend_remark,
        super::handlers::remove_friend,
        super::handlers::list_groups,
        super::handlers::create_group,
        super::handlers::get_group,
        super::handlers::get_group_balances,
        super::handlers::verify_group_ledger,
        super::handlers::list_transactions,
        super::handlers::create_join_link,
        super::handlers::get_group_by_join_link,
        super::handlers::join_group_by_link,
        super::handlers::create_transaction,
        super::handlers::get_transaction,
        super::handlers::edit_transaction,
        super::handlers::delete_transaction,
        super::handlers::list_drafts,
        super::handlers::create_draft,
        super::handlers::get_draft,
        super::handlers::update_draft,
        super::handlers::delete_draft
    ),
    components(schemas(
        LoginRequest,
        LoginResponse,
        RegisterInput,
        UpdateProfileRequest,
        FriendRequest,
        CreateGroupRequest,
        CreateGroupResponse,
        TransactionInput,
        EditTransactionRequest,
        TagInput,
        SplitSpec,
        BalanceEntry,
        DraftInput,
        ErrorResponse,
        Currency,
        User,
        UserSummary,
        Profile,
        Friend,
        Group,
        GroupSummary,
        GroupDetails,
        GroupJoinLink,
        Tag,
        Transaction,
        TransactionBalance,
        TransactionDraft,
        DraftBalance,
        NetPosition,
        GroupBalance,
        PositionMismatch,
        LedgerReport
    )),
    modifiers(&SecurityAddon),
    info(
        title = "Splitledger API",
        description = "API for shared-expense groups, transactions and balances",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
