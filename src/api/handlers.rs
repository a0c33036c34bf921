use crate::{
    api::models::*,
    auth::jwt::Claims,
    core::{
        errors::SplitError,
        models::{
            balance::{GroupBalance, LedgerReport},
            draft::TransactionDraft,
            friend::Friend,
            group::{Group, GroupDetails, GroupJoinLink, GroupSummary},
            transaction::Transaction,
            user::User,
        },
        services::{DraftInput, Profile, RegisterInput, SplitService, TransactionInput},
    },
    infrastructure::{
        cache::in_memory::InMemoryCache, receipts::in_memory::InMemoryReceiptStore,
        storage::in_memory::InMemoryStorage,
    },
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
};
use http::header;

use std::sync::Arc;

pub type AppService = SplitService<InMemoryStorage, InMemoryCache, InMemoryReceiptStore>;

/// Middleware to validate JWT
async fn auth_middleware(
    State(service): State<Arc<AppService>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| SplitError::InvalidToken("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| SplitError::InvalidToken("Invalid Authorization header".to_string()))?;

    let claims = service.validate_token(token)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Resolves the token subject to a stored user.
async fn current_user(service: &AppService, claims: &Claims) -> Result<User, ApiError> {
    let user = service
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| SplitError::InvalidToken(format!("Unknown subject {}", claims.sub)))?;
    Ok(user)
}

// Define API routes
pub fn api_routes(service: Arc<AppService>) -> Router {
    let protected_routes = Router::new()
        .route("/account", get(get_profile).patch(update_profile))
        .route(
            "/account/friends/{friend_id}",
            post(add_friend).patch(update_friend_remark).delete(remove_friend),
        )
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{group_id}", get(get_group))
        .route("/groups/{group_id}/balances", get(get_group_balances))
        .route("/groups/{group_id}/balances/verify", get(verify_group_ledger))
        .route("/groups/{group_id}/transactions", get(list_transactions))
        .route("/groups/{group_id}/join-link", post(create_join_link))
        .route(
            "/groups/join/{link_id}",
            get(get_group_by_join_link).post(join_group_by_link),
        )
        .route("/transactions", post(create_transaction))
        .route(
            "/transactions/{transaction_id}",
            get(get_transaction).put(edit_transaction).delete(delete_transaction),
        )
        .route("/drafts", get(list_drafts).post(create_draft))
        .route(
            "/drafts/{draft_id}",
            get(get_draft).put(update_draft).delete(delete_draft),
        )
        .route_layer(middleware::from_fn_with_state(service.clone(), auth_middleware));

    Router::new()
        .route("/login", post(login))
        .route("/users", post(create_user)) // Unprotected
        .merge(protected_routes)
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn login(
    State(service): State<Arc<AppService>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = service.login(&req.email, &req.password).await?;
    Ok(Json(LoginResponse { token }))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "User created successfully", body = User),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
async fn create_user(
    State(service): State<Arc<AppService>>,
    Json(req): Json<RegisterInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = service.register(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/account",
    responses(
        (status = 200, description = "Profile with friends, groups and balances", body = Profile),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_profile(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Profile>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.get_profile(&user).await?))
}

#[utoipa::path(
    patch,
    path = "/api/account",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn update_profile(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.update_profile(&user, req.username, req.photo).await?))
}

#[utoipa::path(
    post,
    path = "/api/account/friends/{friend_id}",
    params(("friend_id" = String, Path, description = "User to add as a friend")),
    request_body = FriendRequest,
    responses(
        (status = 200, description = "Friend added", body = Friend),
        (status = 400, description = "Cannot befriend yourself", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn add_friend(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(friend_id): Path<String>,
    Json(req): Json<FriendRequest>,
) -> Result<Json<Friend>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.add_friend(&user, &friend_id, req.remark).await?))
}

#[utoipa::path(
    patch,
    path = "/api/account/friends/{friend_id}",
    params(("friend_id" = String, Path, description = "Friend whose remark changes")),
    request_body = FriendRequest,
    responses(
        (status = 200, description = "Remark updated", body = Friend),
        (status = 404, description = "Not a friend", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn update_friend_remark(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(friend_id): Path<String>,
    Json(req): Json<FriendRequest>,
) -> Result<Json<Friend>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.update_friend_remark(&user, &friend_id, req.remark).await?))
}

#[utoipa::path(
    delete,
    path = "/api/account/friends/{friend_id}",
    params(("friend_id" = String, Path, description = "Friend to remove")),
    responses(
        (status = 204, description = "Friend removed"),
        (status = 404, description = "Not a friend", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn remove_friend(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(friend_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&service, &claims).await?;
    service.remove_friend(&user, &friend_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/groups",
    responses(
        (status = 200, description = "Groups of the caller, most recently active first", body = [Group])
    ),
    security(("Bearer" = []))
)]
async fn list_groups(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Group>>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.list_groups(&user).await?))
}

#[utoipa::path(
    post,
    path = "/api/groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = CreateGroupResponse),
        (status = 200, description = "Identical group already existed", body = CreateGroupResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Member not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn create_group(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<CreateGroupResponse>), ApiError> {
    let user = current_user(&service, &claims).await?;
    let (group, created) = service.create_group(req.name, req.photo, req.member_ids, &user).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(CreateGroupResponse { group, created })))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}",
    params(("group_id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group with members and balances", body = GroupDetails),
        (status = 404, description = "Group not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_group(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupDetails>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.get_group(&group_id, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/balances",
    params(("group_id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Pairwise balances by currency", body = [GroupBalance]),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_group_balances(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<GroupBalance>>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.get_group_balances(&group_id, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/balances/verify",
    params(("group_id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Ledger consistency report", body = LedgerReport),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn verify_group_ledger(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<String>,
) -> Result<Json<LedgerReport>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.verify_group_ledger(&group_id, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/transactions",
    params(("group_id" = String, Path, description = "Group id")),
    responses(
        (status = 200, description = "Transactions, newest first", body = [Transaction]),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn list_transactions(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.list_transactions(&group_id, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/groups/{group_id}/join-link",
    params(("group_id" = String, Path, description = "Group id")),
    responses(
        (status = 201, description = "Join link created", body = GroupJoinLink),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn create_join_link(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(group_id): Path<String>,
) -> Result<(StatusCode, Json<GroupJoinLink>), ApiError> {
    let user = current_user(&service, &claims).await?;
    let link = service.create_join_link(&group_id, &user).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

#[utoipa::path(
    get,
    path = "/api/groups/join/{link_id}",
    params(("link_id" = String, Path, description = "Join link id")),
    responses(
        (status = 200, description = "Group behind the link", body = GroupSummary),
        (status = 404, description = "Join link not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_group_by_join_link(
    State(service): State<Arc<AppService>>,
    Path(link_id): Path<String>,
) -> Result<Json<GroupSummary>, ApiError> {
    Ok(Json(service.get_group_by_join_link(&link_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/groups/join/{link_id}",
    params(("link_id" = String, Path, description = "Join link id")),
    responses(
        (status = 200, description = "Joined (or already a member)", body = Group),
        (status = 404, description = "Join link not found", body = ErrorResponse),
        (status = 503, description = "Group busy, try again", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn join_group_by_link(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(link_id): Path<String>,
) -> Result<Json<Group>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.join_group_by_link(&link_id, &user).await?))
}

#[utoipa::path(
    post,
    path = "/api/transactions",
    request_body = TransactionInput,
    responses(
        (status = 201, description = "Transaction created", body = Transaction),
        (status = 400, description = "Invalid amount, currency or split", body = ErrorResponse),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 503, description = "Storage timed out", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn create_transaction(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TransactionInput>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let user = current_user(&service, &claims).await?;
    let transaction = service.create_transaction(req, &user).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

#[utoipa::path(
    get,
    path = "/api/transactions/{transaction_id}",
    params(("transaction_id" = String, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction", body = Transaction),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_transaction(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.get_transaction(&transaction_id, &user).await?))
}

#[utoipa::path(
    put,
    path = "/api/transactions/{transaction_id}",
    params(("transaction_id" = String, Path, description = "Transaction id")),
    request_body = EditTransactionRequest,
    responses(
        (status = 200, description = "Transaction updated", body = Transaction),
        (status = 400, description = "Invalid input or group change", body = ErrorResponse),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 409, description = "Modified concurrently", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn edit_transaction(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(transaction_id): Path<String>,
    Json(req): Json<EditTransactionRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let user = current_user(&service, &claims).await?;
    let transaction = service
        .edit_transaction(&transaction_id, req.transaction, req.expected_version, &user)
        .await?;
    Ok(Json(transaction))
}

#[utoipa::path(
    delete,
    path = "/api/transactions/{transaction_id}",
    params(("transaction_id" = String, Path, description = "Transaction id")),
    responses(
        (status = 204, description = "Transaction deleted"),
        (status = 403, description = "Not a group member", body = ErrorResponse),
        (status = 404, description = "Transaction not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn delete_transaction(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(transaction_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&service, &claims).await?;
    service.delete_transaction(&transaction_id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/drafts",
    responses(
        (status = 200, description = "Drafts of the caller, newest first", body = [TransactionDraft])
    ),
    security(("Bearer" = []))
)]
async fn list_drafts(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<TransactionDraft>>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.list_drafts(&user).await?))
}

#[utoipa::path(
    post,
    path = "/api/drafts",
    request_body = DraftInput,
    responses(
        (status = 201, description = "Draft created", body = TransactionDraft),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Not a group member", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn create_draft(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DraftInput>,
) -> Result<(StatusCode, Json<TransactionDraft>), ApiError> {
    let user = current_user(&service, &claims).await?;
    let draft = service.create_draft(req, &user).await?;
    Ok((StatusCode::CREATED, Json(draft)))
}

#[utoipa::path(
    get,
    path = "/api/drafts/{draft_id}",
    params(("draft_id" = String, Path, description = "Draft id")),
    responses(
        (status = 200, description = "Draft", body = TransactionDraft),
        (status = 403, description = "Not the draft owner", body = ErrorResponse),
        (status = 404, description = "Draft not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn get_draft(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(draft_id): Path<String>,
) -> Result<Json<TransactionDraft>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.get_draft(&draft_id, &user).await?))
}

#[utoipa::path(
    put,
    path = "/api/drafts/{draft_id}",
    params(("draft_id" = String, Path, description = "Draft id")),
    request_body = DraftInput,
    responses(
        (status = 200, description = "Draft updated", body = TransactionDraft),
        (status = 403, description = "Not the draft owner", body = ErrorResponse),
        (status = 404, description = "Draft not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn update_draft(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(draft_id): Path<String>,
    Json(req): Json<DraftInput>,
) -> Result<Json<TransactionDraft>, ApiError> {
    let user = current_user(&service, &claims).await?;
    Ok(Json(service.update_draft(&draft_id, req, &user).await?))
}

#[utoipa::path(
    delete,
    path = "/api/drafts/{draft_id}",
    params(("draft_id" = String, Path, description = "Draft id")),
    responses(
        (status = 204, description = "Draft deleted"),
        (status = 403, description = "Not the draft owner", body = ErrorResponse),
        (status = 404, description = "Draft not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn delete_draft(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(draft_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&service, &claims).await?;
    service.delete_draft(&draft_id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
