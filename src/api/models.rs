use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::core::errors::{ErrorKind, SplitError};
use crate::core::models::group::Group;
use crate::core::services::TransactionInput;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub photo: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct FriendRequest {
    pub remark: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
    pub photo: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CreateGroupResponse {
    pub group: Group,
    /// False when an identical group already existed and was returned.
    pub created: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct EditTransactionRequest {
    #[serde(flatten)]
    pub transaction: TransactionInput,
    /// Version the client last read; omitted means last writer wins.
    pub expected_version: Option<u64>,
}

// Error response struct
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

// Newtype wrapper for SplitError to implement IntoResponse
pub struct ApiError(pub SplitError);

impl From<SplitError> for ApiError {
    fn from(err: SplitError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.0.kind() {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::InvariantViolation | ErrorKind::Internal => {
                error!(error = %self.0, "request failed with internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = match &self.0 {
            SplitError::InvalidInput(_, field) => format!("{}: {}", field.title, field.description),
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
