use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

impl FieldError {
    pub fn new(field: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Coarse classification used by callers that only care about how to react
/// to a failure (retry, fix input, report a bug).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Unauthorized,
    Validation,
    NotFound,
    Conflict,
    InvariantViolation,
    Timeout,
    Internal,
}

#[derive(Error, Debug, Serialize)]
pub enum SplitError {
    /// Caller is not a member of the group, or does not own the resource
    #[error("User {0} is not authorized for this resource")]
    Unauthorized(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Generic input validation error with detailed field information
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),

    /// Email format is invalid
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    /// Currency code does not match `^[A-Z]{3}$`
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),

    /// A balance or draft entry references a user outside the group
    #[error("User {0} is not a group member for split")]
    InvalidSplitUser(String),

    /// Per-participant amounts do not sum to zero
    #[error("Transaction balances do not sum to zero (off by {0})")]
    UnbalancedTransaction(Decimal),

    #[error("Changing the group of a transaction is not allowed")]
    GroupReassignment,

    #[error("Email {0} already registered")]
    EmailAlreadyRegistered(String),

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("Group {0} not found")]
    GroupNotFound(String),

    #[error("Transaction {0} not found")]
    TransactionNotFound(String),

    #[error("Transaction draft {0} not found")]
    DraftNotFound(String),

    #[error("Join link {0} not found")]
    JoinLinkNotFound(String),

    #[error("User {0} is not a friend")]
    FriendNotFound(String),

    /// Another writer changed the row first
    #[error("Transaction {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict { id: String, expected: u64, found: u64 },

    /// Zero-sum assumption broken past validation; always a bug
    #[error("Settlement invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Storage operation timed out after {0} ms")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Receipt storage error: {0}")]
    ReceiptError(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl SplitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SplitError::InvalidCredentials | SplitError::InvalidToken(_) => ErrorKind::Unauthenticated,
            SplitError::Unauthorized(_) => ErrorKind::Unauthorized,
            SplitError::InvalidInput(..)
            | SplitError::InvalidEmail(_)
            | SplitError::InvalidCurrency(_)
            | SplitError::InvalidSplitUser(_)
            | SplitError::UnbalancedTransaction(_)
            | SplitError::GroupReassignment => ErrorKind::Validation,
            SplitError::UserNotFound(_)
            | SplitError::GroupNotFound(_)
            | SplitError::TransactionNotFound(_)
            | SplitError::DraftNotFound(_)
            | SplitError::JoinLinkNotFound(_)
            | SplitError::FriendNotFound(_) => ErrorKind::NotFound,
            SplitError::Conflict { .. } | SplitError::EmailAlreadyRegistered(_) => ErrorKind::Conflict,
            SplitError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            SplitError::Timeout(_) => ErrorKind::Timeout,
            SplitError::StorageError(_)
            | SplitError::CacheError(_)
            | SplitError::ReceiptError(_)
            | SplitError::InternalServerError(_) => ErrorKind::Internal,
        }
    }

    pub fn invalid_input(field: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        SplitError::InvalidInput(field.to_string(), FieldError::new(field, title, description))
    }
}
