//! Error types for the rodovid-tree crate.

use rodovid_core::{StoreError, UserId};
use rodovid_validate::ValidationReport;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    /// Absent, or present but not visible to the caller. The two are never
    /// distinguished.
    #[error("Not found")]
    NotFound,

    #[error("Owner not found: {0}")]
    OwnerNotFound(UserId),

    #[error("User already exists: {0}")]
    UserExists(UserId),

    /// Missing, expired, or in the wrong state.
    #[error("Invite is not available")]
    InviteUnavailable,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Field {0} is not an encrypted payload")]
    PlaintextBlob(&'static str),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl TreeError {
    /// Whether the caller caused the failure, as opposed to the store.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, TreeError::Store(_))
    }
}

pub type Result<T> = std::result::Result<T, TreeError>;
