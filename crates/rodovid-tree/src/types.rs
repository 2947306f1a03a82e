//! Result types returned by the family-tree service.

use chrono::{DateTime, Utc};
use serde::Serialize;

use rodovid_core::{Invite, InviteId, UserId};
use rodovid_validate::ValidationReport;

/// A write that passed validation, with the advisory findings
/// (warnings and skipped rules) surfaced alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct Validated<T> {
    pub value: T,
    pub report: ValidationReport,
}

/// What deleting a Person did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Deletion {
    /// Tombstoned in place because it has recorded descendants.
    Ghosted { ghost_name: String },
    /// Removed together with every edge touching it.
    Deleted,
    /// The caller was a viewer; only their own share was removed.
    Unshared,
}

/// Returned to the recipient's client on acceptance so the owner can wrap
/// the tree key for exactly this recipient.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedInvite {
    pub invite: Invite,
    pub owner_public_key: String,
    pub recipient_public_key: String,
}

/// An accepted invite waiting for the owner to finalize.
#[derive(Debug, Clone, Serialize)]
pub struct PendingInvite {
    pub invite_id: InviteId,
    pub recipient_id: UserId,
    pub recipient_public_key: String,
    pub accepted_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

/// Counts over what a caller can see.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub persons: usize,
    pub owned: usize,
    pub shared: usize,
    pub ghosts: usize,
    /// Directed family edges between visible Persons.
    pub edges: usize,
}
