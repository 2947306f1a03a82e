//! The `FamilyStore` trait: the logical operations the core issues against
//! a property-graph backend.
//!
//! Each method is one transaction. Methods documented as atomic must either
//! apply all their writes or none, so concurrent readers never observe a
//! half-created edge pair or a Person without its `OWNS` edge. Beyond that
//! the backend's native isolation applies: concurrent property sets on the
//! same node are last-write-wins and edge creation is merge-idempotent.
//!
//! Authorization and referential outcomes are expressed through return
//! values (`bool`, `Option`, [`Access`], [`Retirement`]); [`StoreError`] is
//! reserved for infrastructure failures.

use std::collections::HashSet;
use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::types::{
    Blob, EvidenceType, FamilyEdge, FamilyLink, Gender, Invite, InviteId, KeyRotation,
    LinkedSource, ParentKind, Person, PersonId, PersonPatch, PersonView, ShareGrant,
    SiblingKind, Source, SourceId, SpouseMeta, Tombstone, User, UserId, WrappedKey,
};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The caller's relationship to a Person.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Owner,
    Viewer { guest_note: Option<Blob> },
    None,
}

impl Access {
    pub fn is_owner(&self) -> bool {
        matches!(self, Access::Owner)
    }

    pub fn can_read(&self) -> bool {
        !matches!(self, Access::None)
    }
}

/// Facts handed to the ghost-label synthesizer inside the retire transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GhostContext {
    pub gender: Option<Gender>,
    /// Undirected family-edge distance to the nearest Person of the same
    /// owner without recorded descendants, if one is reachable.
    pub leaf_distance: Option<u32>,
}

/// Result of an owner retiring a Person.
#[derive(Debug, Clone, PartialEq)]
pub enum Retirement {
    /// The Person had descendants and was tombstoned in place.
    Ghosted(Tombstone),
    /// The Person had no descendants; node and touching edges were removed.
    Deleted,
    /// The caller does not own such a Person.
    NotOwned,
}

/// Persons visible to a caller plus every family edge touching them.
///
/// Edges may reference Persons outside `nodes`; callers must filter.
#[derive(Debug, Clone, Default)]
pub struct VisibleGraph {
    pub nodes: Vec<PersonView>,
    pub edges: Vec<FamilyEdge>,
}

/// Abstraction over a Rodovid graph backend.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait FamilyStore: Send + Sync {
    // ── Users ─────────────────────────────────────────────────────

    /// Persist a new user. Returns `false` if the id is already taken.
    fn insert_user<'a>(&'a self, user: &'a User)
        -> impl Future<Output = StoreResult<bool>> + Send + 'a;

    fn get_user<'a>(&'a self, id: &'a UserId)
        -> impl Future<Output = StoreResult<Option<User>>> + Send + 'a;

    /// Replace key material. Returns `None` if the user does not exist.
    fn rotate_user_keys<'a>(
        &'a self,
        id: &'a UserId,
        rotation: &'a KeyRotation,
        at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<User>>> + Send + 'a;

    // ── Persons ───────────────────────────────────────────────────

    /// Atomically create the Person, the `OWNS` edge from `person.owner_id`,
    /// and a viewer `SHARED_WITH` edge for every grant recipient of that
    /// owner. Returns `false` (and writes nothing) if the owner is missing.
    fn insert_person<'a>(&'a self, person: &'a Person)
        -> impl Future<Output = StoreResult<bool>> + Send + 'a;

    fn get_person(&self, id: PersonId)
        -> impl Future<Output = StoreResult<Option<Person>>> + Send + '_;

    fn access<'a>(&'a self, caller: &'a UserId, id: PersonId)
        -> impl Future<Output = StoreResult<Access>> + Send + 'a;

    /// Apply `patch` if `owner` owns the Person. `None` otherwise.
    fn update_owned_person<'a>(
        &'a self,
        owner: &'a UserId,
        id: PersonId,
        patch: &'a PersonPatch,
        at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<Person>>> + Send + 'a;

    /// Atomically retire an owned Person: tombstone it with the label
    /// produced by `namer` when it has outgoing `PARENT_OF` edges, otherwise
    /// remove the node and every edge touching it. Sources are untouched.
    fn retire_person<'a, F>(
        &'a self,
        owner: &'a UserId,
        id: PersonId,
        at: DateTime<Utc>,
        namer: F,
    ) -> impl Future<Output = StoreResult<Retirement>> + Send + 'a
    where
        F: FnOnce(GhostContext) -> String + Send + 'a;

    /// Delete the viewer's `SHARED_WITH` edge to a Person. Returns whether
    /// one existed.
    fn remove_person_share<'a>(&'a self, viewer: &'a UserId, id: PersonId)
        -> impl Future<Output = StoreResult<bool>> + Send + 'a;

    /// Set the viewer's guest note on their `SHARED_WITH` edge.
    fn set_guest_note<'a>(&'a self, viewer: &'a UserId, id: PersonId, note: &'a Blob)
        -> impl Future<Output = StoreResult<bool>> + Send + 'a;

    // ── Family edges ──────────────────────────────────────────────

    /// Atomically merge both directed edges of `link`. Existing pairs are
    /// updated in place, never duplicated. Returns `false` if either
    /// endpoint does not exist.
    fn link<'a>(&'a self, link: &'a FamilyLink)
        -> impl Future<Output = StoreResult<bool>> + Send + 'a;

    fn parents_of(&self, id: PersonId)
        -> impl Future<Output = StoreResult<Vec<(Person, ParentKind)>>> + Send + '_;

    fn children_of(&self, id: PersonId)
        -> impl Future<Output = StoreResult<Vec<Person>>> + Send + '_;

    fn spouses_of(&self, id: PersonId)
        -> impl Future<Output = StoreResult<Vec<(Person, SpouseMeta)>>> + Send + '_;

    fn siblings_of(&self, id: PersonId)
        -> impl Future<Output = StoreResult<Vec<(Person, SiblingKind)>>> + Send + '_;

    /// Transitive closure over `CHILD_OF`, excluding `id` itself.
    fn ancestors_of(&self, id: PersonId)
        -> impl Future<Output = StoreResult<HashSet<PersonId>>> + Send + '_;

    /// Counts outgoing `PARENT_OF` edges.
    fn descendant_count(&self, id: PersonId)
        -> impl Future<Output = StoreResult<usize>> + Send + '_;

    fn visible_graph<'a>(&'a self, caller: &'a UserId)
        -> impl Future<Output = StoreResult<VisibleGraph>> + Send + 'a;

    // ── Sources ───────────────────────────────────────────────────

    /// Returns `false` if the owning user does not exist.
    fn insert_source<'a>(&'a self, source: &'a Source)
        -> impl Future<Output = StoreResult<bool>> + Send + 'a;

    fn get_source(&self, id: SourceId)
        -> impl Future<Output = StoreResult<Option<Source>>> + Send + '_;

    fn list_sources<'a>(&'a self, owner: &'a UserId)
        -> impl Future<Output = StoreResult<Vec<Source>>> + Send + 'a;

    /// Remove an owned Source and its `EVIDENCED_BY` edges.
    fn delete_source<'a>(&'a self, owner: &'a UserId, id: SourceId)
        -> impl Future<Output = StoreResult<bool>> + Send + 'a;

    /// Merge an `EVIDENCED_BY` edge. Returns `false` if either node is missing.
    fn link_source(&self, person: PersonId, source: SourceId, evidence: EvidenceType)
        -> impl Future<Output = StoreResult<bool>> + Send + '_;

    fn sources_for(&self, person: PersonId)
        -> impl Future<Output = StoreResult<Vec<LinkedSource>>> + Send + '_;

    // ── Invites & grants ──────────────────────────────────────────

    /// Persist an invite with its `CREATED_INVITE` edge. Returns `false` if
    /// the owner does not exist.
    fn insert_invite<'a>(&'a self, invite: &'a Invite)
        -> impl Future<Output = StoreResult<bool>> + Send + 'a;

    fn get_invite<'a>(&'a self, id: &'a InviteId)
        -> impl Future<Output = StoreResult<Option<Invite>>> + Send + 'a;

    /// Atomically move a `pending`, unexpired invite to `accepted` for an
    /// existing recipient other than the owner. `None` if any precondition
    /// fails.
    fn accept_invite<'a>(
        &'a self,
        id: &'a InviteId,
        recipient: &'a UserId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<Invite>>> + Send + 'a;

    /// Atomically move an `accepted`, unexpired invite owned by `owner` to
    /// `completed`, merge the owner→recipient grant carrying `key`, and
    /// merge viewer edges from the recipient to every Person the owner owns.
    /// `None` if any precondition fails.
    fn finalize_invite<'a>(
        &'a self,
        id: &'a InviteId,
        owner: &'a UserId,
        key: &'a WrappedKey,
        at: DateTime<Utc>,
    ) -> impl Future<Output = StoreResult<Option<ShareGrant>>> + Send + 'a;

    /// Delete the grant and the recipient's viewer edges to the owner's
    /// Persons. Returns whether a grant existed.
    fn revoke_grant<'a>(&'a self, owner: &'a UserId, recipient: &'a UserId)
        -> impl Future<Output = StoreResult<bool>> + Send + 'a;

    fn grants_to<'a>(&'a self, recipient: &'a UserId)
        -> impl Future<Output = StoreResult<Vec<ShareGrant>>> + Send + 'a;

    fn grants_from<'a>(&'a self, owner: &'a UserId)
        -> impl Future<Output = StoreResult<Vec<ShareGrant>>> + Send + 'a;

    fn invites_from<'a>(&'a self, owner: &'a UserId)
        -> impl Future<Output = StoreResult<Vec<Invite>>> + Send + 'a;
}
