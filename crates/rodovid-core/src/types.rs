//! Core domain types for the Rodovid family graph.
//!
//! Node kinds are strongly typed records. Opaque personal data lives only in
//! [`Blob`] values keyed by the closed [`BlobField`] enum; the structural
//! fields next to them (ids, gender, approximate years, tombstone) are the
//! only plaintext the server ever interprets.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Literal prefix carried by client-encrypted values.
pub const ENCRYPTED_PREFIX: &str = "ENC_";

// ── Identifiers ───────────────────────────────────────────────────

/// Identity of a registered user. Assigned by the authentication layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of a Person node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PersonId(pub Uuid);

impl PersonId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PersonId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a Source node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SourceId(pub Uuid);

impl SourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a sharing invite: `inv_` followed by 32 random hex digits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct InviteId(pub String);

impl InviteId {
    /// Fresh unguessable id backed by a random v4 UUID.
    pub fn generate() -> Self {
        Self(format!("inv_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InviteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Opaque payloads ───────────────────────────────────────────────

/// An opaque client-encrypted string. Stored and returned verbatim.
///
/// `Debug` never prints the payload so blobs cannot end up in logs.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Blob(String);

impl Blob {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether the value carries the encrypted-payload prefix.
    /// Detection only; the payload is never decoded.
    pub fn is_encrypted(&self) -> bool {
        self.0.starts_with(ENCRYPTED_PREFIX)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}

/// A tree key wrapped with a recipient's public key. Opaque to the server.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct WrappedKey(String);

impl WrappedKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for WrappedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrappedKey({} bytes)", self.0.len())
    }
}

/// The opaque fields a Person may carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BlobField {
    Name,
    BirthDate,
    DeathDate,
    BirthPlace,
    DeathPlace,
    PrivateNotes,
    SharedNotes,
}

impl BlobField {
    pub const ALL: [BlobField; 7] = [
        BlobField::Name,
        BlobField::BirthDate,
        BlobField::DeathDate,
        BlobField::BirthPlace,
        BlobField::DeathPlace,
        BlobField::PrivateNotes,
        BlobField::SharedNotes,
    ];

    /// Property name used by graph backends.
    pub fn property(&self) -> &'static str {
        match self {
            BlobField::Name => "name_blob",
            BlobField::BirthDate => "birth_date_blob",
            BlobField::DeathDate => "death_date_blob",
            BlobField::BirthPlace => "birth_place_blob",
            BlobField::DeathPlace => "death_place_blob",
            BlobField::PrivateNotes => "private_notes_blob",
            BlobField::SharedNotes => "shared_notes_blob",
        }
    }
}

/// Opaque payloads of a Person keyed by field.
pub type BlobMap = BTreeMap<BlobField, Blob>;

// ── Users ─────────────────────────────────────────────────────────

/// A registered user and their key material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    /// Shareable asymmetric public key (PEM or base64, opaque here).
    pub public_key: String,
    /// Private key wrapped with a password-derived key, for recovery.
    pub encrypted_private_key: Option<Blob>,
    pub key_salt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(id: UserId, public_key: impl Into<String>) -> Self {
        Self {
            id,
            public_key: public_key.into(),
            encrypted_private_key: None,
            key_salt: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

/// Replacement key material. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyRotation {
    pub public_key: Option<String>,
    pub encrypted_private_key: Option<Blob>,
    pub key_salt: Option<String>,
}

impl KeyRotation {
    pub fn is_empty(&self) -> bool {
        self.public_key.is_none() && self.encrypted_private_key.is_none() && self.key_salt.is_none()
    }

    pub fn apply(&self, user: &mut User, at: DateTime<Utc>) {
        if let Some(key) = &self.public_key {
            user.public_key = key.clone();
        }
        if let Some(blob) = &self.encrypted_private_key {
            user.encrypted_private_key = Some(blob.clone());
        }
        if let Some(salt) = &self.key_salt {
            user.key_salt = Some(salt.clone());
        }
        user.updated_at = Some(at);
    }
}

/// What a user needs to recover their private key on a new device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecoveryData {
    pub encrypted_private_key: Blob,
    pub key_salt: Option<String>,
}

// ── Persons ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub fn as_tag(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "M" | "m" => Some(Gender::Male),
            "F" | "f" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// Marks a Person as a ghost: retained for its descendants, shown by label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tombstone {
    pub ghost_name: String,
    pub deleted_at: DateTime<Utc>,
}

/// An individual in a family tree.
///
/// `birth_year`/`death_year` are coarse hints for validation only and are
/// distinct from the encrypted exact dates in `blobs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: PersonId,
    pub owner_id: UserId,
    #[serde(default)]
    pub blobs: BlobMap,
    pub gender: Option<Gender>,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    #[serde(default)]
    pub is_root: bool,
    pub tombstone: Option<Tombstone>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Person {
    pub fn is_ghost(&self) -> bool {
        self.tombstone.is_some()
    }

    pub fn blob(&self, field: BlobField) -> Option<&Blob> {
        self.blobs.get(&field)
    }

    /// Projection served to non-owning viewers.
    pub fn redacted_for_viewer(mut self) -> Self {
        self.blobs.remove(&BlobField::PrivateNotes);
        self
    }
}

/// Input for creating a Person.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPerson {
    #[serde(default)]
    pub blobs: BlobMap,
    pub gender: Option<Gender>,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    #[serde(default)]
    pub is_root: bool,
}

impl NewPerson {
    pub fn into_person(self, id: PersonId, owner_id: UserId, at: DateTime<Utc>) -> Person {
        Person {
            id,
            owner_id,
            blobs: self.blobs,
            gender: self.gender,
            birth_year: self.birth_year,
            death_year: self.death_year,
            is_root: self.is_root,
            tombstone: None,
            created_at: at,
            updated_at: None,
        }
    }
}

/// Partial update of a Person. Only the fields that are set change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonPatch {
    #[serde(default)]
    pub blobs: BlobMap,
    pub gender: Option<Gender>,
    pub birth_year: Option<i32>,
    pub death_year: Option<i32>,
    pub is_root: Option<bool>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
            && self.gender.is_none()
            && self.birth_year.is_none()
            && self.death_year.is_none()
            && self.is_root.is_none()
    }

    pub fn apply(&self, person: &mut Person, at: DateTime<Utc>) {
        for (field, blob) in &self.blobs {
            person.blobs.insert(*field, blob.clone());
        }
        if let Some(gender) = self.gender {
            person.gender = Some(gender);
        }
        if let Some(year) = self.birth_year {
            person.birth_year = Some(year);
        }
        if let Some(year) = self.death_year {
            person.death_year = Some(year);
        }
        if let Some(is_root) = self.is_root {
            person.is_root = is_root;
        }
        person.updated_at = Some(at);
    }
}

/// A Person as seen by a particular caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonView {
    pub person: Person,
    pub is_owner: bool,
    /// The caller's own guest note; always `None` for the owner.
    pub guest_note: Option<Blob>,
}

// ── Family edges ──────────────────────────────────────────────────

/// Closed set of family relationship types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
    ParentOf,
    ChildOf,
    Spouse,
    Sibling,
}

impl RelationKind {
    /// Relationship type as stored in the graph.
    pub fn as_cypher(&self) -> &'static str {
        match self {
            RelationKind::ParentOf => "PARENT_OF",
            RelationKind::ChildOf => "CHILD_OF",
            RelationKind::Spouse => "SPOUSE",
            RelationKind::Sibling => "SIBLING",
        }
    }

    pub fn from_cypher(value: &str) -> Option<Self> {
        match value {
            "PARENT_OF" => Some(RelationKind::ParentOf),
            "CHILD_OF" => Some(RelationKind::ChildOf),
            "SPOUSE" => Some(RelationKind::Spouse),
            "SIBLING" => Some(RelationKind::Sibling),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParentKind {
    #[default]
    Biological,
    Adoptive,
}

impl ParentKind {
    pub fn is_biological(&self) -> bool {
        matches!(self, ParentKind::Biological)
    }

    pub fn from_biological(biological: bool) -> Self {
        if biological {
            ParentKind::Biological
        } else {
            ParentKind::Adoptive
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpouseStatus {
    #[default]
    Married,
    Divorced,
    Widowed,
}

impl SpouseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpouseStatus::Married => "married",
            SpouseStatus::Divorced => "divorced",
            SpouseStatus::Widowed => "widowed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "married" => Some(SpouseStatus::Married),
            "divorced" => Some(SpouseStatus::Divorced),
            "widowed" => Some(SpouseStatus::Widowed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MarriageType {
    /// Registry office.
    #[default]
    Civil,
    Church,
    /// Found in archives, exact form unknown.
    Historical,
}

impl MarriageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarriageType::Civil => "civil",
            MarriageType::Church => "church",
            MarriageType::Historical => "historical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "civil" => Some(MarriageType::Civil),
            "church" => Some(MarriageType::Church),
            "historical" => Some(MarriageType::Historical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SiblingKind {
    Full,
    Half,
}

impl SiblingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiblingKind::Full => "full",
            SiblingKind::Half => "half",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(SiblingKind::Full),
            "half" => Some(SiblingKind::Half),
            _ => None,
        }
    }

    /// Classification from the number of parents two children share.
    pub fn from_shared_parents(shared: usize) -> Option<Self> {
        match shared {
            0 => None,
            1 => Some(SiblingKind::Half),
            _ => Some(SiblingKind::Full),
        }
    }
}

/// Metadata copied identically onto both directions of a `SPOUSE` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpouseMeta {
    pub status: SpouseStatus,
    pub marriage_type: MarriageType,
    /// Ordinal among a person's sequential marriages, starting at 1.
    pub order: u32,
    pub marriage_year: Option<i32>,
    pub divorce_year: Option<i32>,
}

impl Default for SpouseMeta {
    fn default() -> Self {
        Self {
            status: SpouseStatus::Married,
            marriage_type: MarriageType::Civil,
            order: 1,
            marriage_year: None,
            divorce_year: None,
        }
    }
}

/// A requested family relationship. Every variant is stored as a matched
/// pair of directed edges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FamilyLink {
    ParentOf {
        parent: PersonId,
        child: PersonId,
        #[serde(default)]
        parent_kind: ParentKind,
    },
    ChildOf {
        child: PersonId,
        parent: PersonId,
        #[serde(default)]
        parent_kind: ParentKind,
    },
    Spouse {
        a: PersonId,
        b: PersonId,
        #[serde(default)]
        meta: SpouseMeta,
    },
    Sibling {
        a: PersonId,
        b: PersonId,
        sibling_kind: SiblingKind,
    },
}

impl FamilyLink {
    pub fn kind(&self) -> RelationKind {
        match self {
            FamilyLink::ParentOf { .. } => RelationKind::ParentOf,
            FamilyLink::ChildOf { .. } => RelationKind::ChildOf,
            FamilyLink::Spouse { .. } => RelationKind::Spouse,
            FamilyLink::Sibling { .. } => RelationKind::Sibling,
        }
    }

    /// The two endpoints in request order.
    pub fn endpoints(&self) -> (PersonId, PersonId) {
        match *self {
            FamilyLink::ParentOf { parent, child, .. } => (parent, child),
            FamilyLink::ChildOf { child, parent, .. } => (child, parent),
            FamilyLink::Spouse { a, b, .. } | FamilyLink::Sibling { a, b, .. } => (a, b),
        }
    }

    /// `(parent, child, kind)` for either parental direction.
    pub fn parentage(&self) -> Option<(PersonId, PersonId, ParentKind)> {
        match *self {
            FamilyLink::ParentOf { parent, child, parent_kind }
            | FamilyLink::ChildOf { child, parent, parent_kind } => Some((parent, child, parent_kind)),
            _ => None,
        }
    }

    /// The two directed edges this link materialises.
    pub fn edge_pair(&self) -> [FamilyEdge; 2] {
        match *self {
            FamilyLink::ParentOf { parent, child, parent_kind }
            | FamilyLink::ChildOf { child, parent, parent_kind } => {
                let biological = parent_kind.is_biological();
                [
                    FamilyEdge {
                        source: parent,
                        target: child,
                        relation: EdgeRelation::ParentOf { biological },
                    },
                    FamilyEdge {
                        source: child,
                        target: parent,
                        relation: EdgeRelation::ChildOf { biological },
                    },
                ]
            }
            FamilyLink::Spouse { a, b, meta } => [
                FamilyEdge { source: a, target: b, relation: EdgeRelation::Spouse(meta) },
                FamilyEdge { source: b, target: a, relation: EdgeRelation::Spouse(meta) },
            ],
            FamilyLink::Sibling { a, b, sibling_kind } => [
                FamilyEdge {
                    source: a,
                    target: b,
                    relation: EdgeRelation::Sibling { sibling_kind },
                },
                FamilyEdge {
                    source: b,
                    target: a,
                    relation: EdgeRelation::Sibling { sibling_kind },
                },
            ],
        }
    }
}

/// Properties of one directed family edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeRelation {
    ParentOf { biological: bool },
    ChildOf { biological: bool },
    Spouse(SpouseMeta),
    Sibling { sibling_kind: SiblingKind },
}

impl EdgeRelation {
    pub fn kind(&self) -> RelationKind {
        match self {
            EdgeRelation::ParentOf { .. } => RelationKind::ParentOf,
            EdgeRelation::ChildOf { .. } => RelationKind::ChildOf,
            EdgeRelation::Spouse(_) => RelationKind::Spouse,
            EdgeRelation::Sibling { .. } => RelationKind::Sibling,
        }
    }
}

/// A directed family edge between two Persons.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FamilyEdge {
    pub source: PersonId,
    pub target: PersonId,
    pub relation: EdgeRelation,
}

/// Node/edge snapshot of everything a caller can see.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub nodes: Vec<PersonView>,
    pub edges: Vec<FamilyEdge>,
}

// ── Sources ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceConfidence {
    /// Official record (metric book, certificate).
    High,
    /// Semi-official (church book).
    #[default]
    Medium,
    /// Oral history, recollections.
    Low,
}

impl SourceConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceConfidence::High => "high",
            SourceConfidence::Medium => "medium",
            SourceConfidence::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "high" => Some(SourceConfidence::High),
            "medium" => Some(SourceConfidence::Medium),
            "low" => Some(SourceConfidence::Low),
            _ => None,
        }
    }
}

/// How a Source entered the tree.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceProvenance {
    #[default]
    Manual,
    SearchAssisted,
}

/// A citation record. Outlives any Person it is linked to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: SourceId,
    pub owner_id: UserId,
    pub title: String,
    pub archive_ref: Option<String>,
    pub url: Option<String>,
    pub confidence: SourceConfidence,
    pub notes: Option<String>,
    pub provenance: SourceProvenance,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSource {
    pub title: String,
    pub archive_ref: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub confidence: SourceConfidence,
    pub notes: Option<String>,
    #[serde(default)]
    pub provenance: SourceProvenance,
}

impl NewSource {
    pub fn into_source(self, id: SourceId, owner_id: UserId, at: DateTime<Utc>) -> Source {
        Source {
            id,
            owner_id,
            title: self.title,
            archive_ref: self.archive_ref,
            url: self.url,
            confidence: self.confidence,
            notes: self.notes,
            provenance: self.provenance,
            created_at: at,
        }
    }
}

/// What an `EVIDENCED_BY` edge attests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceType {
    Birth,
    Death,
    Marriage,
    General,
}

impl EvidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceType::Birth => "birth",
            EvidenceType::Death => "death",
            EvidenceType::Marriage => "marriage",
            EvidenceType::General => "general",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "birth" => Some(EvidenceType::Birth),
            "death" => Some(EvidenceType::Death),
            "marriage" => Some(EvidenceType::Marriage),
            "general" => Some(EvidenceType::General),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkedSource {
    pub source: Source,
    pub evidence: EvidenceType,
}

// ── Sharing ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Completed,
}

impl InviteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(InviteStatus::Pending),
            "accepted" => Some(InviteStatus::Accepted),
            "completed" => Some(InviteStatus::Completed),
            _ => None,
        }
    }
}

/// Handshake record of the three-step sharing protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invite {
    pub id: InviteId,
    pub owner_id: UserId,
    pub status: InviteStatus,
    pub recipient_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Invite {
    pub fn new(owner_id: UserId, created_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: InviteId::generate(),
            owner_id,
            status: InviteStatus::Pending,
            recipient_id: None,
            created_at,
            expires_at,
            accepted_at: None,
            completed_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Tree-level `SHARED_WITH` edge from an owner to a recipient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShareGrant {
    pub owner_id: UserId,
    pub recipient_id: UserId,
    pub wrapped_tree_key: WrappedKey,
    pub invite_id: InviteId,
    pub granted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_debug_hides_payload() {
        let blob = Blob::new("ENC_c2VjcmV0");
        let debug = format!("{blob:?}");
        assert!(!debug.contains("c2VjcmV0"));
        assert!(blob.is_encrypted());
        assert!(!Blob::new("plain name").is_encrypted());
    }

    #[test]
    fn invite_ids_are_prefixed_and_unique() {
        let a = InviteId::generate();
        let b = InviteId::generate();
        assert!(a.as_str().starts_with("inv_"));
        assert_eq!(a.as_str().len(), 36);
        assert_ne!(a, b);
    }

    #[test]
    fn relation_kind_round_trips_through_cypher_name() {
        for kind in [
            RelationKind::ParentOf,
            RelationKind::ChildOf,
            RelationKind::Spouse,
            RelationKind::Sibling,
        ] {
            assert_eq!(RelationKind::from_cypher(kind.as_cypher()), Some(kind));
        }
        assert_eq!(RelationKind::from_cypher("OWNS"), None);
    }

    #[test]
    fn edge_pair_mirrors_metadata() {
        let (a, b) = (PersonId::new(), PersonId::new());
        let meta = SpouseMeta {
            status: SpouseStatus::Divorced,
            order: 2,
            marriage_year: Some(1921),
            divorce_year: Some(1930),
            ..Default::default()
        };
        let [forward, backward] = FamilyLink::Spouse { a, b, meta }.edge_pair();
        assert_eq!((forward.source, forward.target), (a, b));
        assert_eq!((backward.source, backward.target), (b, a));
        assert_eq!(forward.relation, backward.relation);
    }

    #[test]
    fn child_of_link_normalises_to_parentage() {
        let (parent, child) = (PersonId::new(), PersonId::new());
        let link = FamilyLink::ChildOf { child, parent, parent_kind: ParentKind::Adoptive };
        assert_eq!(link.parentage(), Some((parent, child, ParentKind::Adoptive)));
        let [down, up] = link.edge_pair();
        assert_eq!(down.relation, EdgeRelation::ParentOf { biological: false });
        assert_eq!(up.relation, EdgeRelation::ChildOf { biological: false });
    }

    #[test]
    fn sibling_kind_from_shared_parent_count() {
        assert_eq!(SiblingKind::from_shared_parents(0), None);
        assert_eq!(SiblingKind::from_shared_parents(1), Some(SiblingKind::Half));
        assert_eq!(SiblingKind::from_shared_parents(2), Some(SiblingKind::Full));
    }

    #[test]
    fn viewer_projection_strips_private_notes() {
        let mut blobs = BlobMap::new();
        blobs.insert(BlobField::Name, Blob::new("ENC_name"));
        blobs.insert(BlobField::PrivateNotes, Blob::new("ENC_private"));
        let person = NewPerson { blobs, ..Default::default() }.into_person(
            PersonId::new(),
            UserId::new("alice"),
            Utc::now(),
        );

        let redacted = person.redacted_for_viewer();
        assert!(redacted.blob(BlobField::PrivateNotes).is_none());
        assert!(redacted.blob(BlobField::Name).is_some());
    }

    #[test]
    fn family_link_serializes_with_kind_tag() {
        let link = FamilyLink::Sibling {
            a: PersonId::new(),
            b: PersonId::new(),
            sibling_kind: SiblingKind::Half,
        };
        let json = serde_json::to_value(link).unwrap();
        assert_eq!(json["kind"], "SIBLING");
        assert_eq!(json["sibling_kind"], "half");
    }

    #[test]
    fn gender_serializes_as_tag() {
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"F\"");
        assert_eq!(Gender::from_tag("M"), Some(Gender::Male));
        assert_eq!(Gender::from_tag("X"), None);
    }
}
