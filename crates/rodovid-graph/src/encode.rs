//! Encoding and decoding between domain types and Neo4j properties.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings (microsecond
//! precision, `Z` suffix) so they order lexicographically. UUIDs are hyphenated
//! lowercase strings. Enums are stored by their lowercase tag. Absent
//! optional values are never written; Neo4j drops properties set to null.

use chrono::{DateTime, SecondsFormat, Utc};
use neo4rs::{Node, Relation};
use uuid::Uuid;

use rodovid_core::types::{
    Blob, BlobField, BlobMap, EdgeRelation, Gender, Invite, InviteId, InviteStatus,
    MarriageType, Person, PersonId, RelationKind, ShareGrant, SiblingKind, Source,
    SourceConfidence, SourceId, SourceProvenance, SpouseMeta, SpouseStatus, Tombstone, User,
    UserId, WrappedKey,
};

use crate::client::{GraphError, Result};

// ── Scalars ──────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GraphError::Serialization(format!("bad timestamp {s:?}: {e}")))
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| GraphError::Serialization(format!("bad uuid {s:?}: {e}")))
}

pub fn encode_year(year: Option<i32>) -> Option<i64> {
    year.map(i64::from)
}

pub fn encode_provenance(p: SourceProvenance) -> &'static str {
    match p {
        SourceProvenance::Manual => "manual",
        SourceProvenance::SearchAssisted => "search_assisted",
    }
}

fn decode_provenance(s: &str) -> SourceProvenance {
    match s {
        "search_assisted" => SourceProvenance::SearchAssisted,
        _ => SourceProvenance::Manual,
    }
}

// ── Property access ──────────────────────────────────────────────

fn required(node: &Node, key: &str) -> Result<String> {
    node.get::<String>(key)
        .map_err(|e| GraphError::Serialization(format!("missing property {key}: {e}")))
}

fn optional_str(node: &Node, key: &str) -> Option<String> {
    node.get::<String>(key).ok()
}

fn optional_year(node: &Node, key: &str) -> Option<i32> {
    node.get::<i64>(key).ok().and_then(|y| i32::try_from(y).ok())
}

fn optional_dt(node: &Node, key: &str) -> Result<Option<DateTime<Utc>>> {
    optional_str(node, key).map(|s| decode_dt(&s)).transpose()
}

fn rel_year(rel: &Relation, key: &str) -> Option<i32> {
    rel.get::<i64>(key).ok().and_then(|y| i32::try_from(y).ok())
}

// ── Nodes ────────────────────────────────────────────────────────

pub fn user_from_node(node: &Node) -> Result<User> {
    Ok(User {
        id: UserId(required(node, "id")?),
        public_key: optional_str(node, "public_key").unwrap_or_default(),
        encrypted_private_key: optional_str(node, "encrypted_private_key").map(Blob::new),
        key_salt: optional_str(node, "key_salt"),
        created_at: decode_dt(&required(node, "created_at")?)?,
        updated_at: optional_dt(node, "updated_at")?,
    })
}

/// Decode a `:Person` node. Ownership lives on the `OWNS` edge, so the
/// owner id is read from the query row.
pub fn person_from_node(node: &Node, owner_id: String) -> Result<Person> {
    let mut blobs = BlobMap::new();
    for field in BlobField::ALL {
        if let Some(value) = optional_str(node, field.property()) {
            blobs.insert(field, Blob::new(value));
        }
    }

    let tombstone = if node.get::<bool>("is_deleted").unwrap_or(false) {
        Some(Tombstone {
            ghost_name: optional_str(node, "ghost_name").unwrap_or_default(),
            deleted_at: decode_dt(&required(node, "deleted_at")?)?,
        })
    } else {
        None
    };

    Ok(Person {
        id: PersonId(decode_uuid(&required(node, "id")?)?),
        owner_id: UserId(owner_id),
        blobs,
        gender: optional_str(node, "gender").and_then(|g| Gender::from_tag(&g)),
        birth_year: optional_year(node, "birth_year_approx"),
        death_year: optional_year(node, "death_year_approx"),
        is_root: node.get::<bool>("is_root").unwrap_or(false),
        tombstone,
        created_at: decode_dt(&required(node, "created_at")?)?,
        updated_at: optional_dt(node, "updated_at")?,
    })
}

pub fn source_from_node(node: &Node, owner_id: String) -> Result<Source> {
    Ok(Source {
        id: SourceId(decode_uuid(&required(node, "id")?)?),
        owner_id: UserId(owner_id),
        title: optional_str(node, "title").unwrap_or_default(),
        archive_ref: optional_str(node, "archive_ref"),
        url: optional_str(node, "url"),
        confidence: optional_str(node, "confidence")
            .and_then(|c| SourceConfidence::parse(&c))
            .unwrap_or_default(),
        notes: optional_str(node, "notes"),
        provenance: optional_str(node, "provenance")
            .map(|p| decode_provenance(&p))
            .unwrap_or_default(),
        created_at: decode_dt(&required(node, "created_at")?)?,
    })
}

pub fn invite_from_node(node: &Node, owner_id: String) -> Result<Invite> {
    let status_raw = required(node, "status")?;
    let status = InviteStatus::parse(&status_raw)
        .ok_or_else(|| GraphError::Serialization(format!("unknown invite status {status_raw:?}")))?;

    Ok(Invite {
        id: InviteId(required(node, "id")?),
        owner_id: UserId(owner_id),
        status,
        recipient_id: optional_str(node, "recipient_id").map(UserId),
        created_at: decode_dt(&required(node, "created_at")?)?,
        expires_at: decode_dt(&required(node, "expires_at")?)?,
        accepted_at: optional_dt(node, "accepted_at")?,
        completed_at: optional_dt(node, "completed_at")?,
    })
}

// ── Relationships ────────────────────────────────────────────────

pub fn spouse_meta(rel: &Relation) -> SpouseMeta {
    let defaults = SpouseMeta::default();
    SpouseMeta {
        status: rel
            .get::<String>("status")
            .ok()
            .and_then(|s| SpouseStatus::parse(&s))
            .unwrap_or(defaults.status),
        marriage_type: rel
            .get::<String>("marriage_type")
            .ok()
            .and_then(|s| MarriageType::parse(&s))
            .unwrap_or(defaults.marriage_type),
        order: rel
            .get::<i64>("order")
            .ok()
            .and_then(|o| u32::try_from(o).ok())
            .unwrap_or(defaults.order),
        marriage_year: rel_year(rel, "marriage_year"),
        divorce_year: rel_year(rel, "divorce_year"),
    }
}

pub fn sibling_kind(rel: &Relation) -> Result<SiblingKind> {
    let raw = rel
        .get::<String>("sibling_type")
        .map_err(|e| GraphError::Serialization(format!("missing sibling_type: {e}")))?;
    SiblingKind::parse(&raw)
        .ok_or_else(|| GraphError::Serialization(format!("unknown sibling type {raw:?}")))
}

pub fn is_biological(rel: &Relation) -> bool {
    rel.get::<bool>("is_biological").unwrap_or(true)
}

/// Decode the properties of one directed family edge.
pub fn edge_relation(rel_type: &str, rel: &Relation) -> Result<EdgeRelation> {
    let kind = RelationKind::from_cypher(rel_type)
        .ok_or_else(|| GraphError::Serialization(format!("not a family edge: {rel_type}")))?;
    Ok(match kind {
        RelationKind::ParentOf => EdgeRelation::ParentOf { biological: is_biological(rel) },
        RelationKind::ChildOf => EdgeRelation::ChildOf { biological: is_biological(rel) },
        RelationKind::Spouse => EdgeRelation::Spouse(spouse_meta(rel)),
        RelationKind::Sibling => EdgeRelation::Sibling { sibling_kind: sibling_kind(rel)? },
    })
}

/// Decode a User→User `SHARED_WITH` grant.
pub fn grant_from_rel(rel: &Relation, owner_id: String, recipient_id: String) -> Result<ShareGrant> {
    let wrapped = rel
        .get::<String>("wrapped_key")
        .map_err(|e| GraphError::Serialization(format!("grant without wrapped_key: {e}")))?;
    let invite = rel
        .get::<String>("invite_id")
        .map_err(|e| GraphError::Serialization(format!("grant without invite_id: {e}")))?;
    let granted_at = rel
        .get::<String>("granted_at")
        .map_err(|e| GraphError::Serialization(format!("grant without granted_at: {e}")))?;

    Ok(ShareGrant {
        owner_id: UserId(owner_id),
        recipient_id: UserId(recipient_id),
        wrapped_tree_key: WrappedKey::new(wrapped),
        invite_id: InviteId(invite),
        granted_at: decode_dt(&granted_at)?,
    })
}

/// The `owner_id` column read next to a node. Every Person, Source and
/// Invite hangs off a User, so a missing or blank owner means a corrupt graph.
pub fn owner_column<E: std::fmt::Display>(
    column: std::result::Result<String, E>,
    what: &str,
) -> Result<String> {
    match column {
        Ok(owner_id) if !owner_id.trim().is_empty() => Ok(owner_id),
        Ok(_) => Err(GraphError::Corrupt(format!("{what} has a blank owner"))),
        Err(e) => Err(GraphError::Corrupt(format!("{what} has no owner: {e}"))),
    }
}

/// Blob property value for a field, or null.
pub fn blob_param(blobs: &BlobMap, field: BlobField) -> Option<String> {
    blobs.get(&field).map(|b| b.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_round_trip_through_rfc3339() {
        use chrono::SubsecRound;
        let now = Utc::now().trunc_subsecs(6);
        assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
        assert!(decode_dt("yesterday").is_err());
    }

    #[test]
    fn encoded_timestamps_sort_chronologically() {
        let early = decode_dt("2024-01-01T00:00:00Z").unwrap();
        let late = decode_dt("2024-01-01T00:00:00.500Z").unwrap();
        assert!(encode_dt(early) < encode_dt(late));
        assert_eq!(encode_dt(early), "2024-01-01T00:00:00.000000Z");
    }

    #[test]
    fn years_widen_to_i64() {
        assert_eq!(encode_year(Some(1900)), Some(1900i64));
        assert_eq!(encode_year(None), None);
    }

    #[test]
    fn missing_owner_is_corrupt() {
        assert_eq!(owner_column::<&str>(Ok("alice".into()), "Invite").unwrap(), "alice");
        assert!(matches!(owner_column(Err("null"), "Invite"), Err(GraphError::Corrupt(_))));
        assert!(matches!(owner_column::<&str>(Ok(" ".into()), "Person"), Err(GraphError::Corrupt(_))));
    }

    #[test]
    fn provenance_tags() {
        for p in [SourceProvenance::Manual, SourceProvenance::SearchAssisted] {
            assert_eq!(decode_provenance(encode_provenance(p)), p);
        }
    }
}
