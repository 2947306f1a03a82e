//! Write operations for the family graph.
//!
//! Every method is one transaction. Multi-statement writes (Person plus
//! `OWNS` edge plus viewer fan-out, finalize plus grant plus fan-out) run
//! inside an explicit `Txn` and are rolled back when a precondition fails.
//! Edge pairs use MERGE so re-linking updates in place.

use chrono::{DateTime, Utc};
use neo4rs::{query, Query, Txn};
use tracing::{debug, info};

use rodovid_core::store::{GhostContext, Retirement};
use rodovid_core::types::{
    BlobField, BlobMap, EvidenceType, FamilyLink, Gender, Invite, InviteId, InviteStatus,
    KeyRotation, Person, PersonId, PersonPatch, ShareGrant, Source, SourceId, Tombstone, User,
    UserId, WrappedKey,
};

use crate::client::{count, txn_one, GraphClient, GraphError, Result};
use crate::encode::{
    blob_param, encode_dt, encode_provenance, encode_year, invite_from_node, owner_column,
    person_from_node, user_from_node,
};

// ── Cypher ───────────────────────────────────────────────────────

const CREATE_PERSON: &str = "
    MATCH (o:User {id: $owner_id})
    CREATE (p:Person {
      id: $id, gender: $gender,
      birth_year_approx: $birth_year, death_year_approx: $death_year,
      is_root: $is_root, is_deleted: false, created_at: $created_at,
      name_blob: $name_blob, birth_date_blob: $birth_date_blob,
      death_date_blob: $death_date_blob, birth_place_blob: $birth_place_blob,
      death_place_blob: $death_place_blob, private_notes_blob: $private_notes_blob,
      shared_notes_blob: $shared_notes_blob
    })
    CREATE (o)-[:OWNS {created_at: $created_at}]->(p)
    RETURN count(p) AS created";

/// Viewer edges for every recipient the owner has already granted.
const FAN_OUT_NEW_PERSON: &str = "
    MATCH (o:User {id: $owner_id})-[g:SHARED_WITH]->(r:User)
    MATCH (o)-[:OWNS]->(p:Person {id: $id})
    MERGE (r)-[s:SHARED_WITH]->(p)
    SET s.wrapped_key = g.wrapped_key, s.invite_id = g.invite_id, s.granted_at = $created_at
    RETURN count(s) AS shared";

const UPDATE_PERSON: &str = "
    MATCH (o:User {id: $owner_id})-[:OWNS]->(p:Person {id: $id})
    SET p.gender = coalesce($gender, p.gender),
        p.birth_year_approx = coalesce($birth_year, p.birth_year_approx),
        p.death_year_approx = coalesce($death_year, p.death_year_approx),
        p.is_root = coalesce($is_root, p.is_root),
        p.name_blob = coalesce($name_blob, p.name_blob),
        p.birth_date_blob = coalesce($birth_date_blob, p.birth_date_blob),
        p.death_date_blob = coalesce($death_date_blob, p.death_date_blob),
        p.birth_place_blob = coalesce($birth_place_blob, p.birth_place_blob),
        p.death_place_blob = coalesce($death_place_blob, p.death_place_blob),
        p.private_notes_blob = coalesce($private_notes_blob, p.private_notes_blob),
        p.shared_notes_blob = coalesce($shared_notes_blob, p.shared_notes_blob),
        p.updated_at = $now
    RETURN p, o.id AS owner_id";

const RETIRE_LOOKUP: &str = "
    MATCH (o:User {id: $owner_id})-[:OWNS]->(p:Person {id: $id})
    OPTIONAL MATCH (p)-[c:PARENT_OF]->(:Person)
    RETURN p.gender AS gender, count(c) AS children";

/// Family-edge distance to the nearest childless Person of the same owner.
const NEAREST_LEAF: &str = "
    MATCH (p:Person {id: $id})
    MATCH (o:User {id: $owner_id})-[:OWNS]->(leaf:Person)
    WHERE leaf.id <> $id AND NOT (leaf)-[:PARENT_OF]->(:Person)
    MATCH path = shortestPath((p)-[:PARENT_OF|CHILD_OF|SPOUSE|SIBLING*]-(leaf))
    RETURN min(length(path)) AS distance";

const GHOST_PERSON: &str = "
    MATCH (p:Person {id: $id})
    SET p.is_deleted = true, p.ghost_name = $ghost_name,
        p.deleted_at = $now, p.updated_at = $now";

const HARD_DELETE_PERSON: &str = "
    MATCH (p:Person {id: $id})
    DETACH DELETE p";

const LINK_PARENT: &str = "
    MATCH (parent:Person {id: $parent}), (child:Person {id: $child})
    MERGE (parent)-[down:PARENT_OF]->(child)
    MERGE (child)-[up:CHILD_OF]->(parent)
    SET down.is_biological = $biological, up.is_biological = $biological
    RETURN count(*) AS linked";

const LINK_SPOUSE: &str = "
    MATCH (a:Person {id: $a}), (b:Person {id: $b})
    MERGE (a)-[ab:SPOUSE]->(b)
    MERGE (b)-[ba:SPOUSE]->(a)
    SET ab.status = $status, ba.status = $status,
        ab.marriage_type = $marriage_type, ba.marriage_type = $marriage_type,
        ab.order = $order, ba.order = $order,
        ab.marriage_year = $marriage_year, ba.marriage_year = $marriage_year,
        ab.divorce_year = $divorce_year, ba.divorce_year = $divorce_year
    RETURN count(*) AS linked";

const LINK_SIBLING: &str = "
    MATCH (a:Person {id: $a}), (b:Person {id: $b})
    MERGE (a)-[ab:SIBLING]->(b)
    MERGE (b)-[ba:SIBLING]->(a)
    SET ab.sibling_type = $sibling_type, ba.sibling_type = $sibling_type
    RETURN count(*) AS linked";

const FINALIZE_FAN_OUT: &str = "
    MATCH (o:User {id: $owner_id})-[:OWNS]->(p:Person)
    MATCH (r:User {id: $recipient_id})
    MERGE (r)-[s:SHARED_WITH]->(p)
    SET s.wrapped_key = $wrapped_key, s.invite_id = $invite_id, s.granted_at = $now
    RETURN count(s) AS shared";

impl GraphClient {
    // ── Users ────────────────────────────────────────────────────

    /// Create a User node. Returns `false` if the id is taken.
    pub async fn create_user(&self, user: &User) -> Result<bool> {
        let mut txn = self.start_txn().await?;

        let existing = txn_one(
            &mut txn,
            query("MATCH (u:User {id: $id}) RETURN count(u) AS cnt").param("id", user.id.as_str()),
        )
        .await?;
        if count(existing, "cnt") > 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        let q = query(
            "CREATE (u:User {
               id: $id, public_key: $public_key,
               encrypted_private_key: $encrypted_private_key, key_salt: $key_salt,
               created_at: $created_at
             })",
        )
        .param("id", user.id.as_str())
        .param("public_key", user.public_key.as_str())
        .param(
            "encrypted_private_key",
            user.encrypted_private_key.as_ref().map(|b| b.as_str().to_string()),
        )
        .param("key_salt", user.key_salt.clone())
        .param("created_at", encode_dt(user.created_at));
        txn.run(q).await?;
        txn.commit().await?;

        info!(user_id = %user.id, "User registered");
        Ok(true)
    }

    pub async fn rotate_keys(
        &self,
        id: &UserId,
        rotation: &KeyRotation,
        at: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let q = query(
            "MATCH (u:User {id: $id})
             SET u.public_key = coalesce($public_key, u.public_key),
                 u.encrypted_private_key = coalesce($encrypted_private_key, u.encrypted_private_key),
                 u.key_salt = coalesce($key_salt, u.key_salt),
                 u.updated_at = $now
             RETURN u",
        )
        .param("id", id.as_str())
        .param("public_key", rotation.public_key.clone())
        .param(
            "encrypted_private_key",
            rotation.encrypted_private_key.as_ref().map(|b| b.as_str().to_string()),
        )
        .param("key_salt", rotation.key_salt.clone())
        .param("now", encode_dt(at));

        match self.query_one(q).await? {
            Some(row) => {
                let node: neo4rs::Node = row.get("u").map_err(|e| {
                    GraphError::Serialization(format!("Failed to deserialize user: {e}"))
                })?;
                Ok(Some(user_from_node(&node)?))
            }
            None => Ok(None),
        }
    }

    // ── Persons ──────────────────────────────────────────────────

    /// Create a Person, its `OWNS` edge and viewer fan-out in one transaction.
    pub async fn create_person(&self, person: &Person) -> Result<bool> {
        let mut txn = self.start_txn().await?;

        let q = with_blobs(query(CREATE_PERSON), &person.blobs)
            .param("owner_id", person.owner_id.as_str())
            .param("id", person.id.to_string())
            .param("gender", person.gender.map(|g| g.as_tag()))
            .param("birth_year", encode_year(person.birth_year))
            .param("death_year", encode_year(person.death_year))
            .param("is_root", person.is_root)
            .param("created_at", encode_dt(person.created_at));

        if count(txn_one(&mut txn, q).await?, "created") == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        let fan_out = query(FAN_OUT_NEW_PERSON)
            .param("owner_id", person.owner_id.as_str())
            .param("id", person.id.to_string())
            .param("created_at", encode_dt(person.created_at));
        let shared = count(txn_one(&mut txn, fan_out).await?, "shared");
        txn.commit().await?;

        info!(person_id = %person.id, owner = %person.owner_id, shared, "Person created");
        Ok(true)
    }

    pub async fn update_person(
        &self,
        owner: &UserId,
        id: PersonId,
        patch: &PersonPatch,
        at: DateTime<Utc>,
    ) -> Result<Option<Person>> {
        let q = with_blobs(query(UPDATE_PERSON), &patch.blobs)
            .param("owner_id", owner.as_str())
            .param("id", id.to_string())
            .param("gender", patch.gender.map(|g| g.as_tag()))
            .param("birth_year", encode_year(patch.birth_year))
            .param("death_year", encode_year(patch.death_year))
            .param("is_root", patch.is_root)
            .param("now", encode_dt(at));

        match self.query_one(q).await? {
            Some(row) => {
                let node: neo4rs::Node = row.get("p").map_err(|e| {
                    GraphError::Serialization(format!("Failed to deserialize person: {e}"))
                })?;
                let owner_id = owner_column(row.get("owner_id"), "Person")?;
                Ok(Some(person_from_node(&node, owner_id)?))
            }
            None => Ok(None),
        }
    }

    /// Ghost or hard-delete an owned Person in one transaction.
    pub async fn retire(
        &self,
        owner: &UserId,
        id: PersonId,
        at: DateTime<Utc>,
        namer: impl FnOnce(GhostContext) -> String,
    ) -> Result<Retirement> {
        let mut txn = self.start_txn().await?;

        let lookup = query(RETIRE_LOOKUP)
            .param("owner_id", owner.as_str())
            .param("id", id.to_string());
        let Some(row) = txn_one(&mut txn, lookup).await? else {
            txn.rollback().await?;
            return Ok(Retirement::NotOwned);
        };

        let children = row.get::<i64>("children").unwrap_or(0);
        if children == 0 {
            txn.run(query(HARD_DELETE_PERSON).param("id", id.to_string())).await?;
            txn.commit().await?;
            info!(person_id = %id, "Person deleted");
            return Ok(Retirement::Deleted);
        }

        let gender = row
            .get::<String>("gender")
            .ok()
            .and_then(|g| Gender::from_tag(&g));
        let leaf_distance = nearest_leaf(&mut txn, owner, id).await?;
        let ghost_name = namer(GhostContext { gender, leaf_distance });

        let q = query(GHOST_PERSON)
            .param("id", id.to_string())
            .param("ghost_name", ghost_name.as_str())
            .param("now", encode_dt(at));
        txn.run(q).await?;
        txn.commit().await?;

        info!(person_id = %id, children, ?leaf_distance, "Person converted to ghost");
        Ok(Retirement::Ghosted(Tombstone { ghost_name, deleted_at: at }))
    }

    pub async fn unshare_person(&self, viewer: &UserId, id: PersonId) -> Result<bool> {
        let q = query(
            "MATCH (u:User {id: $viewer})-[s:SHARED_WITH]->(p:Person {id: $id})
             DELETE s
             RETURN count(*) AS removed",
        )
        .param("viewer", viewer.as_str())
        .param("id", id.to_string());

        let removed = count(self.query_one(q).await?, "removed");
        if removed > 0 {
            info!(person_id = %id, viewer = %viewer, "Person unshared");
        }
        Ok(removed > 0)
    }

    pub async fn write_guest_note(&self, viewer: &UserId, id: PersonId, note: &str) -> Result<bool> {
        let q = query(
            "MATCH (u:User {id: $viewer})-[s:SHARED_WITH]->(p:Person {id: $id})
             SET s.guest_note_blob = $note
             RETURN count(s) AS updated",
        )
        .param("viewer", viewer.as_str())
        .param("id", id.to_string())
        .param("note", note);

        Ok(count(self.query_one(q).await?, "updated") > 0)
    }

    // ── Family edges ─────────────────────────────────────────────

    /// Merge both directed edges of a link. Each kind has its own fixed
    /// statement so the pair is written atomically.
    pub async fn merge_link(&self, link: &FamilyLink) -> Result<bool> {
        let q = match *link {
            FamilyLink::ParentOf { parent, child, parent_kind }
            | FamilyLink::ChildOf { child, parent, parent_kind } => query(LINK_PARENT)
                .param("parent", parent.to_string())
                .param("child", child.to_string())
                .param("biological", parent_kind.is_biological()),
            FamilyLink::Spouse { a, b, meta } => query(LINK_SPOUSE)
                .param("a", a.to_string())
                .param("b", b.to_string())
                .param("status", meta.status.as_str())
                .param("marriage_type", meta.marriage_type.as_str())
                .param("order", i64::from(meta.order))
                .param("marriage_year", encode_year(meta.marriage_year))
                .param("divorce_year", encode_year(meta.divorce_year)),
            FamilyLink::Sibling { a, b, sibling_kind } => query(LINK_SIBLING)
                .param("a", a.to_string())
                .param("b", b.to_string())
                .param("sibling_type", sibling_kind.as_str()),
        };

        let linked = count(self.query_one(q).await?, "linked") > 0;
        debug!(kind = link.kind().as_cypher(), linked, "Family link merged");
        Ok(linked)
    }

    // ── Sources ──────────────────────────────────────────────────

    pub async fn create_source(&self, source: &Source) -> Result<bool> {
        let q = query(
            "MATCH (o:User {id: $owner_id})
             CREATE (s:Source {
               id: $id, title: $title, archive_ref: $archive_ref, url: $url,
               confidence: $confidence, notes: $notes, provenance: $provenance,
               created_at: $created_at
             })
             CREATE (o)-[:OWNS]->(s)
             RETURN count(s) AS created",
        )
        .param("owner_id", source.owner_id.as_str())
        .param("id", source.id.to_string())
        .param("title", source.title.as_str())
        .param("archive_ref", source.archive_ref.clone())
        .param("url", source.url.clone())
        .param("confidence", source.confidence.as_str())
        .param("notes", source.notes.clone())
        .param("provenance", encode_provenance(source.provenance))
        .param("created_at", encode_dt(source.created_at));

        Ok(count(self.query_one(q).await?, "created") > 0)
    }

    /// Delete an owned Source and its `EVIDENCED_BY` edges.
    pub async fn remove_source(&self, owner: &UserId, id: SourceId) -> Result<bool> {
        let q = query(
            "MATCH (o:User {id: $owner_id})-[:OWNS]->(s:Source {id: $id})
             DETACH DELETE s
             RETURN count(s) AS deleted",
        )
        .param("owner_id", owner.as_str())
        .param("id", id.to_string());

        Ok(count(self.query_one(q).await?, "deleted") > 0)
    }

    pub async fn merge_evidence(
        &self,
        person: PersonId,
        source: SourceId,
        evidence: EvidenceType,
    ) -> Result<bool> {
        let q = query(
            "MATCH (p:Person {id: $person_id}), (s:Source {id: $source_id})
             MERGE (p)-[e:EVIDENCED_BY {evidence_type: $evidence_type}]->(s)
             RETURN count(e) AS linked",
        )
        .param("person_id", person.to_string())
        .param("source_id", source.to_string())
        .param("evidence_type", evidence.as_str());

        Ok(count(self.query_one(q).await?, "linked") > 0)
    }

    // ── Invites & grants ─────────────────────────────────────────

    pub async fn create_invite(&self, invite: &Invite) -> Result<bool> {
        let q = query(
            "MATCH (o:User {id: $owner_id})
             CREATE (i:Invite {
               id: $id, status: $status, created_at: $created_at, expires_at: $expires_at
             })
             CREATE (o)-[:CREATED_INVITE]->(i)
             RETURN count(i) AS created",
        )
        .param("owner_id", invite.owner_id.as_str())
        .param("id", invite.id.as_str())
        .param("status", invite.status.as_str())
        .param("created_at", encode_dt(invite.created_at))
        .param("expires_at", encode_dt(invite.expires_at));

        Ok(count(self.query_one(q).await?, "created") > 0)
    }

    /// `pending` → `accepted`. The status guard in the update makes
    /// concurrent accepts of the same invite race to a single winner.
    pub async fn accept(
        &self,
        id: &InviteId,
        recipient: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Invite>> {
        let mut txn = self.start_txn().await?;

        let Some(invite) = load_invite(&mut txn, id).await? else {
            txn.rollback().await?;
            return Ok(None);
        };
        let recipient_exists = count(
            txn_one(
                &mut txn,
                query("MATCH (u:User {id: $id}) RETURN count(u) AS cnt").param("id", recipient.as_str()),
            )
            .await?,
            "cnt",
        ) > 0;

        if invite.status != InviteStatus::Pending
            || invite.is_expired(at)
            || !recipient_exists
            || invite.owner_id == *recipient
        {
            txn.rollback().await?;
            return Ok(None);
        }

        let q = query(
            "MATCH (i:Invite {id: $id})
             WHERE i.status = 'pending'
             SET i.status = 'accepted', i.recipient_id = $recipient_id, i.accepted_at = $now
             RETURN count(i) AS cnt",
        )
        .param("id", id.as_str())
        .param("recipient_id", recipient.as_str())
        .param("now", encode_dt(at));
        if count(txn_one(&mut txn, q).await?, "cnt") == 0 {
            txn.rollback().await?;
            return Ok(None);
        }
        txn.commit().await?;

        info!(invite_id = %id, recipient = %recipient, "Invite accepted");
        Ok(Some(Invite {
            status: InviteStatus::Accepted,
            recipient_id: Some(recipient.clone()),
            accepted_at: Some(at),
            ..invite
        }))
    }

    /// `accepted` → `completed`, plus the grant and viewer fan-out.
    pub async fn finalize(
        &self,
        id: &InviteId,
        owner: &UserId,
        key: &WrappedKey,
        at: DateTime<Utc>,
    ) -> Result<Option<ShareGrant>> {
        let mut txn = self.start_txn().await?;

        let invite = load_invite(&mut txn, id).await?;
        let recipient = match invite {
            Some(Invite {
                status: InviteStatus::Accepted,
                recipient_id: Some(recipient),
                owner_id,
                expires_at,
                ..
            }) if owner_id == *owner && at < expires_at => recipient,
            _ => {
                txn.rollback().await?;
                return Ok(None);
            }
        };

        let transition = query(
            "MATCH (i:Invite {id: $id})
             WHERE i.status = 'accepted'
             SET i.status = 'completed', i.completed_at = $now
             RETURN count(i) AS cnt",
        )
        .param("id", id.as_str())
        .param("now", encode_dt(at));
        if count(txn_one(&mut txn, transition).await?, "cnt") == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let grant = query(
            "MATCH (o:User {id: $owner_id}), (r:User {id: $recipient_id})
             MERGE (o)-[g:SHARED_WITH]->(r)
             SET g.wrapped_key = $wrapped_key, g.invite_id = $invite_id, g.granted_at = $now
             RETURN count(g) AS cnt",
        )
        .param("owner_id", owner.as_str())
        .param("recipient_id", recipient.as_str())
        .param("wrapped_key", key.as_str())
        .param("invite_id", id.as_str())
        .param("now", encode_dt(at));
        if count(txn_one(&mut txn, grant).await?, "cnt") == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let fan_out = query(FINALIZE_FAN_OUT)
            .param("owner_id", owner.as_str())
            .param("recipient_id", recipient.as_str())
            .param("wrapped_key", key.as_str())
            .param("invite_id", id.as_str())
            .param("now", encode_dt(at));
        let shared = count(txn_one(&mut txn, fan_out).await?, "shared");
        txn.commit().await?;

        info!(invite_id = %id, owner = %owner, recipient = %recipient, shared, "Share finalized");
        Ok(Some(ShareGrant {
            owner_id: owner.clone(),
            recipient_id: recipient,
            wrapped_tree_key: key.clone(),
            invite_id: id.clone(),
            granted_at: at,
        }))
    }

    /// Delete the grant and the recipient's viewer edges on the owner's Persons.
    pub async fn revoke(&self, owner: &UserId, recipient: &UserId) -> Result<bool> {
        let mut txn = self.start_txn().await?;

        let grant = query(
            "MATCH (o:User {id: $owner_id})-[g:SHARED_WITH]->(r:User {id: $recipient_id})
             DELETE g
             RETURN count(*) AS cnt",
        )
        .param("owner_id", owner.as_str())
        .param("recipient_id", recipient.as_str());
        let existed = count(txn_one(&mut txn, grant).await?, "cnt") > 0;

        let viewer_edges = query(
            "MATCH (o:User {id: $owner_id})-[:OWNS]->(p:Person)<-[s:SHARED_WITH]-(r:User {id: $recipient_id})
             DELETE s
             RETURN count(*) AS cnt",
        )
        .param("owner_id", owner.as_str())
        .param("recipient_id", recipient.as_str());
        let removed = count(txn_one(&mut txn, viewer_edges).await?, "cnt");
        txn.commit().await?;

        if existed {
            info!(owner = %owner, recipient = %recipient, removed, "Share revoked");
        }
        Ok(existed)
    }
}

// ── Helpers ──────────────────────────────────────────────────────

/// Bind every blob property; absent fields bind null.
fn with_blobs(mut q: Query, blobs: &BlobMap) -> Query {
    for field in BlobField::ALL {
        q = q.param(field.property(), blob_param(blobs, field));
    }
    q
}

async fn nearest_leaf(txn: &mut Txn, owner: &UserId, id: PersonId) -> Result<Option<u32>> {
    let q = query(NEAREST_LEAF)
        .param("owner_id", owner.as_str())
        .param("id", id.to_string());
    Ok(txn_one(txn, q)
        .await?
        .and_then(|row| row.get::<i64>("distance").ok())
        .and_then(|d| u32::try_from(d).ok()))
}

async fn load_invite(txn: &mut Txn, id: &InviteId) -> Result<Option<Invite>> {
    let q = query(
        "MATCH (o:User)-[:CREATED_INVITE]->(i:Invite {id: $id})
         RETURN i, o.id AS owner_id",
    )
    .param("id", id.as_str());

    match txn_one(txn, q).await? {
        Some(row) => {
            let node: neo4rs::Node = row.get("i").map_err(|e| {
                GraphError::Serialization(format!("Failed to deserialize invite: {e}"))
            })?;
            let owner_id = owner_column(row.get("owner_id"), "Invite")?;
            Ok(Some(invite_from_node(&node, owner_id)?))
        }
        None => Ok(None),
    }
}
