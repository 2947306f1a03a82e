//! Read operations for the family graph.

use std::collections::HashSet;

use neo4rs::{query, Row};

use rodovid_core::store::{Access, VisibleGraph};
use rodovid_core::types::{
    Blob, EvidenceType, FamilyEdge, Invite, InviteId, LinkedSource, ParentKind, Person,
    PersonId, PersonView, ShareGrant, SiblingKind, Source, SourceId, SpouseMeta, User, UserId,
};

use crate::client::{count, GraphClient, GraphError, Result};
use crate::encode::{
    decode_uuid, edge_relation, grant_from_rel, invite_from_node, is_biological, owner_column,
    person_from_node, sibling_kind, source_from_node, spouse_meta, user_from_node,
};

/// Persons the caller owns or holds a viewer edge to.
const VISIBLE_PERSONS: &str = "
    MATCH (u:User {id: $caller})
    MATCH (o:User)-[:OWNS]->(p:Person)
    WHERE o = u OR (u)-[:SHARED_WITH]->(p)
    OPTIONAL MATCH (u)-[s:SHARED_WITH]->(p)
    RETURN p, o.id AS owner_id, o = u AS is_owner, s.guest_note_blob AS guest_note";

const VISIBLE_EDGES: &str = "
    MATCH (u:User {id: $caller})
    MATCH (o:User)-[:OWNS]->(p:Person)
    WHERE o = u OR (u)-[:SHARED_WITH]->(p)
    MATCH (p)-[r:PARENT_OF|CHILD_OF|SPOUSE|SIBLING]->(q:Person)
    RETURN p.id AS source, q.id AS target, type(r) AS rel_type, r";

impl GraphClient {
    // ── Users ────────────────────────────────────────────────────

    pub async fn find_user(&self, id: &UserId) -> Result<Option<User>> {
        let q = query("MATCH (u:User {id: $id}) RETURN u").param("id", id.as_str());
        match self.query_one(q).await? {
            Some(row) => Ok(Some(user_from_node(&node(&row, "u")?)?)),
            None => Ok(None),
        }
    }

    // ── Persons ──────────────────────────────────────────────────

    pub async fn find_person(&self, id: PersonId) -> Result<Option<Person>> {
        let q = query(
            "MATCH (o:User)-[:OWNS]->(p:Person {id: $id})
             RETURN p, o.id AS owner_id",
        )
        .param("id", id.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(Some(person_row(&row, "p")?)),
            None => Ok(None),
        }
    }

    pub async fn access_of(&self, caller: &UserId, id: PersonId) -> Result<Access> {
        let q = query(
            "MATCH (p:Person {id: $id})
             OPTIONAL MATCH (u:User {id: $caller})-[:OWNS]->(p)
             OPTIONAL MATCH (v:User {id: $caller})-[s:SHARED_WITH]->(p)
             RETURN u IS NOT NULL AS owns, s IS NOT NULL AS shared, s.guest_note_blob AS guest_note",
        )
        .param("caller", caller.as_str())
        .param("id", id.to_string());

        let Some(row) = self.query_one(q).await? else {
            return Ok(Access::None);
        };
        if row.get::<bool>("owns").unwrap_or(false) {
            return Ok(Access::Owner);
        }
        if row.get::<bool>("shared").unwrap_or(false) {
            let guest_note = row.get::<String>("guest_note").ok().map(Blob::new);
            return Ok(Access::Viewer { guest_note });
        }
        Ok(Access::None)
    }

    // ── Family reads ─────────────────────────────────────────────

    pub async fn parents(&self, id: PersonId) -> Result<Vec<(Person, ParentKind)>> {
        let q = query(
            "MATCH (c:Person {id: $id})-[r:CHILD_OF]->(p:Person)<-[:OWNS]-(o:User)
             RETURN p, o.id AS owner_id, r",
        )
        .param("id", id.to_string());

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let rel = relation(&row, "r")?;
            results.push((person_row(&row, "p")?, ParentKind::from_biological(is_biological(&rel))));
        }
        Ok(results)
    }

    pub async fn children(&self, id: PersonId) -> Result<Vec<Person>> {
        let q = query(
            "MATCH (p:Person {id: $id})-[:PARENT_OF]->(c:Person)<-[:OWNS]-(o:User)
             RETURN c, o.id AS owner_id",
        )
        .param("id", id.to_string());

        self.query_rows(q).await?.iter().map(|row| person_row(row, "c")).collect()
    }

    pub async fn spouses(&self, id: PersonId) -> Result<Vec<(Person, SpouseMeta)>> {
        let q = query(
            "MATCH (a:Person {id: $id})-[r:SPOUSE]->(s:Person)<-[:OWNS]-(o:User)
             RETURN s, o.id AS owner_id, r",
        )
        .param("id", id.to_string());

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push((person_row(&row, "s")?, spouse_meta(&relation(&row, "r")?)));
        }
        Ok(results)
    }

    pub async fn siblings(&self, id: PersonId) -> Result<Vec<(Person, SiblingKind)>> {
        let q = query(
            "MATCH (a:Person {id: $id})-[r:SIBLING]->(s:Person)<-[:OWNS]-(o:User)
             RETURN s, o.id AS owner_id, r",
        )
        .param("id", id.to_string());

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push((person_row(&row, "s")?, sibling_kind(&relation(&row, "r")?)?));
        }
        Ok(results)
    }

    pub async fn ancestors(&self, id: PersonId) -> Result<HashSet<PersonId>> {
        let q = query(
            "MATCH (c:Person {id: $id})-[:CHILD_OF*1..]->(a:Person)
             WHERE a.id <> $id
             RETURN DISTINCT a.id AS id",
        )
        .param("id", id.to_string());

        let rows = self.query_rows(q).await?;
        let mut results = HashSet::with_capacity(rows.len());
        for row in rows {
            results.insert(PersonId(decode_uuid(&string(&row, "id")?)?));
        }
        Ok(results)
    }

    pub async fn count_children(&self, id: PersonId) -> Result<usize> {
        let q = query(
            "MATCH (p:Person {id: $id})-[:PARENT_OF]->(c:Person)
             RETURN count(c) AS cnt",
        )
        .param("id", id.to_string());

        Ok(usize::try_from(count(self.query_one(q).await?, "cnt")).unwrap_or(0))
    }

    /// Everything in the caller's visible set plus every family edge
    /// leaving it. Edges may point outside the set.
    pub async fn visible(&self, caller: &UserId) -> Result<VisibleGraph> {
        let rows = self
            .query_rows(query(VISIBLE_PERSONS).param("caller", caller.as_str()))
            .await?;
        let mut nodes = Vec::with_capacity(rows.len());
        for row in rows {
            let is_owner = row.get::<bool>("is_owner").unwrap_or(false);
            nodes.push(PersonView {
                person: person_row(&row, "p")?,
                is_owner,
                guest_note: if is_owner {
                    None
                } else {
                    row.get::<String>("guest_note").ok().map(Blob::new)
                },
            });
        }

        let rows = self
            .query_rows(query(VISIBLE_EDGES).param("caller", caller.as_str()))
            .await?;
        let mut edges = Vec::with_capacity(rows.len());
        for row in rows {
            let rel_type = string(&row, "rel_type")?;
            edges.push(FamilyEdge {
                source: PersonId(decode_uuid(&string(&row, "source")?)?),
                target: PersonId(decode_uuid(&string(&row, "target")?)?),
                relation: edge_relation(&rel_type, &relation(&row, "r")?)?,
            });
        }

        tracing::debug!(caller = %caller, nodes = nodes.len(), edges = edges.len(), "Visible graph fetched");
        Ok(VisibleGraph { nodes, edges })
    }

    // ── Sources ──────────────────────────────────────────────────

    pub async fn find_source(&self, id: SourceId) -> Result<Option<Source>> {
        let q = query(
            "MATCH (o:User)-[:OWNS]->(s:Source {id: $id})
             RETURN s, o.id AS owner_id",
        )
        .param("id", id.to_string());

        match self.query_one(q).await? {
            Some(row) => Ok(Some(source_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn sources_owned_by(&self, owner: &UserId) -> Result<Vec<Source>> {
        let q = query(
            "MATCH (o:User {id: $owner_id})-[:OWNS]->(s:Source)
             RETURN s, o.id AS owner_id
             ORDER BY s.created_at",
        )
        .param("owner_id", owner.as_str());

        self.query_rows(q).await?.iter().map(source_row).collect()
    }

    pub async fn evidence_for(&self, person: PersonId) -> Result<Vec<LinkedSource>> {
        let q = query(
            "MATCH (p:Person {id: $id})-[e:EVIDENCED_BY]->(s:Source)<-[:OWNS]-(o:User)
             RETURN s, o.id AS owner_id, e.evidence_type AS evidence_type
             ORDER BY s.created_at, evidence_type",
        )
        .param("id", person.to_string());

        let rows = self.query_rows(q).await?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let raw = string(&row, "evidence_type")?;
            let evidence = EvidenceType::parse(&raw)
                .ok_or_else(|| GraphError::Serialization(format!("unknown evidence type {raw:?}")))?;
            results.push(LinkedSource { source: source_row(&row)?, evidence });
        }
        Ok(results)
    }

    // ── Invites & grants ─────────────────────────────────────────

    pub async fn find_invite(&self, id: &InviteId) -> Result<Option<Invite>> {
        let q = query(
            "MATCH (o:User)-[:CREATED_INVITE]->(i:Invite {id: $id})
             RETURN i, o.id AS owner_id",
        )
        .param("id", id.as_str());

        match self.query_one(q).await? {
            Some(row) => Ok(Some(invite_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn invites_created_by(&self, owner: &UserId) -> Result<Vec<Invite>> {
        let q = query(
            "MATCH (o:User {id: $owner_id})-[:CREATED_INVITE]->(i:Invite)
             RETURN i, o.id AS owner_id
             ORDER BY i.created_at",
        )
        .param("owner_id", owner.as_str());

        self.query_rows(q).await?.iter().map(invite_row).collect()
    }

    pub async fn grants_received(&self, recipient: &UserId) -> Result<Vec<ShareGrant>> {
        let q = query(
            "MATCH (o:User)-[g:SHARED_WITH]->(r:User {id: $id})
             RETURN o.id AS owner_id, r.id AS recipient_id, g
             ORDER BY g.granted_at",
        )
        .param("id", recipient.as_str());

        self.query_rows(q).await?.iter().map(grant_row).collect()
    }

    pub async fn grants_given(&self, owner: &UserId) -> Result<Vec<ShareGrant>> {
        let q = query(
            "MATCH (o:User {id: $id})-[g:SHARED_WITH]->(r:User)
             RETURN o.id AS owner_id, r.id AS recipient_id, g
             ORDER BY g.granted_at",
        )
        .param("id", owner.as_str());

        self.query_rows(q).await?.iter().map(grant_row).collect()
    }
}

// ── Row helpers ──────────────────────────────────────────────────

fn node(row: &Row, column: &str) -> Result<neo4rs::Node> {
    row.get(column)
        .map_err(|e| GraphError::Serialization(format!("Failed to deserialize node {column}: {e}")))
}

fn relation(row: &Row, column: &str) -> Result<neo4rs::Relation> {
    row.get(column)
        .map_err(|e| GraphError::Serialization(format!("Failed to get relation {column}: {e}")))
}

fn string(row: &Row, column: &str) -> Result<String> {
    row.get(column)
        .map_err(|e| GraphError::Serialization(format!("Failed to read column {column}: {e}")))
}

fn person_row(row: &Row, column: &str) -> Result<Person> {
    let owner_id = owner_column(row.get::<String>("owner_id"), &format!("Person in column {column}"))?;
    person_from_node(&node(row, column)?, owner_id)
}

fn source_row(row: &Row) -> Result<Source> {
    source_from_node(&node(row, "s")?, string(row, "owner_id")?)
}

fn invite_row(row: &Row) -> Result<Invite> {
    invite_from_node(&node(row, "i")?, string(row, "owner_id")?)
}

fn grant_row(row: &Row) -> Result<ShareGrant> {
    grant_from_rel(
        &relation(row, "g")?,
        string(row, "owner_id")?,
        string(row, "recipient_id")?,
    )
}
