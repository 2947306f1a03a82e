//! Users, Persons and the caller-scoped views over them.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info};

use rodovid_core::{
    Access, Blob, FamilyStore, KeyRotation, NewPerson, Person, PersonId, PersonPatch,
    PersonView, RecoveryData, TreeSnapshot, User, UserId,
};
use rodovid_validate::PersonFacts;

use crate::error::{Result, TreeError};
use crate::types::{TreeStats, Validated};
use crate::{project, FamilyTree};

impl<S: FamilyStore> FamilyTree<S> {
    // ── Users ────────────────────────────────────────────────────

    /// Register a user with their public key and, optionally, the
    /// password-wrapped private key used for recovery.
    pub async fn register_user(
        &self,
        id: UserId,
        public_key: impl Into<String>,
        recovery: Option<RecoveryData>,
    ) -> Result<User> {
        let public_key = public_key.into();
        if id.as_str().trim().is_empty() {
            return Err(TreeError::InvalidInput("user id must not be empty".into()));
        }
        if public_key.trim().is_empty() {
            return Err(TreeError::InvalidInput("public key must not be empty".into()));
        }

        let mut user = User::new(id, public_key);
        if let Some(recovery) = recovery {
            self.check_blob("encrypted_private_key", &recovery.encrypted_private_key)?;
            user.encrypted_private_key = Some(recovery.encrypted_private_key);
            user.key_salt = recovery.key_salt;
        }

        if !self.store.insert_user(&user).await? {
            return Err(TreeError::UserExists(user.id));
        }
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn get_user(&self, id: &UserId) -> Result<User> {
        self.store.get_user(id).await?.ok_or(TreeError::NotFound)
    }

    pub async fn public_key(&self, id: &UserId) -> Result<String> {
        Ok(self.get_user(id).await?.public_key)
    }

    /// The wrapped private key and salt. `NotFound` if none was stored.
    pub async fn recovery_data(&self, id: &UserId) -> Result<RecoveryData> {
        let user = self.get_user(id).await?;
        let encrypted_private_key = user.encrypted_private_key.ok_or(TreeError::NotFound)?;
        Ok(RecoveryData { encrypted_private_key, key_salt: user.key_salt })
    }

    pub async fn rotate_keys(&self, id: &UserId, rotation: &KeyRotation) -> Result<User> {
        if rotation.is_empty() {
            return Err(TreeError::InvalidInput("key rotation changes nothing".into()));
        }
        if rotation.public_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(TreeError::InvalidInput("public key must not be empty".into()));
        }
        if let Some(blob) = &rotation.encrypted_private_key {
            self.check_blob("encrypted_private_key", blob)?;
        }

        let user = self
            .store
            .rotate_user_keys(id, rotation, Utc::now())
            .await?
            .ok_or(TreeError::NotFound)?;
        info!(user_id = %id, "User keys rotated");
        Ok(user)
    }

    // ── Persons ──────────────────────────────────────────────────

    /// Create a Person owned by `owner`, together with its `OWNS` edge.
    pub async fn create_person(&self, owner: &UserId, input: NewPerson) -> Result<Validated<Person>> {
        self.check_blobs(&input.blobs)?;
        self.check_years(&[("birth_year", input.birth_year), ("death_year", input.death_year)])?;

        let id = PersonId::new();
        let facts = PersonFacts {
            id,
            gender: input.gender,
            birth_year: input.birth_year,
            death_year: input.death_year,
        };
        let report = self.admit("create_person", self.validator.validate_person(&facts))?;

        let person = input.into_person(id, owner.clone(), Utc::now());
        if !self.store.insert_person(&person).await? {
            return Err(TreeError::OwnerNotFound(owner.clone()));
        }
        info!(person_id = %id, owner = %owner, warnings = report.warnings().count(), "Person created");
        Ok(Validated { value: person, report })
    }

    /// A Person as the caller may see it.
    pub async fn get_person(&self, caller: &UserId, id: PersonId) -> Result<PersonView> {
        let access = self.store.access(caller, id).await?;
        if !access.can_read() {
            return Err(TreeError::NotFound);
        }
        let person = self.store.get_person(id).await?.ok_or(TreeError::NotFound)?;
        project(person, access).ok_or(TreeError::NotFound)
    }

    /// Owner-only partial update. Non-owners get the same `NotFound` as
    /// for an absent id.
    pub async fn update_person(
        &self,
        caller: &UserId,
        id: PersonId,
        patch: PersonPatch,
    ) -> Result<Validated<Person>> {
        if patch.is_empty() {
            return Err(TreeError::InvalidInput("update changes nothing".into()));
        }
        self.check_blobs(&patch.blobs)?;
        self.check_years(&[("birth_year", patch.birth_year), ("death_year", patch.death_year)])?;

        let current = self.owned_person(caller, id).await?;
        let facts = PersonFacts {
            id,
            gender: patch.gender.or(current.gender),
            birth_year: patch.birth_year.or(current.birth_year),
            death_year: patch.death_year.or(current.death_year),
        };
        let report = self.admit("update_person", self.validator.validate_person(&facts))?;

        let person = self
            .store
            .update_owned_person(caller, id, &patch, Utc::now())
            .await?
            .ok_or(TreeError::NotFound)?;
        info!(person_id = %id, "Person updated");
        Ok(Validated { value: person, report })
    }

    // ── Tree ─────────────────────────────────────────────────────

    /// Owned and shared Persons with the edges between them. Ghosts are
    /// left out unless `include_deleted` is set; edges to anything outside
    /// the returned node set are dropped.
    pub async fn get_tree(&self, caller: &UserId, include_deleted: bool) -> Result<TreeSnapshot> {
        let graph = self.store.visible_graph(caller).await?;

        let nodes: Vec<PersonView> = graph
            .nodes
            .into_iter()
            .filter(|view| include_deleted || !view.person.is_ghost())
            .map(|view| {
                if view.is_owner {
                    view
                } else {
                    PersonView { person: view.person.redacted_for_viewer(), ..view }
                }
            })
            .collect();

        let visible: HashSet<PersonId> = nodes.iter().map(|view| view.person.id).collect();
        let edges: Vec<_> = graph
            .edges
            .into_iter()
            .filter(|edge| visible.contains(&edge.source) && visible.contains(&edge.target))
            .collect();

        debug!(caller = %caller, nodes = nodes.len(), edges = edges.len(), include_deleted, "Tree fetched");
        Ok(TreeSnapshot { nodes, edges })
    }

    pub async fn tree_stats(&self, caller: &UserId) -> Result<TreeStats> {
        let tree = self.get_tree(caller, true).await?;
        let owned = tree.nodes.iter().filter(|view| view.is_owner).count();
        Ok(TreeStats {
            persons: tree.nodes.len(),
            owned,
            shared: tree.nodes.len() - owned,
            ghosts: tree.nodes.iter().filter(|view| view.person.is_ghost()).count(),
            edges: tree.edges.len(),
        })
    }

    // ── Guest notes ──────────────────────────────────────────────

    /// Attach the viewer's own note to a shared Person. Owners keep their
    /// notes in the Person's blobs instead.
    pub async fn set_guest_note(&self, viewer: &UserId, id: PersonId, note: Blob) -> Result<()> {
        self.check_blob("guest_note_blob", &note)?;
        match self.store.access(viewer, id).await? {
            Access::Owner => Err(TreeError::InvalidInput(
                "owners cannot attach guest notes to their own persons".into(),
            )),
            Access::None => Err(TreeError::NotFound),
            Access::Viewer { .. } => {
                if !self.store.set_guest_note(viewer, id, &note).await? {
                    return Err(TreeError::NotFound);
                }
                debug!(person_id = %id, viewer = %viewer, "Guest note set");
                Ok(())
            }
        }
    }

    pub async fn get_guest_note(&self, viewer: &UserId, id: PersonId) -> Result<Option<Blob>> {
        match self.store.access(viewer, id).await? {
            Access::Viewer { guest_note } => Ok(guest_note),
            Access::Owner => Ok(None),
            Access::None => Err(TreeError::NotFound),
        }
    }
}
