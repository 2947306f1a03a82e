//! [`FamilyStore`] implementation backed by Neo4j.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use rodovid_core::store::{Access, FamilyStore, GhostContext, Retirement, StoreResult, VisibleGraph};
use rodovid_core::types::{
    Blob, EvidenceType, FamilyLink, Invite, InviteId, KeyRotation, LinkedSource, ParentKind,
    Person, PersonId, PersonPatch, ShareGrant, SiblingKind, Source, SourceId, SpouseMeta, User,
    UserId, WrappedKey,
};

use crate::client::GraphClient;

impl FamilyStore for GraphClient {
    async fn insert_user<'a>(&'a self, user: &'a User) -> StoreResult<bool> {
        Ok(self.create_user(user).await?)
    }

    async fn get_user<'a>(&'a self, id: &'a UserId) -> StoreResult<Option<User>> {
        Ok(self.find_user(id).await?)
    }

    async fn rotate_user_keys<'a>(
        &'a self,
        id: &'a UserId,
        rotation: &'a KeyRotation,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        Ok(self.rotate_keys(id, rotation, at).await?)
    }

    async fn insert_person<'a>(&'a self, person: &'a Person) -> StoreResult<bool> {
        Ok(self.create_person(person).await?)
    }

    async fn get_person(&self, id: PersonId) -> StoreResult<Option<Person>> {
        Ok(self.find_person(id).await?)
    }

    async fn access<'a>(&'a self, caller: &'a UserId, id: PersonId) -> StoreResult<Access> {
        Ok(self.access_of(caller, id).await?)
    }

    async fn update_owned_person<'a>(
        &'a self,
        owner: &'a UserId,
        id: PersonId,
        patch: &'a PersonPatch,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Person>> {
        Ok(self.update_person(owner, id, patch, at).await?)
    }

    async fn retire_person<'a, F>(
        &'a self,
        owner: &'a UserId,
        id: PersonId,
        at: DateTime<Utc>,
        namer: F,
    ) -> StoreResult<Retirement>
    where
        F: FnOnce(GhostContext) -> String + Send + 'a,
    {
        Ok(self.retire(owner, id, at, namer).await?)
    }

    async fn remove_person_share<'a>(&'a self, viewer: &'a UserId, id: PersonId) -> StoreResult<bool> {
        Ok(self.unshare_person(viewer, id).await?)
    }

    async fn set_guest_note<'a>(
        &'a self,
        viewer: &'a UserId,
        id: PersonId,
        note: &'a Blob,
    ) -> StoreResult<bool> {
        Ok(self.write_guest_note(viewer, id, note.as_str()).await?)
    }

    async fn link<'a>(&'a self, link: &'a FamilyLink) -> StoreResult<bool> {
        Ok(self.merge_link(link).await?)
    }

    async fn parents_of(&self, id: PersonId) -> StoreResult<Vec<(Person, ParentKind)>> {
        Ok(self.parents(id).await?)
    }

    async fn children_of(&self, id: PersonId) -> StoreResult<Vec<Person>> {
        Ok(self.children(id).await?)
    }

    async fn spouses_of(&self, id: PersonId) -> StoreResult<Vec<(Person, SpouseMeta)>> {
        Ok(self.spouses(id).await?)
    }

    async fn siblings_of(&self, id: PersonId) -> StoreResult<Vec<(Person, SiblingKind)>> {
        Ok(self.siblings(id).await?)
    }

    async fn ancestors_of(&self, id: PersonId) -> StoreResult<HashSet<PersonId>> {
        Ok(self.ancestors(id).await?)
    }

    async fn descendant_count(&self, id: PersonId) -> StoreResult<usize> {
        Ok(self.count_children(id).await?)
    }

    async fn visible_graph<'a>(&'a self, caller: &'a UserId) -> StoreResult<VisibleGraph> {
        Ok(self.visible(caller).await?)
    }

    async fn insert_source<'a>(&'a self, source: &'a Source) -> StoreResult<bool> {
        Ok(self.create_source(source).await?)
    }

    async fn get_source(&self, id: SourceId) -> StoreResult<Option<Source>> {
        Ok(self.find_source(id).await?)
    }

    async fn list_sources<'a>(&'a self, owner: &'a UserId) -> StoreResult<Vec<Source>> {
        Ok(self.sources_owned_by(owner).await?)
    }

    async fn delete_source<'a>(&'a self, owner: &'a UserId, id: SourceId) -> StoreResult<bool> {
        Ok(self.remove_source(owner, id).await?)
    }

    async fn link_source(
        &self,
        person: PersonId,
        source: SourceId,
        evidence: EvidenceType,
    ) -> StoreResult<bool> {
        Ok(self.merge_evidence(person, source, evidence).await?)
    }

    async fn sources_for(&self, person: PersonId) -> StoreResult<Vec<LinkedSource>> {
        Ok(self.evidence_for(person).await?)
    }

    async fn insert_invite<'a>(&'a self, invite: &'a Invite) -> StoreResult<bool> {
        Ok(self.create_invite(invite).await?)
    }

    async fn get_invite<'a>(&'a self, id: &'a InviteId) -> StoreResult<Option<Invite>> {
        Ok(self.find_invite(id).await?)
    }

    async fn accept_invite<'a>(
        &'a self,
        id: &'a InviteId,
        recipient: &'a UserId,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Invite>> {
        Ok(self.accept(id, recipient, at).await?)
    }

    async fn finalize_invite<'a>(
        &'a self,
        id: &'a InviteId,
        owner: &'a UserId,
        key: &'a WrappedKey,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<ShareGrant>> {
        Ok(self.finalize(id, owner, key, at).await?)
    }

    async fn revoke_grant<'a>(&'a self, owner: &'a UserId, recipient: &'a UserId) -> StoreResult<bool> {
        Ok(self.revoke(owner, recipient).await?)
    }

    async fn grants_to<'a>(&'a self, recipient: &'a UserId) -> StoreResult<Vec<ShareGrant>> {
        Ok(self.grants_received(recipient).await?)
    }

    async fn grants_from<'a>(&'a self, owner: &'a UserId) -> StoreResult<Vec<ShareGrant>> {
        Ok(self.grants_given(owner).await?)
    }

    async fn invites_from<'a>(&'a self, owner: &'a UserId) -> StoreResult<Vec<Invite>> {
        Ok(self.invites_created_by(owner).await?)
    }
}
