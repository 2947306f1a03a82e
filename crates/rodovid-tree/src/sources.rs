//! Sources and the `EVIDENCED_BY` links tying them to Persons.

use chrono::Utc;
use tracing::{debug, info};

use rodovid_core::{EvidenceType, FamilyStore, LinkedSource, NewSource, PersonId, Source, SourceId, UserId};

use crate::error::{Result, TreeError};
use crate::FamilyTree;

impl<S: FamilyStore> FamilyTree<S> {
    pub async fn create_source(&self, owner: &UserId, input: NewSource) -> Result<Source> {
        if input.title.trim().is_empty() {
            return Err(TreeError::InvalidInput("source title must not be empty".into()));
        }
        let source = input.into_source(SourceId::new(), owner.clone(), Utc::now());
        if !self.store.insert_source(&source).await? {
            return Err(TreeError::OwnerNotFound(owner.clone()));
        }
        info!(source_id = %source.id, owner = %owner, "Source created");
        Ok(source)
    }

    /// Sources are private to their owner.
    pub async fn get_source(&self, caller: &UserId, id: SourceId) -> Result<Source> {
        match self.store.get_source(id).await? {
            Some(source) if source.owner_id == *caller => Ok(source),
            _ => Err(TreeError::NotFound),
        }
    }

    pub async fn list_sources(&self, owner: &UserId) -> Result<Vec<Source>> {
        Ok(self.store.list_sources(owner).await?)
    }

    /// Remove a Source and its evidence links; linked Persons are untouched.
    pub async fn delete_source(&self, owner: &UserId, id: SourceId) -> Result<()> {
        if !self.store.delete_source(owner, id).await? {
            return Err(TreeError::NotFound);
        }
        info!(source_id = %id, owner = %owner, "Source deleted");
        Ok(())
    }

    /// Cite `source` as evidence for `person`. Idempotent per evidence type.
    pub async fn link_source(
        &self,
        caller: &UserId,
        person: PersonId,
        source: SourceId,
        evidence: EvidenceType,
    ) -> Result<()> {
        self.owned_person(caller, person).await?;
        self.get_source(caller, source).await?;
        if !self.store.link_source(person, source, evidence).await? {
            return Err(TreeError::NotFound);
        }
        debug!(person_id = %person, source_id = %source, evidence = evidence.as_str(), "Source linked");
        Ok(())
    }

    /// Evidence for a Person, for anyone who can see it.
    pub async fn sources_for(&self, caller: &UserId, person: PersonId) -> Result<Vec<LinkedSource>> {
        if !self.store.access(caller, person).await?.can_read() {
            return Err(TreeError::NotFound);
        }
        Ok(self.store.sources_for(person).await?)
    }
}
