//! Family edges: validated linking, sibling derivation and family reads.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use rodovid_core::{
    FamilyLink, FamilyStore, ParentKind, Person, PersonId, PersonView, SiblingKind, SpouseMeta,
    UserId,
};
use rodovid_validate::{ParentLinkCheck, PersonFacts, SiblingLinkCheck, SpouseLinkCheck, ValidationReport};

use crate::error::{Result, TreeError};
use crate::types::Validated;
use crate::FamilyTree;

impl<S: FamilyStore> FamilyTree<S> {
    /// Validate and merge a family link between two Persons the caller
    /// owns. Parental links are followed by sibling derivation for the child.
    pub async fn link(&self, caller: &UserId, link: FamilyLink) -> Result<Validated<FamilyLink>> {
        if let FamilyLink::Spouse { meta, .. } = &link {
            self.check_years(&[("marriage_year", meta.marriage_year), ("divorce_year", meta.divorce_year)])?;
        }
        let (a, b) = link.endpoints();
        let first = self.owned_person(caller, a).await?;
        let second = if a == b { first.clone() } else { self.owned_person(caller, b).await? };

        let report = match link {
            FamilyLink::ParentOf { parent, parent_kind, .. }
            | FamilyLink::ChildOf { parent, parent_kind, .. } => {
                let (parent, child) = if parent == a { (&first, &second) } else { (&second, &first) };
                self.parent_report(link, parent, child, parent_kind).await?
            }
            FamilyLink::Spouse { meta, .. } => self.spouse_report(&first, &second, meta).await?,
            FamilyLink::Sibling { .. } => {
                let already_spouses = self.store.spouses_of(a).await?.iter().any(|(p, _)| p.id == b);
                self.validator.validate_sibling_link(&SiblingLinkCheck { a, b, already_spouses })
            }
        };
        let report = self.admit("link", report)?;

        if !self.store.link(&link).await? {
            return Err(TreeError::NotFound);
        }
        info!(kind = link.kind().as_cypher(), a = %a, b = %b, "Family link created");

        if let Some((_, child, _)) = link.parentage() {
            self.derive_siblings(child).await?;
        }
        Ok(Validated { value: link, report })
    }

    async fn parent_report(
        &self,
        link: FamilyLink,
        parent: &Person,
        child: &Person,
        parent_kind: ParentKind,
    ) -> Result<ValidationReport> {
        // Re-linking an existing parent must not count it twice.
        let existing_parents: Vec<ParentKind> = self
            .store
            .parents_of(child.id)
            .await?
            .into_iter()
            .filter(|(p, _)| p.id != parent.id)
            .map(|(_, kind)| kind)
            .collect();
        let parent_ancestors = self.store.ancestors_of(parent.id).await?;

        Ok(self.validator.validate_parent_link(&ParentLinkCheck {
            parent: PersonFacts::from(parent),
            child: PersonFacts::from(child),
            parent_kind,
            requested_as: link.kind(),
            existing_parents,
            parent_ancestors,
        }))
    }

    async fn spouse_report(&self, a: &Person, b: &Person, meta: SpouseMeta) -> Result<ValidationReport> {
        let spouses = |list: Vec<(Person, SpouseMeta)>| -> Vec<(PersonId, SpouseMeta)> {
            list.into_iter().map(|(p, m)| (p.id, m)).collect()
        };
        let a_spouses = spouses(self.store.spouses_of(a.id).await?);
        let b_spouses = spouses(self.store.spouses_of(b.id).await?);
        let already_siblings = self.store.siblings_of(a.id).await?.iter().any(|(p, _)| p.id == b.id);

        Ok(self.validator.validate_spouse_link(&SpouseLinkCheck {
            a: PersonFacts::from(a),
            b: PersonFacts::from(b),
            meta,
            a_spouses,
            b_spouses,
            already_siblings,
        }))
    }

    /// Merge `SIBLING` pairs between an owned Person and every co-child of
    /// its parents: `full` when they share two parents, `half` for one.
    pub async fn auto_derive_siblings(
        &self,
        caller: &UserId,
        id: PersonId,
    ) -> Result<Vec<(PersonId, SiblingKind)>> {
        self.owned_person(caller, id).await?;
        self.derive_siblings(id).await
    }

    async fn derive_siblings(&self, id: PersonId) -> Result<Vec<(PersonId, SiblingKind)>> {
        let mut shared: BTreeMap<PersonId, BTreeSet<PersonId>> = BTreeMap::new();
        for (parent, _) in self.store.parents_of(id).await? {
            for child in self.store.children_of(parent.id).await? {
                if child.id != id {
                    shared.entry(child.id).or_default().insert(parent.id);
                }
            }
        }

        let mut derived = Vec::with_capacity(shared.len());
        for (sibling, parents) in shared {
            let Some(sibling_kind) = SiblingKind::from_shared_parents(parents.len()) else {
                continue;
            };
            self.store
                .link(&FamilyLink::Sibling { a: id, b: sibling, sibling_kind })
                .await?;
            derived.push((sibling, sibling_kind));
        }

        debug!(person_id = %id, derived = derived.len(), "Siblings derived");
        Ok(derived)
    }

    // ── Family reads ─────────────────────────────────────────────

    pub async fn get_parents(&self, caller: &UserId, id: PersonId) -> Result<Vec<(PersonView, ParentKind)>> {
        self.require_visible(caller, id).await?;
        let parents = self.store.parents_of(id).await?;
        self.visible_with(caller, parents).await
    }

    pub async fn get_children(&self, caller: &UserId, id: PersonId) -> Result<Vec<PersonView>> {
        self.require_visible(caller, id).await?;
        let children: Vec<(Person, ())> =
            self.store.children_of(id).await?.into_iter().map(|p| (p, ())).collect();
        Ok(self
            .visible_with(caller, children)
            .await?
            .into_iter()
            .map(|(view, ())| view)
            .collect())
    }

    pub async fn get_spouses(&self, caller: &UserId, id: PersonId) -> Result<Vec<(PersonView, SpouseMeta)>> {
        self.require_visible(caller, id).await?;
        let spouses = self.store.spouses_of(id).await?;
        self.visible_with(caller, spouses).await
    }

    pub async fn get_siblings(&self, caller: &UserId, id: PersonId) -> Result<Vec<(PersonView, SiblingKind)>> {
        self.require_visible(caller, id).await?;
        let siblings = self.store.siblings_of(id).await?;
        self.visible_with(caller, siblings).await
    }

    async fn require_visible(&self, caller: &UserId, id: PersonId) -> Result<()> {
        if self.store.access(caller, id).await?.can_read() {
            Ok(())
        } else {
            Err(TreeError::NotFound)
        }
    }

    /// Keep only the relatives the caller can see, projected for them.
    async fn visible_with<T>(&self, caller: &UserId, relatives: Vec<(Person, T)>) -> Result<Vec<(PersonView, T)>> {
        let mut visible = Vec::with_capacity(relatives.len());
        for (person, meta) in relatives {
            if let Some(view) = self.view_for(caller, person).await? {
                visible.push((view, meta));
            }
        }
        Ok(visible)
    }
}
