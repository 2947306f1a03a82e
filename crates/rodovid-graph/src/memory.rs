//! In-memory [`FamilyStore`] used by tests and the offline CLI.
//!
//! Mirrors the Neo4j backend's semantics: ownership is a property of the
//! Person, family edges are keyed by `(source, target, kind)` so re-linking
//! overwrites, and every write happens under one lock acquisition.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use rodovid_core::store::{Access, FamilyStore, GhostContext, Retirement, StoreResult, VisibleGraph};
use rodovid_core::types::{
    Blob, EdgeRelation, EvidenceType, FamilyEdge, FamilyLink, Invite, InviteId, InviteStatus,
    KeyRotation, LinkedSource, ParentKind, Person, PersonId, PersonPatch, PersonView,
    RelationKind, ShareGrant, SiblingKind, Source, SourceId, SpouseMeta, Tombstone, User, UserId,
    WrappedKey,
};
use rodovid_core::StoreError;

/// Person-level `SHARED_WITH` edge. The wrapped key and invite live on
/// the owner-level [`ShareGrant`], so the edge only holds the viewer's note.
#[derive(Debug, Clone, Default)]
struct ViewerEdge {
    guest_note: Option<Blob>,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    persons: HashMap<PersonId, Person>,
    viewers: HashMap<(UserId, PersonId), ViewerEdge>,
    edges: HashMap<(PersonId, PersonId, RelationKind), EdgeRelation>,
    sources: HashMap<SourceId, Source>,
    evidence: BTreeSet<(PersonId, SourceId, EvidenceType)>,
    invites: HashMap<InviteId, Invite>,
    grants: HashMap<(UserId, UserId), ShareGrant>,
}

impl State {
    fn outgoing(&self, id: PersonId, kind: RelationKind) -> impl Iterator<Item = (PersonId, &EdgeRelation)> + '_ {
        self.edges
            .iter()
            .filter(move |((source, _, k), _)| *source == id && *k == kind)
            .map(|((_, target, _), relation)| (*target, relation))
    }

    fn has_children(&self, id: PersonId) -> bool {
        self.outgoing(id, RelationKind::ParentOf).next().is_some()
    }

    /// Persons reachable by outgoing edges of `kind`, in creation order.
    fn related<T>(
        &self,
        id: PersonId,
        kind: RelationKind,
        extract: impl Fn(&EdgeRelation) -> Option<T>,
    ) -> Vec<(Person, T)> {
        let mut results: Vec<(Person, T)> = self
            .outgoing(id, kind)
            .filter_map(|(target, relation)| {
                let person = self.persons.get(&target)?;
                Some((person.clone(), extract(relation)?))
            })
            .collect();
        results.sort_by(|(a, _), (b, _)| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        results
    }

    /// Undirected BFS distance to the nearest childless Person of `owner`.
    fn nearest_leaf(&self, owner: &UserId, start: PersonId) -> Option<u32> {
        let mut neighbours: HashMap<PersonId, Vec<PersonId>> = HashMap::new();
        for (source, target, _) in self.edges.keys() {
            neighbours.entry(*source).or_default().push(*target);
            neighbours.entry(*target).or_default().push(*source);
        }

        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0u32)]);
        while let Some((current, distance)) = queue.pop_front() {
            if current != start {
                if let Some(person) = self.persons.get(&current) {
                    if person.owner_id == *owner && !self.has_children(current) {
                        return Some(distance);
                    }
                }
            }
            for next in neighbours.get(&current).into_iter().flatten() {
                if seen.insert(*next) {
                    queue.push_back((*next, distance + 1));
                }
            }
        }
        None
    }

    fn remove_person(&mut self, id: PersonId) {
        self.persons.remove(&id);
        self.edges.retain(|(source, target, _), _| *source != id && *target != id);
        self.viewers.retain(|(_, person), _| *person != id);
        self.evidence.retain(|(person, _, _)| *person != id);
    }
}

/// Thread-safe in-process family graph.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

impl FamilyStore for MemoryStore {
    // ── Users ────────────────────────────────────────────────────

    async fn insert_user<'a>(&'a self, user: &'a User) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.users.contains_key(&user.id) {
            return Ok(false);
        }
        state.users.insert(user.id.clone(), user.clone());
        Ok(true)
    }

    async fn get_user<'a>(&'a self, id: &'a UserId) -> StoreResult<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn rotate_user_keys<'a>(
        &'a self,
        id: &'a UserId,
        rotation: &'a KeyRotation,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let mut state = self.write()?;
        Ok(state.users.get_mut(id).map(|user| {
            rotation.apply(user, at);
            user.clone()
        }))
    }

    // ── Persons ──────────────────────────────────────────────────

    async fn insert_person<'a>(&'a self, person: &'a Person) -> StoreResult<bool> {
        let mut state = self.write()?;
        if !state.users.contains_key(&person.owner_id) {
            return Ok(false);
        }
        if state.persons.contains_key(&person.id) {
            return Err(StoreError::Query(format!("Person {} already exists", person.id)));
        }
        state.persons.insert(person.id, person.clone());

        let recipients: Vec<ShareGrant> = state
            .grants
            .values()
            .filter(|grant| grant.owner_id == person.owner_id)
            .cloned()
            .collect();
        for grant in recipients {
            state.viewers.insert((grant.recipient_id, person.id), ViewerEdge::default());
        }
        Ok(true)
    }

    async fn get_person(&self, id: PersonId) -> StoreResult<Option<Person>> {
        Ok(self.read()?.persons.get(&id).cloned())
    }

    async fn access<'a>(&'a self, caller: &'a UserId, id: PersonId) -> StoreResult<Access> {
        let state = self.read()?;
        let Some(person) = state.persons.get(&id) else {
            return Ok(Access::None);
        };
        if person.owner_id == *caller {
            return Ok(Access::Owner);
        }
        Ok(match state.viewers.get(&(caller.clone(), id)) {
            Some(edge) => Access::Viewer { guest_note: edge.guest_note.clone() },
            None => Access::None,
        })
    }

    async fn update_owned_person<'a>(
        &'a self,
        owner: &'a UserId,
        id: PersonId,
        patch: &'a PersonPatch,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Person>> {
        let mut state = self.write()?;
        Ok(state
            .persons
            .get_mut(&id)
            .filter(|person| person.owner_id == *owner)
            .map(|person| {
                patch.apply(person, at);
                person.clone()
            }))
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
        let mut state = self.write()?;
        let gender = match state.persons.get(&id) {
            Some(person) if person.owner_id == *owner => person.gender,
            _ => return Ok(Retirement::NotOwned),
        };

        if !state.has_children(id) {
            state.remove_person(id);
            return Ok(Retirement::Deleted);
        }

        let leaf_distance = state.nearest_leaf(owner, id);
        let tombstone = Tombstone {
            ghost_name: namer(GhostContext { gender, leaf_distance }),
            deleted_at: at,
        };
        if let Some(person) = state.persons.get_mut(&id) {
            person.tombstone = Some(tombstone.clone());
            person.updated_at = Some(at);
        }
        Ok(Retirement::Ghosted(tombstone))
    }

    async fn remove_person_share<'a>(&'a self, viewer: &'a UserId, id: PersonId) -> StoreResult<bool> {
        Ok(self.write()?.viewers.remove(&(viewer.clone(), id)).is_some())
    }

    async fn set_guest_note<'a>(
        &'a self,
        viewer: &'a UserId,
        id: PersonId,
        note: &'a Blob,
    ) -> StoreResult<bool> {
        let mut state = self.write()?;
        match state.viewers.get_mut(&(viewer.clone(), id)) {
            Some(edge) => {
                edge.guest_note = Some(note.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ── Family edges ─────────────────────────────────────────────

    async fn link<'a>(&'a self, link: &'a FamilyLink) -> StoreResult<bool> {
        let mut state = self.write()?;
        let (a, b) = link.endpoints();
        if !state.persons.contains_key(&a) || !state.persons.contains_key(&b) {
            return Ok(false);
        }
        for edge in link.edge_pair() {
            state
                .edges
                .insert((edge.source, edge.target, edge.relation.kind()), edge.relation);
        }
        Ok(true)
    }

    async fn parents_of(&self, id: PersonId) -> StoreResult<Vec<(Person, ParentKind)>> {
        Ok(self.read()?.related(id, RelationKind::ChildOf, |relation| match relation {
            EdgeRelation::ChildOf { biological } => Some(ParentKind::from_biological(*biological)),
            _ => None,
        }))
    }

    async fn children_of(&self, id: PersonId) -> StoreResult<Vec<Person>> {
        Ok(self
            .read()?
            .related(id, RelationKind::ParentOf, |_| Some(()))
            .into_iter()
            .map(|(person, ())| person)
            .collect())
    }

    async fn spouses_of(&self, id: PersonId) -> StoreResult<Vec<(Person, SpouseMeta)>> {
        Ok(self.read()?.related(id, RelationKind::Spouse, |relation| match relation {
            EdgeRelation::Spouse(meta) => Some(*meta),
            _ => None,
        }))
    }

    async fn siblings_of(&self, id: PersonId) -> StoreResult<Vec<(Person, SiblingKind)>> {
        Ok(self.read()?.related(id, RelationKind::Sibling, |relation| match relation {
            EdgeRelation::Sibling { sibling_kind } => Some(*sibling_kind),
            _ => None,
        }))
    }

    async fn ancestors_of(&self, id: PersonId) -> StoreResult<HashSet<PersonId>> {
        let state = self.read()?;
        let mut ancestors = HashSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for (parent, _) in state.outgoing(current, RelationKind::ChildOf) {
                if parent != id && ancestors.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        Ok(ancestors)
    }

    async fn descendant_count(&self, id: PersonId) -> StoreResult<usize> {
        Ok(self.read()?.outgoing(id, RelationKind::ParentOf).count())
    }

    async fn visible_graph<'a>(&'a self, caller: &'a UserId) -> StoreResult<VisibleGraph> {
        let state = self.read()?;
        if !state.users.contains_key(caller) {
            return Ok(VisibleGraph::default());
        }

        let mut nodes: Vec<PersonView> = state
            .persons
            .values()
            .filter_map(|person| {
                if person.owner_id == *caller {
                    return Some(PersonView { person: person.clone(), is_owner: true, guest_note: None });
                }
                state.viewers.get(&(caller.clone(), person.id)).map(|edge| PersonView {
                    person: person.clone(),
                    is_owner: false,
                    guest_note: edge.guest_note.clone(),
                })
            })
            .collect();
        nodes.sort_by(|a, b| (a.person.created_at, a.person.id).cmp(&(b.person.created_at, b.person.id)));

        let visible: HashSet<PersonId> = nodes.iter().map(|view| view.person.id).collect();
        let edges = state
            .edges
            .iter()
            .filter(|((source, _, _), _)| visible.contains(source))
            .map(|((source, target, _), relation)| FamilyEdge {
                source: *source,
                target: *target,
                relation: *relation,
            })
            .collect();

        Ok(VisibleGraph { nodes, edges })
    }

    // ── Sources ──────────────────────────────────────────────────

    async fn insert_source<'a>(&'a self, source: &'a Source) -> StoreResult<bool> {
        let mut state = self.write()?;
        if !state.users.contains_key(&source.owner_id) {
            return Ok(false);
        }
        state.sources.insert(source.id, source.clone());
        Ok(true)
    }

    async fn get_source(&self, id: SourceId) -> StoreResult<Option<Source>> {
        Ok(self.read()?.sources.get(&id).cloned())
    }

    async fn list_sources<'a>(&'a self, owner: &'a UserId) -> StoreResult<Vec<Source>> {
        let state = self.read()?;
        let mut sources: Vec<Source> = state
            .sources
            .values()
            .filter(|source| source.owner_id == *owner)
            .cloned()
            .collect();
        sources.sort_by_key(|source| (source.created_at, source.id));
        Ok(sources)
    }

    async fn delete_source<'a>(&'a self, owner: &'a UserId, id: SourceId) -> StoreResult<bool> {
        let mut state = self.write()?;
        match state.sources.get(&id) {
            Some(source) if source.owner_id == *owner => {
                state.sources.remove(&id);
                state.evidence.retain(|(_, source, _)| *source != id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn link_source(
        &self,
        person: PersonId,
        source: SourceId,
        evidence: EvidenceType,
    ) -> StoreResult<bool> {
        let mut state = self.write()?;
        if !state.persons.contains_key(&person) || !state.sources.contains_key(&source) {
            return Ok(false);
        }
        state.evidence.insert((person, source, evidence));
        Ok(true)
    }

    async fn sources_for(&self, person: PersonId) -> StoreResult<Vec<LinkedSource>> {
        let state = self.read()?;
        let mut linked: Vec<LinkedSource> = state
            .evidence
            .iter()
            .filter(|(p, _, _)| *p == person)
            .filter_map(|(_, source, evidence)| {
                state.sources.get(source).map(|source| LinkedSource {
                    source: source.clone(),
                    evidence: *evidence,
                })
            })
            .collect();
        linked.sort_by_key(|l| (l.source.created_at, l.evidence));
        Ok(linked)
    }

    // ── Invites & grants ─────────────────────────────────────────

    async fn insert_invite<'a>(&'a self, invite: &'a Invite) -> StoreResult<bool> {
        let mut state = self.write()?;
        if !state.users.contains_key(&invite.owner_id) {
            return Ok(false);
        }
        state.invites.insert(invite.id.clone(), invite.clone());
        Ok(true)
    }

    async fn get_invite<'a>(&'a self, id: &'a InviteId) -> StoreResult<Option<Invite>> {
        Ok(self.read()?.invites.get(id).cloned())
    }

    async fn accept_invite<'a>(
        &'a self,
        id: &'a InviteId,
        recipient: &'a UserId,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Invite>> {
        let mut state = self.write()?;
        let recipient_exists = state.users.contains_key(recipient);
        let Some(invite) = state.invites.get_mut(id) else {
            return Ok(None);
        };
        if invite.status != InviteStatus::Pending
            || invite.is_expired(at)
            || !recipient_exists
            || invite.owner_id == *recipient
        {
            return Ok(None);
        }

        invite.status = InviteStatus::Accepted;
        invite.recipient_id = Some(recipient.clone());
        invite.accepted_at = Some(at);
        Ok(Some(invite.clone()))
    }

    async fn finalize_invite<'a>(
        &'a self,
        id: &'a InviteId,
        owner: &'a UserId,
        key: &'a WrappedKey,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<ShareGrant>> {
        let mut state = self.write()?;
        let recipient = match state.invites.get(id) {
            Some(Invite {
                status: InviteStatus::Accepted,
                recipient_id: Some(recipient),
                owner_id,
                expires_at,
                ..
            }) if owner_id == owner && at < *expires_at => recipient.clone(),
            _ => return Ok(None),
        };
        if !state.users.contains_key(&recipient) {
            return Ok(None);
        }

        if let Some(invite) = state.invites.get_mut(id) {
            invite.status = InviteStatus::Completed;
            invite.completed_at = Some(at);
        }

        let grant = ShareGrant {
            owner_id: owner.clone(),
            recipient_id: recipient.clone(),
            wrapped_tree_key: key.clone(),
            invite_id: id.clone(),
            granted_at: at,
        };
        state.grants.insert((owner.clone(), recipient.clone()), grant.clone());

        let owned: Vec<PersonId> = state
            .persons
            .values()
            .filter(|person| person.owner_id == *owner)
            .map(|person| person.id)
            .collect();
        for person in owned {
            state.viewers.entry((recipient.clone(), person)).or_default();
        }

        Ok(Some(grant))
    }

    async fn revoke_grant<'a>(&'a self, owner: &'a UserId, recipient: &'a UserId) -> StoreResult<bool> {
        let mut state = self.write()?;
        let existed = state.grants.remove(&(owner.clone(), recipient.clone())).is_some();

        let owned: HashSet<PersonId> = state
            .persons
            .values()
            .filter(|person| person.owner_id == *owner)
            .map(|person| person.id)
            .collect();
        state
            .viewers
            .retain(|(viewer, person), _| !(viewer == recipient && owned.contains(person)));
        Ok(existed)
    }

    async fn grants_to<'a>(&'a self, recipient: &'a UserId) -> StoreResult<Vec<ShareGrant>> {
        let state = self.read()?;
        let mut grants: Vec<ShareGrant> = state
            .grants
            .values()
            .filter(|grant| grant.recipient_id == *recipient)
            .cloned()
            .collect();
        grants.sort_by_key(|grant| grant.granted_at);
        Ok(grants)
    }

    async fn grants_from<'a>(&'a self, owner: &'a UserId) -> StoreResult<Vec<ShareGrant>> {
        let state = self.read()?;
        let mut grants: Vec<ShareGrant> = state
            .grants
            .values()
            .filter(|grant| grant.owner_id == *owner)
            .cloned()
            .collect();
        grants.sort_by_key(|grant| grant.granted_at);
        Ok(grants)
    }

    async fn invites_from<'a>(&'a self, owner: &'a UserId) -> StoreResult<Vec<Invite>> {
        let state = self.read()?;
        let mut invites: Vec<Invite> = state
            .invites
            .values()
            .filter(|invite| invite.owner_id == *owner)
            .cloned()
            .collect();
        invites.sort_by_key(|invite| invite.created_at);
        Ok(invites)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rodovid_core::types::{BlobField, BlobMap, Gender, NewPerson};

    use super::*;

    async fn user(store: &MemoryStore, id: &str) -> UserId {
        let id = UserId::new(id);
        assert!(store.insert_user(&User::new(id.clone(), "pk")).await.unwrap());
        id
    }

    async fn person(store: &MemoryStore, owner: &UserId, gender: Gender) -> PersonId {
        let mut blobs = BlobMap::new();
        blobs.insert(BlobField::Name, Blob::new("ENC_name"));
        let p = NewPerson { blobs, gender: Some(gender), ..Default::default() }.into_person(
            PersonId::new(),
            owner.clone(),
            Utc::now(),
        );
        assert!(store.insert_person(&p).await.unwrap());
        p.id
    }

    fn parent_of(parent: PersonId, child: PersonId) -> FamilyLink {
        FamilyLink::ParentOf { parent, child, parent_kind: ParentKind::Biological }
    }

    #[tokio::test]
    async fn duplicate_user_is_rejected() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        assert!(!store.insert_user(&User::new(alice, "other")).await.unwrap());
    }

    #[tokio::test]
    async fn person_requires_existing_owner() {
        let store = MemoryStore::new();
        let p = NewPerson::default().into_person(PersonId::new(), UserId::new("ghost"), Utc::now());
        assert!(!store.insert_person(&p).await.unwrap());
        assert!(store.get_person(p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn relinking_updates_in_place() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let a = person(&store, &alice, Gender::Male).await;
        let b = person(&store, &alice, Gender::Female).await;

        store.link(&FamilyLink::Spouse { a, b, meta: SpouseMeta::default() }).await.unwrap();
        let divorced = SpouseMeta { status: rodovid_core::types::SpouseStatus::Divorced, ..Default::default() };
        store.link(&FamilyLink::Spouse { a, b, meta: divorced }).await.unwrap();

        let spouses = store.spouses_of(a).await.unwrap();
        assert_eq!(spouses.len(), 1);
        assert_eq!(spouses[0].1, divorced);
        assert_eq!(store.spouses_of(b).await.unwrap()[0].1, divorced);
    }

    #[tokio::test]
    async fn link_with_missing_endpoint_writes_nothing() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let a = person(&store, &alice, Gender::Male).await;
        assert!(!store.link(&parent_of(a, PersonId::new())).await.unwrap());
        assert_eq!(store.descendant_count(a).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ancestors_follow_child_of_transitively() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let grandpa = person(&store, &alice, Gender::Male).await;
        let dad = person(&store, &alice, Gender::Male).await;
        let me = person(&store, &alice, Gender::Female).await;
        store.link(&parent_of(grandpa, dad)).await.unwrap();
        store.link(&parent_of(dad, me)).await.unwrap();

        let ancestors = store.ancestors_of(me).await.unwrap();
        assert_eq!(ancestors, HashSet::from([grandpa, dad]));
        assert!(store.ancestors_of(grandpa).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn nearest_leaf_is_measured_over_family_edges() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let grandpa = person(&store, &alice, Gender::Male).await;
        let dad = person(&store, &alice, Gender::Male).await;
        let me = person(&store, &alice, Gender::Female).await;
        store.link(&parent_of(grandpa, dad)).await.unwrap();
        store.link(&parent_of(dad, me)).await.unwrap();

        let mut seen = None;
        let outcome = store
            .retire_person(&alice, grandpa, Utc::now(), |ctx| {
                seen = Some(ctx);
                "ghost".to_string()
            })
            .await
            .unwrap();

        assert!(matches!(outcome, Retirement::Ghosted(_)));
        assert_eq!(seen.map(|c| c.leaf_distance), Some(Some(2)));
        assert!(store.get_person(grandpa).await.unwrap().unwrap().is_ghost());
    }

    #[tokio::test]
    async fn childless_person_is_removed_with_its_edges() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let dad = person(&store, &alice, Gender::Male).await;
        let me = person(&store, &alice, Gender::Female).await;
        store.link(&parent_of(dad, me)).await.unwrap();

        let outcome = store.retire_person(&alice, me, Utc::now(), |_| String::new()).await.unwrap();
        assert_eq!(outcome, Retirement::Deleted);
        assert!(store.get_person(me).await.unwrap().is_none());
        assert_eq!(store.descendant_count(dad).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn retire_by_non_owner_is_refused() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let p = person(&store, &alice, Gender::Male).await;
        let outcome = store.retire_person(&bob, p, Utc::now(), |_| String::new()).await.unwrap();
        assert_eq!(outcome, Retirement::NotOwned);
        assert!(store.get_person(p).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn finalized_share_fans_out_to_existing_and_new_persons() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let before = person(&store, &alice, Gender::Male).await;

        let now = Utc::now();
        let invite = Invite::new(alice.clone(), now, now + Duration::hours(24));
        store.insert_invite(&invite).await.unwrap();
        assert!(store.accept_invite(&invite.id, &bob, now).await.unwrap().is_some());
        let key = WrappedKey::new("wrapped-for-bob");
        assert!(store.finalize_invite(&invite.id, &alice, &key, now).await.unwrap().is_some());

        let after = person(&store, &alice, Gender::Female).await;
        assert!(matches!(store.access(&bob, before).await.unwrap(), Access::Viewer { .. }));
        assert!(matches!(store.access(&bob, after).await.unwrap(), Access::Viewer { .. }));

        assert!(store.revoke_grant(&alice, &bob).await.unwrap());
        assert_eq!(store.access(&bob, before).await.unwrap(), Access::None);
        assert!(store.grants_to(&bob).await.unwrap().is_empty());
    }

    async fn handshake(store: &MemoryStore, owner: &UserId, recipient: &UserId, key: &str) -> ShareGrant {
        let now = Utc::now();
        let invite = Invite::new(owner.clone(), now, now + Duration::hours(24));
        assert!(store.insert_invite(&invite).await.unwrap());
        assert!(store.accept_invite(&invite.id, recipient, now).await.unwrap().is_some());
        store.finalize_invite(&invite.id, owner, &WrappedKey::new(key), now).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn resharing_keeps_guest_notes_and_replaces_the_key() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let p = person(&store, &alice, Gender::Male).await;

        handshake(&store, &alice, &bob, "first-key").await;
        let note = Blob::new("ENC_note");
        assert!(store.set_guest_note(&bob, p, &note).await.unwrap());
        let second = handshake(&store, &alice, &bob, "second-key").await;

        assert_eq!(store.access(&bob, p).await.unwrap(), Access::Viewer { guest_note: Some(note) });
        let grants = store.grants_to(&bob).await.unwrap();
        assert_eq!(grants, vec![second]);
        assert_eq!(grants[0].wrapped_tree_key, WrappedKey::new("second-key"));
    }

    #[tokio::test]
    async fn expired_invite_cannot_be_accepted() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let now = Utc::now();
        let invite = Invite::new(alice, now - Duration::hours(48), now - Duration::hours(24));
        store.insert_invite(&invite).await.unwrap();
        assert!(store.accept_invite(&invite.id, &bob, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_a_source_keeps_the_person() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let p = person(&store, &alice, Gender::Male).await;
        let source = rodovid_core::types::NewSource { title: "Metric book".into(), ..Default::default() }
            .into_source(SourceId::new(), alice.clone(), Utc::now());
        store.insert_source(&source).await.unwrap();
        assert!(store.link_source(p, source.id, EvidenceType::Birth).await.unwrap());
        assert_eq!(store.sources_for(p).await.unwrap().len(), 1);

        assert!(store.delete_source(&alice, source.id).await.unwrap());
        assert!(store.sources_for(p).await.unwrap().is_empty());
        assert!(store.get_person(p).await.unwrap().is_some());
    }
}
