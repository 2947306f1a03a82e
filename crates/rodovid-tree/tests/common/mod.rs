#![allow(dead_code)]

use rodovid_core::{
    Blob, BlobField, FamilyLink, Gender, NewPerson, ParentKind, PersonId, ShareGrant, UserId,
    WrappedKey,
};
use rodovid_graph::MemoryStore;
use rodovid_tree::FamilyTree;

pub type Tree = FamilyTree<MemoryStore>;

pub fn service() -> Tree {
    FamilyTree::new(MemoryStore::new())
}

pub fn enc(payload: &str) -> Blob {
    Blob::new(format!("ENC_{payload}"))
}

pub async fn user(tree: &Tree, id: &str) -> UserId {
    let id = UserId::new(id);
    tree.register_user(id.clone(), format!("pk-{id}"), None).await.unwrap();
    id
}

pub async fn person(tree: &Tree, owner: &UserId, gender: Gender, birth_year: Option<i32>) -> PersonId {
    let input = NewPerson {
        gender: Some(gender),
        birth_year,
        ..NewPerson::default()
    };
    create(tree, owner, input).await
}

pub async fn named(tree: &Tree, owner: &UserId, name: &str) -> PersonId {
    let mut input = NewPerson::default();
    input.blobs.insert(BlobField::Name, enc(name));
    create(tree, owner, input).await
}

pub async fn create(tree: &Tree, owner: &UserId, input: NewPerson) -> PersonId {
    tree.create_person(owner, input).await.unwrap().value.id
}

pub async fn parent_of(tree: &Tree, owner: &UserId, parent: PersonId, child: PersonId) {
    let link = FamilyLink::ParentOf { parent, child, parent_kind: ParentKind::Biological };
    tree.link(owner, link).await.unwrap();
}

/// Run the full invite handshake from `owner` to `recipient`.
pub async fn share(tree: &Tree, owner: &UserId, recipient: &UserId) -> ShareGrant {
    let invite = tree.create_invite(owner, None).await.unwrap();
    tree.accept_invite(&invite.id, recipient).await.unwrap();
    tree.finalize_share(&invite.id, owner, WrappedKey::new(format!("wrapped-for-{recipient}")))
        .await
        .unwrap()
}
