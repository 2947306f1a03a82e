mod common;

use common::{named, parent_of, person, service, share, user};
use rodovid_core::config::GhostLocale;
use rodovid_core::{FamilyLink, Gender, RodovidConfig, SpouseMeta};
use rodovid_graph::MemoryStore;
use rodovid_tree::{Deletion, FamilyTree, TreeError};

#[tokio::test]
async fn test_childless_person_is_hard_deleted() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let dad = named(&tree, &alice, "dad").await;
    let kid = named(&tree, &alice, "kid").await;
    let wife = named(&tree, &alice, "wife").await;
    parent_of(&tree, &alice, dad, kid).await;
    tree.link(&alice, FamilyLink::Spouse { a: kid, b: wife, meta: SpouseMeta::default() })
        .await
        .unwrap();

    assert_eq!(tree.delete_person(&alice, kid).await.unwrap(), Deletion::Deleted);

    assert!(matches!(tree.get_person(&alice, kid).await, Err(TreeError::NotFound)));
    assert!(tree.get_children(&alice, dad).await.unwrap().is_empty());
    assert!(tree.get_spouses(&alice, wife).await.unwrap().is_empty());
    assert!(tree.get_tree(&alice, true).await.unwrap().edges.is_empty());
}

#[tokio::test]
async fn test_person_with_children_becomes_ghost() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let grandpa = person(&tree, &alice, Gender::Male, None).await;
    let kid = named(&tree, &alice, "kid").await;
    parent_of(&tree, &alice, grandpa, kid).await;

    let outcome = tree.delete_person(&alice, grandpa).await.unwrap();
    assert_eq!(outcome, Deletion::Ghosted { ghost_name: "дід".into() });

    let ghost = tree.get_person(&alice, grandpa).await.unwrap().person;
    assert!(ghost.is_ghost());
    assert_eq!(ghost.tombstone.as_ref().map(|t| t.ghost_name.as_str()), Some("дід"));
    assert_eq!(tree.get_children(&alice, grandpa).await.unwrap().len(), 1);
    assert_eq!(tree.get_parents(&alice, kid).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ghost_label_uses_distance_to_leaf() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let great = person(&tree, &alice, Gender::Female, None).await;
    let grandma = person(&tree, &alice, Gender::Female, None).await;
    let kid = named(&tree, &alice, "kid").await;
    parent_of(&tree, &alice, great, grandma).await;
    parent_of(&tree, &alice, grandma, kid).await;

    let outcome = tree.delete_person(&alice, great).await.unwrap();
    assert_eq!(outcome, Deletion::Ghosted { ghost_name: "прабаба".into() });
}

#[tokio::test]
async fn test_deleting_a_ghost_again_keeps_its_label() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let grandpa = person(&tree, &alice, Gender::Male, None).await;
    let kid = named(&tree, &alice, "kid").await;
    parent_of(&tree, &alice, grandpa, kid).await;

    let first = tree.delete_person(&alice, grandpa).await.unwrap();
    let second = tree.delete_person(&alice, grandpa).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_ghost_without_descendants_left_is_removed() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let grandpa = person(&tree, &alice, Gender::Male, None).await;
    let kid = named(&tree, &alice, "kid").await;
    parent_of(&tree, &alice, grandpa, kid).await;

    tree.delete_person(&alice, grandpa).await.unwrap();
    assert_eq!(tree.delete_person(&alice, kid).await.unwrap(), Deletion::Deleted);
    assert_eq!(tree.delete_person(&alice, grandpa).await.unwrap(), Deletion::Deleted);
    assert!(tree.get_tree(&alice, true).await.unwrap().nodes.is_empty());
}

#[tokio::test]
async fn test_viewer_delete_only_unshares() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let bob = user(&tree, "bob").await;
    let dad = named(&tree, &alice, "dad").await;
    let kid = named(&tree, &alice, "kid").await;
    parent_of(&tree, &alice, dad, kid).await;
    share(&tree, &alice, &bob).await;

    assert_eq!(tree.delete_person(&bob, kid).await.unwrap(), Deletion::Unshared);

    assert!(matches!(tree.get_person(&bob, kid).await, Err(TreeError::NotFound)));
    let owner_view = tree.get_person(&alice, kid).await.unwrap();
    assert!(!owner_view.person.is_ghost());
    assert_eq!(tree.get_parents(&alice, kid).await.unwrap().len(), 1);
    // The rest of the share is untouched.
    assert!(tree.get_person(&bob, dad).await.is_ok());
}

#[tokio::test]
async fn test_stranger_delete_is_not_found() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let mallory = user(&tree, "mallory").await;
    let p = named(&tree, &alice, "p").await;

    assert!(matches!(tree.delete_person(&mallory, p).await, Err(TreeError::NotFound)));
    assert!(tree.get_person(&alice, p).await.is_ok());
}

#[tokio::test]
async fn test_english_ghost_labels() {
    let mut config = RodovidConfig::default();
    config.ghosts.locale = GhostLocale::En;
    let tree = FamilyTree::new(MemoryStore::new()).with_config(config);

    let alice = user(&tree, "alice").await;
    let grandma = person(&tree, &alice, Gender::Female, None).await;
    let kid = named(&tree, &alice, "kid").await;
    parent_of(&tree, &alice, grandma, kid).await;

    let outcome = tree.delete_person(&alice, grandma).await.unwrap();
    assert_eq!(outcome, Deletion::Ghosted { ghost_name: "grandmother".into() });
}
