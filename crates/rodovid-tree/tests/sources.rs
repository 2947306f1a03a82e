mod common;

use common::{named, parent_of, service, share, user};
use rodovid_core::{EvidenceType, NewSource, SourceConfidence, SourceId, UserId};
use rodovid_tree::{Deletion, TreeError};

fn metric_book() -> NewSource {
    NewSource {
        title: "Metric book, St. Nicholas parish".into(),
        archive_ref: Some("F.127 Op.1012 Spr.45".into()),
        confidence: SourceConfidence::High,
        ..NewSource::default()
    }
}

#[tokio::test]
async fn test_source_crud() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let mallory = user(&tree, "mallory").await;

    let source = tree.create_source(&alice, metric_book()).await.unwrap();
    assert_eq!(tree.get_source(&alice, source.id).await.unwrap(), source);
    assert_eq!(tree.list_sources(&alice).await.unwrap(), vec![source.clone()]);

    assert!(matches!(tree.get_source(&mallory, source.id).await, Err(TreeError::NotFound)));
    assert!(tree.list_sources(&mallory).await.unwrap().is_empty());
    assert!(matches!(tree.delete_source(&mallory, source.id).await, Err(TreeError::NotFound)));

    tree.delete_source(&alice, source.id).await.unwrap();
    assert!(matches!(tree.get_source(&alice, source.id).await, Err(TreeError::NotFound)));
    assert!(matches!(tree.delete_source(&alice, SourceId::new()).await, Err(TreeError::NotFound)));
}

#[tokio::test]
async fn test_source_requires_title_and_owner() {
    let tree = service();
    let alice = user(&tree, "alice").await;

    let untitled = NewSource { title: "  ".into(), ..NewSource::default() };
    assert!(matches!(tree.create_source(&alice, untitled).await, Err(TreeError::InvalidInput(_))));

    let orphan = tree.create_source(&UserId::new("nobody"), metric_book()).await;
    assert!(matches!(orphan, Err(TreeError::OwnerNotFound(_))));
}

#[tokio::test]
async fn test_link_source_is_idempotent_per_evidence_type() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let p = named(&tree, &alice, "p").await;
    let source = tree.create_source(&alice, metric_book()).await.unwrap();

    tree.link_source(&alice, p, source.id, EvidenceType::Birth).await.unwrap();
    tree.link_source(&alice, p, source.id, EvidenceType::Birth).await.unwrap();
    tree.link_source(&alice, p, source.id, EvidenceType::Marriage).await.unwrap();

    let linked = tree.sources_for(&alice, p).await.unwrap();
    assert_eq!(linked.len(), 2);
    assert!(linked.iter().all(|l| l.source.id == source.id));
    assert!(linked.iter().any(|l| l.evidence == EvidenceType::Birth));
    assert!(linked.iter().any(|l| l.evidence == EvidenceType::Marriage));
}

#[tokio::test]
async fn test_evidence_visible_to_viewers_only() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let bob = user(&tree, "bob").await;
    let mallory = user(&tree, "mallory").await;
    let p = named(&tree, &alice, "p").await;
    let source = tree.create_source(&alice, metric_book()).await.unwrap();
    tree.link_source(&alice, p, source.id, EvidenceType::General).await.unwrap();
    share(&tree, &alice, &bob).await;

    assert_eq!(tree.sources_for(&bob, p).await.unwrap().len(), 1);
    assert!(matches!(tree.sources_for(&mallory, p).await, Err(TreeError::NotFound)));

    let theirs = tree.create_source(&bob, metric_book()).await.unwrap();
    let denied = tree.link_source(&bob, p, theirs.id, EvidenceType::General).await;
    assert!(matches!(denied, Err(TreeError::NotFound)));

    let other = named(&tree, &alice, "other").await;
    let foreign = tree.link_source(&alice, other, theirs.id, EvidenceType::General).await;
    assert!(matches!(foreign, Err(TreeError::NotFound)));
}

#[tokio::test]
async fn test_source_outlives_deleted_person() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let p = named(&tree, &alice, "p").await;
    let source = tree.create_source(&alice, metric_book()).await.unwrap();
    tree.link_source(&alice, p, source.id, EvidenceType::Death).await.unwrap();

    assert_eq!(tree.delete_person(&alice, p).await.unwrap(), Deletion::Deleted);
    assert_eq!(tree.get_source(&alice, source.id).await.unwrap(), source);
    assert_eq!(tree.list_sources(&alice).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_deleting_source_keeps_person() {
    let tree = service();
    let alice = user(&tree, "alice").await;
    let dad = named(&tree, &alice, "dad").await;
    let kid = named(&tree, &alice, "kid").await;
    parent_of(&tree, &alice, dad, kid).await;
    let source = tree.create_source(&alice, metric_book()).await.unwrap();
    tree.link_source(&alice, kid, source.id, EvidenceType::Birth).await.unwrap();

    tree.delete_source(&alice, source.id).await.unwrap();
    assert!(tree.sources_for(&alice, kid).await.unwrap().is_empty());
    assert!(tree.get_person(&alice, kid).await.is_ok());
    assert_eq!(tree.get_parents(&alice, kid).await.unwrap().len(), 1);
}
