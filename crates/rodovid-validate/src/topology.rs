//! Structural rules on the shape of the family graph.

use std::collections::HashSet;

use rodovid_core::types::{PersonId, RelationKind};

use crate::findings::{RuleCode, ValidationResult};

/// A relationship from a Person to itself, with a code per relation kind.
pub fn check_self_reference(kind: RelationKind, a: PersonId, b: PersonId) -> Option<ValidationResult> {
    if a != b {
        return None;
    }
    let (code, message) = match kind {
        RelationKind::Spouse => (RuleCode::SelfMarriage, "A person cannot marry themselves"),
        RelationKind::ParentOf => (RuleCode::SelfParent, "A person cannot be their own parent"),
        RelationKind::ChildOf => (RuleCode::SelfChild, "A person cannot be their own child"),
        RelationKind::Sibling => (RuleCode::SelfSibling, "A person cannot be their own sibling"),
    };
    Some(ValidationResult::error(code, message))
}

/// Reject `parent → child` when `child` is already an ancestor of `parent`.
///
/// `parent_ancestors` is the `CHILD_OF` closure of the proposed parent.
pub fn check_ancestry_cycle(
    child: PersonId,
    parent_ancestors: &HashSet<PersonId>,
) -> Option<ValidationResult> {
    parent_ancestors.contains(&child).then(|| {
        ValidationResult::error(
            RuleCode::AncestryCycle,
            "The proposed child is already an ancestor of the proposed parent",
        )
    })
}
