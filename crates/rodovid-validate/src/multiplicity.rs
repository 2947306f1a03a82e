//! Rules on how many relationships of a kind a Person may hold.

use rodovid_core::config::ValidationPolicy;
use rodovid_core::types::{PersonId, RelationKind, SpouseMeta, SpouseStatus};

use crate::findings::{RuleCode, ValidationResult};

/// A new `married` spouse edge while another `married` edge exists.
///
/// `existing` are the Person's current spouses; an entry for `partner`
/// itself is ignored so re-linking the same pair passes.
pub fn check_concurrent_marriage(
    policy: &ValidationPolicy,
    proposed: SpouseStatus,
    partner: PersonId,
    existing: &[(PersonId, SpouseMeta)],
) -> Option<ValidationResult> {
    if policy.allow_polygamy || proposed != SpouseStatus::Married {
        return None;
    }
    let current = existing
        .iter()
        .filter(|(id, meta)| *id != partner && meta.status == SpouseStatus::Married)
        .count();
    (current > 0).then(|| {
        ValidationResult::error(
            RuleCode::ConcurrentMarriage,
            format!("Already in {current} marriage(s) with status married"),
        )
    })
}

/// Siblings who are also spouses. Advisory only.
///
/// `proposed` is the relation being added; `conflicting` whether the
/// opposite relation already links the pair.
pub fn check_sibling_spouse(proposed: RelationKind, conflicting: bool) -> Option<ValidationResult> {
    if !conflicting {
        return None;
    }
    let message = match proposed {
        RelationKind::Sibling => "These people are already recorded as spouses",
        _ => "These people are already recorded as siblings",
    };
    Some(ValidationResult::warning(RuleCode::SiblingSpouse, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Level;

    fn spouse(status: SpouseStatus) -> (PersonId, SpouseMeta) {
        (PersonId::new(), SpouseMeta { status, ..SpouseMeta::default() })
    }

    #[test]
    fn second_marriage_rejected() {
        let policy = ValidationPolicy::default();
        let existing = [spouse(SpouseStatus::Married)];
        let result =
            check_concurrent_marriage(&policy, SpouseStatus::Married, PersonId::new(), &existing);
        assert_eq!(result.map(|r| r.level), Some(Level::Error));
    }

    #[test]
    fn polygamy_policy_and_non_married_status() {
        let existing = [spouse(SpouseStatus::Married)];
        let partner = PersonId::new();

        let permissive = ValidationPolicy { allow_polygamy: true, ..ValidationPolicy::default() };
        assert!(check_concurrent_marriage(&permissive, SpouseStatus::Married, partner, &existing).is_none());

        let policy = ValidationPolicy::default();
        assert!(check_concurrent_marriage(&policy, SpouseStatus::Divorced, partner, &existing).is_none());

        let past = [spouse(SpouseStatus::Divorced), spouse(SpouseStatus::Widowed)];
        assert!(check_concurrent_marriage(&policy, SpouseStatus::Married, partner, &past).is_none());
    }

    #[test]
    fn relinking_same_partner_passes() {
        let policy = ValidationPolicy::default();
        let existing = [spouse(SpouseStatus::Married)];
        let partner = existing[0].0;
        assert!(check_concurrent_marriage(&policy, SpouseStatus::Married, partner, &existing).is_none());
    }

    #[test]
    fn sibling_spouse_warns_both_directions() {
        for kind in [RelationKind::Sibling, RelationKind::Spouse] {
            let result = check_sibling_spouse(kind, true).unwrap();
            assert_eq!(result.level, Level::Warning);
            assert!(check_sibling_spouse(kind, false).is_none());
        }
    }
}
