use rodovid_core::types::ParentKind;

use crate::findings::{RuleCode, ValidationResult};

/// Maximum number of biological parents a Person may have.
pub const MAX_BIOLOGICAL_PARENTS: usize = 2;

/// At most two biological parents. Adoptive parents are not counted.
pub fn check_biological_parents(
    existing: &[ParentKind],
    proposed: ParentKind,
) -> Option<ValidationResult> {
    if !proposed.is_biological() {
        return None;
    }
    let biological = existing.iter().filter(|k| k.is_biological()).count();
    (biological >= MAX_BIOLOGICAL_PARENTS).then(|| {
        ValidationResult::error(
            RuleCode::TooManyBiologicalParents,
            format!("Child already has {biological} biological parents"),
        )
    })
}
