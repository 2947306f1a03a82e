//! Possible-duplicate detection over a caller-supplied candidate set.
//!
//! Names are encrypted at rest, so candidates come from the client that
//! holds the tree key.

use serde::{Deserialize, Serialize};

use crate::date::{self, DateInput};
use crate::findings::{RuleCode, ValidationResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DuplicateCandidate {
    pub name: String,
    #[serde(default)]
    pub birth: Option<DateInput>,
}

/// Lowercase and collapse internal whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Warn once per candidate that shares the normalized name and resolved
/// birth year of `subject`. Candidates with an unknown year never match.
pub fn check_duplicate(
    subject: &DuplicateCandidate,
    candidates: &[DuplicateCandidate],
) -> Vec<ValidationResult> {
    let Some(year) = date::resolve_opt(subject.birth.as_ref()).year else {
        return vec![ValidationResult::skipped(RuleCode::PossibleDuplicate, "birth year")];
    };
    let name = normalize_name(&subject.name);
    if name.is_empty() {
        return vec![ValidationResult::skipped(RuleCode::PossibleDuplicate, "name")];
    }

    candidates
        .iter()
        .filter(|c| normalize_name(&c.name) == name)
        .filter(|c| date::resolve_opt(c.birth.as_ref()).year == Some(year))
        .map(|c| {
            ValidationResult::warning(
                RuleCode::PossibleDuplicate,
                format!("A person named \"{}\" born in {year} already exists", c.name.trim()),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Level;

    fn candidate(name: &str, birth: Option<DateInput>) -> DuplicateCandidate {
        DuplicateCandidate { name: name.to_string(), birth }
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_name("  Іван   ПЕТРЕНКО "), "іван петренко");
    }

    #[test]
    fn matches_on_name_and_resolved_year() {
        let subject = candidate("Ivan Petrenko", Some(1900.into()));
        let existing = [
            candidate("ivan  petrenko", Some("c. 1900".into())),
            candidate("Ivan Petrenko", Some(1901.into())),
            candidate("Petro Petrenko", Some(1900.into())),
            candidate("Ivan Petrenko", None),
        ];
        let results = check_duplicate(&subject, &existing);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].level, Level::Warning);
        assert_eq!(results[0].code, RuleCode::PossibleDuplicate);
    }

    #[test]
    fn unknown_subject_year_is_skipped() {
        let subject = candidate("Ivan", Some("?".into()));
        let results = check_duplicate(&subject, &[candidate("Ivan", Some(1900.into()))]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].level, Level::Skipped);
    }
}
