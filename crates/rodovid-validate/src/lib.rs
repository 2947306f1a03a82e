//! rodovid-validate: Date resolution and genealogical consistency rules.
//!
//! Everything here is pure. The validator sees only coarse structural facts
//! (resolved years, gender tags, existing relationship lists) supplied by
//! the caller and never touches the store. Rules produce independent
//! results; the caller treats any `Error` as a rejection and surfaces
//! warnings alongside a successful write.

pub mod biology;
pub mod date;
pub mod duplicate;
pub mod findings;
pub mod multiplicity;
pub mod temporal;
pub mod topology;

pub use date::{is_record_year, resolve, DateConfidence, DateInput, ResolvedDate};
pub use duplicate::DuplicateCandidate;
pub use findings::{Level, RuleCode, ValidationReport, ValidationResult};

use std::collections::HashSet;

use chrono::{Datelike, Utc};
use rodovid_core::config::ValidationPolicy;
use rodovid_core::types::{
    Gender, ParentKind, Person, PersonId, RelationKind, SpouseMeta, SpouseStatus,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The validator's view of a Person.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonFacts {
    pub id: PersonId,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub death_year: Option<i32>,
}

impl From<&Person> for PersonFacts {
    fn from(person: &Person) -> Self {
        Self {
            id: person.id,
            gender: person.gender,
            birth_year: person.birth_year,
            death_year: person.death_year,
        }
    }
}

/// A proposed `parent → child` edge and the facts around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentLinkCheck {
    pub parent: PersonFacts,
    pub child: PersonFacts,
    #[serde(default)]
    pub parent_kind: ParentKind,
    /// Direction the caller asked for; selects the self-reference code.
    #[serde(default = "default_parent_direction")]
    pub requested_as: RelationKind,
    /// Kinds of the child's other current parents.
    #[serde(default)]
    pub existing_parents: Vec<ParentKind>,
    /// `CHILD_OF` closure of the proposed parent.
    #[serde(default)]
    pub parent_ancestors: HashSet<PersonId>,
}

fn default_parent_direction() -> RelationKind {
    RelationKind::ParentOf
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpouseLinkCheck {
    pub a: PersonFacts,
    pub b: PersonFacts,
    #[serde(default)]
    pub meta: SpouseMeta,
    #[serde(default)]
    pub a_spouses: Vec<(PersonId, SpouseMeta)>,
    #[serde(default)]
    pub b_spouses: Vec<(PersonId, SpouseMeta)>,
    #[serde(default)]
    pub already_siblings: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SiblingLinkCheck {
    pub a: PersonId,
    pub b: PersonId,
    #[serde(default)]
    pub already_spouses: bool,
}

/// A validation preview request, tagged by `check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum ValidationRequest {
    Person(PersonFacts),
    ParentLink(ParentLinkCheck),
    SpouseLink(SpouseLinkCheck),
    SiblingLink(SiblingLinkCheck),
    Duplicate {
        subject: DuplicateCandidate,
        #[serde(default)]
        candidates: Vec<DuplicateCandidate>,
    },
}

/// Composite checks over the individual rule families.
#[derive(Debug, Clone)]
pub struct FamilyValidator {
    policy: ValidationPolicy,
    current_year: i32,
}

impl Default for FamilyValidator {
    fn default() -> Self {
        Self::new(ValidationPolicy::default())
    }
}

impl FamilyValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        let current_year = policy.current_year.unwrap_or_else(|| Utc::now().year());
        Self { policy, current_year }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Birth/death consistency of a single Person.
    pub fn validate_lifespan(&self, birth: Option<i32>, death: Option<i32>) -> ValidationReport {
        temporal::check_lifespan(&self.policy, self.current_year, birth, death)
            .into_iter()
            .collect()
    }

    /// Parent's age at the child's birth, without gender-specific rules.
    pub fn validate_parent_child(&self, parent_birth: Option<i32>, child_birth: Option<i32>) -> ValidationReport {
        temporal::check_parent_age(&self.policy, parent_birth, Some(Gender::Male), child_birth)
            .into_iter()
            .collect()
    }

    pub fn validate_person(&self, person: &PersonFacts) -> ValidationReport {
        finish("person", self.validate_lifespan(person.birth_year, person.death_year))
    }

    pub fn validate_duplicate(
        &self,
        subject: &DuplicateCandidate,
        candidates: &[DuplicateCandidate],
    ) -> ValidationReport {
        finish("duplicate", duplicate::check_duplicate(subject, candidates).into_iter().collect())
    }

    pub fn validate_parent_link(&self, check: &ParentLinkCheck) -> ValidationReport {
        let mut report = ValidationReport::new();
        if let Some(r) = topology::check_self_reference(check.requested_as, check.parent.id, check.child.id) {
            report.push(r);
            return finish("parent_link", report);
        }

        report.extend(topology::check_ancestry_cycle(check.child.id, &check.parent_ancestors));
        report.extend(biology::check_biological_parents(&check.existing_parents, check.parent_kind));
        report.extend(temporal::check_parent_age(
            &self.policy,
            check.parent.birth_year,
            check.parent.gender,
            check.child.birth_year,
        ));
        if check.parent_kind.is_biological() {
            report.extend(temporal::check_posthumous_birth(
                &self.policy,
                check.parent.death_year,
                check.parent.gender,
                check.child.birth_year,
            ));
        }
        finish("parent_link", report)
    }

    pub fn validate_spouse_link(&self, check: &SpouseLinkCheck) -> ValidationReport {
        let mut report = ValidationReport::new();
        if let Some(r) = topology::check_self_reference(RelationKind::Spouse, check.a.id, check.b.id) {
            report.push(r);
            return finish("spouse_link", report);
        }

        let meta = &check.meta;
        report.extend(multiplicity::check_concurrent_marriage(
            &self.policy,
            meta.status,
            check.b.id,
            &check.a_spouses,
        ));
        report.extend(multiplicity::check_concurrent_marriage(
            &self.policy,
            meta.status,
            check.a.id,
            &check.b_spouses,
        ));

        for spouse in [&check.a, &check.b] {
            report.extend(temporal::check_marriage_age(&self.policy, spouse.birth_year, meta.marriage_year));
            report.extend(temporal::check_marriage_before_death(meta.marriage_year, spouse.death_year));
        }

        // Only a divorced pair, or one with a recorded divorce year, needs ordering.
        if meta.status == SpouseStatus::Divorced || meta.divorce_year.is_some() {
            report.extend(temporal::check_divorce_order(meta.marriage_year, meta.divorce_year));
        }

        report.extend(multiplicity::check_sibling_spouse(RelationKind::Spouse, check.already_siblings));
        finish("spouse_link", report)
    }

    /// Dispatch a preview request to the matching composite check.
    pub fn run(&self, request: &ValidationRequest) -> ValidationReport {
        match request {
            ValidationRequest::Person(facts) => self.validate_person(facts),
            ValidationRequest::ParentLink(check) => self.validate_parent_link(check),
            ValidationRequest::SpouseLink(check) => self.validate_spouse_link(check),
            ValidationRequest::SiblingLink(check) => self.validate_sibling_link(check),
            ValidationRequest::Duplicate { subject, candidates } => self.validate_duplicate(subject, candidates),
        }
    }

    pub fn validate_sibling_link(&self, check: &SiblingLinkCheck) -> ValidationReport {
        let mut report = ValidationReport::new();
        if let Some(r) = topology::check_self_reference(RelationKind::Sibling, check.a, check.b) {
            report.push(r);
            return finish("sibling_link", report);
        }
        report.extend(multiplicity::check_sibling_spouse(RelationKind::Sibling, check.already_spouses));
        finish("sibling_link", report)
    }
}

fn finish(check: &str, report: ValidationReport) -> ValidationReport {
    debug!(
        check,
        errors = report.errors().count(),
        warnings = report.warnings().count(),
        skipped = report.skipped().count(),
        "Validation complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> FamilyValidator {
        FamilyValidator::new(ValidationPolicy {
            current_year: Some(2024),
            ..ValidationPolicy::default()
        })
    }

    fn facts(gender: Option<Gender>, birth: Option<i32>, death: Option<i32>) -> PersonFacts {
        PersonFacts { id: PersonId::new(), gender, birth_year: birth, death_year: death }
    }

    fn parent_check(parent: PersonFacts, child: PersonFacts) -> ParentLinkCheck {
        ParentLinkCheck {
            parent,
            child,
            parent_kind: ParentKind::Biological,
            requested_as: RelationKind::ParentOf,
            existing_parents: Vec::new(),
            parent_ancestors: HashSet::new(),
        }
    }

    #[test]
    fn test_current_year_pinned() {
        assert_eq!(validator().current_year(), 2024);
    }

    #[test]
    fn test_lifespan_error_iff_death_before_birth() {
        let v = validator();
        assert!(!v.validate_lifespan(Some(1900), Some(1899)).is_admissible());
        assert!(v.validate_lifespan(Some(1900), Some(1900)).is_admissible());
        assert!(v.validate_lifespan(Some(1900), Some(1960)).is_admissible());
        assert!(v.validate_lifespan(None, Some(1960)).is_admissible());
    }

    #[test]
    fn test_parent_child_property() {
        let v = validator();
        let min = v.policy().min_parent_age;
        for gap in -5..30 {
            let report = v.validate_parent_child(Some(1900), Some(1900 + gap));
            assert_eq!(!report.is_admissible(), gap <= 0 || gap < min, "gap {gap}");
        }
    }

    #[test]
    fn test_unknown_years_reported_as_skipped() {
        let v = validator();
        let report = v.validate_parent_child(None, Some(1920));
        assert!(report.is_admissible());
        assert_eq!(report.level_of(RuleCode::ParentBornAfterChild), Some(Level::Skipped));
    }

    #[test]
    fn test_self_parent_short_circuits() {
        let v = validator();
        let p = facts(Some(Gender::Male), Some(1900), None);
        let report = v.validate_parent_link(&parent_check(p, p));
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.level_of(RuleCode::SelfParent), Some(Level::Error));

        let mut as_child = parent_check(p, p);
        as_child.requested_as = RelationKind::ChildOf;
        assert!(v.validate_parent_link(&as_child).has(RuleCode::SelfChild));
    }

    #[test]
    fn test_parent_link_aggregates_rules() {
        let v = validator();
        let mother = facts(Some(Gender::Female), Some(1900), Some(1930));
        let child = facts(None, Some(1935), None);
        let mut check = parent_check(mother, child);
        check.existing_parents = vec![ParentKind::Biological, ParentKind::Biological];
        check.parent_ancestors = [child.id].into_iter().collect();

        let report = v.validate_parent_link(&check);
        assert!(!report.is_admissible());
        assert!(report.has(RuleCode::AncestryCycle));
        assert!(report.has(RuleCode::TooManyBiologicalParents));
        assert!(report.has(RuleCode::BornAfterMotherDeath));
    }

    #[test]
    fn test_adoptive_parent_skips_posthumous_rules() {
        let v = validator();
        let father = facts(Some(Gender::Male), Some(1900), Some(1930));
        let child = facts(None, Some(1940), None);
        let mut check = parent_check(father, child);
        check.parent_kind = ParentKind::Adoptive;
        let report = v.validate_parent_link(&check);
        assert!(!report.has(RuleCode::BornAfterFatherDeath));
        assert!(report.is_admissible());
    }

    #[test]
    fn test_spouse_link_checks_both_spouses() {
        let v = validator();
        let a = facts(Some(Gender::Male), Some(1900), Some(1950));
        let b = facts(Some(Gender::Female), Some(1912), Some(1920));
        let check = SpouseLinkCheck {
            a,
            b,
            meta: SpouseMeta { marriage_year: Some(1921), ..SpouseMeta::default() },
            a_spouses: vec![(PersonId::new(), SpouseMeta::default())],
            b_spouses: Vec::new(),
            already_siblings: true,
        };
        let report = v.validate_spouse_link(&check);
        assert!(!report.is_admissible());
        assert_eq!(report.level_of(RuleCode::ConcurrentMarriage), Some(Level::Error));
        assert_eq!(report.level_of(RuleCode::MarriageAfterDeath), Some(Level::Error));
        assert_eq!(report.level_of(RuleCode::SiblingSpouse), Some(Level::Warning));
        // Married status without a divorce year does not evaluate ordering.
        assert!(!report.has(RuleCode::DivorceBeforeMarriage));
    }

    #[test]
    fn test_divorce_before_marriage() {
        let v = validator();
        let check = SpouseLinkCheck {
            a: facts(None, Some(1900), None),
            b: facts(None, Some(1900), None),
            meta: SpouseMeta {
                status: SpouseStatus::Divorced,
                marriage_year: Some(1925),
                divorce_year: Some(1924),
                ..SpouseMeta::default()
            },
            a_spouses: Vec::new(),
            b_spouses: Vec::new(),
            already_siblings: false,
        };
        let report = v.validate_spouse_link(&check);
        assert_eq!(report.level_of(RuleCode::DivorceBeforeMarriage), Some(Level::Error));
    }

    #[test]
    fn test_sibling_link() {
        let v = validator();
        let a = PersonId::new();
        let self_sibling = SiblingLinkCheck { a, b: a, already_spouses: false };
        assert!(v.validate_sibling_link(&self_sibling).has(RuleCode::SelfSibling));

        let spouses = SiblingLinkCheck { a, b: PersonId::new(), already_spouses: true };
        let report = v.validate_sibling_link(&spouses);
        assert!(report.is_admissible());
        assert_eq!(report.level_of(RuleCode::SiblingSpouse), Some(Level::Warning));
    }

    #[test]
    fn test_request_dispatch_from_json() {
        let json = serde_json::json!({
            "check": "person",
            "id": PersonId::new(),
            "birth_year": 1900,
            "death_year": 1890,
        });
        let request: ValidationRequest = serde_json::from_value(json).unwrap();
        let report = validator().run(&request);
        assert_eq!(report.level_of(RuleCode::DeathBeforeBirth), Some(Level::Error));
    }

    #[test]
    fn test_parent_link_check_deserializes_with_defaults() {
        let parent = PersonId::new();
        let child = PersonId::new();
        let json = serde_json::json!({
            "parent": { "id": parent, "birth_year": 1900 },
            "child": { "id": child, "birth_year": 1925 },
        });
        let check: ParentLinkCheck = serde_json::from_value(json).unwrap();
        assert_eq!(check.requested_as, RelationKind::ParentOf);
        assert_eq!(check.parent_kind, ParentKind::Biological);
        assert!(validator().validate_parent_link(&check).is_admissible());
    }
}
