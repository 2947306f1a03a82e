//! Temporal rules: lifespans, parental ages, posthumous births, marriages.
//!
//! Every function takes resolved years. A `None` year means the rule cannot
//! be evaluated and yields a `Skipped` result under its own code.

use rodovid_core::config::ValidationPolicy;
use rodovid_core::types::Gender;

use crate::findings::{RuleCode, ValidationResult};

/// Death before birth (error) and implausible age (warning).
///
/// Age is measured at death, or at `current_year` for the living.
pub fn check_lifespan(
    policy: &ValidationPolicy,
    current_year: i32,
    birth: Option<i32>,
    death: Option<i32>,
) -> Vec<ValidationResult> {
    let mut out = Vec::with_capacity(2);

    match (birth, death) {
        (Some(b), Some(d)) if d < b => out.push(ValidationResult::error(
            RuleCode::DeathBeforeBirth,
            format!("Death year {d} is before birth year {b}"),
        )),
        (Some(_), Some(_)) => {}
        (None, _) => out.push(ValidationResult::skipped(RuleCode::DeathBeforeBirth, "birth year")),
        (_, None) => out.push(ValidationResult::skipped(RuleCode::DeathBeforeBirth, "death year")),
    }

    let Some(b) = birth else {
        out.push(ValidationResult::skipped(RuleCode::UnrealisticAge, "birth year"));
        return out;
    };

    match death {
        Some(d) if d >= b => match years_between(b, d) {
            Some(age) if age > policy.max_lifespan => out.push(ValidationResult::warning(
                RuleCode::UnrealisticAge,
                format!("Lived {age} years, more than {}", policy.max_lifespan),
            )),
            Some(_) => {}
            None => out.push(ValidationResult::out_of_range(RuleCode::UnrealisticAge)),
        },
        Some(_) => {}
        None => match years_between(b, current_year) {
            Some(age) if age > policy.max_lifespan => out.push(ValidationResult::warning(
                RuleCode::ImplausiblyAlive,
                format!("Would be {age} years old if alive, more than {}", policy.max_lifespan),
            )),
            Some(_) => {}
            None => out.push(ValidationResult::out_of_range(RuleCode::ImplausiblyAlive)),
        },
    }

    out
}

/// Parent's age at the child's birth.
///
/// An age of zero or less is an error and suppresses the remaining age
/// checks. Below `min_parent_age` is an error; a mother above
/// `max_mother_age` is a warning.
pub fn check_parent_age(
    policy: &ValidationPolicy,
    parent_birth: Option<i32>,
    parent_gender: Option<Gender>,
    child_birth: Option<i32>,
) -> Vec<ValidationResult> {
    let (Some(p), Some(c)) = (parent_birth, child_birth) else {
        let missing = if parent_birth.is_none() { "parent birth year" } else { "child birth year" };
        let mut out = vec![
            ValidationResult::skipped(RuleCode::ParentBornAfterChild, missing),
            ValidationResult::skipped(RuleCode::ParentTooYoung, missing),
        ];
        if parent_gender != Some(Gender::Male) {
            out.push(ValidationResult::skipped(RuleCode::MotherTooOld, missing));
        }
        return out;
    };

    let Some(age) = years_between(p, c) else {
        return vec![
            ValidationResult::out_of_range(RuleCode::ParentBornAfterChild),
            ValidationResult::out_of_range(RuleCode::ParentTooYoung),
        ];
    };
    if age <= 0 {
        return vec![ValidationResult::error(
            RuleCode::ParentBornAfterChild,
            format!("Parent born in {p}, not before the child ({c})"),
        )];
    }

    let mut out = Vec::new();
    if age < policy.min_parent_age {
        out.push(ValidationResult::error(
            RuleCode::ParentTooYoung,
            format!("Parent was {age} at the child's birth, below {}", policy.min_parent_age),
        ));
    }
    match parent_gender {
        Some(Gender::Female) if age > policy.max_mother_age => out.push(ValidationResult::warning(
            RuleCode::MotherTooOld,
            format!("Mother was {age} at the child's birth, above {}", policy.max_mother_age),
        )),
        None => out.push(ValidationResult::skipped(RuleCode::MotherTooOld, "parent gender")),
        _ => {}
    }
    out
}

/// Child born after a parent's death.
///
/// After the mother's death is an error. After the father's death plus
/// `father_posthumous_years` is a warning.
pub fn check_posthumous_birth(
    policy: &ValidationPolicy,
    parent_death: Option<i32>,
    parent_gender: Option<Gender>,
    child_birth: Option<i32>,
) -> Vec<ValidationResult> {
    let codes: &[RuleCode] = match parent_gender {
        Some(Gender::Female) => &[RuleCode::BornAfterMotherDeath],
        Some(Gender::Male) => &[RuleCode::BornAfterFatherDeath],
        None => {
            return vec![
                ValidationResult::skipped(RuleCode::BornAfterMotherDeath, "parent gender"),
                ValidationResult::skipped(RuleCode::BornAfterFatherDeath, "parent gender"),
            ]
        }
    };

    let (Some(d), Some(c)) = (parent_death, child_birth) else {
        let missing = if parent_death.is_none() { "parent death year" } else { "child birth year" };
        return codes.iter().map(|&code| ValidationResult::skipped(code, missing)).collect();
    };

    let Some(gap) = years_between(d, c) else {
        return codes.iter().map(|&code| ValidationResult::out_of_range(code)).collect();
    };
    match parent_gender {
        Some(Gender::Female) if gap > 0 => vec![ValidationResult::error(
            RuleCode::BornAfterMotherDeath,
            format!("Child born in {c}, {gap} year(s) after the mother's death"),
        )],
        Some(Gender::Male) if gap > policy.father_posthumous_years => vec![ValidationResult::warning(
            RuleCode::BornAfterFatherDeath,
            format!("Child born in {c}, {gap} year(s) after the father's death"),
        )],
        _ => Vec::new(),
    }
}

/// Age of one spouse at marriage.
///
/// Below `marriage_hard_floor` is an error, below `min_marriage_age` a warning.
pub fn check_marriage_age(
    policy: &ValidationPolicy,
    birth: Option<i32>,
    marriage: Option<i32>,
) -> Option<ValidationResult> {
    let (Some(b), Some(m)) = (birth, marriage) else {
        let missing = if marriage.is_none() { "marriage year" } else { "birth year" };
        return Some(ValidationResult::skipped(RuleCode::ChildMarriage, missing));
    };

    let Some(age) = years_between(b, m) else {
        return Some(ValidationResult::out_of_range(RuleCode::ChildMarriage));
    };
    if age < policy.marriage_hard_floor {
        Some(ValidationResult::error(
            RuleCode::ChildMarriage,
            format!("Married at {age}, below {}", policy.marriage_hard_floor),
        ))
    } else if age < policy.min_marriage_age {
        Some(ValidationResult::warning(
            RuleCode::ChildMarriage,
            format!("Married at {age}, below {}", policy.min_marriage_age),
        ))
    } else {
        None
    }
}

pub fn check_divorce_order(marriage: Option<i32>, divorce: Option<i32>) -> Option<ValidationResult> {
    match (marriage, divorce) {
        (Some(m), Some(d)) if d < m => Some(ValidationResult::error(
            RuleCode::DivorceBeforeMarriage,
            format!("Divorce year {d} is before marriage year {m}"),
        )),
        (Some(_), Some(_)) => None,
        (None, _) => Some(ValidationResult::skipped(RuleCode::DivorceBeforeMarriage, "marriage year")),
        (_, None) => Some(ValidationResult::skipped(RuleCode::DivorceBeforeMarriage, "divorce year")),
    }
}

/// Marriage recorded after one spouse's death.
pub fn check_marriage_before_death(marriage: Option<i32>, death: Option<i32>) -> Option<ValidationResult> {
    match (marriage, death) {
        (Some(m), Some(d)) if m > d => Some(ValidationResult::error(
            RuleCode::MarriageAfterDeath,
            format!("Marriage year {m} is after death year {d}"),
        )),
        (Some(_), Some(_)) => None,
        (None, _) => Some(ValidationResult::skipped(RuleCode::MarriageAfterDeath, "marriage year")),
        (_, None) => Some(ValidationResult::skipped(RuleCode::MarriageAfterDeath, "death year")),
    }
}

/// Years from `from` to `to`, or `None` when the difference overflows.
fn years_between(from: i32, to: i32) -> Option<i32> {
    to.checked_sub(from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Level;

    fn policy() -> ValidationPolicy {
        ValidationPolicy::default()
    }

    fn level(results: &[ValidationResult], code: RuleCode) -> Option<Level> {
        results.iter().find(|r| r.code == code).map(|r| r.level)
    }

    #[test]
    fn death_before_birth_iff_death_earlier() {
        for birth in 1890..1910 {
            for death in 1880..1920 {
                let results = check_lifespan(&policy(), 2024, Some(birth), Some(death));
                let is_error = results.iter().any(ValidationResult::is_error);
                assert_eq!(is_error, death < birth, "birth {birth} death {death}");
            }
        }
    }

    #[test]
    fn lifespan_skips_unknown_years() {
        let results = check_lifespan(&policy(), 2024, None, Some(1900));
        assert_eq!(level(&results, RuleCode::DeathBeforeBirth), Some(Level::Skipped));
        assert_eq!(level(&results, RuleCode::UnrealisticAge), Some(Level::Skipped));
    }

    #[test]
    fn unrealistic_age_is_warning() {
        let results = check_lifespan(&policy(), 2024, Some(1700), Some(1850));
        assert_eq!(level(&results, RuleCode::UnrealisticAge), Some(Level::Warning));
        assert!(!results.iter().any(ValidationResult::is_error));

        let alive = check_lifespan(&policy(), 2024, Some(1850), None);
        assert_eq!(level(&alive, RuleCode::ImplausiblyAlive), Some(Level::Warning));

        let young = check_lifespan(&policy(), 2024, Some(1990), None);
        assert_eq!(level(&young, RuleCode::ImplausiblyAlive), None);
    }

    #[test]
    fn parent_age_error_iff_non_positive_or_below_minimum() {
        let p = policy();
        for parent in 1880..1910 {
            for child in 1880..1930 {
                let results = check_parent_age(&p, Some(parent), Some(Gender::Male), Some(child));
                let is_error = results.iter().any(ValidationResult::is_error);
                let age = child - parent;
                assert_eq!(is_error, age <= 0 || age < p.min_parent_age, "{parent} -> {child}");
            }
        }
    }

    #[test]
    fn parent_born_after_child_stops_further_age_rules() {
        let results = check_parent_age(&policy(), Some(1950), Some(Gender::Female), Some(1940));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].code, RuleCode::ParentBornAfterChild);
    }

    #[test]
    fn old_mother_warns_old_father_passes() {
        let mother = check_parent_age(&policy(), Some(1900), Some(Gender::Female), Some(1965));
        assert_eq!(level(&mother, RuleCode::MotherTooOld), Some(Level::Warning));
        let father = check_parent_age(&policy(), Some(1900), Some(Gender::Male), Some(1965));
        assert!(father.is_empty());
    }

    #[test]
    fn posthumous_mother_is_error_father_tolerated() {
        let p = policy();
        let mother = check_posthumous_birth(&p, Some(1900), Some(Gender::Female), Some(1901));
        assert_eq!(level(&mother, RuleCode::BornAfterMotherDeath), Some(Level::Error));
        let same_year = check_posthumous_birth(&p, Some(1900), Some(Gender::Female), Some(1900));
        assert!(same_year.is_empty());

        let father_within = check_posthumous_birth(&p, Some(1900), Some(Gender::Male), Some(1901));
        assert!(father_within.is_empty());
        let father_late = check_posthumous_birth(&p, Some(1900), Some(Gender::Male), Some(1903));
        assert_eq!(level(&father_late, RuleCode::BornAfterFatherDeath), Some(Level::Warning));
    }

    #[test]
    fn posthumous_unknown_gender_skips_both() {
        let results = check_posthumous_birth(&policy(), Some(1900), None, Some(1920));
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.level == Level::Skipped));
    }

    #[test]
    fn marriage_age_tiers() {
        let p = policy();
        assert_eq!(check_marriage_age(&p, Some(1900), Some(1920)), None);
        let warn = check_marriage_age(&p, Some(1900), Some(1912)).unwrap();
        assert_eq!(warn.level, Level::Warning);
        let err = check_marriage_age(&p, Some(1900), Some(1908)).unwrap();
        assert_eq!(err.level, Level::Error);
        let skip = check_marriage_age(&p, None, Some(1908)).unwrap();
        assert_eq!(skip.level, Level::Skipped);
    }

    #[test]
    fn divorce_and_death_ordering() {
        assert!(check_divorce_order(Some(1920), Some(1919)).unwrap().is_error());
        assert_eq!(check_divorce_order(Some(1920), Some(1920)), None);
        assert_eq!(check_divorce_order(Some(1920), None).unwrap().level, Level::Skipped);

        assert!(check_marriage_before_death(Some(1931), Some(1930)).unwrap().is_error());
        assert_eq!(check_marriage_before_death(Some(1930), Some(1930)), None);
    }

    #[test]
    fn extreme_years_degrade_to_skipped() {
        let p = policy();

        let alive = check_lifespan(&p, 2024, Some(i32::MIN), None);
        assert_eq!(level(&alive, RuleCode::ImplausiblyAlive), Some(Level::Skipped));
        let dead = check_lifespan(&p, 2024, Some(i32::MIN), Some(i32::MAX));
        assert_eq!(level(&dead, RuleCode::UnrealisticAge), Some(Level::Skipped));
        assert!(!dead.iter().any(ValidationResult::is_error));

        let parent = check_parent_age(&p, Some(i32::MIN), Some(Gender::Female), Some(i32::MAX));
        assert!(parent.iter().all(|r| r.level == Level::Skipped));
        assert_eq!(level(&parent, RuleCode::ParentTooYoung), Some(Level::Skipped));

        let posthumous = check_posthumous_birth(&p, Some(i32::MIN), Some(Gender::Male), Some(i32::MAX));
        assert_eq!(level(&posthumous, RuleCode::BornAfterFatherDeath), Some(Level::Skipped));

        let married = check_marriage_age(&p, Some(i32::MIN), Some(i32::MAX)).unwrap();
        assert_eq!(married.level, Level::Skipped);
    }
}
