//! Validation results and their aggregate report.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Blocks the write.
    Error,
    /// Advisory only.
    Warning,
    /// The rule could not be evaluated because a required year is unknown.
    Skipped,
}

/// Stable machine-readable rule codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RuleCode {
    #[serde(rename = "T1_DEATH_BEFORE_BIRTH")]
    DeathBeforeBirth,
    #[serde(rename = "Z3_UNREALISTIC_AGE")]
    UnrealisticAge,
    #[serde(rename = "Z3_IMMORTAL")]
    ImplausiblyAlive,
    #[serde(rename = "T2_PARENT_YOUNGER")]
    ParentBornAfterChild,
    #[serde(rename = "B1_PARENT_TOO_YOUNG")]
    ParentTooYoung,
    #[serde(rename = "B2_MOTHER_TOO_OLD")]
    MotherTooOld,
    #[serde(rename = "T3_MOTHER_GHOST")]
    BornAfterMotherDeath,
    #[serde(rename = "T4_FATHER_GHOST")]
    BornAfterFatherDeath,
    #[serde(rename = "T5_CHILD_MARRIAGE")]
    ChildMarriage,
    #[serde(rename = "T6_DIVORCE_BEFORE_MARRIAGE")]
    DivorceBeforeMarriage,
    #[serde(rename = "Z1_MARRIAGE_AFTER_DEATH")]
    MarriageAfterDeath,
    #[serde(rename = "C1_SELF_MARRIAGE")]
    SelfMarriage,
    #[serde(rename = "C2_SELF_PARENT")]
    SelfParent,
    #[serde(rename = "C2_SELF_CHILD")]
    SelfChild,
    #[serde(rename = "C4_SELF_SIBLING")]
    SelfSibling,
    #[serde(rename = "C3_CYCLE_DETECTED")]
    AncestryCycle,
    #[serde(rename = "B4_THREE_PARENTS")]
    TooManyBiologicalParents,
    #[serde(rename = "M1_POLYGAMY")]
    ConcurrentMarriage,
    #[serde(rename = "B3_SIBLING_SPOUSE")]
    SiblingSpouse,
    #[serde(rename = "M2_DUPLICATE")]
    PossibleDuplicate,
}

impl RuleCode {
    /// Same string as the serde rename of each variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCode::DeathBeforeBirth => "T1_DEATH_BEFORE_BIRTH",
            RuleCode::UnrealisticAge => "Z3_UNREALISTIC_AGE",
            RuleCode::ImplausiblyAlive => "Z3_IMMORTAL",
            RuleCode::ParentBornAfterChild => "T2_PARENT_YOUNGER",
            RuleCode::ParentTooYoung => "B1_PARENT_TOO_YOUNG",
            RuleCode::MotherTooOld => "B2_MOTHER_TOO_OLD",
            RuleCode::BornAfterMotherDeath => "T3_MOTHER_GHOST",
            RuleCode::BornAfterFatherDeath => "T4_FATHER_GHOST",
            RuleCode::ChildMarriage => "T5_CHILD_MARRIAGE",
            RuleCode::DivorceBeforeMarriage => "T6_DIVORCE_BEFORE_MARRIAGE",
            RuleCode::MarriageAfterDeath => "Z1_MARRIAGE_AFTER_DEATH",
            RuleCode::SelfMarriage => "C1_SELF_MARRIAGE",
            RuleCode::SelfParent => "C2_SELF_PARENT",
            RuleCode::SelfChild => "C2_SELF_CHILD",
            RuleCode::SelfSibling => "C4_SELF_SIBLING",
            RuleCode::AncestryCycle => "C3_CYCLE_DETECTED",
            RuleCode::TooManyBiologicalParents => "B4_THREE_PARENTS",
            RuleCode::ConcurrentMarriage => "M1_POLYGAMY",
            RuleCode::SiblingSpouse => "B3_SIBLING_SPOUSE",
            RuleCode::PossibleDuplicate => "M2_DUPLICATE",
        }
    }
}

impl std::fmt::Display for RuleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rule outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub level: Level,
    pub code: RuleCode,
    pub message: String,
}

impl ValidationResult {
    pub fn error(code: RuleCode, message: impl Into<String>) -> Self {
        Self { level: Level::Error, code, message: message.into() }
    }

    pub fn warning(code: RuleCode, message: impl Into<String>) -> Self {
        Self { level: Level::Warning, code, message: message.into() }
    }

    pub fn skipped(code: RuleCode, missing: &str) -> Self {
        Self {
            level: Level::Skipped,
            code,
            message: format!("Not evaluated: {missing} unknown"),
        }
    }

    /// The rule's inputs are too far apart to compare.
    pub fn out_of_range(code: RuleCode) -> Self {
        Self {
            level: Level::Skipped,
            code,
            message: "Not evaluated: year out of range".into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

/// Every result produced for one proposed fact.
///
/// A clean pass is an empty report; rules that could not run appear as
/// `Skipped` entries so callers can tell "passed" from "not evaluated".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationReport {
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: ValidationResult) {
        self.results.push(result);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ValidationResult>) {
        self.results.extend(results);
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.results.extend(other.results);
    }

    /// True when no `Error`-level result is present.
    pub fn is_admissible(&self) -> bool {
        !self.results.iter().any(ValidationResult::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationResult> {
        self.by_level(Level::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationResult> {
        self.by_level(Level::Warning)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ValidationResult> {
        self.by_level(Level::Skipped)
    }

    pub fn has(&self, code: RuleCode) -> bool {
        self.results.iter().any(|r| r.code == code)
    }

    pub fn level_of(&self, code: RuleCode) -> Option<Level> {
        self.results.iter().find(|r| r.code == code).map(|r| r.level)
    }

    /// Drop `Skipped` entries, keeping errors and warnings.
    pub fn findings(&self) -> Vec<ValidationResult> {
        self.results
            .iter()
            .filter(|r| r.level != Level::Skipped)
            .cloned()
            .collect()
    }

    fn by_level(&self, level: Level) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(move |r| r.level == level)
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let codes: Vec<&str> = self.errors().map(|r| r.code.as_str()).collect();
        write!(f, "{} error(s): {}", codes.len(), codes.join(", "))
    }
}

impl FromIterator<ValidationResult> for ValidationReport {
    fn from_iter<I: IntoIterator<Item = ValidationResult>>(iter: I) -> Self {
        Self { results: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admissibility_ignores_warnings_and_skips() {
        let report: ValidationReport = [
            ValidationResult::warning(RuleCode::MotherTooOld, "late"),
            ValidationResult::skipped(RuleCode::DeathBeforeBirth, "death year"),
        ]
        .into_iter()
        .collect();
        assert!(report.is_admissible());
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.skipped().count(), 1);
        assert_eq!(report.findings().len(), 1);
    }

    #[test]
    fn any_error_rejects() {
        let mut report = ValidationReport::new();
        report.push(ValidationResult::error(RuleCode::SelfParent, "self"));
        assert!(!report.is_admissible());
        assert_eq!(report.level_of(RuleCode::SelfParent), Some(Level::Error));
        assert_eq!(report.to_string(), "1 error(s): C2_SELF_PARENT");
    }

    const ALL_CODES: [RuleCode; 20] = [
        RuleCode::DeathBeforeBirth,
        RuleCode::UnrealisticAge,
        RuleCode::ImplausiblyAlive,
        RuleCode::ParentBornAfterChild,
        RuleCode::ParentTooYoung,
        RuleCode::MotherTooOld,
        RuleCode::BornAfterMotherDeath,
        RuleCode::BornAfterFatherDeath,
        RuleCode::ChildMarriage,
        RuleCode::DivorceBeforeMarriage,
        RuleCode::MarriageAfterDeath,
        RuleCode::SelfMarriage,
        RuleCode::SelfParent,
        RuleCode::SelfChild,
        RuleCode::SelfSibling,
        RuleCode::AncestryCycle,
        RuleCode::TooManyBiologicalParents,
        RuleCode::ConcurrentMarriage,
        RuleCode::SiblingSpouse,
        RuleCode::PossibleDuplicate,
    ];

    #[test]
    fn display_matches_serialized_code() {
        let mut seen = std::collections::HashSet::new();
        for code in ALL_CODES {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, serde_json::Value::String(code.as_str().to_string()), "{code:?}");
            assert_eq!(code.to_string(), code.as_str());
            assert!(seen.insert(code.as_str()), "{} used twice", code.as_str());
        }
    }

    #[test]
    fn codes_serialize_as_stable_strings() {
        let json = serde_json::to_string(&RuleCode::AncestryCycle).unwrap();
        assert_eq!(json, "\"C3_CYCLE_DETECTED\"");
        let level = serde_json::to_string(&Level::Skipped).unwrap();
        assert_eq!(level, "\"skipped\"");
    }
}
