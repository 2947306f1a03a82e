//! Resolution of heterogeneous historical date expressions into a year.
//!
//! Recognized forms, in priority order:
//! - `1990`, `1990-05-20`, `20.05.1990` → exact
//! - `c. 1900`, `~1900`, `≈1900`, `circa 1900`, `близько 1900` → approximate
//! - `1910..1920`, `1910-1920`, `1910–1920` → range, midpoint year
//! - `?`, `unknown`, `невідомо`, empty → unknown
//! - any text with a 4-digit year in [1000, 2100] → approximate
//!
//! Resolution never fails: anything unparseable degrades to unknown.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Plausible calendar bound for years found inside free text.
pub const MIN_TEXT_YEAR: i32 = 1000;
pub const MAX_TEXT_YEAR: i32 = 2100;

/// Bounds for structured year fields on Persons and marriages.
pub const MIN_RECORD_YEAR: i32 = 1;
pub const MAX_RECORD_YEAR: i32 = MAX_TEXT_YEAR;

pub fn is_record_year(year: i32) -> bool {
    (MIN_RECORD_YEAR..=MAX_RECORD_YEAR).contains(&year)
}

static EXACT: Lazy<Regex> = Lazy::new(|| {
    // Unwrap as the expression is a checked literal
    Regex::new(r"^(\d{4})(?:[-./]\d{1,2}[-./]\d{1,2})?$").unwrap()
});

static EXACT_DMY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}[-./]\d{1,2}[-./](\d{4})$").unwrap());

static APPROXIMATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:c\.?\s*|ca\.?\s*|~\s*|≈\s*|circa\s+|about\s+|abt\.?\s*|близько\s+|приблизно\s+|біля\s+|бл\.\s*)(\d{4})$",
    )
    .unwrap()
});

static RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})\s*(?:\.\.|[-–—])\s*(\d{4})$").unwrap());

static UNKNOWN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:\?+|unknown|n/a|empty|невідомо|не\s*відомо)$").unwrap()
});

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// A date as supplied by a client: a numeric year or free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Year(i32),
    Text(String),
}

impl From<i32> for DateInput {
    fn from(year: i32) -> Self {
        DateInput::Year(year)
    }
}

impl From<&str> for DateInput {
    fn from(text: &str) -> Self {
        DateInput::Text(text.to_string())
    }
}

impl From<String> for DateInput {
    fn from(text: String) -> Self {
        DateInput::Text(text)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DateConfidence {
    Exact,
    Approximate,
    Range,
    Unknown,
}

/// Outcome of resolving a [`DateInput`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedDate {
    pub year: Option<i32>,
    pub is_approximate: bool,
    pub range_start: Option<i32>,
    pub range_end: Option<i32>,
    pub confidence: DateConfidence,
}

impl ResolvedDate {
    pub const UNKNOWN: ResolvedDate = ResolvedDate {
        year: None,
        is_approximate: false,
        range_start: None,
        range_end: None,
        confidence: DateConfidence::Unknown,
    };

    fn exact(year: i32) -> Self {
        Self {
            year: Some(year),
            is_approximate: false,
            range_start: None,
            range_end: None,
            confidence: DateConfidence::Exact,
        }
    }

    fn approximate(year: i32) -> Self {
        Self {
            year: Some(year),
            is_approximate: true,
            range_start: None,
            range_end: None,
            confidence: DateConfidence::Approximate,
        }
    }

    fn range(start: i32, end: i32) -> Self {
        Self {
            year: Some((start + end).div_euclid(2)),
            is_approximate: true,
            range_start: Some(start),
            range_end: Some(end),
            confidence: DateConfidence::Range,
        }
    }

    pub fn is_known(&self) -> bool {
        self.year.is_some()
    }
}

/// Resolve a date expression. Never fails.
pub fn resolve(input: impl Into<DateInput>) -> ResolvedDate {
    match input.into() {
        DateInput::Year(year) => ResolvedDate::exact(year),
        DateInput::Text(text) => resolve_text(&text),
    }
}

/// Resolve an optional input; absence is unknown.
pub fn resolve_opt(input: Option<&DateInput>) -> ResolvedDate {
    input.map_or(ResolvedDate::UNKNOWN, |i| resolve(i.clone()))
}

/// Shorthand for the resolved year only.
pub fn resolve_year(input: impl Into<DateInput>) -> Option<i32> {
    resolve(input).year
}

fn resolve_text(raw: &str) -> ResolvedDate {
    let text = raw.trim();
    if text.is_empty() {
        return ResolvedDate::UNKNOWN;
    }

    if let Some(year) = capture_year(&EXACT, text, 1) {
        return ResolvedDate::exact(year);
    }
    if let Some(year) = capture_year(&EXACT_DMY, text, 1) {
        return ResolvedDate::exact(year);
    }
    if let Some(year) = capture_year(&APPROXIMATE, text, 1) {
        return ResolvedDate::approximate(year);
    }
    if let Some(caps) = RANGE.captures(text) {
        let start = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let end = caps.get(2).and_then(|m| m.as_str().parse().ok());
        if let (Some(start), Some(end)) = (start, end) {
            return ResolvedDate::range(start, end);
        }
    }
    if UNKNOWN.is_match(text) {
        return ResolvedDate::UNKNOWN;
    }

    DIGIT_RUN
        .find_iter(text)
        .filter(|m| m.as_str().len() == 4)
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .find(|year| (MIN_TEXT_YEAR..=MAX_TEXT_YEAR).contains(year))
        .map_or(ResolvedDate::UNKNOWN, ResolvedDate::approximate)
}

fn capture_year(re: &Regex, text: &str, group: usize) -> Option<i32> {
    re.captures(text)
        .and_then(|caps| caps.get(group))
        .and_then(|m| m.as_str().parse().ok())
}
