//! Gazette archive value objects
//!
//! Identifies one gazette issue and the legislative documents printed in it.
//! The identifier grammar mirrors the conventions of the gazette archive:
//! issues are referenced as `number/year-suffix`, bills as a house/senate
//! pair, laws as `year/number`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::errors::AcquisitionError;

static ISSUE_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)/(\d+)$").expect("issue reference pattern"));

/// Bill identifiers carry a house and a senate side, either possibly blank.
static BILL_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([\d/]*)-([\d/]*)").expect("bill identifier pattern"));

/// Law identifiers are `year/number`.
static LAW_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)/(\d+)").expect("law identifier pattern"));

// Table-of-contents link texts reference a bill either by number and
// two-digit year or by number and a written-out date.
static ENTRY_BILL_NUMBER_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\D*(\d+)\s*de[\s\d]*(\d\d)").expect("entry bill id pattern"));
static ENTRY_BILL_FULL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\D*(\d+)\s*del\s*\d*[\w\s\d]+(\d\d)").expect("entry bill date pattern"));

// Law link texts usually carry the number and the full passing date, but can
// fall back to just number and year.
static ENTRY_LAW_NUMBER_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\D*(\d+)\s*del\s*\d*[\w\s]*de\s*(\d+)").expect("entry law date pattern"));
static ENTRY_LAW_NUMBER_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*[dD][eE]\s*(\d+)").expect("entry law year pattern"));

/// One numbered, dated unit of the gazette archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GazetteIssue {
    pub number: u32,
    pub year_suffix: String,
}

impl GazetteIssue {
    /// Parses a free-text issue reference of the form `number/year-suffix`.
    ///
    /// Invalid references are rejected here, before any fetch is attempted.
    pub fn parse(reference: &str) -> Result<Self, AcquisitionError> {
        let invalid = || AcquisitionError::InvalidIssueReference {
            reference: reference.to_string(),
        };
        let caps = ISSUE_REFERENCE.captures(reference).ok_or_else(invalid)?;
        let number = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(invalid)?;
        let year_suffix = caps.get(2).map(|m| m.as_str().to_string()).ok_or_else(invalid)?;
        Ok(Self { number, year_suffix })
    }
}

impl std::fmt::Display for GazetteIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.number, self.year_suffix)
    }
}

impl std::str::FromStr for GazetteIssue {
    type Err = AcquisitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The kinds of legislative document printed in a gazette issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    Bill,
    Law,
    Amendment,
}

impl DocumentKind {
    /// Whether `identifier` is shaped like an identifier of this kind.
    /// Amendments are referenced by the identifier of the bill they amend.
    pub fn accepts_identifier(self, identifier: &str) -> bool {
        match self {
            Self::Law => LAW_IDENTIFIER.is_match(identifier),
            Self::Bill | Self::Amendment => BILL_IDENTIFIER.is_match(identifier),
        }
    }
}

/// Whether a table-of-contents link text refers to the identified document.
///
/// The relaxed mode only affects bill-style matching: it accepts a run-number
/// match with a mismatched year. That heuristic can pick the wrong bill when
/// two bills share a number across adjacent years; it is kept because link
/// texts misprint years often enough that the strict pass alone loses
/// documents.
pub fn matches_toc_entry(kind: DocumentKind, identifier: &str, entry_text: &str, relaxed: bool) -> bool {
    match kind {
        DocumentKind::Law => law_matches_entry(identifier, entry_text),
        DocumentKind::Bill | DocumentKind::Amendment => {
            bill_matches_entry(identifier, entry_text, relaxed)
        }
    }
}

/// The non-blank `(number, year)` sides of a bill identifier.
pub fn bill_identifier_sides(identifier: &str) -> Vec<(u32, u32)> {
    let Some(caps) = BILL_IDENTIFIER.captures(identifier) else {
        return Vec::new();
    };
    [caps.get(1), caps.get(2)]
        .into_iter()
        .flatten()
        .filter_map(|side| {
            let side = side.as_str();
            if side.trim().is_empty() {
                return None;
            }
            let (number, year) = side.split_once('/')?;
            Some((number.parse().ok()?, year.parse().ok()?))
        })
        .collect()
}

/// The `(number, year)` digit groups used to locate a document inside a
/// multi-document PDF. Bills contribute one pair per non-blank side; laws a
/// single pair. Amendments have no PDF form.
pub fn pdf_identifier_parts(kind: DocumentKind, identifier: &str) -> Vec<(String, String)> {
    match kind {
        DocumentKind::Bill => {
            let Some(caps) = BILL_IDENTIFIER.captures(identifier) else {
                return Vec::new();
            };
            [caps.get(1), caps.get(2)]
                .into_iter()
                .flatten()
                .filter_map(|side| {
                    let side = side.as_str();
                    if side.trim().is_empty() {
                        return None;
                    }
                    let (number, year) = side.split_once('/')?;
                    Some((number.to_string(), year.to_string()))
                })
                .collect()
        }
        DocumentKind::Law => LAW_IDENTIFIER
            .captures(identifier)
            .and_then(|caps| {
                let year = caps.get(1)?.as_str().to_string();
                let number = caps.get(2)?.as_str().to_string();
                Some(vec![(number, year)])
            })
            .unwrap_or_default(),
        DocumentKind::Amendment => Vec::new(),
    }
}

fn entry_bill_ids(entry_text: &str) -> Vec<(u32, u32)> {
    for pattern in [&*ENTRY_BILL_NUMBER_YEAR, &*ENTRY_BILL_FULL_DATE] {
        let ids: Vec<(u32, u32)> = pattern
            .captures_iter(entry_text)
            .filter_map(|caps| {
                let number = caps.get(1)?.as_str().parse().ok()?;
                let year = caps.get(2)?.as_str().parse().ok()?;
                Some((number, year))
            })
            .collect();
        if !ids.is_empty() {
            return ids;
        }
    }
    Vec::new()
}

fn bill_matches_entry(identifier: &str, entry_text: &str, relaxed: bool) -> bool {
    let entry_ids = entry_bill_ids(entry_text);
    if entry_ids.is_empty() {
        return false;
    }
    bill_identifier_sides(identifier).into_iter().any(|(number, year)| {
        entry_ids
            .iter()
            .any(|&(entry_number, entry_year)| {
                entry_number == number && (entry_year == year || relaxed)
            })
    })
}

fn law_matches_entry(identifier: &str, entry_text: &str) -> bool {
    let caps = ENTRY_LAW_NUMBER_DATE
        .captures(entry_text)
        .or_else(|| ENTRY_LAW_NUMBER_YEAR.captures(entry_text));
    let Some(caps) = caps else {
        return false;
    };
    let Some(id_caps) = LAW_IDENTIFIER.captures(identifier) else {
        return false;
    };
    let parsed = (
        id_caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()),
        id_caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()),
        caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()),
        caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()),
    );
    match parsed {
        (Some(number), Some(year), Some(entry_number), Some(entry_year)) => {
            number == entry_number && year == entry_year
        }
        _ => false,
    }
}
