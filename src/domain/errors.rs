//! Error taxonomy for gazette acquisition, boundary extraction and diff
//! sizing.
//!
//! Every kind is programmatically distinguishable so callers can branch on
//! it, e.g. to decide whether the next gazette-issue candidate is worth
//! trying.

use thiserror::Error;

use crate::domain::gazette::{DocumentKind, GazetteIssue};

/// Failures of one acquisition attempt, or of a whole candidate list.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("'{identifier}' is not a usable {kind:?} identifier")]
    InvalidIdentifier { kind: DocumentKind, identifier: String },

    #[error("'{reference}' is not a gazette issue reference")]
    InvalidIssueReference { reference: String },

    #[error("gazette issue {issue} not found in the archive index")]
    IssueNotFound { issue: GazetteIssue },

    #[error("no entry for '{identifier}' in the table of contents of gazette {issue}")]
    EntryNotFound { issue: GazetteIssue, identifier: String },

    #[error("gazette issue {issue} offers neither a details page nor a PDF")]
    NoRetrievalPath { issue: GazetteIssue },

    #[error("timed out waiting for the gazette {issue} PDF to become available")]
    DownloadTimedOut { issue: GazetteIssue },

    #[error("page did not respond while {context}")]
    PageUnreachable { context: String },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("external capability failure: {0:#}")]
    Capability(anyhow::Error),

    #[error("all {} issue candidates failed for '{identifier}'", .failures.len())]
    AllCandidatesFailed {
        identifier: String,
        failures: Vec<(String, AcquisitionError)>,
    },
}

impl From<anyhow::Error> for AcquisitionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Capability(err)
    }
}

/// Failures of boundary extraction over an already-acquired text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no start marker found, cannot determine where the operative text begins")]
    NoStartMarker,

    #[error("end marker found before the start of the operative text")]
    EndBeforeStart,

    #[error("'{identifier}' not locatable in the gazette PDF: {attempts}")]
    NotFoundInPdf { identifier: String, attempts: String },

    #[error("the gazette PDF yielded no readable text")]
    PdfUnreadable,
}

/// Failure to compute an amendment size from two text revisions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("{which} text is invalid (empty or blank)")]
    InvalidInput { which: &'static str },
}

/// Failures raised by the page-navigation capability.
///
/// `Timeout` ("page never loaded") is deliberately distinct from `NotFound`
/// ("content not found on a loaded page").
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("element not found: {what}")]
    NotFound { what: String },

    #[error("page '{url}' did not load in time")]
    Timeout { url: String },

    #[error("navigation failed: {0:#}")]
    Navigation(anyhow::Error),
}

impl From<anyhow::Error> for PortalError {
    fn from(err: anyhow::Error) -> Self {
        Self::Navigation(err)
    }
}
