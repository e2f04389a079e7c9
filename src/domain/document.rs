//! Document entities exchanged between the coordinator, the registry and the
//! document store.

use serde::{Deserialize, Serialize};

use crate::domain::errors::AcquisitionError;
use crate::domain::gazette::{DocumentKind, GazetteIssue};

/// One request to acquire the text of a legislative document from a gazette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub kind: DocumentKind,
    pub identifier: String,
    /// Tag under which the acquired raw text is stored, e.g. a stage label.
    pub source_type_tag: String,
}

impl DocumentRequest {
    pub fn new(kind: DocumentKind, identifier: impl Into<String>, source_type_tag: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            source_type_tag: source_type_tag.into(),
        }
    }

    /// Rejects identifiers that do not fit the kind's reference grammar.
    /// A mismatch would silently fetch the wrong document, so it aborts the
    /// request instead.
    pub fn validate(&self) -> Result<(), AcquisitionError> {
        if self.kind.accepts_identifier(&self.identifier) {
            Ok(())
        } else {
            Err(AcquisitionError::InvalidIdentifier {
                kind: self.kind,
                identifier: self.identifier.clone(),
            })
        }
    }

    /// Natural key of the stored text for this request and issue.
    pub fn store_key(&self, issue: &GazetteIssue) -> String {
        format!("Gazette: {}, id: {}", issue, self.identifier)
    }

    /// Tag of the companion record holding the table-of-contents link text
    /// for amendments. `*_TEXT` tags get their suffix rewritten, anything
    /// else gets the suffix appended.
    pub fn link_text_tag(&self) -> String {
        match self.source_type_tag.strip_suffix("_TEXT") {
            Some(stem) => format!("{stem}_LINK_TEXT"),
            None => format!("{}_LINK_TEXT", self.source_type_tag),
        }
    }
}

/// The result of a successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedDocument {
    pub url: String,
    pub text: String,
}

/// A stored (or staged-for-storage) raw document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    pub text_type: String,
    pub text_identifier: String,
    pub country: String,
    pub content: String,
    pub download_url: String,
}

/// A stored (or staged-for-storage) downloaded gazette file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub filename: String,
    pub url: String,
    pub content: Vec<u8>,
}
