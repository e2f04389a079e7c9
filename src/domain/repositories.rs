//! Capability interfaces consumed by the acquisition core
//!
//! Contains trait definitions for the document store, the gazette portal
//! (page navigation) and binary text extraction. Production adapters live in
//! the infrastructure layer; tests implement these over fixtures.

use async_trait::async_trait;
use anyhow::Result;

use crate::domain::document::{DownloadedFile, TextRecord};
use crate::domain::errors::PortalError;

/// Persistence-backed lookup/save of acquired texts and downloaded files.
///
/// Assumed externally synchronized and duplicate-tolerant: saving a record
/// whose natural key already exists is acceptable because lookups are
/// find-first.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_text(&self, text_type: &str, identifier: &str, country: &str) -> Result<Option<TextRecord>>;
    async fn find_file(&self, filename: &str) -> Result<Option<DownloadedFile>>;
    async fn save_texts(&self, texts: &[TextRecord]) -> Result<()>;
    async fn save_files(&self, files: &[DownloadedFile]) -> Result<()>;
}

/// One row of the gazette archive index, with the retrieval affordances it
/// offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRow {
    pub number: u32,
    /// Raw text of the year column; matched by suffix against the issue
    /// reference.
    pub year_label: String,
    pub details_url: Option<String>,
    /// Published link of the issue PDF, when the archive exposes one.
    pub pdf_url: Option<String>,
    /// Whether the row offers a PDF download control.
    pub downloadable: bool,
}

/// One link of an issue's table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub text: String,
    pub href: String,
}

/// The resolved page of a table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPage {
    pub url: String,
    /// Text of the fixed details region, paragraphs separated by newlines.
    pub body: String,
}

/// Page-navigation capability over the gazette archive.
///
/// Implementations drive a live site or fixture HTML; the coordinator never
/// touches HTML itself.
#[async_trait]
pub trait GazettePortal: Send + Sync {
    /// Archive index rows for one gazette number.
    async fn issue_rows(&self, number: u32) -> Result<Vec<IssueRow>, PortalError>;

    /// Table of contents behind a row's details affordance.
    async fn open_details(&self, row: &IssueRow) -> Result<Vec<TocEntry>, PortalError>;

    /// Resolve one table-of-contents entry to its page.
    async fn open_entry(&self, entry: &TocEntry) -> Result<EntryPage, PortalError>;

    /// Retrieve the issue PDF bytes behind a row's download affordance.
    async fn download_pdf(&self, row: &IssueRow) -> Result<Vec<u8>, PortalError>;
}

/// Binary-to-text extraction for downloaded gazette files.
///
/// An unreadable or scanned document is reported as empty text, never as an
/// error; errors are reserved for the capability itself being broken.
#[async_trait]
pub trait PdfTextExtractor: Send + Sync {
    async fn extract_text(&self, bytes: &[u8]) -> Result<String>;
}
