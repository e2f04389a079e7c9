//! Domain module - value objects, entities and capability interfaces
//!
//! Everything the acquisition core knows about gazettes, documents and the
//! external collaborators it drives.

pub mod document;
pub mod errors;
pub mod gazette;
pub mod repositories;

// Re-export commonly used items
pub use document::{DocumentRequest, DownloadedFile, FetchedDocument, TextRecord};
pub use errors::{AcquisitionError, DiffError, ExtractionError, PortalError};
pub use gazette::{DocumentKind, GazetteIssue};
