//! Gazette acquisition and deduplication core
//!
//! Fetches legislative document texts (bills, laws, amendments) from a slow,
//! rate-limited legal-gazette archive while guaranteeing that no gazette
//! issue is downloaded twice across concurrent workers, extracts the legally
//! operative substring with layered marker heuristics, and computes a stable
//! diff-based size between two revisions of legislative text.

// Module declarations
pub mod application;
pub mod diff;
pub mod domain;
pub mod extraction;
pub mod infrastructure;

// Re-export the acquisition surface for easier access
pub use application::coordinator::{AcquisitionConfig, GazetteFetchCoordinator};
pub use application::registry::PendingWorkRegistry;
pub use diff::TextDiffSizeCalculator;
pub use domain::document::{DocumentRequest, FetchedDocument};
pub use domain::errors::{AcquisitionError, DiffError, ExtractionError, PortalError};
pub use domain::gazette::{DocumentKind, GazetteIssue};
