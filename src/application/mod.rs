//! Application module - acquisition orchestration
//!
//! The fetch coordinator and the shared pending-work registry that
//! deduplicates downloads across concurrent workers.

pub mod coordinator;
pub mod registry;

pub use coordinator::{AcquisitionConfig, GazetteFetchCoordinator};
pub use registry::PendingWorkRegistry;
