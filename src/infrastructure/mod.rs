//! Infrastructure module - adapters over external capabilities
//!
//! Production implementations of the domain's capability traits: the HTTP
//! gazette portal, the SQLite document store and the external PDF text
//! extractor, plus configuration and logging setup.

pub mod config;
pub mod http_client;
pub mod logging;
pub mod pdf;
pub mod portal;
pub mod sqlite_store;

pub use config::CollectorConfig;
pub use http_client::{HttpClient, HttpClientConfig};
pub use pdf::PdftotextExtractor;
pub use portal::{HttpGazettePortal, HttpPortalConfig, PortalSelectors};
pub use sqlite_store::SqliteDocumentStore;
