//! Configuration infrastructure
//!
//! A JSON configuration file with serde defaults; a missing file is written
//! out with its defaults so deployments always have something to edit.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::application::coordinator::AcquisitionConfig;
use crate::infrastructure::http_client::HttpClientConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub database_url: String,
    pub portal: PortalEndpoints,
    pub http: HttpClientConfig,
    pub acquisition: AcquisitionConfig,
    pub pdf_tool: PdfToolConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalEndpoints {
    pub base_url: String,
    /// `{number}` is replaced with the searched gazette number.
    pub search_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfToolConfig {
    pub binary: String,
    pub scratch_dir: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        let base_url = "http://svrpubindc.imprenta.gov.co/senado/".to_string();
        Self {
            database_url: "sqlite:data/gazette-collector.db".to_string(),
            portal: PortalEndpoints {
                search_url: format!("{base_url}?numeroGaceta={{number}}"),
                base_url,
            },
            http: HttpClientConfig::default(),
            acquisition: AcquisitionConfig::default(),
            pdf_tool: PdfToolConfig {
                binary: "pdftotext".to_string(),
                scratch_dir: std::env::temp_dir().display().to_string(),
            },
        }
    }
}

impl CollectorConfig {
    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config/gazette-collector.json")
    }

    /// Loads the configuration file, writing the defaults first when it does
    /// not exist yet.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("reading configuration from {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing configuration from {}", path.display()))
        } else {
            let config = Self::default();
            config.save(path).await?;
            info!("wrote default configuration to {}", path.display());
            Ok(config)
        }
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating configuration directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("serializing configuration")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("writing configuration to {}", path.display()))
    }
}
