//! PDF text extraction via the external `pdftotext` tool
//!
//! Gazette PDFs are often scans; when the tool cannot read a file the
//! extractor reports empty text, which downstream extraction treats as an
//! unreadable document rather than a crash.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::warn;

use crate::domain::repositories::PdfTextExtractor;

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct PdftotextExtractor {
    binary: String,
    scratch_dir: PathBuf,
}

impl PdftotextExtractor {
    pub fn new(binary: impl Into<String>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into(), scratch_dir: scratch_dir.into() }
    }
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self::new("pdftotext", std::env::temp_dir())
    }
}

#[async_trait]
impl PdfTextExtractor for PdftotextExtractor {
    async fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .with_context(|| format!("creating scratch directory {}", self.scratch_dir.display()))?;
        let sequence = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
        let input = self
            .scratch_dir
            .join(format!("gazette-{}-{sequence}.pdf", std::process::id()));
        tokio::fs::write(&input, bytes)
            .await
            .with_context(|| format!("writing scratch PDF {}", input.display()))?;

        let output = Command::new(&self.binary)
            .arg("-q")
            .arg("-layout")
            .arg(&input)
            .arg("-")
            .output()
            .await
            .with_context(|| format!("running {} on {}", self.binary, input.display()));
        let _ = tokio::fs::remove_file(&input).await;

        let output = output?;
        if !output.status.success() {
            warn!("{} exited with {}; treating the PDF as unreadable", self.binary, output.status);
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
