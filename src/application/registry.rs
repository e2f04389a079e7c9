//! Pending work registry
//!
//! Process-wide bookkeeping shared by concurrent fetch workers: which gazette
//! issues are currently being downloaded, and which acquired texts/files have
//! not yet been flushed to the document store. One instance is constructed
//! per job run and injected into every coordinator; it is never a global.
//!
//! Locking is coarse on purpose: whole-structure mutexes, never held across
//! an await point. Contention is a handful of workers at most.

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Result;
use tracing::{debug, info};

use crate::domain::document::{DownloadedFile, TextRecord};
use crate::domain::repositories::DocumentStore;

#[derive(Debug, Default)]
pub struct PendingWorkRegistry {
    in_flight: Mutex<HashSet<String>>,
    pending_texts: Mutex<Vec<TextRecord>>,
    pending_files: Mutex<Vec<DownloadedFile>>,
}

impl PendingWorkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims the download of one gazette issue. Returns `true`
    /// only for the caller that performed the insertion; everyone else should
    /// wait for the claimant's result instead of re-triggering the download.
    pub fn try_claim(&self, issue_key: &str) -> bool {
        self.in_flight
            .lock()
            .expect("in-flight set poisoned")
            .insert(issue_key.to_string())
    }

    /// Releases a claim; idempotent.
    pub fn release(&self, issue_key: &str) {
        self.in_flight
            .lock()
            .expect("in-flight set poisoned")
            .remove(issue_key);
    }

    /// Whether some worker currently owns the download of this issue.
    /// Advisory only: the answer can change the moment the lock is dropped.
    pub fn is_in_flight(&self, issue_key: &str) -> bool {
        self.in_flight
            .lock()
            .expect("in-flight set poisoned")
            .contains(issue_key)
    }

    pub fn stage_text(&self, record: TextRecord) {
        self.pending_texts
            .lock()
            .expect("pending texts poisoned")
            .push(record);
    }

    pub fn stage_file(&self, file: DownloadedFile) {
        self.pending_files
            .lock()
            .expect("pending files poisoned")
            .push(file);
    }

    /// Linear scan of the staged texts. The buffer is bounded by the work
    /// done since the last flush, so a scan beats a second index.
    pub fn lookup_text(&self, text_type: &str, identifier: &str) -> Option<TextRecord> {
        self.pending_texts
            .lock()
            .expect("pending texts poisoned")
            .iter()
            .find(|record| record.text_type == text_type && record.text_identifier == identifier)
            .cloned()
    }

    pub fn lookup_file(&self, filename: &str) -> Option<DownloadedFile> {
        self.pending_files
            .lock()
            .expect("pending files poisoned")
            .iter()
            .find(|file| file.filename == filename)
            .cloned()
    }

    /// Moves every staged entry into the store and clears the buffers.
    /// Called periodically by the owning job, not per fetch. On a store
    /// failure the drained entries are put back so the next flush retries
    /// them.
    pub async fn flush(&self, store: &dyn DocumentStore) -> Result<()> {
        let texts: Vec<TextRecord> =
            std::mem::take(&mut *self.pending_texts.lock().expect("pending texts poisoned"));
        let files: Vec<DownloadedFile> =
            std::mem::take(&mut *self.pending_files.lock().expect("pending files poisoned"));
        if texts.is_empty() && files.is_empty() {
            debug!("nothing staged, skipping flush");
            return Ok(());
        }

        if let Err(err) = store.save_texts(&texts).await {
            self.restage(texts, files);
            return Err(err);
        }
        if let Err(err) = store.save_files(&files).await {
            self.restage(Vec::new(), files);
            return Err(err);
        }
        info!("flushed staged work to the store");
        Ok(())
    }

    fn restage(&self, texts: Vec<TextRecord>, files: Vec<DownloadedFile>) {
        self.pending_texts
            .lock()
            .expect("pending texts poisoned")
            .extend(texts);
        self.pending_files
            .lock()
            .expect("pending files poisoned")
            .extend(files);
    }
}
