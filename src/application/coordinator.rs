//! Gazette fetch coordination
//!
//! Produces the text of one requested document from one gazette issue,
//! trying the cheapest source first: the document store, then the in-memory
//! pending buffers, then the archive itself via a details page or a shared
//! PDF download. Concurrent workers coordinate through the injected
//! [`PendingWorkRegistry`] so no issue PDF is ever downloaded twice.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::application::registry::PendingWorkRegistry;
use crate::domain::document::{DocumentRequest, DownloadedFile, FetchedDocument, TextRecord};
use crate::domain::errors::{AcquisitionError, PortalError};
use crate::domain::gazette::{matches_toc_entry, DocumentKind, GazetteIssue};
use crate::domain::repositories::{DocumentStore, GazettePortal, IssueRow, PdfTextExtractor, TocEntry};
use crate::extraction;

/// Tuning of the acquisition flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Country tag recorded on every stored text.
    pub country: String,
    /// Hard ceiling on waiting for another worker's PDF download.
    pub download_wait_timeout_secs: u64,
    /// First poll interval while waiting; doubles up to the maximum.
    pub poll_initial_interval_secs: u64,
    pub poll_max_interval_secs: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            country: "colombia".to_string(),
            download_wait_timeout_secs: 600,
            poll_initial_interval_secs: 5,
            poll_max_interval_secs: 10,
        }
    }
}

/// Coordinates acquisition of gazette document texts for one job run.
///
/// Workers may call [`acquire`](Self::acquire) concurrently; the only shared
/// mutable state lives in the registry.
pub struct GazetteFetchCoordinator {
    portal: Arc<dyn GazettePortal>,
    store: Arc<dyn DocumentStore>,
    pdf_extractor: Arc<dyn PdfTextExtractor>,
    registry: Arc<PendingWorkRegistry>,
    config: AcquisitionConfig,
}

impl GazetteFetchCoordinator {
    pub fn new(
        portal: Arc<dyn GazettePortal>,
        store: Arc<dyn DocumentStore>,
        pdf_extractor: Arc<dyn PdfTextExtractor>,
        registry: Arc<PendingWorkRegistry>,
        config: AcquisitionConfig,
    ) -> Self {
        Self { portal, store, pdf_extractor, registry, config }
    }

    /// Acquires the first obtainable candidate, in preference order.
    ///
    /// Failures stay local to each `(request, issue)` pair; they are
    /// aggregated into the final error so a batch job can log one precise
    /// diagnosis per attempted issue and move on to its next record.
    pub async fn acquire_first(
        &self,
        request: &DocumentRequest,
        candidates: &[GazetteIssue],
    ) -> Result<FetchedDocument, AcquisitionError> {
        request.validate()?;
        let mut failures: Vec<(String, AcquisitionError)> = Vec::new();
        for issue in candidates {
            match self.acquire(request, issue).await {
                Ok(document) => return Ok(document),
                Err(err @ AcquisitionError::DownloadTimedOut { .. }) => {
                    // The in-flight download may have completed, stalled or
                    // been abandoned in the meantime; one re-entry of the
                    // whole flow settles it either way.
                    warn!("retrying gazette {issue} once after a download timeout");
                    failures.push((issue.to_string(), err));
                    match self.acquire(request, issue).await {
                        Ok(document) => return Ok(document),
                        Err(retry_err) => failures.push((issue.to_string(), retry_err)),
                    }
                }
                Err(err) => {
                    debug!("gazette {issue} failed for '{}': {err}", request.identifier);
                    failures.push((issue.to_string(), err));
                }
            }
        }
        warn!(
            "no gazette candidate yielded '{}' ({} tried)",
            request.identifier,
            candidates.len()
        );
        Err(AcquisitionError::AllCandidatesFailed {
            identifier: request.identifier.clone(),
            failures,
        })
    }

    /// Acquires one document from one gazette issue.
    pub async fn acquire(
        &self,
        request: &DocumentRequest,
        issue: &GazetteIssue,
    ) -> Result<FetchedDocument, AcquisitionError> {
        request.validate()?;
        if let Some(document) = self.lookup_cached(request, issue).await? {
            info!("serving gazette {issue} text for '{}' from cache", request.identifier);
            return Ok(document);
        }
        self.acquire_from_archive(request, issue).await
    }

    /// Store and pending-buffer lookup; a hit never touches the network.
    async fn lookup_cached(
        &self,
        request: &DocumentRequest,
        issue: &GazetteIssue,
    ) -> Result<Option<FetchedDocument>, AcquisitionError> {
        let key = request.store_key(issue);
        let record = match self
            .store
            .find_text(&request.source_type_tag, &key, &self.config.country)
            .await?
        {
            Some(record) => Some(record),
            None => self.registry.lookup_text(&request.source_type_tag, &key),
        };
        let Some(record) = record else {
            return Ok(None);
        };

        let text = match request.kind {
            DocumentKind::Amendment => {
                let link_text = self.cached_link_text(request, &key).await?;
                extraction::amendment_operative_part(&record.content, &link_text)?
            }
            kind => extraction::operative_part(kind, &record.content)?,
        };
        Ok(Some(FetchedDocument { url: record.download_url, text }))
    }

    /// Companion link text of a cached amendment. Stays blank when absent;
    /// the extractor then falls through to the paragraph scan.
    async fn cached_link_text(
        &self,
        request: &DocumentRequest,
        key: &str,
    ) -> Result<String, AcquisitionError> {
        let tag = request.link_text_tag();
        let record = match self.store.find_text(&tag, key, &self.config.country).await? {
            Some(record) => Some(record),
            None => self.registry.lookup_text(&tag, key),
        };
        Ok(record.map(|record| record.content).unwrap_or_default())
    }

    async fn acquire_from_archive(
        &self,
        request: &DocumentRequest,
        issue: &GazetteIssue,
    ) -> Result<FetchedDocument, AcquisitionError> {
        debug!("getting information from gazette {issue}");
        let rows = self.portal.issue_rows(issue.number).await.map_err(|err| match err {
            PortalError::NotFound { what } => {
                warn!("archive index holds nothing for gazette {issue}: {what}");
                AcquisitionError::IssueNotFound { issue: issue.clone() }
            }
            other => page_unreachable(other, &format!("searching the archive for gazette {issue}")),
        })?;

        // Among rows with the requested number, the year column decides;
        // first suffix match wins.
        let row = rows
            .into_iter()
            .filter(|row| row.number == issue.number)
            .find(|row| row.year_label.trim().ends_with(issue.year_suffix.as_str()))
            .ok_or_else(|| AcquisitionError::IssueNotFound { issue: issue.clone() })?;

        if row.details_url.is_some() {
            return self.acquire_from_details(request, issue, &row).await;
        }

        if !row.downloadable && row.pdf_url.is_none() {
            warn!("gazette {issue} offers no details page and no PDF");
            return Err(AcquisitionError::NoRetrievalPath { issue: issue.clone() });
        }
        if request.kind == DocumentKind::Amendment {
            // Amendment end markers never appear in issue PDFs, so a
            // PDF-only issue cannot serve an amendment.
            return Err(AcquisitionError::NoRetrievalPath { issue: issue.clone() });
        }

        let file_key = issue.to_string();
        let already_available = self.store.find_file(&file_key).await?.is_some()
            || self.registry.lookup_file(&file_key).is_some()
            || self.registry.is_in_flight(&file_key);
        if already_available {
            info!("PDF for gazette {issue} already collected or in flight");
            return self.await_shared_download(request, issue).await;
        }

        if self.registry.try_claim(&file_key) {
            // The claim also succeeds right after a previous owner released
            // it; anything that owner staged in the meantime supersedes a
            // second download.
            let staged_meanwhile = match self.store.find_file(&file_key).await {
                Ok(found) => found.is_some() || self.registry.lookup_file(&file_key).is_some(),
                Err(err) => {
                    self.registry.release(&file_key);
                    return Err(err.into());
                }
            };
            if staged_meanwhile {
                self.registry.release(&file_key);
                return self.await_shared_download(request, issue).await;
            }
            self.download_and_extract(request, issue, &row).await
        } else {
            // Lost the claim race; the winner's download will land shortly.
            self.await_shared_download(request, issue).await
        }
    }

    async fn acquire_from_details(
        &self,
        request: &DocumentRequest,
        issue: &GazetteIssue,
        row: &IssueRow,
    ) -> Result<FetchedDocument, AcquisitionError> {
        let entry = self.find_toc_entry(request, issue, row).await?;
        let page = self.portal.open_entry(&entry).await.map_err(|err| {
            page_unreachable(
                err,
                &format!("opening the entry for '{}' in gazette {issue}", request.identifier),
            )
        })?;

        let key = request.store_key(issue);
        let url = if page.url.trim().is_empty() { key.clone() } else { page.url.clone() };
        self.registry.stage_text(TextRecord {
            text_type: request.source_type_tag.clone(),
            text_identifier: key.clone(),
            country: self.config.country.clone(),
            content: page.body.clone(),
            download_url: url.clone(),
        });

        let text = match request.kind {
            DocumentKind::Amendment => {
                // The link text alone can mark the page as fully operative,
                // so it is kept under its companion tag.
                self.registry.stage_text(TextRecord {
                    text_type: request.link_text_tag(),
                    text_identifier: key,
                    country: self.config.country.clone(),
                    content: entry.text.clone(),
                    download_url: url.clone(),
                });
                extraction::amendment_operative_part(&page.body, &entry.text)?
            }
            kind => extraction::operative_part(kind, &page.body)?,
        };
        info!("extracted '{}' from the gazette {issue} details page", request.identifier);
        Ok(FetchedDocument { url, text })
    }

    /// Searches the table of contents, twice at most.
    ///
    /// The first pass matches strictly. The retry covers a transient
    /// half-rendered contents table, and for bills it also relaxes the
    /// matcher to tolerate a misprinted year.
    async fn find_toc_entry(
        &self,
        request: &DocumentRequest,
        issue: &GazetteIssue,
        row: &IssueRow,
    ) -> Result<TocEntry, AcquisitionError> {
        for attempt in 0..2 {
            let relaxed = attempt == 1;
            match self.portal.open_details(row).await {
                Ok(entries) => {
                    let matched = entries.iter().find(|entry| {
                        matches_toc_entry(request.kind, &request.identifier, &entry.text, relaxed)
                    });
                    if let Some(entry) = matched {
                        return Ok(entry.clone());
                    }
                    debug!(
                        "no contents entry matched '{}' in gazette {issue} (attempt {})",
                        request.identifier,
                        attempt + 1
                    );
                }
                Err(PortalError::NotFound { what }) => {
                    warn!("table of contents of gazette {issue} not ready: {what}");
                }
                Err(other) => {
                    return Err(page_unreachable(
                        other,
                        &format!("loading the table of contents of gazette {issue}"),
                    ));
                }
            }
        }
        warn!("legislation '{}' not found in gazette {issue}", request.identifier);
        Err(AcquisitionError::EntryNotFound {
            issue: issue.clone(),
            identifier: request.identifier.clone(),
        })
    }

    /// Owns the claim for this issue: downloads the PDF, stages it, releases
    /// the claim, then extracts the requested document.
    async fn download_and_extract(
        &self,
        request: &DocumentRequest,
        issue: &GazetteIssue,
        row: &IssueRow,
    ) -> Result<FetchedDocument, AcquisitionError> {
        let file_key = issue.to_string();
        let url = row.pdf_url.clone().unwrap_or_else(|| request.store_key(issue));
        info!("downloading gazette {issue} PDF");
        let bytes = match self.portal.download_pdf(row).await {
            Ok(bytes) => bytes,
            Err(err) => {
                // Let another worker have a go instead of starving every
                // waiter until the poll timeout.
                self.registry.release(&file_key);
                return Err(match err {
                    PortalError::NotFound { what } => {
                        warn!("no download control for gazette {issue}: {what}");
                        AcquisitionError::NoRetrievalPath { issue: issue.clone() }
                    }
                    other => {
                        page_unreachable(other, &format!("downloading the gazette {issue} PDF"))
                    }
                });
            }
        };

        self.registry.stage_file(DownloadedFile {
            filename: file_key.clone(),
            url: url.clone(),
            content: bytes.clone(),
        });
        self.registry.release(&file_key);
        debug!("PDF for gazette {issue} staged for persistence");

        self.extract_from_pdf(request, issue, url, &bytes).await
    }

    /// Polls with bounded exponential backoff until another worker's
    /// download becomes visible, then extracts from it.
    async fn await_shared_download(
        &self,
        request: &DocumentRequest,
        issue: &GazetteIssue,
    ) -> Result<FetchedDocument, AcquisitionError> {
        let file_key = issue.to_string();
        let deadline = Instant::now() + Duration::from_secs(self.config.download_wait_timeout_secs);
        let mut interval = Duration::from_secs(self.config.poll_initial_interval_secs.max(1));
        let max_interval =
            Duration::from_secs(self.config.poll_max_interval_secs.max(1)).max(interval);
        loop {
            let file = match self.store.find_file(&file_key).await? {
                Some(file) => Some(file),
                None => self.registry.lookup_file(&file_key),
            };
            if let Some(file) = file {
                let url = if file.url.trim().is_empty() {
                    request.store_key(issue)
                } else {
                    file.url.clone()
                };
                return self.extract_from_pdf(request, issue, url, &file.content).await;
            }

            let now = Instant::now();
            if now >= deadline {
                warn!("wait for gazette {issue} PDF timed out");
                return Err(AcquisitionError::DownloadTimedOut { issue: issue.clone() });
            }
            info!("waiting for the gazette {issue} PDF to be saved");
            tokio::time::sleep(interval.min(deadline - now)).await;
            interval = (interval * 2).min(max_interval);
        }
    }

    async fn extract_from_pdf(
        &self,
        request: &DocumentRequest,
        issue: &GazetteIssue,
        url: String,
        bytes: &[u8],
    ) -> Result<FetchedDocument, AcquisitionError> {
        let pdf_text = self.pdf_extractor.extract_text(bytes).await?;
        let located = extraction::pdf_operative_part(request.kind, &request.identifier, &pdf_text)?;
        self.registry.stage_text(TextRecord {
            text_type: request.source_type_tag.clone(),
            text_identifier: request.store_key(issue),
            country: self.config.country.clone(),
            content: located.located,
            download_url: url.clone(),
        });
        info!("extracted '{}' from the gazette {issue} PDF", request.identifier);
        Ok(FetchedDocument { url, text: located.operative })
    }
}

fn page_unreachable(err: PortalError, context: &str) -> AcquisitionError {
    match err {
        PortalError::Timeout { url } => {
            AcquisitionError::PageUnreachable { context: format!("{context} ({url})") }
        }
        PortalError::Navigation(source) => {
            AcquisitionError::PageUnreachable { context: format!("{context}: {source:#}") }
        }
        PortalError::NotFound { what } => {
            AcquisitionError::PageUnreachable { context: format!("{context}: missing {what}") }
        }
    }
}
