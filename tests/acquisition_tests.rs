//! End-to-end acquisition tests over a fixture portal and an in-memory
//! store: no network, no browser.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;

use gazette_collector::domain::document::{DownloadedFile, TextRecord};
use gazette_collector::domain::errors::PortalError;
use gazette_collector::domain::repositories::{
    DocumentStore, EntryPage, GazettePortal, IssueRow, PdfTextExtractor, TocEntry,
};
use gazette_collector::{
    AcquisitionConfig, AcquisitionError, DocumentKind, DocumentRequest, GazetteFetchCoordinator,
    GazetteIssue, PendingWorkRegistry,
};

#[derive(Default)]
struct MemoryStore {
    texts: Mutex<Vec<TextRecord>>,
    files: Mutex<Vec<DownloadedFile>>,
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_text(
        &self,
        text_type: &str,
        identifier: &str,
        country: &str,
    ) -> Result<Option<TextRecord>> {
        Ok(self
            .texts
            .lock()
            .unwrap()
            .iter()
            .find(|record| {
                record.text_type == text_type
                    && record.text_identifier == identifier
                    && record.country == country
            })
            .cloned())
    }

    async fn find_file(&self, filename: &str) -> Result<Option<DownloadedFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .iter()
            .find(|file| file.filename == filename)
            .cloned())
    }

    async fn save_texts(&self, texts: &[TextRecord]) -> Result<()> {
        self.texts.lock().unwrap().extend_from_slice(texts);
        Ok(())
    }

    async fn save_files(&self, files: &[DownloadedFile]) -> Result<()> {
        self.files.lock().unwrap().extend_from_slice(files);
        Ok(())
    }
}

#[derive(Default)]
struct FixturePortal {
    rows: Vec<IssueRow>,
    toc: HashMap<String, Vec<TocEntry>>,
    pages: HashMap<String, EntryPage>,
    pdfs: HashMap<String, Vec<u8>>,
    download_delay: Duration,
    index_calls: AtomicUsize,
    details_calls: AtomicUsize,
    downloads: AtomicUsize,
}

#[async_trait]
impl GazettePortal for FixturePortal {
    async fn issue_rows(&self, number: u32) -> Result<Vec<IssueRow>, PortalError> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.iter().filter(|row| row.number == number).cloned().collect())
    }

    async fn open_details(&self, row: &IssueRow) -> Result<Vec<TocEntry>, PortalError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        let details_url = row
            .details_url
            .as_deref()
            .ok_or_else(|| PortalError::NotFound { what: "details link".to_string() })?;
        Ok(self.toc.get(details_url).cloned().unwrap_or_default())
    }

    async fn open_entry(&self, entry: &TocEntry) -> Result<EntryPage, PortalError> {
        self.pages
            .get(&entry.href)
            .cloned()
            .ok_or_else(|| PortalError::NotFound { what: entry.href.clone() })
    }

    async fn download_pdf(&self, row: &IssueRow) -> Result<Vec<u8>, PortalError> {
        let url = row
            .pdf_url
            .as_deref()
            .ok_or_else(|| PortalError::NotFound { what: "download control".to_string() })?;
        tokio::time::sleep(self.download_delay).await;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.pdfs
            .get(url)
            .cloned()
            .ok_or_else(|| PortalError::NotFound { what: url.to_string() })
    }
}

/// The fixture "PDF" bytes hold plain text already.
struct PlainTextPdf;

#[async_trait]
impl PdfTextExtractor for PlainTextPdf {
    async fn extract_text(&self, bytes: &[u8]) -> Result<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

fn test_config() -> AcquisitionConfig {
    AcquisitionConfig {
        country: "colombia".to_string(),
        download_wait_timeout_secs: 20,
        poll_initial_interval_secs: 1,
        poll_max_interval_secs: 2,
    }
}

fn build_coordinator(
    portal: Arc<FixturePortal>,
    store: Arc<MemoryStore>,
    registry: Arc<PendingWorkRegistry>,
) -> GazetteFetchCoordinator {
    GazetteFetchCoordinator::new(portal, store, Arc::new(PlainTextPdf), registry, test_config())
}

fn pdf_only_row(number: u32, year_label: &str, pdf_url: &str) -> IssueRow {
    IssueRow {
        number,
        year_label: year_label.to_string(),
        details_url: None,
        pdf_url: Some(pdf_url.to_string()),
        downloadable: true,
    }
}

fn details_row(number: u32, year_label: &str, details_url: &str) -> IssueRow {
    IssueRow {
        number,
        year_label: year_label.to_string(),
        details_url: Some(details_url.to_string()),
        pdf_url: None,
        downloadable: false,
    }
}

const TWO_BILL_GAZETTE: &str = "Gaceta del Congreso 45. \
    123 de 2020 por la cual se dictan normas DECRETA Articulo 1 contenido A \
    EXPOSICION DE MOTIVOS razones del ponente \
    456 de 2021 otro proyecto DECRETA Articulo 1 contenido B \
    Exposición de motivos del segundo proyecto";

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_workers_share_a_single_pdf_download() {
    let portal = Arc::new(FixturePortal {
        rows: vec![pdf_only_row(45, "12/03/2021", "http://gazettes/45-21.pdf")],
        pdfs: HashMap::from([(
            "http://gazettes/45-21.pdf".to_string(),
            TWO_BILL_GAZETTE.as_bytes().to_vec(),
        )]),
        download_delay: Duration::from_millis(300),
        ..FixturePortal::default()
    });
    let store = Arc::new(MemoryStore::default());
    let registry = Arc::new(PendingWorkRegistry::new());
    let coordinator = Arc::new(build_coordinator(
        Arc::clone(&portal),
        Arc::clone(&store),
        Arc::clone(&registry),
    ));

    let issue = GazetteIssue::parse("45/21").unwrap();
    let workers = ["123/20-", "456/21-"].map(|identifier| {
        let coordinator = Arc::clone(&coordinator);
        let issue = issue.clone();
        let request = DocumentRequest::new(DocumentKind::Bill, identifier, "BILL_TEXT");
        tokio::spawn(async move { coordinator.acquire(&request, &issue).await })
    });

    let results: Vec<_> = join_all(workers).await;
    let first = results[0].as_ref().unwrap().as_ref().expect("first worker succeeds");
    let second = results[1].as_ref().unwrap().as_ref().expect("second worker succeeds");

    assert_eq!(first.text, "Articulo 1 contenido A");
    assert_eq!(second.text, "Articulo 1 contenido B");
    assert!(!first.text.is_empty() && !second.text.is_empty());

    // The whole point: one download served both workers.
    assert_eq!(portal.downloads.load(Ordering::SeqCst), 1);
    assert!(registry.lookup_file("45/21").is_some());
    assert!(!registry.is_in_flight("45/21"));
}

#[tokio::test]
async fn cached_text_is_served_without_touching_the_portal() {
    let portal = Arc::new(FixturePortal::default());
    let store = Arc::new(MemoryStore::default());
    store
        .save_texts(&[TextRecord {
            text_type: "BILL_TEXT".to_string(),
            text_identifier: "Gazette: 45/21, id: 123/20-".to_string(),
            country: "colombia".to_string(),
            content: "encabezado DECRETA contenido esencial EXPOSICIÓN DE MOTIVOS resto"
                .to_string(),
            download_url: "http://gazettes/45".to_string(),
        }])
        .await
        .unwrap();
    let coordinator = build_coordinator(
        Arc::clone(&portal),
        Arc::clone(&store),
        Arc::new(PendingWorkRegistry::new()),
    );

    let request = DocumentRequest::new(DocumentKind::Bill, "123/20-", "BILL_TEXT");
    let issue = GazetteIssue::parse("45/21").unwrap();
    let document = coordinator.acquire(&request, &issue).await.unwrap();

    assert_eq!(document.text, "contenido esencial");
    assert_eq!(document.url, "http://gazettes/45");
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn details_search_retries_once_with_a_relaxed_bill_match() {
    let portal = Arc::new(FixturePortal {
        rows: vec![details_row(45, "12/03/2021", "http://gazettes/45/details")],
        toc: HashMap::from([(
            "http://gazettes/45/details".to_string(),
            vec![TocEntry {
                // Misprinted year: the strict pass rejects it.
                text: "Proyecto de ley número 123 de 2019".to_string(),
                href: "http://gazettes/45/toc/123".to_string(),
            }],
        )]),
        pages: HashMap::from([(
            "http://gazettes/45/toc/123".to_string(),
            EntryPage {
                url: "http://gazettes/45/toc/123".to_string(),
                body: "encabezado DECRETA Artículo 1 contenido esencial".to_string(),
            },
        )]),
        ..FixturePortal::default()
    });
    let store = Arc::new(MemoryStore::default());
    let registry = Arc::new(PendingWorkRegistry::new());
    let coordinator =
        build_coordinator(Arc::clone(&portal), Arc::clone(&store), Arc::clone(&registry));

    let request = DocumentRequest::new(DocumentKind::Bill, "123/20-", "BILL_TEXT");
    let issue = GazetteIssue::parse("45/21").unwrap();
    let document = coordinator.acquire(&request, &issue).await.unwrap();

    assert_eq!(document.text, "Artículo 1 contenido esencial");
    assert_eq!(document.url, "http://gazettes/45/toc/123");
    // One strict pass, one relaxed pass.
    assert_eq!(portal.details_calls.load(Ordering::SeqCst), 2);
    // The raw page text was staged under the request's tag.
    assert!(registry
        .lookup_text("BILL_TEXT", "Gazette: 45/21, id: 123/20-")
        .is_some());
}

#[tokio::test]
async fn amendment_link_text_is_staged_and_drives_extraction() {
    let portal = Arc::new(FixturePortal {
        rows: vec![details_row(45, "12/03/2021", "http://gazettes/45/details")],
        toc: HashMap::from([(
            "http://gazettes/45/details".to_string(),
            vec![TocEntry {
                text: "Texto definitivo aprobado Proyecto de ley 123 de 2020".to_string(),
                href: "http://gazettes/45/toc/enmienda".to_string(),
            }],
        )]),
        pages: HashMap::from([(
            "http://gazettes/45/toc/enmienda".to_string(),
            EntryPage {
                url: "http://gazettes/45/toc/enmienda".to_string(),
                body: "DECRETA\nArtículo 1 enmendado\ndisposición final".to_string(),
            },
        )]),
        ..FixturePortal::default()
    });
    let store = Arc::new(MemoryStore::default());
    let registry = Arc::new(PendingWorkRegistry::new());
    let coordinator =
        build_coordinator(Arc::clone(&portal), Arc::clone(&store), Arc::clone(&registry));

    let request =
        DocumentRequest::new(DocumentKind::Amendment, "123/20-", "AMENDMENT_STAGE_1_TEXT");
    let issue = GazetteIssue::parse("45/21").unwrap();
    let document = coordinator.acquire(&request, &issue).await.unwrap();

    assert_eq!(document.text, "Artículo 1 enmendado\ndisposición final");
    let staged_link = registry
        .lookup_text("AMENDMENT_STAGE_1_LINK_TEXT", "Gazette: 45/21, id: 123/20-")
        .expect("link text is staged under its companion tag");
    assert!(staged_link.content.contains("Texto definitivo aprobado"));
}

#[tokio::test]
async fn candidate_iteration_returns_the_first_success() {
    let portal = Arc::new(FixturePortal {
        // Nothing for gazette 99; gazette 45 resolves through its details
        // page.
        rows: vec![details_row(45, "12/03/2021", "http://gazettes/45/details")],
        toc: HashMap::from([(
            "http://gazettes/45/details".to_string(),
            vec![TocEntry {
                text: "Proyecto de ley 123 de 2020".to_string(),
                href: "http://gazettes/45/toc/123".to_string(),
            }],
        )]),
        pages: HashMap::from([(
            "http://gazettes/45/toc/123".to_string(),
            EntryPage {
                url: "http://gazettes/45/toc/123".to_string(),
                body: "DECRETA Artículo 1 contenido".to_string(),
            },
        )]),
        ..FixturePortal::default()
    });
    let coordinator = build_coordinator(
        portal,
        Arc::new(MemoryStore::default()),
        Arc::new(PendingWorkRegistry::new()),
    );

    let request = DocumentRequest::new(DocumentKind::Bill, "123/20-", "BILL_TEXT");
    let candidates = vec![GazetteIssue::parse("99/19").unwrap(), GazetteIssue::parse("45/21").unwrap()];
    let document = coordinator.acquire_first(&request, &candidates).await.unwrap();
    assert_eq!(document.text, "Artículo 1 contenido");
}

#[tokio::test]
async fn exhausted_candidates_aggregate_every_failure() {
    let portal = Arc::new(FixturePortal {
        rows: vec![IssueRow {
            number: 45,
            year_label: "12/03/2021".to_string(),
            details_url: None,
            pdf_url: None,
            downloadable: false,
        }],
        ..FixturePortal::default()
    });
    let coordinator = build_coordinator(
        portal,
        Arc::new(MemoryStore::default()),
        Arc::new(PendingWorkRegistry::new()),
    );

    let request = DocumentRequest::new(DocumentKind::Bill, "123/20-", "BILL_TEXT");
    let candidates = vec![GazetteIssue::parse("99/19").unwrap(), GazetteIssue::parse("45/21").unwrap()];
    let err = coordinator.acquire_first(&request, &candidates).await.unwrap_err();

    match err {
        AcquisitionError::AllCandidatesFailed { identifier, failures } => {
            assert_eq!(identifier, "123/20-");
            assert_eq!(failures.len(), 2);
            assert_eq!(failures[0].0, "99/19");
            assert!(matches!(failures[0].1, AcquisitionError::IssueNotFound { .. }));
            assert_eq!(failures[1].0, "45/21");
            assert!(matches!(failures[1].1, AcquisitionError::NoRetrievalPath { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn invalid_identifiers_abort_before_any_navigation() {
    let portal = Arc::new(FixturePortal::default());
    let coordinator = build_coordinator(
        Arc::clone(&portal),
        Arc::new(MemoryStore::default()),
        Arc::new(PendingWorkRegistry::new()),
    );

    let request = DocumentRequest::new(DocumentKind::Law, "not a law reference", "LAW_TEXT");
    let candidates = vec![GazetteIssue::parse("45/21").unwrap()];
    let err = coordinator.acquire_first(&request, &candidates).await.unwrap_err();

    assert!(matches!(err, AcquisitionError::InvalidIdentifier { .. }));
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn amendments_cannot_be_served_from_pdf_only_issues() {
    let portal = Arc::new(FixturePortal {
        rows: vec![pdf_only_row(45, "12/03/2021", "http://gazettes/45-21.pdf")],
        ..FixturePortal::default()
    });
    let coordinator = build_coordinator(
        Arc::clone(&portal),
        Arc::new(MemoryStore::default()),
        Arc::new(PendingWorkRegistry::new()),
    );

    let request =
        DocumentRequest::new(DocumentKind::Amendment, "123/20-", "AMENDMENT_STAGE_1_TEXT");
    let issue = GazetteIssue::parse("45/21").unwrap();
    let err = coordinator.acquire(&request, &issue).await.unwrap_err();

    assert!(matches!(err, AcquisitionError::NoRetrievalPath { .. }));
    assert_eq!(portal.downloads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn flush_moves_staged_work_into_the_store() {
    let portal = Arc::new(FixturePortal {
        rows: vec![details_row(45, "12/03/2021", "http://gazettes/45/details")],
        toc: HashMap::from([(
            "http://gazettes/45/details".to_string(),
            vec![TocEntry {
                text: "Proyecto de ley 123 de 2020".to_string(),
                href: "http://gazettes/45/toc/123".to_string(),
            }],
        )]),
        pages: HashMap::from([(
            "http://gazettes/45/toc/123".to_string(),
            EntryPage {
                url: "http://gazettes/45/toc/123".to_string(),
                body: "DECRETA Artículo 1 contenido".to_string(),
            },
        )]),
        ..FixturePortal::default()
    });
    let store = Arc::new(MemoryStore::default());
    let registry = Arc::new(PendingWorkRegistry::new());
    let coordinator =
        build_coordinator(Arc::clone(&portal), Arc::clone(&store), Arc::clone(&registry));

    let request = DocumentRequest::new(DocumentKind::Bill, "123/20-", "BILL_TEXT");
    let issue = GazetteIssue::parse("45/21").unwrap();
    coordinator.acquire(&request, &issue).await.unwrap();

    registry.flush(store.as_ref()).await.unwrap();
    assert!(registry.lookup_text("BILL_TEXT", "Gazette: 45/21, id: 123/20-").is_none());
    assert!(store
        .find_text("BILL_TEXT", "Gazette: 45/21, id: 123/20-", "colombia")
        .await
        .unwrap()
        .is_some());

    // A later request for the same document is now a pure store hit.
    let index_calls_before = portal.index_calls.load(Ordering::SeqCst);
    let document = coordinator.acquire(&request, &issue).await.unwrap();
    assert_eq!(document.text, "Artículo 1 contenido");
    assert_eq!(portal.index_calls.load(Ordering::SeqCst), index_calls_before);
}
