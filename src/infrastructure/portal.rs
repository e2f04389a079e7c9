//! HTTP implementation of the gazette portal
//!
//! Drives the public gazette archive over plain HTTP and parses its pages
//! with CSS selectors. The selectors are configuration so the scraper
//! survives cosmetic markup changes without a code edit.

use anyhow::anyhow;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::domain::errors::PortalError;
use crate::domain::repositories::{EntryPage, GazettePortal, IssueRow, TocEntry};
use crate::infrastructure::http_client::HttpClient;

/// CSS selectors for the archive's pages.
#[derive(Debug, Clone)]
pub struct PortalSelectors {
    /// Rows of the archive index table.
    pub index_rows: String,
    pub number_cell: String,
    pub year_cell: String,
    pub details_link: String,
    pub pdf_link: String,
    pub download_link: String,
    /// Links of an issue's table of contents.
    pub toc_links: String,
    /// The fixed region of an entry page holding the document text.
    pub entry_body: String,
}

impl Default for PortalSelectors {
    fn default() -> Self {
        Self {
            index_rows: ".ui-datatable-tablewrapper tbody tr".to_string(),
            number_cell: "td:nth-child(1) label, td:nth-child(1)".to_string(),
            year_cell: "td:nth-child(3) label, td:nth-child(3)".to_string(),
            details_link: ".colIconoAjustable a[id$=btnVerDetalle]".to_string(),
            pdf_link: ".colIconoAjustable a[id$=verLink]".to_string(),
            download_link: ".colIconoAjustable a[id$=btnDescargarPdf]".to_string(),
            toc_links: "form table div a".to_string(),
            entry_body: "form div.textoGaceta, form div label".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpPortalConfig {
    pub base_url: String,
    /// Index search URL; `{number}` is replaced with the gazette number.
    pub search_url: String,
    pub selectors: PortalSelectors,
}

impl Default for HttpPortalConfig {
    fn default() -> Self {
        let base_url = "http://svrpubindc.imprenta.gov.co/senado/".to_string();
        Self {
            search_url: format!("{base_url}?numeroGaceta={{number}}"),
            base_url,
            selectors: PortalSelectors::default(),
        }
    }
}

pub struct HttpGazettePortal {
    http: HttpClient,
    config: HttpPortalConfig,
}

impl HttpGazettePortal {
    pub fn new(http: HttpClient, config: HttpPortalConfig) -> Self {
        Self { http, config }
    }

    fn base(&self) -> Result<Url, PortalError> {
        Url::parse(&self.config.base_url)
            .map_err(|err| PortalError::Navigation(anyhow!("invalid base url: {err}")))
    }

    async fn fetch(&self, url: &str) -> Result<String, PortalError> {
        self.http.get_text(url).await.map_err(|err| http_error(err, url))
    }
}

#[async_trait]
impl GazettePortal for HttpGazettePortal {
    async fn issue_rows(&self, number: u32) -> Result<Vec<IssueRow>, PortalError> {
        let url = self.config.search_url.replace("{number}", &number.to_string());
        let body = self.fetch(&url).await?;
        let document = Html::parse_document(&body);
        let rows = parse_issue_rows(&document, &self.config.selectors, &self.base()?)?;
        debug!("archive index returned {} rows for number {}", rows.len(), number);
        Ok(rows.into_iter().filter(|row| row.number == number).collect())
    }

    async fn open_details(&self, row: &IssueRow) -> Result<Vec<TocEntry>, PortalError> {
        let details_url = row
            .details_url
            .as_deref()
            .ok_or_else(|| PortalError::NotFound { what: "details link".to_string() })?;
        let body = self.fetch(details_url).await?;
        let document = Html::parse_document(&body);
        parse_toc_entries(&document, &self.config.selectors, &self.base()?)
    }

    async fn open_entry(&self, entry: &TocEntry) -> Result<EntryPage, PortalError> {
        let body = self.fetch(&entry.href).await?;
        let document = Html::parse_document(&body);
        parse_entry_page(&document, &self.config.selectors, &entry.href)
    }

    async fn download_pdf(&self, row: &IssueRow) -> Result<Vec<u8>, PortalError> {
        let pdf_url = row
            .pdf_url
            .as_deref()
            .ok_or_else(|| PortalError::NotFound { what: "PDF download control".to_string() })?;
        self.http.get_bytes(pdf_url).await.map_err(|err| http_error(err, pdf_url))
    }
}

pub(crate) fn parse_issue_rows(
    document: &Html,
    selectors: &PortalSelectors,
    base: &Url,
) -> Result<Vec<IssueRow>, PortalError> {
    let row_selector = selector(&selectors.index_rows)?;
    let number_selector = selector(&selectors.number_cell)?;
    let year_selector = selector(&selectors.year_cell)?;
    let details_selector = selector(&selectors.details_link)?;
    let pdf_selector = selector(&selectors.pdf_link)?;
    let download_selector = selector(&selectors.download_link)?;

    let mut rows = Vec::new();
    for row in document.select(&row_selector) {
        // Rows without a parseable number are pagination or header clutter.
        let Some(number) = first_text(&row, &number_selector).and_then(|t| t.parse::<u32>().ok())
        else {
            continue;
        };
        let year_label = first_text(&row, &year_selector).unwrap_or_default();
        let details_url = first_href(&row, &details_selector, base);
        let pdf_url = first_href(&row, &pdf_selector, base);
        let downloadable = row.select(&download_selector).next().is_some() || pdf_url.is_some();
        rows.push(IssueRow { number, year_label, details_url, pdf_url, downloadable });
    }
    Ok(rows)
}

pub(crate) fn parse_toc_entries(
    document: &Html,
    selectors: &PortalSelectors,
    base: &Url,
) -> Result<Vec<TocEntry>, PortalError> {
    let link_selector = selector(&selectors.toc_links)?;
    let entries = document
        .select(&link_selector)
        .filter_map(|link| {
            let href = link.value().attr("href")?;
            let text = collect_text(&link);
            Some(TocEntry { text, href: resolve(base, href) })
        })
        .collect();
    Ok(entries)
}

pub(crate) fn parse_entry_page(
    document: &Html,
    selectors: &PortalSelectors,
    url: &str,
) -> Result<EntryPage, PortalError> {
    let body_selector = selector(&selectors.entry_body)?;
    let region = document
        .select(&body_selector)
        .next()
        .ok_or_else(|| PortalError::NotFound { what: selectors.entry_body.clone() })?;
    let body = region
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(EntryPage { url: url.to_string(), body })
}

fn selector(css: &str) -> Result<Selector, PortalError> {
    Selector::parse(css)
        .map_err(|err| PortalError::Navigation(anyhow!("invalid selector '{css}': {err}")))
}

fn first_text(row: &ElementRef<'_>, cell: &Selector) -> Option<String> {
    row.select(cell).next().map(|element| collect_text(&element))
}

fn first_href(row: &ElementRef<'_>, link: &Selector, base: &Url) -> Option<String> {
    row.select(link)
        .next()
        .and_then(|element| element.value().attr("href"))
        .map(|href| resolve(base, href))
}

fn collect_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve(base: &Url, href: &str) -> String {
    base.join(href).map(|joined| joined.to_string()).unwrap_or_else(|_| href.to_string())
}

fn http_error(err: anyhow::Error, url: &str) -> PortalError {
    let timed_out = err
        .downcast_ref::<reqwest::Error>()
        .map(reqwest::Error::is_timeout)
        .unwrap_or(false);
    if timed_out {
        PortalError::Timeout { url: url.to_string() }
    } else {
        PortalError::Navigation(err)
    }
}
