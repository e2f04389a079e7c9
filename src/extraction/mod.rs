//! Boundary extraction of the legally operative text
//!
//! Raw gazette pages and PDFs carry headers, expositions of motives and
//! archive boilerplate around the operative text. This module derives the
//! operative substring using an ordered chain of start markers with
//! per-document-kind end markers.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::errors::ExtractionError;
use crate::domain::gazette::{pdf_identifier_parts, DocumentKind};

/// Fixed introductory formula of the operative text in the local drafting
/// convention. The operative text starts right after it.
static DECREE_FORMULA: Lazy<Regex> = Lazy::new(|| Regex::new("DECRETA").expect("decree formula pattern"));

/// Spelling and numbering variants of a first or sole article heading. When
/// no decree formula exists the operative text starts at the heading itself.
static ARTICLE_ONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:art\.?|art[ií]*c*u*l[o0])[\s]+(?:I[^I]|1\D|l[.º°]|[uú]*nico|primero|uno)")
        .expect("article one pattern")
});

static BILL_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"E(?:XPOSICI.N\s*DE\s*MOTIVOS|xposici.n\s*de\s*[Mm]otivos)|CONSULTAR.*?(?:ORIGINAL\s*IMPRESO|FOI*RMAT[OE]\s*PDF|ARCHIVO\s*PDF)",
    )
    .expect("bill end pattern")
});

static LAW_END: Lazy<Regex> =
    Lazy::new(|| Regex::new("Publíquese y cúmplase").expect("law end pattern"));

static AMENDMENT_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"CONSULTAR.*?(?:ORIGINAL\s*IMPRESO|FOI*RMAT[OE]\s*PDF|ARCHIVO\s*PDF)")
        .expect("amendment end pattern")
});

static WS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

#[derive(Debug, Clone, Copy)]
enum StartPolicy {
    /// The marker is an introduction; operative text begins after it.
    AfterMatch,
    /// The marker is part of the operative text; it begins at the marker.
    AtMatch,
}

struct StartStrategy {
    marker: &'static Lazy<Regex>,
    policy: StartPolicy,
}

/// Ordered start-marker chain; first hit wins.
static START_STRATEGIES: [StartStrategy; 2] = [
    StartStrategy { marker: &DECREE_FORMULA, policy: StartPolicy::AfterMatch },
    StartStrategy { marker: &ARTICLE_ONE, policy: StartPolicy::AtMatch },
];

/// Link texts that announce the linked page already holds only the approved
/// text, making the whole page operative.
const APPROVED_LINK_PHRASES: [&str; 3] =
    ["texto definitivo aprobado", "texto aprobado", "texto definitivo"];

/// Capitalized paragraph titles opening an amendment's approved text. The
/// exact title is preferred; the looser ones are a fallback.
const PRIMARY_AMENDMENT_TITLE: &str = "TEXTO DEFINITIVO APROBADO";
const SECONDARY_AMENDMENT_TITLES: [&str; 2] = ["TEXTO APROBADO", "TEXTO DEFINITIVO"];

/// Operative sub-range of a located multi-document PDF, both as staged and
/// as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfOperativeText {
    /// The identified document's full print, end marker included; this is
    /// what gets staged for persistence.
    pub located: String,
    pub operative: String,
}

/// Extracts the operative text of a bill or law page.
pub fn operative_part(kind: DocumentKind, text: &str) -> Result<String, ExtractionError> {
    let start = find_start(text).ok_or(ExtractionError::NoStartMarker)?;
    clip_to_end(kind, text, start)
}

/// Extracts the operative text of an amendment page.
///
/// The search is paragraph-scoped: the link text alone can mark the whole
/// page as operative, otherwise a title paragraph does, and paragraphs from
/// the end marker onward are dropped before the start-marker chain runs.
pub fn amendment_operative_part(raw_text: &str, link_text: &str) -> Result<String, ExtractionError> {
    let paragraphs: Vec<&str> = raw_text.split('\n').collect();
    let start_index =
        amendment_start_index(link_text, &paragraphs).ok_or(ExtractionError::NoStartMarker)?;
    let scoped = scope_amendment_paragraphs(&paragraphs, start_index);

    if let Some(m) = DECREE_FORMULA.find(&scoped) {
        return finish(&scoped[m.end()..]);
    }
    if let Some(m) = ARTICLE_ONE.find(&scoped) {
        return finish(&scoped[m.start()..]);
    }
    Err(ExtractionError::NoStartMarker)
}

/// Locates the identified document inside a whole-issue PDF text, then
/// extracts its operative part.
///
/// Gazette PDFs print several documents back to back, so the requested
/// identifier's `number de year` heading and the kind's end marker bound the
/// document first. Failure is reported per identifier part, so a caller
/// iterating issue candidates gets a precise diagnosis for each attempt.
pub fn pdf_operative_part(
    kind: DocumentKind,
    identifier: &str,
    pdf_text: &str,
) -> Result<PdfOperativeText, ExtractionError> {
    if pdf_text.trim().is_empty() {
        return Err(ExtractionError::PdfUnreadable);
    }
    let collapsed = WS_RUN.replace_all(pdf_text, " ");
    let collapsed = collapsed.trim();
    let mut attempts = Vec::new();

    for (number, year) in pdf_identifier_parts(kind, identifier) {
        let pattern = format!(r"{}\s*[dD][eE][\s\d]*{}", regex::escape(&number), regex::escape(&year));
        let Ok(locator) = Regex::new(&pattern) else {
            continue;
        };
        let Some(m) = locator.find(collapsed) else {
            attempts.push(format!("'{number} de {year}' not present"));
            continue;
        };
        let tail = &collapsed[m.start()..];
        let Some(end_match) = end_marker(kind).find(tail) else {
            attempts.push(format!("no end marker after '{number} de {year}'"));
            continue;
        };
        let located = tail[..end_match.end()].trim().to_string();
        let operative = operative_part(kind, &located)?;
        return Ok(PdfOperativeText { located, operative });
    }

    Err(ExtractionError::NotFoundInPdf {
        identifier: identifier.to_string(),
        attempts: if attempts.is_empty() {
            "no usable identifier parts".to_string()
        } else {
            attempts.join("; ")
        },
    })
}

fn find_start(text: &str) -> Option<usize> {
    for strategy in &START_STRATEGIES {
        if let Some(m) = strategy.marker.find(text) {
            return Some(match strategy.policy {
                StartPolicy::AfterMatch => m.end(),
                StartPolicy::AtMatch => m.start(),
            });
        }
    }
    None
}

fn clip_to_end(kind: DocumentKind, text: &str, start: usize) -> Result<String, ExtractionError> {
    let clipped = match end_marker(kind).find(text) {
        Some(m) if m.start() > start => &text[start..m.start()],
        Some(_) => return Err(ExtractionError::EndBeforeStart),
        None => {
            // End markers are frequently absent in shorter documents; the
            // tail of the document is taken instead.
            debug!("no {kind:?} end marker found, taking text to end of document");
            &text[start..]
        }
    };
    finish(clipped)
}

fn finish(clipped: &str) -> Result<String, ExtractionError> {
    let cleaned = clipped.trim_start_matches(|c: char| !c.is_alphabetic()).trim();
    if cleaned.is_empty() {
        // A start marker with nothing after it is as useless as no marker.
        return Err(ExtractionError::NoStartMarker);
    }
    Ok(cleaned.to_string())
}

fn end_marker(kind: DocumentKind) -> &'static Regex {
    match kind {
        DocumentKind::Bill => &BILL_END,
        DocumentKind::Law => &LAW_END,
        DocumentKind::Amendment => &AMENDMENT_END,
    }
}

fn amendment_start_index(link_text: &str, paragraphs: &[&str]) -> Option<usize> {
    let normalized_link = WS_RUN.replace_all(link_text, " ").to_lowercase();
    if APPROVED_LINK_PHRASES.iter().any(|phrase| normalized_link.contains(phrase)) {
        return Some(0);
    }
    let mut secondary = None;
    for (i, paragraph) in paragraphs.iter().enumerate() {
        let trimmed = paragraph.trim();
        if trimmed.starts_with(PRIMARY_AMENDMENT_TITLE) {
            return Some(i);
        }
        if secondary.is_none()
            && SECONDARY_AMENDMENT_TITLES.iter().any(|title| trimmed.starts_with(title))
        {
            secondary = Some(i);
        }
    }
    secondary
}

fn scope_amendment_paragraphs(paragraphs: &[&str], start_index: usize) -> String {
    let mut text = String::new();
    for paragraph in &paragraphs[start_index..] {
        if AMENDMENT_END.is_match(paragraph) {
            break;
        }
        text.push_str(paragraph);
        text.push('\n');
    }
    text
}
