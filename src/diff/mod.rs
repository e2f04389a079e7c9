//! Amendment size measurement
//!
//! Computes a stable, case- and whitespace-insensitive count of changed
//! non-whitespace characters between two revisions of legislative text. A
//! replaced word counts once (the longer side), not as deletion plus
//! insertion.

mod engine;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::errors::DiffError;
use engine::{DiffRow, diff_rows, NEW_START_TAG};

static DIFF_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "(?:({os})(.*?){oe}|({ns})(.*?){ne})",
        os = regex::escape(engine::OLD_START_TAG),
        oe = regex::escape(engine::OLD_END_TAG),
        ns = regex::escape(engine::NEW_START_TAG),
        ne = regex::escape(engine::NEW_END_TAG),
    ))
    .expect("diff span pattern")
});

/// Computes the size of the textual change between two revisions of the same
/// legislative stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDiffSizeCalculator;

impl TextDiffSizeCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Number of non-whitespace characters changed between `old_text` and
    /// `new_text`.
    ///
    /// Both inputs must be non-blank: an amendment size cannot be computed
    /// without both revisions, and `0` is a meaningful result that must not
    /// double as a missing-input default.
    pub fn char_difference(&self, old_text: &str, new_text: &str) -> Result<u64, DiffError> {
        validate(old_text, "older")?;
        validate(new_text, "new")?;

        // Re-capitalization is not a substantive change in legal text.
        let old_lines = split_lines(&old_text.to_lowercase());
        let new_lines = split_lines(&new_text.to_lowercase());

        let total = diff_rows(&old_lines, &new_lines)
            .into_iter()
            .filter_map(|row| match row {
                DiffRow::Equal => None,
                DiffRow::Changed { merged } => Some(line_difference(&merged)),
            })
            .sum();
        Ok(total)
    }
}

fn validate(text: &str, which: &'static str) -> Result<(), DiffError> {
    if text.trim().is_empty() {
        return Err(DiffError::InvalidInput { which });
    }
    Ok(())
}

fn split_lines(text: &str) -> Vec<String> {
    text.trim()
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Walks the tagged spans of one merged changed line in order. An old span
/// whose closing tag is immediately followed by a new span is a
/// substitution and contributes the longer side only.
fn line_difference(merged: &str) -> u64 {
    let spans: Vec<regex::Captures<'_>> = DIFF_SPAN.captures_iter(merged).collect();
    let mut total = 0u64;
    let mut index = 0;
    while index < spans.len() {
        let caps = &spans[index];
        let Some(whole) = caps.get(0) else {
            index += 1;
            continue;
        };
        let (is_old, span_text) = match (caps.get(2), caps.get(4)) {
            (Some(m), _) => (true, m.as_str()),
            (None, Some(m)) => (false, m.as_str()),
            (None, None) => {
                index += 1;
                continue;
            }
        };
        let span_len = length_without_whitespace(span_text);
        let is_substitution = is_old
            && index + 1 < spans.len()
            && merged[whole.end()..].starts_with(NEW_START_TAG);
        if is_substitution {
            let replacement_len = spans[index + 1]
                .get(4)
                .map(|m| length_without_whitespace(m.as_str()))
                .unwrap_or(0);
            total += span_len.max(replacement_len);
            index += 2;
        } else {
            total += span_len;
            index += 1;
        }
    }
    total
}

fn length_without_whitespace(text: &str) -> u64 {
    text.chars().filter(|c| !c.is_whitespace()).count() as u64
}
