//! Line and token diff engine
//!
//! Produces per-line diff rows where every non-equal row carries a merged
//! old-line representation with paired inline span tags, the shape the size
//! calculator walks. Line equality ignores whitespace differences; inline
//! diffs run at word/whitespace token granularity.

pub(crate) const OLD_START_TAG: &str = "<old#>";
pub(crate) const OLD_END_TAG: &str = "<#old>";
pub(crate) const NEW_START_TAG: &str = "<new#>";
pub(crate) const NEW_END_TAG: &str = "<#new>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditOp {
    Equal,
    Delete,
    Insert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DiffRow {
    Equal,
    /// Any non-equal row; `merged` interleaves kept text with tagged old/new
    /// spans.
    Changed { merged: String },
}

/// Diff rows between two already-trimmed, non-blank line lists.
pub(crate) fn diff_rows(old_lines: &[String], new_lines: &[String]) -> Vec<DiffRow> {
    let old_norm: Vec<String> = old_lines.iter().map(|line| normalize_ws(line)).collect();
    let new_norm: Vec<String> = new_lines.iter().map(|line| normalize_ws(line)).collect();
    let ops = edit_script(&old_norm, &new_norm, |a, b| a == b);

    let mut rows = Vec::new();
    let mut deletes: Vec<usize> = Vec::new();
    let mut inserts: Vec<usize> = Vec::new();
    let (mut ai, mut bi) = (0usize, 0usize);
    for op in ops {
        match op {
            EditOp::Equal => {
                flush_block(&mut rows, &mut deletes, &mut inserts, old_lines, new_lines);
                rows.push(DiffRow::Equal);
                ai += 1;
                bi += 1;
            }
            EditOp::Delete => {
                deletes.push(ai);
                ai += 1;
            }
            EditOp::Insert => {
                inserts.push(bi);
                bi += 1;
            }
        }
    }
    flush_block(&mut rows, &mut deletes, &mut inserts, old_lines, new_lines);
    rows
}

/// Turns a pending block of deleted/inserted lines into rows. Lines facing
/// each other pairwise become changed rows with inline diffs; leftovers
/// become whole-line old or new spans.
fn flush_block(
    rows: &mut Vec<DiffRow>,
    deletes: &mut Vec<usize>,
    inserts: &mut Vec<usize>,
    old_lines: &[String],
    new_lines: &[String],
) {
    let pairs = deletes.len().min(inserts.len());
    for j in 0..pairs {
        rows.push(DiffRow::Changed {
            merged: merge_inline(&old_lines[deletes[j]], &new_lines[inserts[j]]),
        });
    }
    for &index in &deletes[pairs..] {
        rows.push(DiffRow::Changed {
            merged: format!("{OLD_START_TAG}{}{OLD_END_TAG}", old_lines[index]),
        });
    }
    for &index in &inserts[pairs..] {
        rows.push(DiffRow::Changed {
            merged: format!("{NEW_START_TAG}{}{NEW_END_TAG}", new_lines[index]),
        });
    }
    deletes.clear();
    inserts.clear();
}

/// Word-level merged representation of one changed line pair. Replaced token
/// runs come out as an old span immediately followed by its new span, which
/// is how the calculator recognizes substitutions.
fn merge_inline(old_line: &str, new_line: &str) -> String {
    let old_tokens = tokenize(old_line);
    let new_tokens = tokenize(new_line);
    let ops = edit_script(&old_tokens, &new_tokens, token_eq);

    let mut merged = String::new();
    let mut old_span = String::new();
    let mut new_span = String::new();
    let (mut ai, mut bi) = (0usize, 0usize);
    for op in ops {
        match op {
            EditOp::Equal => {
                flush_spans(&mut merged, &mut old_span, &mut new_span);
                merged.push_str(old_tokens[ai]);
                ai += 1;
                bi += 1;
            }
            EditOp::Delete => {
                old_span.push_str(old_tokens[ai]);
                ai += 1;
            }
            EditOp::Insert => {
                new_span.push_str(new_tokens[bi]);
                bi += 1;
            }
        }
    }
    flush_spans(&mut merged, &mut old_span, &mut new_span);
    merged
}

fn flush_spans(merged: &mut String, old_span: &mut String, new_span: &mut String) {
    if !old_span.is_empty() {
        merged.push_str(OLD_START_TAG);
        merged.push_str(old_span);
        merged.push_str(OLD_END_TAG);
        old_span.clear();
    }
    if !new_span.is_empty() {
        merged.push_str(NEW_START_TAG);
        merged.push_str(new_span);
        merged.push_str(NEW_END_TAG);
        new_span.clear();
    }
}

/// Splits a line into alternating runs of whitespace and non-whitespace.
fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_ws: Option<bool> = None;
    for (idx, ch) in line.char_indices() {
        let is_ws = ch.is_whitespace();
        match in_ws {
            None => in_ws = Some(is_ws),
            Some(previous) if previous != is_ws => {
                tokens.push(&line[start..idx]);
                start = idx;
                in_ws = Some(is_ws);
            }
            _ => {}
        }
    }
    if start < line.len() {
        tokens.push(&line[start..]);
    }
    tokens
}

/// Whitespace tokens compare equal regardless of their exact content.
fn token_eq(a: &&str, b: &&str) -> bool {
    let a_ws = a.chars().all(char::is_whitespace);
    let b_ws = b.chars().all(char::is_whitespace);
    if a_ws || b_ws {
        return a_ws && b_ws;
    }
    a == b
}

fn normalize_ws(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Myers' greedy shortest-edit-script search with a recorded trace for
/// backtracking.
fn edit_script<T, F>(a: &[T], b: &[T], eq: F) -> Vec<EditOp>
where
    F: Fn(&T, &T) -> bool,
{
    let n = a.len();
    let m = b.len();
    if n == 0 {
        return vec![EditOp::Insert; m];
    }
    if m == 0 {
        return vec![EditOp::Delete; n];
    }

    let max = n + m;
    let offset = max as isize;
    let width = 2 * max + 1;
    let mut v = vec![0isize; width];
    let mut trace: Vec<Vec<isize>> = Vec::new();
    let mut found = false;
    'search: for d in 0..=(max as isize) {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let i = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[i - 1] < v[i + 1]) {
                v[i + 1]
            } else {
                v[i - 1] + 1
            };
            let mut y = x - k;
            while (x as usize) < n && (y as usize) < m && eq(&a[x as usize], &b[y as usize]) {
                x += 1;
                y += 1;
            }
            v[i] = x;
            if x as usize >= n && y as usize >= m {
                found = true;
                break 'search;
            }
            k += 2;
        }
    }
    debug_assert!(found, "an edit script of length n+m always exists");

    let mut ops_rev: Vec<EditOp> = Vec::with_capacity(max);
    let mut x = n as isize;
    let mut y = m as isize;
    for (d, round) in trace.iter().enumerate().rev() {
        if x == 0 && y == 0 {
            break;
        }
        let d = d as isize;
        let k = x - y;
        let i = (k + offset) as usize;
        let go_down = k == -d || (k != d && round[i - 1] < round[i + 1]);
        let prev_k = if go_down { k + 1 } else { k - 1 };
        let prev_x = round[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            ops_rev.push(EditOp::Equal);
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            ops_rev.push(if x == prev_x { EditOp::Insert } else { EditOp::Delete });
            x = prev_x;
            y = prev_y;
        }
    }
    ops_rev.reverse();
    ops_rev
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn equal_inputs_produce_only_equal_rows() {
        let rows = diff_rows(&lines(&["uno", "dos"]), &lines(&["uno", "dos"]));
        assert_eq!(rows, vec![DiffRow::Equal, DiffRow::Equal]);
    }

    #[test]
    fn whitespace_runs_do_not_make_lines_unequal() {
        let rows = diff_rows(&lines(&["uno   dos"]), &lines(&["uno dos"]));
        assert_eq!(rows, vec![DiffRow::Equal]);
    }

    #[test]
    fn a_replaced_word_yields_adjacent_old_and_new_spans() {
        let rows = diff_rows(&lines(&["the cat sat"]), &lines(&["the dog sat"]));
        assert_eq!(
            rows,
            vec![DiffRow::Changed {
                merged: "the <old#>cat<#old><new#>dog<#new> sat".to_string()
            }]
        );
    }

    #[test]
    fn unpaired_lines_become_whole_line_spans() {
        let rows = diff_rows(&lines(&["a", "b"]), &lines(&["a"]));
        assert_eq!(
            rows,
            vec![
                DiffRow::Equal,
                DiffRow::Changed { merged: "<old#>b<#old>".to_string() },
            ]
        );

        let rows = diff_rows(&lines(&["a"]), &lines(&["a", "c"]));
        assert_eq!(
            rows,
            vec![
                DiffRow::Equal,
                DiffRow::Changed { merged: "<new#>c<#new>".to_string() },
            ]
        );
    }

    #[test]
    fn tokenizer_alternates_word_and_whitespace_runs() {
        assert_eq!(tokenize("uno  dos tres"), vec!["uno", "  ", "dos", " ", "tres"]);
        assert!(tokenize("").is_empty());
    }
}
