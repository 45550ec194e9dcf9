//! Text renderings of an edit script.

use std::fmt::Write as _;

use colored::Colorize;

use super::myers::{diff_lines, Edit, Op};

/// Lines of unchanged context kept around each change.
pub const CONTEXT: usize = 3;

fn prefix(op: Op) -> char {
    match op {
        Op::Equal => ' ',
        Op::Delete => '-',
        Op::Insert => '+',
    }
}

fn script<'a>(from: &'a str, to: &'a str) -> Vec<Edit<'a>> {
    let a: Vec<&str> = from.lines().collect();
    let b: Vec<&str> = to.lines().collect();
    diff_lines(&a, &b)
}

fn range(start: usize, count: usize) -> String {
    match count {
        0 => format!("{},0", start.saturating_sub(1)),
        1 => start.to_string(),
        _ => format!("{start},{count}"),
    }
}

/// Renders a unified diff with `---`/`+++` headers and hunks carrying
/// [`CONTEXT`] lines of context. Returns an empty string when the texts
/// are line-equal.
#[must_use]
pub fn unified(from_label: &str, to_label: &str, from: &str, to: &str) -> String {
    let edits = script(from, to);
    let changes: Vec<usize> = edits
        .iter()
        .enumerate()
        .filter(|(_, e)| e.op != Op::Equal)
        .map(|(i, _)| i)
        .collect();
    if changes.is_empty() {
        return String::new();
    }

    // Half-open edit index ranges, merged when their context overlaps.
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for &i in &changes {
        let start = i.saturating_sub(CONTEXT);
        let end = (i + CONTEXT + 1).min(edits.len());
        match hunks.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => hunks.push((start, end)),
        }
    }

    // Lines of each side consumed before every edit index.
    let mut consumed = Vec::with_capacity(edits.len() + 1);
    let (mut a, mut b) = (0_usize, 0_usize);
    consumed.push((a, b));
    for e in &edits {
        match e.op {
            Op::Equal => {
                a += 1;
                b += 1;
            }
            Op::Delete => a += 1,
            Op::Insert => b += 1,
        }
        consumed.push((a, b));
    }

    let mut out = format!("--- {from_label}\n+++ {to_label}\n");
    for (start, end) in hunks {
        let (a0, b0) = consumed[start];
        let (a1, b1) = consumed[end];
        let _ = writeln!(out, "@@ -{} +{} @@", range(a0 + 1, a1 - a0), range(b0 + 1, b1 - b0));
        for e in &edits[start..end] {
            let _ = writeln!(out, "{}{}", prefix(e.op), e.line);
        }
    }
    out
}

/// Renders every line of both texts, marked `-`, `+` or ` `, under a
/// two-line `---`/`+++` header.
#[must_use]
pub fn simple(from_label: &str, to_label: &str, from: &str, to: &str) -> String {
    let mut out = format!("--- {from_label}\n+++ {to_label}\n");
    for e in script(from, to) {
        let _ = writeln!(out, "{}{}", prefix(e.op), e.line);
    }
    out
}

/// Colours removed lines red and added lines green. Other lines are left
/// as they are.
#[must_use]
pub fn colorize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        if line.starts_with('-') {
            let _ = writeln!(out, "{}", line.red());
        } else if line.starts_with('+') {
            let _ = writeln!(out, "{}", line.green());
        } else {
            let _ = writeln!(out, "{line}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(range: std::ops::RangeInclusive<u32>) -> String {
        range.map(|i| format!("line{i}\n")).collect()
    }

    #[test]
    fn equal_texts_render_nothing() {
        assert_eq!(unified("r", "l", "a\nb\n", "a\nb\n"), "");
    }

    #[test]
    fn unified_single_change_has_context() {
        let from = numbered(1..=10);
        let to = from.replace("line5\n", "LINE5\n");
        assert_eq!(
            unified("remote", "local", &from, &to),
            "--- remote\n+++ local\n@@ -2,7 +2,7 @@\n line2\n line3\n line4\n-line5\n+LINE5\n line6\n line7\n line8\n"
        );
    }

    #[test]
    fn distant_changes_form_separate_hunks() {
        let from = numbered(1..=20);
        let to = from.replace("line2\n", "X\n").replace("line18\n", "Y\n");
        let text = unified("r", "l", &from, &to);
        assert_eq!(text.matches("@@ -").count(), 2);
        assert!(text.contains("@@ -1,5 +1,5 @@\n"));
        assert!(text.contains("@@ -15,6 +15,6 @@\n"));
    }

    #[test]
    fn nearby_changes_share_a_hunk() {
        let from = numbered(1..=12);
        let to = from.replace("line3\n", "X\n").replace("line8\n", "Y\n");
        assert_eq!(unified("r", "l", &from, &to).matches("@@ -").count(), 1);
    }

    #[test]
    fn missing_remote_shows_every_line_added() {
        let text = unified("", "local.json", "", "{\n  \"a\": 1\n}\n");
        assert_eq!(text, "--- \n+++ local.json\n@@ -0,0 +1,3 @@\n+{\n+  \"a\": 1\n+}\n");
    }

    #[test]
    fn simple_keeps_all_lines() {
        let text = simple("r", "l", "a\nb\nc\n", "a\nB\nc\n");
        assert_eq!(text, "--- r\n+++ l\n a\n-b\n+B\n c\n");
    }

    #[test]
    fn colorize_touches_only_changed_lines() {
        colored::control::set_override(true);
        let text = colorize(" same\n-old\n+new\n");
        assert!(text.starts_with(" same\n"));
        assert!(text.contains("\u{1b}[31m-old\u{1b}[0m"));
        assert!(text.contains("\u{1b}[32m+new\u{1b}[0m"));
    }
}
