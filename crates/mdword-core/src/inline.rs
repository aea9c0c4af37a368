//! Inline span formatter, shared by both conversion directions.
//!
//! Forward: [`parse_spans`] splits a block's text on top-level matches
//! of bold, italic, and monospace spans — left-to-right,
//! non-overlapping, non-nested — so the builder can map each span to
//! run attributes. Reverse: [`format_run`] wraps a run's text back in
//! the corresponding Markdown markers.

use once_cell::sync::Lazy;
use regex::Regex;

/// Top-level inline spans, in preference order: bold before italic so
/// `**x**` never parses as an italic. Bodies must be non-empty, so a
/// bare `**` or `` ` `` is not a span and stays plain.
static SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*.+?\*\*|\*.+?\*|`.+?`").expect("valid regex"));

/// One inline span of a block's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineSpan {
    Plain(String),
    Bold(String),
    Italic(String),
    Code(String),
}

/// Split text into inline spans.
///
/// Unmatched marker characters stay in plain text; nesting is not
/// interpreted.
pub fn parse_spans(text: &str) -> Vec<InlineSpan> {
    let mut spans = Vec::new();
    let mut last = 0;

    for m in SPAN.find_iter(text) {
        if m.start() > last {
            spans.push(InlineSpan::Plain(text[last..m.start()].to_string()));
        }
        let piece = m.as_str();
        if let Some(inner) = piece
            .strip_prefix("**")
            .and_then(|p| p.strip_suffix("**"))
        {
            spans.push(InlineSpan::Bold(inner.to_string()));
        } else if let Some(inner) = piece.strip_prefix('`').and_then(|p| p.strip_suffix('`')) {
            spans.push(InlineSpan::Code(inner.to_string()));
        } else if let Some(inner) = piece.strip_prefix('*').and_then(|p| p.strip_suffix('*')) {
            spans.push(InlineSpan::Italic(inner.to_string()));
        } else {
            spans.push(InlineSpan::Plain(piece.to_string()));
        }
        last = m.end();
    }

    if last < text.len() {
        spans.push(InlineSpan::Plain(text[last..].to_string()));
    }

    spans
}

/// Render one rich-text run back into Markdown.
///
/// Bold+italic nests as `***text***`; monospace wins over emphasis
/// (a monospace run is emitted as code regardless of other flags).
pub fn format_run(text: &str, bold: bool, italic: bool, mono: bool) -> String {
    if text.is_empty() {
        return String::new();
    }
    if mono {
        return format!("`{text}`");
    }
    match (bold, italic) {
        (true, true) => format!("***{text}***"),
        (true, false) => format!("**{text}**"),
        (false, true) => format!("*{text}*"),
        (false, false) => text.to_string(),
    }
}
