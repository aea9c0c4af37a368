//! Line-oriented Markdown scanner.
//!
//! A single forward scan over the source lines with one line of
//! lookahead (table detection). Each line or block is classified into
//! a [`Block`]; anything unrecognized falls through to a paragraph, so
//! parsing never fails on malformed input.

use crate::block::Block;
use once_cell::sync::Lazy;
use regex::Regex;

/// Whole-line image syntax: `![alt](path)` or `![alt](path "title")`.
static IMAGE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^!\[(.*?)\]\(([^)\s]+)(?:\s+"(.*?)")?\)$"#).expect("valid regex"));

/// Ordered list marker: `1. `, `23. `, ...
static ORDERED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\. ").expect("valid regex"));

/// One cell of a table separator row: `---`, `:---`, `---:`, `:---:`.
static SEPARATOR_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:?-{3,}:?$").expect("valid regex"));

/// Parse Markdown source into an ordered sequence of blocks.
///
/// Dispatch order per line: blank, image, table (with lookahead),
/// fence, then single-line classification (heading / list / quote /
/// paragraph). A table is only entered when the *next* line is a valid
/// separator row; a data row whose cell count differs from the header
/// terminates the table and is re-processed from the top of the loop,
/// not skipped.
pub fn parse(markdown: &str) -> Vec<Block> {
    let lines: Vec<&str> = markdown
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();

        if line.is_empty() {
            blocks.push(Block::Blank);
            i += 1;
            continue;
        }

        // Image must be checked before generic paragraph handling.
        if let Some(caps) = IMAGE_LINE.captures(line) {
            blocks.push(Block::Image {
                alt: caps[1].to_string(),
                path: caps[2].to_string(),
                title: caps.get(3).map(|m| m.as_str().to_string()),
            });
            i += 1;
            continue;
        }

        if let Some((table, next)) = try_consume_table(&lines, i) {
            blocks.push(table);
            i = next;
            continue;
        }

        // Fenced mode: every line until the closing fence is emitted as
        // a plain paragraph. The fence itself is dropped — code blocks
        // are deliberately flattened (known fidelity limitation).
        if line.starts_with("```") {
            i += 1;
            while i < lines.len() && !lines[i].trim().starts_with("```") {
                blocks.push(Block::Paragraph(lines[i].to_string()));
                i += 1;
            }
            i += 1; // closing fence (or end of input)
            continue;
        }

        blocks.push(classify_line(lines[i]));
        i += 1;
    }

    blocks
}

/// Classify a single non-table, non-image, non-fence line.
fn classify_line(raw: &str) -> Block {
    let line = raw.trim();

    // Headings require exactly one space after the marker; "##Title"
    // falls through to a paragraph.
    for level in 1..=4u8 {
        let marker = "#".repeat(level as usize);
        if let Some(rest) = line.strip_prefix(&format!("{marker} ")) {
            return Block::Heading {
                level,
                text: rest.to_string(),
            };
        }
    }

    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Block::ListItem {
            ordered: false,
            indent: indent_level(raw),
            text: rest.to_string(),
        };
    }

    if ORDERED_MARKER.is_match(line) {
        return Block::ListItem {
            ordered: true,
            indent: indent_level(raw),
            text: ORDERED_MARKER.replace(line, "").to_string(),
        };
    }

    if let Some(rest) = line.strip_prefix("> ") {
        return Block::Quote(rest.to_string());
    }

    Block::Paragraph(line.to_string())
}

/// Indentation level of a raw list line, at two spaces per level.
///
/// This mirrors the extractor's own indentation convention so that
/// extracted lists survive a re-parse; forward parsing does not
/// interpret depth beyond carrying it along.
fn indent_level(raw: &str) -> usize {
    let spaces = raw.len() - raw.trim_start_matches(' ').len();
    spaces / 2
}

/// Try to consume a table starting at `lines[start]`.
///
/// Returns the consumed [`Block::Table`] plus the index of the first
/// line *after* the table, or `None` when `lines[start]` does not open
/// a table. Data rows are consumed greedily only while their cell
/// count matches the header's; the first mismatching or
/// non-`|`-prefixed row is left for the caller to re-process.
fn try_consume_table(lines: &[&str], start: usize) -> Option<(Block, usize)> {
    let header = lines[start].trim();
    if !is_table_row(header) {
        return None;
    }
    let separator = lines.get(start + 1)?.trim();
    if !is_separator_row(separator) {
        return None;
    }

    let headers = split_cells(header);
    let mut rows = Vec::new();
    let mut i = start + 2;
    while i < lines.len() {
        let line = lines[i].trim();
        if !is_table_row(line) {
            break;
        }
        let cells = split_cells(line);
        if cells.len() != headers.len() {
            break;
        }
        rows.push(cells);
        i += 1;
    }

    Some((Block::Table { headers, rows }, i))
}

/// A table row starts with `|` and contains at least one interior `|`.
#[inline]
fn is_table_row(line: &str) -> bool {
    line.starts_with('|') && line[1..].contains('|')
}

/// Split a `|`-delimited row into trimmed cell texts, dropping the
/// empty fragments before the leading and after the trailing pipe.
fn split_cells(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 2 {
        return Vec::new();
    }
    parts[1..parts.len() - 1]
        .iter()
        .map(|c| c.trim().to_string())
        .collect()
}

/// A separator row has only cells matching `^:?-{3,}:?$`.
fn is_separator_row(line: &str) -> bool {
    if !is_table_row(line) {
        return false;
    }
    let cells = split_cells(line);
    !cells.is_empty() && cells.iter().all(|c| SEPARATOR_CELL.is_match(c))
}
