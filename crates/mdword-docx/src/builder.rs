//! Word document builder for the Markdown → DOCX direction.
//!
//! Each parsed [`Block`] appends one or more body elements to an
//! in-memory document. Styles and list numberings are registered once
//! at construction so headings, quotes and lists pick up consistent
//! formatting in Word.

use docx_rs::{
    AbstractNumbering, AlignmentType, Docx, IndentLevel, Level, LevelJc, LevelText, NumberFormat,
    Numbering, NumberingId, Paragraph, Pic, Run, RunFonts, Start, Style, StyleType, Table,
    TableCell, TableRow,
};
use mdword_core::inline::{parse_spans, InlineSpan};
use mdword_core::{Block, MdwordError, Result};
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::assets::AssetResolver;

/// Numbering id registered for unordered lists.
const BULLET_NUM_ID: usize = 1;
/// Numbering id registered for ordered lists.
const DECIMAL_NUM_ID: usize = 2;

/// Default display width for embedded images: 5 inches in EMU.
const IMAGE_WIDTH_EMU: u32 = 4_572_000;

/// Placeholder text color for unresolvable images (Word's dark red).
const PLACEHOLDER_COLOR: &str = "C00000";

/// Accumulates Markdown blocks into a Word document.
pub struct DocxBuilder {
    docx: Docx,
}

impl Default for DocxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocxBuilder {
    /// New empty document with heading, quote, caption and list
    /// numbering definitions registered.
    pub fn new() -> Self {
        let mut docx = Docx::new();

        for level in 1..=6u8 {
            let size = match level {
                1 => 32,
                2 => 28,
                3 => 26,
                _ => 24,
            };
            docx = docx.add_style(
                Style::new(format!("Heading{level}"), StyleType::Paragraph)
                    .name(format!("Heading {level}"))
                    .bold()
                    .size(size),
            );
        }
        docx = docx.add_style(
            Style::new("Quote", StyleType::Paragraph)
                .name("Quote")
                .italic()
                .color("666666"),
        );
        docx = docx.add_style(
            Style::new("Caption", StyleType::Paragraph)
                .name("Caption")
                .italic()
                .size(18),
        );

        docx = docx
            .add_abstract_numbering(bullet_numbering())
            .add_abstract_numbering(decimal_numbering())
            .add_numbering(Numbering::new(BULLET_NUM_ID, BULLET_NUM_ID))
            .add_numbering(Numbering::new(DECIMAL_NUM_ID, DECIMAL_NUM_ID));

        Self { docx }
    }

    /// Append one block to the document body.
    pub fn append(&mut self, block: &Block, resolver: &AssetResolver) {
        match block {
            Block::Blank => self.push_paragraph(Paragraph::new()),
            Block::Heading { level, text } => {
                let level = (*level).clamp(1, 6);
                let para = runs_into_paragraph(text).style(&format!("Heading{level}"));
                self.push_paragraph(para);
            }
            Block::Paragraph(text) => self.push_paragraph(runs_into_paragraph(text)),
            Block::ListItem {
                ordered,
                indent,
                text,
            } => {
                let num_id = if *ordered { DECIMAL_NUM_ID } else { BULLET_NUM_ID };
                let ilvl = (*indent).min(2);
                let para = runs_into_paragraph(text)
                    .numbering(NumberingId::new(num_id), IndentLevel::new(ilvl));
                self.push_paragraph(para);
            }
            Block::Quote(text) => self.push_paragraph(runs_into_paragraph(text).style("Quote")),
            Block::Table { headers, rows } => self.append_table(headers, rows),
            Block::Image { alt, path, .. } => self.append_image(alt, path, resolver),
        }
    }

    fn append_table(&mut self, headers: &[String], rows: &[Vec<String>]) {
        let mut table_rows = Vec::with_capacity(rows.len() + 1);

        let header_cells = headers
            .iter()
            .map(|text| {
                TableCell::new()
                    .add_paragraph(Paragraph::new().add_run(Run::new().add_text(text).bold()))
            })
            .collect();
        table_rows.push(TableRow::new(header_cells));

        for row in rows {
            let cells = (0..headers.len())
                .map(|i| {
                    let text = row.get(i).map(String::as_str).unwrap_or("");
                    TableCell::new().add_paragraph(runs_into_paragraph(text))
                })
                .collect();
            table_rows.push(TableRow::new(cells));
        }

        self.docx = std::mem::take(&mut self.docx).add_table(Table::new(table_rows));
    }

    /// Embed an image, or a visible placeholder when it cannot be read.
    fn append_image(&mut self, alt: &str, reference: &str, resolver: &AssetResolver) {
        let Some(local) = resolver.resolve(reference) else {
            self.push_placeholder(reference);
            return;
        };
        let bytes = match fs::read(&local) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("failed to read image {}: {e}", local.display());
                self.push_placeholder(reference);
                return;
            }
        };

        let mut pic = Pic::new(&bytes);
        if let Ok((width, height)) = image::image_dimensions(&local) {
            if width > 0 {
                let scaled_height =
                    (IMAGE_WIDTH_EMU as u64 * height as u64 / width as u64) as u32;
                pic = pic.size(IMAGE_WIDTH_EMU, scaled_height);
            }
        }
        self.push_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_image(pic))
                .align(AlignmentType::Center),
        );

        if !alt.is_empty() {
            self.push_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(alt))
                    .style("Caption")
                    .align(AlignmentType::Center),
            );
        }
    }

    fn push_placeholder(&mut self, reference: &str) {
        log::warn!("unresolvable image reference: {reference}");
        self.push_paragraph(Paragraph::new().add_run(
            Run::new()
                .add_text(format!("[image not found] {reference}"))
                .bold()
                .color(PLACEHOLDER_COLOR),
        ));
    }

    fn push_paragraph(&mut self, para: Paragraph) {
        self.docx = std::mem::take(&mut self.docx).add_paragraph(para);
    }

    /// Serialize the document to DOCX bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.docx
            .build()
            .pack(&mut cursor)
            .map_err(|e| MdwordError::Conversion(format!("failed to pack document: {e}")))?;
        Ok(cursor.into_inner())
    }

    /// Serialize and write the document to `path`.
    pub fn save(self, path: &Path) -> Result<()> {
        let bytes = self.into_bytes()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, bytes)?;
        Ok(())
    }
}

/// Timestamped default output filename.
pub fn default_output_name() -> String {
    format!(
        "converted_document_{}.docx",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Map a block's text into a paragraph of styled runs.
fn runs_into_paragraph(text: &str) -> Paragraph {
    let mut para = Paragraph::new();
    for span in parse_spans(text) {
        let run = match span {
            InlineSpan::Plain(s) => Run::new().add_text(s),
            InlineSpan::Bold(s) => Run::new().add_text(s).bold(),
            InlineSpan::Italic(s) => Run::new().add_text(s).italic(),
            InlineSpan::Code(s) => Run::new()
                .add_text(s)
                .fonts(RunFonts::new().ascii("Courier New")),
        };
        para = para.add_run(run);
    }
    para
}

fn bullet_numbering() -> AbstractNumbering {
    let mut abs = AbstractNumbering::new(BULLET_NUM_ID);
    for ilvl in 0..3usize {
        abs = abs.add_level(Level::new(
            ilvl,
            Start::new(1),
            NumberFormat::new("bullet"),
            LevelText::new("•"),
            LevelJc::new("left"),
        ));
    }
    abs
}

fn decimal_numbering() -> AbstractNumbering {
    let mut abs = AbstractNumbering::new(DECIMAL_NUM_ID);
    for ilvl in 0..3usize {
        abs = abs.add_level(Level::new(
            ilvl,
            Start::new(1),
            NumberFormat::new("decimal"),
            LevelText::new(format!("%{}.", ilvl + 1)),
            LevelJc::new("left"),
        ));
    }
    abs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn document_xml(bytes: &[u8]) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("word/document.xml").unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        content
    }

    fn build(blocks: &[Block]) -> Vec<u8> {
        let dir = TempDir::new().unwrap();
        let resolver = AssetResolver::new(dir.path());
        let mut builder = DocxBuilder::new();
        for block in blocks {
            builder.append(block, &resolver);
        }
        builder.into_bytes().unwrap()
    }

    #[test]
    fn test_heading_uses_style() {
        let xml = document_xml(&build(&[Block::Heading {
            level: 2,
            text: "Overview".to_string(),
        }]));
        assert!(xml.contains("Heading2"));
        assert!(xml.contains("Overview"));
    }

    #[test]
    fn test_heading_level_clamped() {
        let xml = document_xml(&build(&[Block::Heading {
            level: 9,
            text: "Deep".to_string(),
        }]));
        assert!(xml.contains("Heading6"));
    }

    #[test]
    fn test_list_items_use_registered_numberings() {
        let xml = document_xml(&build(&[
            Block::ListItem {
                ordered: false,
                indent: 0,
                text: "first".to_string(),
            },
            Block::ListItem {
                ordered: true,
                indent: 0,
                text: "second".to_string(),
            },
        ]));
        assert!(xml.contains("first"));
        assert!(xml.contains("second"));
        assert!(xml.contains("w:numId"));
    }

    #[test]
    fn test_table_includes_all_cells() {
        let xml = document_xml(&build(&[Block::Table {
            headers: vec!["Name".to_string(), "Role".to_string()],
            rows: vec![vec!["ada".to_string(), "engineer".to_string()]],
        }]));
        for text in ["Name", "Role", "ada", "engineer"] {
            assert!(xml.contains(text), "missing {text}");
        }
        assert!(xml.contains("<w:tbl>"));
    }

    #[test]
    fn test_short_row_padded_to_header_width() {
        let xml = document_xml(&build(&[Block::Table {
            headers: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            rows: vec![vec!["only".to_string()]],
        }]));
        assert!(xml.contains("only"));
    }

    #[test]
    fn test_missing_image_becomes_placeholder() {
        let xml = document_xml(&build(&[Block::Image {
            alt: "chart".to_string(),
            path: "missing.png".to_string(),
            title: None,
        }]));
        assert!(xml.contains("[image not found] missing.png"));
        assert!(xml.contains(PLACEHOLDER_COLOR));
    }

    #[test]
    fn test_inline_emphasis_maps_to_run_properties() {
        let xml = document_xml(&build(&[Block::paragraph("plain **bold** *italic* `code`")]));
        // Markers are consumed; the span texts become separate runs.
        assert!(!xml.contains("**"));
        for text in ["plain", "bold", "italic", "code"] {
            assert!(xml.contains(text), "missing {text}");
        }
        assert!(xml.contains("Courier New"));
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let resolver = AssetResolver::new(dir.path());
        let mut builder = DocxBuilder::new();
        builder.append(&Block::paragraph("hello"), &resolver);

        let target = dir.path().join("nested/out.docx");
        builder.save(&target).unwrap();
        assert!(target.is_file());
    }

    #[test]
    fn test_default_output_name_shape() {
        let name = default_output_name();
        assert!(name.starts_with("converted_document_"));
        assert!(name.ends_with(".docx"));
    }
}
