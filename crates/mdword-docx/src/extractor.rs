//! DOCX → Markdown extraction.
//!
//! Reading is a manual walk: open the archive with `zip`, then stream
//! `word/document.xml` with quick-xml, tracking position flags and
//! builders as elements open and close. This keeps document order and
//! lets us read exactly the parts Markdown can express. Relationships,
//! styles and numbering definitions are parsed up front; embedded
//! images are externalized into a media directory as they are
//! encountered.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use mdword_core::inline::format_run;
use mdword_core::{MdwordError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::numbering::{parse_numbering_xml, ListCounters, NumberingDefinitions};

/// Heading style detection: matches "heading 1" / "Heading2" style
/// names and ids after lowercasing.
static HEADING_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"heading\s*([1-9])").expect("valid regex"));

/// Extract a Word document on disk to Markdown.
///
/// Embedded images are written under `media_dir` and referenced as
/// `media/<name>` in the output.
pub fn extract_file(path: &Path, media_dir: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(MdwordError::SourceNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    extract_markdown(&bytes, media_dir)
}

/// Extract DOCX bytes to Markdown.
pub fn extract_markdown(bytes: &[u8], media_dir: &Path) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| MdwordError::Extraction(format!("not a DOCX archive: {e}")))?;

    let relationships = parse_relationships(&mut archive)?;
    let numbering = parse_numbering_xml(&mut archive);
    let styles = parse_styles_xml(&mut archive)?;

    let xml_content = {
        let mut document_xml = archive
            .by_name("word/document.xml")
            .map_err(|e| MdwordError::Extraction(format!("missing word/document.xml: {e}")))?;
        let mut content = String::new();
        document_xml.read_to_string(&mut content)?;
        content
    };

    let fragments = walk_body(
        &xml_content,
        &styles,
        &relationships,
        &numbering,
        media_dir,
        &mut archive,
    )?;

    Ok(fragments.join("\n\n"))
}

/// Parse `word/_rels/document.xml.rels` into rId → target mappings.
fn parse_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<HashMap<String, String>> {
    let xml_content = {
        let Ok(mut rels_file) = archive.by_name("word/_rels/document.xml.rels") else {
            return Ok(HashMap::new());
        };
        let mut content = String::new();
        rels_file.read_to_string(&mut content)?;
        content
    };

    let mut relationships = HashMap::new();
    let mut reader = Reader::from_str(&xml_content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e) | Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                let id = get_attr(&e, b"Id");
                let target = get_attr(&e, b"Target");
                if let (Some(id), Some(target)) = (id, target) {
                    relationships.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MdwordError::Extraction(format!(
                    "error parsing relationships: {e}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// Parse `word/styles.xml` into styleId → lowercased style name.
fn parse_styles_xml<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<HashMap<String, String>> {
    let mut styles_map = HashMap::new();

    let Ok(mut styles_xml) = archive.by_name("word/styles.xml") else {
        return Ok(styles_map);
    };
    let mut xml_content = String::new();
    styles_xml.read_to_string(&mut xml_content)?;
    drop(styles_xml);

    let mut reader = Reader::from_str(&xml_content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut current_style_id: Option<String> = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:style" => {
                current_style_id = get_attr(&e, b"w:styleId");
            }
            Ok(Event::Start(e) | Event::Empty(e)) if e.name().as_ref() == b"w:name" => {
                if let (Some(id), Some(name)) = (current_style_id.as_ref(), get_attr(&e, b"w:val"))
                {
                    styles_map.insert(id.clone(), name.to_lowercase());
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:style" => {
                current_style_id = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MdwordError::Extraction(format!(
                    "error parsing styles.xml: {e}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(styles_map)
}

/// One paragraph being accumulated during the walk.
#[derive(Default)]
struct ParagraphBuilder {
    style_id: Option<String>,
    num_id: Option<i32>,
    ilvl: Option<i32>,
    /// First image relationship seen in this paragraph, if any.
    image_rel: Option<String>,
    /// Formatted run texts, joined on paragraph end.
    runs: Vec<String>,
}

impl ParagraphBuilder {
    fn text(&self) -> String {
        self.runs.concat()
    }
}

/// One table cell with its merge attributes.
#[derive(Default, Clone)]
struct CellInfo {
    text: String,
    grid_span: usize,
    /// `Some(true)` restarts a vertical merge, `Some(false)` continues
    /// the one above.
    v_merge: Option<bool>,
}

/// All state for one pass over `word/document.xml`.
///
/// Position flags mirror the element nesting; builders accumulate the
/// current paragraph, row and cell. Finished fragments are complete
/// Markdown blocks.
struct WalkState<'a> {
    styles: &'a HashMap<String, String>,
    relationships: &'a HashMap<String, String>,
    numbering: &'a NumberingDefinitions,
    media_dir: &'a Path,

    fragments: Vec<String>,

    in_body: bool,
    in_table: bool,
    in_table_row: bool,
    in_table_cell: bool,
    in_run: bool,
    in_run_props: bool,
    in_text: bool,
    in_drawing: bool,

    current_paragraph: Option<ParagraphBuilder>,
    current_table: Vec<Vec<CellInfo>>,
    current_row: Vec<CellInfo>,
    current_cell: Option<CellInfo>,

    run_text: String,
    has_bold: bool,
    has_italic: bool,
    has_mono: bool,

    drawing_rel_id: Option<String>,
    list_counters: ListCounters,
    image_seq: usize,
}

impl<'a> WalkState<'a> {
    fn new(
        styles: &'a HashMap<String, String>,
        relationships: &'a HashMap<String, String>,
        numbering: &'a NumberingDefinitions,
        media_dir: &'a Path,
    ) -> Self {
        Self {
            styles,
            relationships,
            numbering,
            media_dir,
            fragments: Vec::new(),
            in_body: false,
            in_table: false,
            in_table_row: false,
            in_table_cell: false,
            in_run: false,
            in_run_props: false,
            in_text: false,
            in_drawing: false,
            current_paragraph: None,
            current_table: Vec::new(),
            current_row: Vec::new(),
            current_cell: None,
            run_text: String::new(),
            has_bold: false,
            has_italic: false,
            has_mono: false,
            drawing_rel_id: None,
            list_counters: ListCounters::new(),
            image_seq: 0,
        }
    }

    fn handle_start_element(&mut self, e: &quick_xml::events::BytesStart<'_>) {
        match e.name().as_ref() {
            b"w:body" => self.in_body = true,
            b"w:tbl" if self.in_body && !self.in_table => {
                self.in_table = true;
                self.current_table.clear();
            }
            b"w:tr" if self.in_table && !self.in_table_row => {
                self.in_table_row = true;
                self.current_row.clear();
            }
            b"w:tc" if self.in_table_row && !self.in_table_cell => {
                self.in_table_cell = true;
                self.current_cell = Some(CellInfo::default());
            }
            b"w:p" if self.in_table_cell => {}
            b"w:p" if self.in_body && !self.in_table => {
                self.current_paragraph = Some(ParagraphBuilder::default());
            }
            b"w:r" if self.in_table_cell || self.current_paragraph.is_some() => {
                self.in_run = true;
                self.run_text.clear();
                self.has_bold = false;
                self.has_italic = false;
                self.has_mono = false;
            }
            b"w:rPr" if self.in_run => self.in_run_props = true,
            b"w:t" if self.in_run => self.in_text = true,
            b"w:drawing" if self.in_run && !self.in_table_cell => {
                self.in_drawing = true;
                self.drawing_rel_id = None;
            }
            _ => self.handle_attr_element(e),
        }
    }

    /// Attribute-carrying elements that appear as either Start or
    /// Empty events depending on the producer.
    fn handle_attr_element(&mut self, e: &quick_xml::events::BytesStart<'_>) {
        match e.name().as_ref() {
            b"w:pStyle" => {
                if let (Some(para), Some(style_id)) =
                    (self.current_paragraph.as_mut(), get_attr(e, b"w:val"))
                {
                    para.style_id = Some(style_id);
                }
            }
            b"w:numId" => {
                if let (Some(para), Some(num_id)) =
                    (self.current_paragraph.as_mut(), get_attr_i32(e, b"w:val"))
                {
                    para.num_id = Some(num_id);
                }
            }
            b"w:ilvl" => {
                if let (Some(para), Some(ilvl)) =
                    (self.current_paragraph.as_mut(), get_attr_i32(e, b"w:val"))
                {
                    para.ilvl = Some(ilvl);
                }
            }
            b"w:gridSpan" if self.in_table_cell => {
                if let (Some(cell), Some(span)) =
                    (self.current_cell.as_mut(), get_attr_usize(e, b"w:val"))
                {
                    cell.grid_span = span;
                }
            }
            b"w:vMerge" if self.in_table_cell => {
                if let Some(cell) = self.current_cell.as_mut() {
                    // Absent w:val also means "continue".
                    cell.v_merge = Some(get_attr(e, b"w:val").as_deref() == Some("restart"));
                }
            }
            b"w:b" | b"w:bCs" if self.in_run_props => {
                if !check_val_off(e) {
                    self.has_bold = true;
                }
            }
            b"w:i" | b"w:iCs" if self.in_run_props => {
                if !check_val_off(e) {
                    self.has_italic = true;
                }
            }
            b"w:rFonts" if self.in_run_props => {
                if let Some(font) = get_attr(e, b"w:ascii") {
                    if font.to_lowercase().contains("courier") {
                        self.has_mono = true;
                    }
                }
            }
            b"w:br" if self.in_run && !self.in_drawing => {
                self.run_text.push('\n');
            }
            b"a:blip" if self.in_drawing => {
                // First image per paragraph wins.
                if self.drawing_rel_id.is_none() {
                    self.drawing_rel_id = get_attr(e, b"r:embed");
                }
            }
            _ => {}
        }
    }

    fn handle_end_element<R: Read + Seek>(
        &mut self,
        e: &quick_xml::events::BytesEnd<'_>,
        archive: &mut ZipArchive<R>,
    ) {
        match e.name().as_ref() {
            b"w:tbl" if self.in_table => self.handle_table_end(),
            b"w:tr" if self.in_table_row => {
                self.in_table_row = false;
                self.current_table.push(std::mem::take(&mut self.current_row));
            }
            b"w:tc" if self.in_table_cell => {
                self.in_table_cell = false;
                if let Some(cell) = self.current_cell.take() {
                    self.current_row.push(cell);
                }
            }
            b"w:p" if self.in_table_cell => {
                // Paragraph boundary inside a cell collapses to a space.
                if let Some(cell) = self.current_cell.as_mut() {
                    cell.text.push(' ');
                }
            }
            b"w:p" if self.current_paragraph.is_some() => self.handle_paragraph_end(archive),
            b"w:r" if self.in_run => self.handle_run_end(),
            b"w:rPr" if self.in_run_props => self.in_run_props = false,
            b"w:t" if self.in_text => self.in_text = false,
            b"w:drawing" if self.in_drawing => self.handle_drawing_end(),
            b"w:body" => self.in_body = false,
            _ => {}
        }
    }

    /// The surrounding paragraph claims the drawing's image when the
    /// drawing closes; only the first image per paragraph is kept.
    fn handle_drawing_end(&mut self) {
        self.in_drawing = false;
        if let (Some(rel_id), Some(para)) =
            (self.drawing_rel_id.take(), self.current_paragraph.as_mut())
        {
            if para.image_rel.is_none() {
                para.image_rel = Some(rel_id);
            }
        }
    }

    fn handle_text(&mut self, text: &str) {
        if self.in_text {
            self.run_text.push_str(text);
        }
    }

    fn handle_run_end(&mut self) {
        self.in_run = false;
        let formatted = format_run(&self.run_text, self.has_bold, self.has_italic, self.has_mono);
        if formatted.is_empty() {
            return;
        }
        if self.in_table_cell {
            if let Some(cell) = self.current_cell.as_mut() {
                cell.text.push_str(&formatted);
            }
        } else if let Some(para) = self.current_paragraph.as_mut() {
            para.runs.push(formatted);
        }
    }

    /// Render the finished paragraph into a Markdown fragment.
    fn handle_paragraph_end<R: Read + Seek>(&mut self, archive: &mut ZipArchive<R>) {
        let Some(para) = self.current_paragraph.take() else {
            return;
        };

        // An image-bearing paragraph renders only the image.
        if let Some(ref rel_id) = para.image_rel {
            if let Some(fragment) = self.externalize_image(rel_id, archive) {
                self.fragments.push(fragment);
            }
            return;
        }

        let text = para.text();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        let flattened = trimmed.replace('\n', " ");

        if let Some(level) = self.heading_level(para.style_id.as_deref()) {
            self.fragments.push(format!("{} {flattened}", "#".repeat(level)));
            return;
        }

        if let Some(num_id) = para.num_id {
            let ilvl = para.ilvl.unwrap_or(0);
            let indent = " ".repeat(2 * ilvl.max(0) as usize);
            let marker = if self.is_ordered(num_id, ilvl) {
                format!("{}. ", self.list_counters.next(num_id, ilvl))
            } else {
                "- ".to_string()
            };
            self.fragments.push(format!("{indent}{marker}{flattened}"));
            return;
        }

        if self.is_quote(para.style_id.as_deref()) {
            self.fragments.push(format!("> {flattened}"));
            return;
        }

        self.fragments.push(flattened);
    }

    fn handle_table_end(&mut self) {
        self.in_table = false;
        let rows = std::mem::take(&mut self.current_table);
        if let Some(fragment) = render_table(&rows) {
            self.fragments.push(fragment);
        }
    }

    /// Heading level from the paragraph style, via the style name when
    /// known and the raw style id otherwise.
    fn heading_level(&self, style_id: Option<&str>) -> Option<usize> {
        let style_id = style_id?;
        let candidate = self
            .styles
            .get(style_id)
            .cloned()
            .unwrap_or_else(|| style_id.to_lowercase());
        let caps = HEADING_STYLE.captures(&candidate)?;
        let level: usize = caps[1].parse().ok()?;
        Some(level.clamp(1, 6))
    }

    fn is_quote(&self, style_id: Option<&str>) -> bool {
        let Some(style_id) = style_id else {
            return false;
        };
        let candidate = self
            .styles
            .get(style_id)
            .cloned()
            .unwrap_or_else(|| style_id.to_lowercase());
        candidate.contains("quote")
    }

    /// Ordered vs. unordered for one list paragraph. Prefers the
    /// document's own numbering definitions; when those are missing,
    /// numId 1 is conventionally the bullet list.
    fn is_ordered(&self, num_id: i32, ilvl: i32) -> bool {
        match self.numbering.is_numbered(num_id, ilvl) {
            Some(numbered) => numbered,
            None => num_id != 1,
        }
    }

    /// Write an embedded image into the media directory and return its
    /// Markdown reference.
    fn externalize_image<R: Read + Seek>(
        &mut self,
        rel_id: &str,
        archive: &mut ZipArchive<R>,
    ) -> Option<String> {
        let target = self.relationships.get(rel_id)?;
        let entry_name = format!("word/{}", target.trim_start_matches('/'));

        let bytes = {
            let mut entry = match archive.by_name(&entry_name) {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("missing embedded image {entry_name}: {e}");
                    return None;
                }
            };
            let mut bytes = Vec::new();
            if let Err(e) = entry.read_to_end(&mut bytes) {
                log::warn!("failed to read embedded image {entry_name}: {e}");
                return None;
            }
            bytes
        };

        let ext = Path::new(target)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("png")
            .to_lowercase();
        let path = match self.unique_image_path(&ext) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("failed to prepare media directory: {e}");
                return None;
            }
        };
        if let Err(e) = fs::write(&path, bytes) {
            log::warn!("failed to write image {}: {e}", path.display());
            return None;
        }

        let name = path.file_name()?.to_string_lossy().to_string();
        let stem = path.file_stem()?.to_string_lossy().to_string();
        Some(format!("![{stem}](media/{name})"))
    }

    /// Timestamped image filename, disambiguated by a sequence counter
    /// within one extraction run.
    fn unique_image_path(&mut self, ext: &str) -> std::io::Result<PathBuf> {
        fs::create_dir_all(self.media_dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        loop {
            let name = if self.image_seq == 0 {
                format!("image_{stamp}.{ext}")
            } else {
                format!("image_{stamp}_{}.{ext}", self.image_seq)
            };
            self.image_seq += 1;
            let path = self.media_dir.join(name);
            if !path.exists() {
                return Ok(path);
            }
        }
    }
}

/// Walk `word/document.xml` and return finished Markdown fragments.
fn walk_body<R: Read + Seek>(
    xml_content: &str,
    styles: &HashMap<String, String>,
    relationships: &HashMap<String, String>,
    numbering: &NumberingDefinitions,
    media_dir: &Path,
    archive: &mut ZipArchive<R>,
) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml_content);
    let mut state = WalkState::new(styles, relationships, numbering, media_dir);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => state.handle_start_element(e),
            Ok(Event::Empty(ref e)) => state.handle_attr_element(e),
            Ok(Event::End(ref e)) => state.handle_end_element(e, archive),
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| MdwordError::Extraction(format!("bad text content: {e}")))?;
                state.handle_text(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(MdwordError::Extraction(format!(
                    "error parsing document.xml: {e}"
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(state.fragments)
}

/// Render accumulated table cells as a GFM table with merge hints.
fn render_table(rows: &[Vec<CellInfo>]) -> Option<String> {
    let header = rows.first()?;
    if header.is_empty() {
        return None;
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render_row(header, header.len()));
    lines.push(format!("|{}", " --- |".repeat(header.len())));
    for row in &rows[1..] {
        lines.push(render_row(row, header.len()));
    }
    Some(lines.join("\n"))
}

fn render_row(cells: &[CellInfo], width: usize) -> String {
    let mut line = String::from("|");
    for i in 0..width {
        let rendered = cells.get(i).map(render_cell).unwrap_or_default();
        line.push_str(&format!(" {rendered} |"));
    }
    line
}

/// One cell's Markdown text: whitespace collapsed, pipes escaped,
/// merge hints appended.
fn render_cell(cell: &CellInfo) -> String {
    let mut text = collapse_ws(&cell.text).replace('|', "\\|");
    if cell.grid_span > 1 {
        text.push_str(&format!(" <colspan={}>", cell.grid_span));
    }
    match cell.v_merge {
        Some(true) => text.push_str(" <rowspan=start>"),
        Some(false) => text.push_str(" <rowspan=continue>"),
        None => {}
    }
    text.trim().to_string()
}

fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn get_attr(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

fn get_attr_i32(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<i32> {
    get_attr(e, key)?.parse().ok()
}

fn get_attr_usize(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<usize> {
    get_attr(e, key)?.parse().ok()
}

/// Whether a toggle property is explicitly switched off
/// (`w:val="false"` or `w:val="0"`).
fn check_val_off(e: &quick_xml::events::BytesStart<'_>) -> bool {
    matches!(
        get_attr(e, b"w:val").as_deref(),
        Some("false") | Some("0") | Some("none")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_ws() {
        assert_eq!(collapse_ws("  a \n b\t c "), "a b c");
        assert_eq!(collapse_ws(""), "");
    }

    #[test]
    fn test_render_cell_hints() {
        let plain = CellInfo {
            text: "v".to_string(),
            grid_span: 0,
            v_merge: None,
        };
        assert_eq!(render_cell(&plain), "v");

        let spanned = CellInfo {
            text: "wide".to_string(),
            grid_span: 3,
            v_merge: None,
        };
        assert_eq!(render_cell(&spanned), "wide <colspan=3>");

        let merged = CellInfo {
            text: "tall".to_string(),
            grid_span: 0,
            v_merge: Some(true),
        };
        assert_eq!(render_cell(&merged), "tall <rowspan=start>");

        let continued = CellInfo {
            text: String::new(),
            grid_span: 0,
            v_merge: Some(false),
        };
        assert_eq!(render_cell(&continued), "<rowspan=continue>");
    }

    #[test]
    fn test_render_cell_escapes_pipes() {
        let cell = CellInfo {
            text: "a|b".to_string(),
            grid_span: 0,
            v_merge: None,
        };
        assert_eq!(render_cell(&cell), "a\\|b");
    }

    #[test]
    fn test_render_table_shape() {
        let rows = vec![
            vec![
                CellInfo {
                    text: "H1".to_string(),
                    ..Default::default()
                },
                CellInfo {
                    text: "H2".to_string(),
                    ..Default::default()
                },
            ],
            vec![
                CellInfo {
                    text: "a".to_string(),
                    ..Default::default()
                },
                CellInfo {
                    text: "b".to_string(),
                    ..Default::default()
                },
            ],
        ];
        let table = render_table(&rows).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "| H1 | H2 |");
        assert_eq!(lines[1], "| --- | --- |");
        assert_eq!(lines[2], "| a | b |");
    }

    #[test]
    fn test_render_table_empty_is_none() {
        assert!(render_table(&[]).is_none());
        assert!(render_table(&[vec![]]).is_none());
    }
}
