//! Numbering definitions from `word/numbering.xml`.
//!
//! Markdown only distinguishes ordered from unordered lists, so the
//! full OOXML numbering model collapses to one question per
//! `(numId, ilvl)` pair: bullet or numbered? When `numbering.xml` is
//! present we answer it from the actual `<w:numFmt>` value; the
//! extractor only falls back to a numId heuristic when the definition
//! is missing.
//!
//! ```xml
//! <w:numbering>
//!   <w:abstractNum w:abstractNumId="0">
//!     <w:lvl w:ilvl="0">
//!       <w:numFmt w:val="decimal"/>  <!-- 1, 2, 3 -->
//!     </w:lvl>
//!   </w:abstractNum>
//!   <w:num w:numId="1">
//!     <w:abstractNumId w:val="0"/>
//!   </w:num>
//! </w:numbering>
//! ```

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

/// List format for one numbering level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumFormat {
    /// Non-numbered list (`bullet`, `none`, or unspecified).
    #[default]
    Bullet,
    /// Any numbered format (decimal, roman, letter, ...). Markdown
    /// renders them all as `N.`.
    Numbered,
}

impl NumFormat {
    /// Parse from a `<w:numFmt w:val="..."/>` attribute value.
    #[inline]
    pub fn parse_format(s: &str) -> Self {
        match s {
            "bullet" | "none" => Self::Bullet,
            _ => Self::Numbered,
        }
    }

    #[inline]
    pub const fn is_numbered(self) -> bool {
        matches!(self, Self::Numbered)
    }
}

/// All numbering definitions of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberingDefinitions {
    /// numId → abstractNumId
    num_map: HashMap<i32, i32>,
    /// (abstractNumId, ilvl) → format
    levels: HashMap<(i32, i32), NumFormat>,
}

impl NumberingDefinitions {
    /// Empty definitions, for documents without `numbering.xml`.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether `(numId, ilvl)` is a numbered list, or `None` when no
    /// definition exists (caller decides the fallback).
    pub fn is_numbered(&self, num_id: i32, ilvl: i32) -> Option<bool> {
        let abstract_id = self.num_map.get(&num_id)?;
        self.levels
            .get(&(*abstract_id, ilvl))
            .map(|fmt| fmt.is_numbered())
    }

    #[cfg(test)]
    fn insert(&mut self, num_id: i32, abstract_id: i32, ilvl: i32, fmt: NumFormat) {
        self.num_map.insert(num_id, abstract_id);
        self.levels.insert((abstract_id, ilvl), fmt);
    }
}

/// Per-list counters for ordered list prefixes during extraction.
#[derive(Debug, Clone, Default)]
pub struct ListCounters {
    counters: HashMap<(i32, i32), u32>,
}

impl ListCounters {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next counter value for `(numId, ilvl)`, starting at 1.
    pub fn next(&mut self, num_id: i32, ilvl: i32) -> u32 {
        let counter = self.counters.entry((num_id, ilvl)).or_insert(0);
        *counter += 1;
        *counter
    }
}

#[inline]
fn get_attr_i32(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<i32> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| std::str::from_utf8(&a.value).ok()?.parse::<i32>().ok())
}

#[inline]
fn get_attr_string(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| std::str::from_utf8(&a.value).ok().map(str::to_string))
}

/// Parse `word/numbering.xml` from a DOCX archive.
///
/// The file is optional (documents without lists do not carry it);
/// absence and parse failures both yield empty definitions so the
/// extractor can fall back to its heuristic.
pub fn parse_numbering_xml<R: Read + Seek>(archive: &mut ZipArchive<R>) -> NumberingDefinitions {
    let Ok(mut xml_file) = archive.by_name("word/numbering.xml") else {
        return NumberingDefinitions::empty();
    };

    let mut xml_content = String::new();
    if xml_file.read_to_string(&mut xml_content).is_err() {
        log::warn!("numbering.xml is not valid UTF-8, ignoring list definitions");
        return NumberingDefinitions::empty();
    }
    drop(xml_file);

    let mut reader = Reader::from_str(&xml_content);
    reader.trim_text(true);

    let mut defs = NumberingDefinitions::empty();

    // State while walking abstractNum / num elements
    let mut current_abstract_id: Option<i32> = None;
    let mut current_ilvl: Option<i32> = None;
    let mut pending_num_id: Option<i32> = None;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:abstractNum" => {
                    current_abstract_id = get_attr_i32(e, b"w:abstractNumId");
                }
                b"w:num" => {
                    pending_num_id = get_attr_i32(e, b"w:numId");
                }
                b"w:abstractNumId" => {
                    if let (Some(num_id), Some(abstract_id)) =
                        (pending_num_id.take(), get_attr_i32(e, b"w:val"))
                    {
                        defs.num_map.insert(num_id, abstract_id);
                    }
                }
                b"w:lvl" => {
                    current_ilvl = get_attr_i32(e, b"w:ilvl");
                    // Unspecified numFmt defaults to bullet.
                    if let (Some(abstract_id), Some(ilvl)) = (current_abstract_id, current_ilvl) {
                        defs.levels
                            .entry((abstract_id, ilvl))
                            .or_insert(NumFormat::Bullet);
                    }
                }
                b"w:numFmt" => {
                    if let (Some(abstract_id), Some(ilvl), Some(val)) = (
                        current_abstract_id,
                        current_ilvl,
                        get_attr_string(e, b"w:val"),
                    ) {
                        defs.levels
                            .insert((abstract_id, ilvl), NumFormat::parse_format(&val));
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:lvl" => current_ilvl = None,
                b"w:abstractNum" => current_abstract_id = None,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!("error parsing numbering.xml, ignoring list definitions: {e}");
                return NumberingDefinitions::empty();
            }
            _ => {}
        }
        buf.clear();
    }

    defs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_format_parse() {
        assert_eq!(NumFormat::parse_format("bullet"), NumFormat::Bullet);
        assert_eq!(NumFormat::parse_format("none"), NumFormat::Bullet);
        assert_eq!(NumFormat::parse_format("decimal"), NumFormat::Numbered);
        assert_eq!(NumFormat::parse_format("lowerRoman"), NumFormat::Numbered);
        assert_eq!(NumFormat::parse_format("upperLetter"), NumFormat::Numbered);
    }

    #[test]
    fn test_empty_definitions_answer_none() {
        let defs = NumberingDefinitions::empty();
        assert_eq!(defs.is_numbered(1, 0), None);
    }

    #[test]
    fn test_definition_lookup() {
        let mut defs = NumberingDefinitions::empty();
        defs.insert(1, 0, 0, NumFormat::Bullet);
        defs.insert(2, 5, 0, NumFormat::Numbered);

        assert_eq!(defs.is_numbered(1, 0), Some(false));
        assert_eq!(defs.is_numbered(2, 0), Some(true));
        assert_eq!(defs.is_numbered(2, 1), None); // ilvl not defined
        assert_eq!(defs.is_numbered(9, 0), None); // numId not mapped
    }

    #[test]
    fn test_counter_management() {
        let mut counters = ListCounters::new();
        assert_eq!(counters.next(1, 0), 1);
        assert_eq!(counters.next(1, 0), 2);
        assert_eq!(counters.next(1, 1), 1); // separate per ilvl
        assert_eq!(counters.next(2, 0), 1); // separate per numId
    }
}
