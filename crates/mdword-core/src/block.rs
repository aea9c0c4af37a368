//! The classified Markdown block model.

/// One classified unit of parsed Markdown.
///
/// A parsed document is an ordered `Vec<Block>`; order is serialization
/// order. Blocks are immutable values — the parser emits them, a
/// document builder consumes them, and consumption sites match
/// exhaustively so adding a variant is a compile error everywhere it
/// matters.
///
/// There is deliberately no code-fence variant: fenced lines are
/// flattened to [`Block::Paragraph`] at parse time (the fence is never
/// rendered as a distinguished code block in the output document).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `# text` through `#### text` (levels 5–6 only occur on the
    /// reverse path, where deep heading styles are preserved).
    Heading { level: u8, text: String },

    /// Any line not recognized as another construct. Inline spans
    /// (`**bold**`, `*italic*`, `` `code` ``) are resolved at build
    /// time, not parse time.
    Paragraph(String),

    /// `- item` / `* item` (unordered) or `1. item` (ordered).
    /// `indent` counts levels of two-space indentation and is carried
    /// only for round-trip fidelity; the builder renders lists flat.
    ListItem {
        ordered: bool,
        indent: usize,
        text: String,
    },

    /// `> text`.
    Quote(String),

    /// A pipe-delimited table. Every data row has exactly
    /// `headers.len()` cells — rows with a mismatched cell count
    /// terminate the table during parsing and are never stored here.
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },

    /// A whole-line image reference: `![alt](path "title")`.
    Image {
        alt: String,
        path: String,
        title: Option<String>,
    },

    /// A blank source line, preserved for vertical spacing.
    Blank,
}

impl Block {
    /// Plain paragraph from anything stringly, used by degradation paths.
    #[inline]
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph(text.into())
    }
}
