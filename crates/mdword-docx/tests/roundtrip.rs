//! Round-trip coverage through the native builder and extractor.

use std::path::PathBuf;
use tempfile::TempDir;

use mdword_docx::Converter;

/// A valid 1x1 PNG.
fn tiny_png() -> &'static [u8] {
    &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48,
        0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00,
        0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78,
        0x9C, 0x62, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00,
        0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

fn native_round_trip(markdown: &str) -> (TempDir, String) {
    let dir = TempDir::new().unwrap();
    let converter = Converter::new(dir.path()).without_pandoc();
    let docx = converter.markdown_to_docx(markdown, None).unwrap();
    let extracted = converter.docx_to_markdown(&docx).unwrap();
    (dir, extracted)
}

#[test]
fn headings_survive_round_trip() {
    let (_dir, extracted) = native_round_trip("# Top\n\n## Section\n\n### Detail");
    assert!(extracted.contains("# Top"));
    assert!(extracted.contains("## Section"));
    assert!(extracted.contains("### Detail"));
}

#[test]
fn table_cells_survive_round_trip() {
    let markdown = "\
| Name | Role |
| --- | --- |
| ada | engineer |
| grace | admiral |";
    let (_dir, extracted) = native_round_trip(markdown);
    for text in ["Name", "Role", "ada", "engineer", "grace", "admiral"] {
        assert!(extracted.contains(text), "missing {text} in:\n{extracted}");
    }
    // Still a table: header row plus separator.
    assert!(extracted.contains("| Name | Role |"));
    assert!(extracted.contains("| --- | --- |"));
}

#[test]
fn list_kinds_survive_round_trip() {
    let (_dir, extracted) = native_round_trip("- alpha\n- beta\n\n1. first\n2. second");
    assert!(extracted.contains("- alpha"));
    assert!(extracted.contains("- beta"));
    assert!(extracted.contains("1. first"));
    assert!(extracted.contains("2. second"));
}

#[test]
fn quote_survives_round_trip() {
    let (_dir, extracted) = native_round_trip("> measure twice, cut once");
    assert!(extracted.contains("> measure twice, cut once"));
}

#[test]
fn inline_emphasis_survives_round_trip() {
    let (_dir, extracted) = native_round_trip("plain **bold** and *italic* and `code`");
    assert!(extracted.contains("**bold**"));
    assert!(extracted.contains("*italic*"));
    assert!(extracted.contains("`code`"));
}

#[test]
fn code_fence_flattens_to_plain_paragraphs() {
    let markdown = "before\n\n```rust\nlet x = 1;\n```\n\nafter";
    let (_dir, extracted) = native_round_trip(markdown);
    // Fence content survives as plain text, the fence markers do not.
    assert!(extracted.contains("let x = 1;"));
    assert!(!extracted.contains("```"));
}

#[test]
fn missing_image_renders_placeholder_paragraph() {
    let (_dir, extracted) = native_round_trip("![chart](not_there.png)");
    assert!(extracted.contains("[image not found] not_there.png"));
}

#[test]
fn local_image_is_embedded_and_reextracted() {
    let dir = TempDir::new().unwrap();
    let media = dir.path().join("media");
    std::fs::create_dir_all(&media).unwrap();
    std::fs::write(media.join("dot.png"), tiny_png()).unwrap();

    let converter = Converter::new(dir.path()).without_pandoc();
    let docx = converter
        .markdown_to_docx("![a tiny dot](dot.png)", None)
        .unwrap();
    let extracted = converter.docx_to_markdown(&docx).unwrap();

    // The embedded image came back out into the media store.
    assert!(extracted.contains("](media/image_"));
    let externalized: Vec<PathBuf> = std::fs::read_dir(&media)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("image_"))
                .unwrap_or(false)
        })
        .collect();
    assert_eq!(externalized.len(), 1);
}

#[test]
fn repeated_conversion_reuses_cached_assets() {
    let dir = TempDir::new().unwrap();
    let media = dir.path().join("media");
    std::fs::create_dir_all(&media).unwrap();
    std::fs::write(media.join("logo.png"), tiny_png()).unwrap();

    let converter = Converter::new(dir.path()).without_pandoc();
    let markdown = "![logo](logo.png)";
    let first = converter.markdown_to_docx(markdown, None).unwrap();
    let second = converter
        .markdown_to_docx(markdown, Some(&dir.path().join("second.docx")))
        .unwrap();
    assert!(first.is_file());
    assert!(second.is_file());
    // Still exactly one media file; nothing was duplicated.
    assert_eq!(std::fs::read_dir(&media).unwrap().count(), 1);
}
