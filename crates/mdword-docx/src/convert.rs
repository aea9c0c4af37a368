//! Conversion entry points.
//!
//! Both directions prefer pandoc when it is installed, for maximum
//! fidelity, and fall back to the native builder/extractor after a
//! single failed attempt. The fallback is also the only path on
//! systems without pandoc, so it covers the full block model on its
//! own.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use mdword_core::{parse, MdwordError, Result};

use crate::assets::AssetResolver;
use crate::builder::{default_output_name, DocxBuilder};
use crate::extractor;

/// Markdown ⇄ DOCX converter bound to one output directory.
pub struct Converter {
    output_dir: PathBuf,
    pandoc_available: bool,
    use_pandoc: bool,
}

impl Converter {
    /// Probes for pandoc once; availability is fixed for the life of
    /// the converter.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let pandoc_available = pandoc_available();
        if !pandoc_available {
            log::info!("pandoc not found, using native conversion");
        }
        Self {
            output_dir: output_dir.into(),
            pandoc_available,
            use_pandoc: true,
        }
    }

    /// Force the native conversion path even when pandoc is installed.
    #[must_use]
    pub fn without_pandoc(mut self) -> Self {
        self.use_pandoc = false;
        self
    }

    #[inline]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[inline]
    fn pandoc_enabled(&self) -> bool {
        self.use_pandoc && self.pandoc_available
    }

    /// Convert Markdown text to a Word document.
    ///
    /// Image references are normalized into the output directory's
    /// media store first, so both conversion paths see local files.
    /// Returns the path of the written document (`output` when given,
    /// a timestamped name in the output directory otherwise).
    pub fn markdown_to_docx(&self, markdown: &str, output: Option<&Path>) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let resolver = AssetResolver::new(&self.output_dir);
        let normalized = resolver.normalize_markdown(markdown);

        let target = match output {
            Some(path) => path.to_path_buf(),
            None => self.output_dir.join(default_output_name()),
        };

        if self.pandoc_enabled() {
            match self.pandoc_md_to_docx(&normalized, &target) {
                Ok(()) => return Ok(target),
                Err(e) => log::warn!("pandoc conversion failed, falling back to native: {e}"),
            }
        }

        let mut builder = DocxBuilder::new();
        for block in parse(&normalized) {
            builder.append(&block, &resolver);
        }
        builder.save(&target)?;
        Ok(target)
    }

    /// Convert a Word document to Markdown text.
    ///
    /// Embedded images land in `<output_dir>/media/` and are
    /// referenced relatively as `media/<name>`.
    pub fn docx_to_markdown(&self, source: &Path) -> Result<String> {
        if !source.is_file() {
            return Err(MdwordError::SourceNotFound(source.to_path_buf()));
        }
        std::fs::create_dir_all(&self.output_dir)?;

        if self.pandoc_enabled() {
            match self.pandoc_docx_to_md(source) {
                Ok(markdown) => return Ok(markdown),
                Err(e) => log::warn!("pandoc extraction failed, falling back to native: {e}"),
            }
        }

        extractor::extract_file(source, &self.output_dir.join("media"))
    }

    fn pandoc_md_to_docx(&self, markdown: &str, target: &Path) -> Result<()> {
        let mut source = tempfile::Builder::new()
            .prefix("mdword")
            .suffix(".md")
            .tempfile()?;
        source.write_all(markdown.as_bytes())?;
        source.flush()?;

        let status = Command::new("pandoc")
            .arg("-f")
            .arg("markdown")
            .arg("-t")
            .arg("docx")
            .arg("--resource-path")
            .arg(&self.output_dir)
            .arg("-o")
            .arg(target)
            .arg(source.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| MdwordError::Conversion(format!("failed to run pandoc: {e}")))?;

        if !status.success() {
            return Err(MdwordError::Conversion(format!(
                "pandoc exited with {status}"
            )));
        }
        Ok(())
    }

    fn pandoc_docx_to_md(&self, source: &Path) -> Result<String> {
        let source = source
            .canonicalize()
            .map_err(|_| MdwordError::SourceNotFound(source.to_path_buf()))?;

        // Run from the output directory so extracted media keeps the
        // relative media/<name> form in the produced Markdown.
        let output = Command::new("pandoc")
            .current_dir(&self.output_dir)
            .arg("-f")
            .arg("docx")
            .arg("-t")
            .arg("gfm")
            .arg("--extract-media")
            .arg("media")
            .arg(&source)
            .stderr(Stdio::null())
            .output()
            .map_err(|e| MdwordError::Conversion(format!("failed to run pandoc: {e}")))?;

        if !output.status.success() {
            return Err(MdwordError::Conversion(format!(
                "pandoc exited with {}",
                output.status
            )));
        }
        String::from_utf8(output.stdout)
            .map_err(|e| MdwordError::Conversion(format!("pandoc produced invalid UTF-8: {e}")))
    }
}

fn pandoc_available() -> bool {
    Command::new("pandoc")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
