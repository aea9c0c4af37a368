//! # mdword-docx — Word document builder, extractor and assets
//!
//! The rich-document half of mdword:
//!
//! - [`builder::DocxBuilder`]: appends parsed Markdown blocks to a new
//!   Word document (the only component that touches the target
//!   document structure on the forward path).
//! - [`extractor`]: walks an existing document's body in order with a
//!   manual ZIP + streamed XML parse, reconstructing Markdown,
//!   externalizing embedded images and annotating merged table cells.
//! - [`assets::AssetResolver`]: resolves image references (relative
//!   paths, `media/` paths, remote URLs) to local files with memoized
//!   downloads.
//! - [`convert::Converter`]: the conversion entry point; prefers an
//!   external high-fidelity tool (pandoc) when available and falls
//!   back to the native builder/extractor.

pub mod assets;
pub mod builder;
pub mod convert;
pub mod extractor;
pub mod numbering;

pub use assets::AssetResolver;
pub use builder::DocxBuilder;
pub use convert::Converter;
