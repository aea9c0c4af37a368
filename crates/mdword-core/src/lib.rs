//! # mdword-core — block model and Markdown line parser
//!
//! The core types shared by both conversion directions:
//!
//! - [`Block`]: the closed sum type of classified Markdown units
//!   (heading, paragraph, list item, quote, table, image, blank line).
//! - [`parse`]: the line-oriented Markdown scanner. It is a total
//!   function: malformed constructs degrade to plain paragraphs and
//!   parsing never fails.
//! - [`inline`]: the inline span formatter shared by the builder
//!   (Markdown spans → run attributes) and the extractor (run
//!   attributes → Markdown spans).
//!
//! A parsed document is a transient `Vec<Block>` — produced by
//! [`parse`], consumed by a document builder, never persisted.

pub mod block;
pub mod error;
pub mod inline;
pub mod parser;

pub use block::Block;
pub use error::{MdwordError, Result};
pub use parser::parse;
