//! Error types for document generation and conversion operations.

use std::path::PathBuf;
use thiserror::Error;

/// Error types that can occur while generating or converting documents.
///
/// Two of these are fatal by design and always propagate to the caller:
/// [`MdwordError::Llm`] (an upstream collaborator failed for this call,
/// no partial document is written) and [`MdwordError::SourceNotFound`]
/// (raised before any extraction work begins). Unresolvable assets and
/// malformed Markdown constructs are *not* errors — they degrade to
/// placeholder elements and plain paragraphs respectively.
#[derive(Error, Debug)]
pub enum MdwordError {
    /// The LLM collaborator rejected or failed the request.
    #[error("LLM request failed: {0}")]
    Llm(String),

    /// Building the target document from Markdown failed.
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Walking a rich document back into Markdown failed.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// The reverse direction was given a path that does not exist.
    #[error("source document not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// File I/O error while reading input or writing output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error (LLM request/response payloads).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for [`Result<T, MdwordError>`].
pub type Result<T> = std::result::Result<T, MdwordError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_display() {
        let error = MdwordError::Llm("connection refused".to_string());
        assert_eq!(format!("{error}"), "LLM request failed: connection refused");
    }

    #[test]
    fn test_source_not_found_display() {
        let error = MdwordError::SourceNotFound(PathBuf::from("missing.docx"));
        assert_eq!(format!("{error}"), "source document not found: missing.docx");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MdwordError = io_err.into();
        match err {
            MdwordError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("expected Io variant"),
        }
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<String> {
            Err(MdwordError::Conversion("bad table".to_string()))
        }

        fn outer() -> Result<String> {
            let _ = inner()?;
            Ok("unreachable".to_string())
        }

        match outer() {
            Err(MdwordError::Conversion(msg)) => assert_eq!(msg, "bad table"),
            _ => panic!("expected Conversion to propagate"),
        }
    }
}
