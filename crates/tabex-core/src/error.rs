//! Error types for table extraction.
//!
//! Every variant here is recovered before it reaches the caller of the
//! extraction pipeline: the orchestrator turns them into a
//! [`NoTableReason`](crate::NoTableReason). They exist so inner stages can use
//! `?` and so the reason a file produced no table can be logged precisely.

use thiserror::Error;

/// Maximum number of characters of a gateway response body kept in errors and logs.
pub const MAX_LOGGED_BODY_CHARS: usize = 500;

/// Error types that can occur while extracting a table.
#[derive(Error, Debug)]
pub enum TabexError {
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The file is not a format the pipeline can read.
    #[error("Format detection error: {0}")]
    FormatError(String),

    /// A parsing backend (CSV reader, spreadsheet reader) failed.
    #[error("Backend error: {0}")]
    BackendError(String),

    /// The source held fewer than two rows.
    #[error("Insufficient rows: found {found}, need a header and at least one data row")]
    InsufficientRows {
        /// Number of rows found
        found: usize,
    },

    /// The AI gateway answered with a non-success status.
    #[error("AI gateway returned status {status}: {body}")]
    GatewayError {
        /// HTTP status code
        status: u16,
        /// Response body, truncated to [`MAX_LOGGED_BODY_CHARS`]
        body: String,
    },

    /// The AI gateway could not be reached or the exchange broke off.
    #[error("AI gateway request failed: {0}")]
    GatewayUnavailable(String),

    /// The AI gateway answered, but the payload is too short to be a table.
    #[error("AI gateway response is implausibly short ({chars} chars)")]
    ImplausibleResponse {
        /// Length of the cleaned response
        chars: usize,
    },

    /// A PDF needs the AI gateway but no credential was supplied.
    #[error("No AI gateway credential configured")]
    MissingCredential,
}

impl TabexError {
    /// Build a [`TabexError::GatewayError`], truncating the body for logging.
    #[must_use = "creates an error value"]
    pub fn gateway(status: u16, body: &str) -> Self {
        Self::GatewayError {
            status,
            body: truncate_chars(body, MAX_LOGGED_BODY_CHARS),
        }
    }
}

/// Truncate `text` to at most `max` characters, respecting char boundaries.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, TabexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_rows_display() {
        let error = TabexError::InsufficientRows { found: 1 };
        let display = format!("{error}");
        assert!(display.contains("found 1"), "display should name the row count: {display}");
    }

    #[test]
    fn test_gateway_error_truncates_body() {
        let body = "x".repeat(2000);
        match TabexError::gateway(500, &body) {
            TabexError::GatewayError { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.chars().count(), MAX_LOGGED_BODY_CHARS + 1);
                assert!(body.ends_with('…'));
            }
            other => panic!("Expected GatewayError, got {other:?}"),
        }
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("Größe", 3), "Grö…");
        assert_eq!(truncate_chars("qm", 10), "qm");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TabexError = io_err.into();
        match err {
            TabexError::IoError(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected IoError variant"),
        }
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<()> {
            Err(TabexError::FormatError("unsupported".to_string()))
        }

        fn outer() -> Result<String> {
            inner()?;
            Ok("should not reach".to_string())
        }

        match outer() {
            Err(TabexError::FormatError(msg)) => assert_eq!(msg, "unsupported"),
            _ => panic!("Expected FormatError to propagate"),
        }
    }
}
