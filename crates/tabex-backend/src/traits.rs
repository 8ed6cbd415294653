//! Core trait definitions for tabular backends

use std::path::Path;
use tabex_core::{InputFormat, ParsedTable, Result, TabexError};

/// A deterministic parser that turns file bytes into a [`ParsedTable`].
///
/// Backends never call out to the network; the PDF path converts the
/// document to CSV first and then uses the CSV backend.
pub trait TableBackend: Send + Sync {
    /// The format this backend reads
    fn format(&self) -> InputFormat;

    /// Parse a table from bytes.
    ///
    /// # Errors
    /// [`TabexError::InsufficientRows`] when the source has fewer than two
    /// rows, [`TabexError::BackendError`] when the bytes cannot be
    /// read as this format.
    fn parse_bytes(&self, data: &[u8]) -> Result<ParsedTable>;

    /// Parse a table from a file path.
    ///
    /// # Errors
    /// Returns an error if file reading or parsing fails.
    fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ParsedTable>
    where
        Self: Sized,
    {
        let data = std::fs::read(path.as_ref()).map_err(TabexError::IoError)?;
        self.parse_bytes(&data)
    }

    /// Check if this backend can handle the given format
    fn can_handle(&self, format: InputFormat) -> bool {
        self.format() == format
    }
}
