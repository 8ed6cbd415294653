//! CSV backend
//!
//! Reads delimited text into a [`ParsedTable`]. Every cell stays text; numeric
//! interpretation happens later, at the normalizer.
//!
//! # Features
//!
//! - Delimiter from the first line: `;` if present, otherwise `,`
//! - Forced delimiter for sources with a known dialect (AI-converted PDFs)
//! - RFC 4180 quoting, ragged rows
//! - Lossy UTF-8 decoding with BOM removal

use crate::traits::TableBackend;
use tabex_core::{CellValue, InputFormat, ParsedTable, Result, TabexError};

const UTF8_BOM: char = '\u{feff}';

/// CSV Table Backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CsvBackend {
    delimiter: Option<u8>,
}

impl CsvBackend {
    /// Create a backend that detects the delimiter per file
    #[inline]
    #[must_use = "creates a backend instance that should be used for parsing"]
    pub const fn new() -> Self {
        Self { delimiter: None }
    }

    /// Create a backend that always splits on `delimiter`
    #[inline]
    #[must_use = "creates a backend instance that should be used for parsing"]
    pub const fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
        }
    }

    /// Pick the delimiter from the first line.
    ///
    /// German exports use `;` because `,` is the decimal separator, so any
    /// semicolon in the header line decides it.
    #[inline]
    #[must_use]
    pub fn detect_delimiter(content: &str) -> u8 {
        let first_line = content.lines().next().unwrap_or_default();
        if first_line.contains(';') {
            b';'
        } else {
            b','
        }
    }

    /// Decode bytes as UTF-8, replacing invalid sequences and dropping a BOM.
    #[must_use]
    pub fn decode(data: &[u8]) -> String {
        let text = String::from_utf8_lossy(data);
        text.strip_prefix(UTF8_BOM).unwrap_or(&text[..]).to_string()
    }

    /// Read CSV text into a raw cell matrix.
    fn read_csv_data(content: &str, delimiter: u8) -> Result<Vec<Vec<CellValue>>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(false)
            .from_reader(content.as_bytes());

        reader
            .records()
            .map(|result| {
                result
                    .map(|record| record.iter().map(CellValue::from).collect::<Vec<_>>())
                    .map_err(|e| TabexError::BackendError(format!("Failed to read CSV record: {e}")))
            })
            .collect()
    }

    /// Parse already-decoded CSV text.
    ///
    /// # Errors
    /// See [`TableBackend::parse_bytes`].
    pub fn parse_str(&self, content: &str) -> Result<ParsedTable> {
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Self::detect_delimiter(content));
        log::debug!("Parsing CSV with delimiter: {:?}", delimiter as char);

        let matrix = Self::read_csv_data(content, delimiter)?;
        ParsedTable::from_matrix(matrix)
    }
}

impl TableBackend for CsvBackend {
    #[inline]
    fn format(&self) -> InputFormat {
        InputFormat::Csv
    }

    fn parse_bytes(&self, data: &[u8]) -> Result<ParsedTable> {
        self.parse_str(&Self::decode(data))
    }
}
