//! Table data model
//!
//! [`TabularDocument`] is the input of one extraction call; everything else
//! here is built during that call and handed back to the caller.

use crate::number::CellValue;
use crate::{Result, TabexError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An uploaded file, owned by the caller for the duration of one extraction.
#[derive(Debug, Clone, Copy)]
pub struct TabularDocument<'a> {
    /// Raw file bytes
    pub content: &'a [u8],
    /// Declared MIME type (may be empty)
    pub content_type: &'a str,
    /// Original filename, used for format detection and logging
    pub filename: &'a str,
}

impl<'a> TabularDocument<'a> {
    /// Create a document view over caller-owned bytes.
    #[inline]
    #[must_use]
    pub const fn new(content: &'a [u8], content_type: &'a str, filename: &'a str) -> Self {
        Self {
            content,
            content_type,
            filename,
        }
    }
}

/// A rectangular table: one header row plus data rows of equal width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTable {
    /// Headers trimmed and lower-cased, used for matching
    pub headers: Vec<String>,
    /// Headers trimmed but otherwise verbatim, used for display
    pub raw_headers: Vec<String>,
    /// Data rows, each exactly `headers.len()` cells wide
    pub rows: Vec<Vec<CellValue>>,
}

impl ParsedTable {
    /// Build a table from a matrix whose first row is the header.
    ///
    /// Every physical row is kept, blank ones included. Short rows are
    /// right-padded with empty cells; if any row is wider than the header the
    /// header is padded instead, so no cell is ever dropped.
    ///
    /// # Errors
    ///
    /// Returns [`TabexError::InsufficientRows`] when the matrix has fewer than
    /// two rows.
    pub fn from_matrix(matrix: Vec<Vec<CellValue>>) -> Result<Self> {
        let mut rows = matrix;

        if rows.len() < 2 {
            return Err(TabexError::InsufficientRows { found: rows.len() });
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, CellValue::empty());
        }

        let header = rows.remove(0);
        let raw_headers: Vec<String> = header.iter().map(CellValue::as_text).collect();
        let headers = raw_headers.iter().map(|h| h.to_lowercase()).collect();

        Ok(Self {
            headers,
            raw_headers,
            rows,
        })
    }

    /// Number of data rows (the header is not counted).
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// The first data row, used to sample values for ambiguous headers.
    #[inline]
    #[must_use]
    pub fn first_row(&self) -> Option<&[CellValue]> {
        self.rows.first().map(Vec::as_slice)
    }
}

/// One classified column, kept for human review before import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMappingEntry {
    /// Header text as it appears in the source
    pub original_column: String,
    /// Canonical field name
    pub mapped_field: String,
    /// Zero-based column index
    pub column_index: usize,
}

/// Column index to canonical field relation.
///
/// A column maps to at most one field and a field is claimed by at most one
/// column. Columns missing from the mapping are unclassified, not missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    entries: Vec<ColumnMappingEntry>,
}

impl ColumnMapping {
    /// Build a mapping from audit entries, ordered by column index.
    #[must_use]
    pub fn new(mut entries: Vec<ColumnMappingEntry>) -> Self {
        entries.sort_by_key(|e| e.column_index);
        Self { entries }
    }

    /// Audit entries in column order.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[ColumnMappingEntry] {
        &self.entries
    }

    /// Column index claimed by `field`, if any.
    #[must_use]
    pub fn column_for(&self, field: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.mapped_field == field)
            .map(|e| e.column_index)
    }

    /// Field claimed by column `index`, if any.
    #[must_use]
    pub fn field_for(&self, index: usize) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.column_index == index)
            .map(|e| e.mapped_field.as_str())
    }

    /// Field to column lookup table.
    #[must_use]
    pub fn mapped_fields(&self) -> BTreeMap<&str, usize> {
        self.entries
            .iter()
            .map(|e| (e.mapped_field.as_str(), e.column_index))
            .collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which code path produced a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    /// Native spreadsheet read
    DirectSpreadsheet,
    /// Native CSV read
    DirectCsv,
    /// PDF converted to CSV by the AI gateway, then read as CSV
    PdfViaAiCsv,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DirectSpreadsheet => "direct-spreadsheet",
            Self::DirectCsv => "direct-csv",
            Self::PdfViaAiCsv => "pdf-via-ai-csv",
        };
        write!(f, "{s}")
    }
}

/// A successfully extracted table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    #[serde(flatten)]
    pub table: ParsedTable,
    pub row_count: usize,
    pub extraction_method: ExtractionMethod,
    pub column_mapping: ColumnMapping,
    /// Intermediate CSV text (PDF path only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_text: Option<String>,
}

/// Why a document yielded no table. None of these are failures of the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "kebab-case")]
pub enum NoTableReason {
    /// Not a spreadsheet, CSV or PDF
    UnsupportedFormat,
    /// Fewer than two rows
    InsufficientRows,
    /// A PDF was supplied without an AI gateway credential
    MissingCredential,
    /// The AI gateway failed or returned an implausible answer
    AiGatewayFailure(String),
    /// The bytes could not be read as the detected format
    Unreadable(String),
}

impl std::fmt::Display for NoTableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormat => write!(f, "unsupported format"),
            Self::InsufficientRows => write!(f, "fewer than two rows"),
            Self::MissingCredential => write!(f, "no AI gateway credential for PDF"),
            Self::AiGatewayFailure(msg) => write!(f, "AI gateway failure: {msg}"),
            Self::Unreadable(msg) => write!(f, "unreadable file: {msg}"),
        }
    }
}

impl From<TabexError> for NoTableReason {
    fn from(err: TabexError) -> Self {
        match err {
            TabexError::InsufficientRows { .. } => Self::InsufficientRows,
            TabexError::MissingCredential => Self::MissingCredential,
            TabexError::FormatError(_) => Self::UnsupportedFormat,
            e @ (TabexError::GatewayError { .. }
            | TabexError::GatewayUnavailable(_)
            | TabexError::ImplausibleResponse { .. }) => {
                Self::AiGatewayFailure(e.to_string())
            }
            other => Self::Unreadable(other.to_string()),
        }
    }
}

/// Outcome of one extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Extraction {
    /// A table was recovered
    Table(ExtractionResult),
    /// Nothing to extract; the caller should offer another file or manual entry
    NoTable(NoTableReason),
}

impl Extraction {
    /// The table, if one was recovered.
    #[must_use]
    pub fn into_table(self) -> Option<ExtractionResult> {
        match self {
            Self::Table(result) => Some(result),
            Self::NoTable(_) => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_table(&self) -> bool {
        matches!(self, Self::Table(_))
    }
}
