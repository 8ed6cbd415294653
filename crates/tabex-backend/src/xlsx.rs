//! Spreadsheet backend using calamine
//!
//! Reads the first worksheet of an Excel or OpenDocument workbook into a
//! [`ParsedTable`]. The container is detected from the bytes, so `.xlsx`,
//! `.xlsm`, `.xlsb`, `.xls` and `.ods` all go through the same path.
//!
//! Numeric cells stay numeric ([`CellValue::Number`]); everything else is
//! rendered to text. Dates become ISO `YYYY-MM-DD` strings.

// Clippy pedantic allows:
// - Excel integers are converted to f64 like every other numeric cell
#![allow(clippy::cast_precision_loss)]

use crate::traits::TableBackend;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use tabex_core::{CellValue, InputFormat, ParsedTable, Result, TabexError};

/// Spreadsheet Table Backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SpreadsheetBackend;

impl SpreadsheetBackend {
    /// Create a new spreadsheet backend instance
    #[inline]
    #[must_use = "creates a backend instance that should be used for parsing"]
    pub const fn new() -> Self {
        Self
    }

    /// Convert one calamine cell.
    #[must_use]
    pub fn cell_value(cell: &Data) -> CellValue {
        match cell {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
                CellValue::Text(s.clone())
            }
            Data::Bool(b) => CellValue::Text(b.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(datetime) => CellValue::Text(datetime.format("%Y-%m-%d").to_string()),
                None => CellValue::Number(dt.as_f64()),
            },
            Data::Error(e) => CellValue::Text(e.to_string()),
            Data::Empty => CellValue::empty(),
        }
    }
}

impl TableBackend for SpreadsheetBackend {
    #[inline]
    fn format(&self) -> InputFormat {
        InputFormat::Spreadsheet
    }

    fn parse_bytes(&self, data: &[u8]) -> Result<ParsedTable> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))
            .map_err(|e| TabexError::BackendError(format!("Failed to open workbook: {e}")))?;

        let sheet_names = workbook.sheet_names();
        let Some(first_sheet) = sheet_names.first() else {
            return Err(TabexError::InsufficientRows { found: 0 });
        };
        if sheet_names.len() > 1 {
            log::debug!(
                "Workbook has {} sheets, reading only {first_sheet:?}",
                sheet_names.len()
            );
        }

        let range = workbook
            .worksheet_range(first_sheet)
            .map_err(|e| TabexError::BackendError(format!("Failed to read sheet: {e}")))?;

        let matrix: Vec<Vec<CellValue>> = range
            .rows()
            .map(|row| row.iter().map(Self::cell_value).collect())
            .collect();
        log::debug!(
            "Read {} physical rows from sheet {first_sheet:?}",
            matrix.len()
        );

        ParsedTable::from_matrix(matrix)
    }
}
