//! # tabex-core
//!
//! Core types for the tabex table extraction pipeline.
//!
//! ```text
//! bytes ─► InputFormat::detect ─► parser (tabex-backend) ─► ParsedTable
//!                                   ▲                          │
//!              PDF ─► AI gateway ───┘ (tabex-llm)              ▼
//!                                                   column classifier ─► ExtractionResult
//! ```
//!
//! This crate holds the pieces every stage shares:
//!
//! - [`InputFormat`] - file classification by extension, then MIME type
//! - [`ParsedTable`], [`ColumnMapping`], [`ExtractionResult`] - the data model
//! - [`CellValue`] and [`parse_locale_number`] - numeric normalization
//! - [`TabexError`] - the error type used inside the pipeline
//!
//! Extraction never fails on bad input: the orchestrator reports
//! [`Extraction::NoTable`] with a [`NoTableReason`] instead.

pub mod error;
pub mod format;
pub mod number;
pub mod table;

pub use error::{Result, TabexError};
pub use format::InputFormat;
pub use number::{parse_locale_number, CellValue};
pub use table::{
    ColumnMapping, ColumnMappingEntry, Extraction, ExtractionMethod, ExtractionResult,
    NoTableReason, ParsedTable, TabularDocument,
};
