//! Tabular backends for tabex
//!
//! This crate turns uploaded files into classified tables. It holds the
//! deterministic parsers, the fuzzy column classifier and the
//! [`TabularExtractor`] pipeline that ties them to the AI stages in
//! `tabex-llm`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      TabularExtractor                        │
//! │  (format detection, backend dispatch, column classification) │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!        ┌──────────────────────┼──────────────────────┐
//!        ▼                      ▼                      ▼
//! ┌──────────────┐       ┌──────────────┐       ┌──────────────┐
//! │ Spreadsheet  │       │  CsvBackend  │◄──────│  PDF via AI  │
//! │ (calamine)   │       │  (csv)       │  ";"  │  (tabex-llm) │
//! └──────────────┘       └──────────────┘       └──────────────┘
//!                               │
//!                               ▼
//!                     RuleSet::classify (regex)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tabex_backend::TabularExtractor;
//! use tabex_core::TabularDocument;
//!
//! # async fn run() {
//! let extractor = TabularExtractor::new();
//! let bytes = b"Name;Miete\nMax;450,00\nAnna;600,00";
//! let extraction = extractor
//!     .extract(&TabularDocument::new(bytes, "text/csv", "mieter.csv"))
//!     .await;
//!
//! if let Some(result) = extraction.into_table() {
//!     println!("{} rows via {}", result.row_count, result.extraction_method);
//! }
//! # }
//! ```

pub mod classifier;
pub mod converter;
pub mod csv;
pub mod traits;
pub mod xlsx;

pub use classifier::{classify, ColumnRule, RuleSet};
pub use converter::{ExtractOptions, TabularExtractor};
pub use csv::CsvBackend;
pub use traits::TableBackend;
pub use xlsx::SpreadsheetBackend;
