//! Extraction pipeline
//!
//! [`TabularExtractor`] takes one uploaded file through detection, parsing
//! and column classification:
//!
//! | Format | Path | Method |
//! |--------|------|--------|
//! | Spreadsheet | [`SpreadsheetBackend`] | `direct-spreadsheet` |
//! | CSV | [`CsvBackend`] | `direct-csv` |
//! | PDF | AI gateway to CSV, then [`CsvBackend`] with `;` | `pdf-via-ai-csv` |
//!
//! Every failure is turned into [`Extraction::NoTable`]; nothing escapes the
//! call as an error.

use crate::classifier::RuleSet;
use crate::csv::CsvBackend;
use crate::traits::TableBackend;
use crate::xlsx::SpreadsheetBackend;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tabex_core::{
    Extraction, ExtractionMethod, ExtractionResult, InputFormat, NoTableReason, ParsedTable,
    Result, TabexError, TabularDocument,
};
use tabex_llm::records::{self, RecordExtraction, RecordInput};
use tabex_llm::table::try_extract_csv_from_pdf;
use tabex_llm::{ChatGateway, GatewayConfig, HttpGateway, LlmOptions};

/// Per-extractor settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Free-text context for the AI stages (document kind, project name)
    pub hint: Option<String>,
    /// Models and limits for the AI stages
    pub llm: LlmOptions,
}

impl ExtractOptions {
    /// Set the context hint
    #[must_use = "returns options with the hint configured"]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Set the model and limit settings for the AI stages
    #[must_use = "returns options with LLM settings configured"]
    pub fn with_llm(mut self, llm: LlmOptions) -> Self {
        self.llm = llm;
        self
    }

    fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

/// Turns uploaded files into classified tables.
///
/// Holds no per-call state; one extractor can serve any number of concurrent
/// calls.
#[derive(Clone)]
pub struct TabularExtractor {
    gateway: Option<Arc<dyn ChatGateway>>,
    rules: RuleSet,
    options: ExtractOptions,
}

impl std::fmt::Debug for TabularExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabularExtractor")
            .field("has_gateway", &self.gateway.is_some())
            .field("rules", &self.rules.rules().len())
            .field("options", &self.options)
            .finish()
    }
}

impl Default for TabularExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularExtractor {
    /// Create an extractor without AI access. PDFs yield no table.
    #[must_use = "creating an extractor that is not used is a waste of resources"]
    pub fn new() -> Self {
        Self {
            gateway: None,
            rules: RuleSet::default(),
            options: ExtractOptions::default(),
        }
    }

    /// Create an extractor that uses `gateway` for the AI stages.
    #[must_use = "creating an extractor that is not used is a waste of resources"]
    pub fn with_gateway(gateway: Arc<dyn ChatGateway>) -> Self {
        Self {
            gateway: Some(gateway),
            ..Self::new()
        }
    }

    /// Create an extractor backed by the HTTP gateway.
    #[must_use = "creating an extractor that is not used is a waste of resources"]
    pub fn with_http_gateway(config: GatewayConfig) -> Self {
        Self::with_gateway(Arc::new(HttpGateway::new(config)))
    }

    /// Replace the column rules
    #[must_use = "returns an extractor with the rules configured"]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the options
    #[must_use = "returns an extractor with the options configured"]
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    #[must_use]
    pub const fn options(&self) -> &ExtractOptions {
        &self.options
    }

    #[inline]
    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Extract a table from `document`.
    ///
    /// Never fails: anything that prevents a table is reported as
    /// [`Extraction::NoTable`] with the reason.
    pub async fn extract(&self, document: &TabularDocument<'_>) -> Extraction {
        let start = Instant::now();
        match self.try_extract(document).await {
            Ok(result) => {
                info!(
                    "Extracted {} rows, {} mapped columns from {} via {} in {:?}",
                    result.row_count,
                    result.column_mapping.len(),
                    document.filename,
                    result.extraction_method,
                    start.elapsed()
                );
                Extraction::Table(result)
            }
            Err(e) => {
                let reason = NoTableReason::from(e);
                warn!("No table extracted from {}: {reason}", document.filename);
                Extraction::NoTable(reason)
            }
        }
    }

    /// Extract a table, surfacing the reason for failure as an error.
    ///
    /// # Errors
    /// - [`TabexError::FormatError`] for unsupported files
    /// - [`TabexError::InsufficientRows`] for fewer than two rows
    /// - [`TabexError::MissingCredential`] for a PDF without a gateway
    /// - gateway errors from the PDF path
    /// - [`TabexError::BackendError`] for unreadable files
    pub async fn try_extract(&self, document: &TabularDocument<'_>) -> Result<ExtractionResult> {
        let format = InputFormat::detect(document.filename, document.content_type);
        info!(
            "Processing {} ({} bytes) as {format}",
            document.filename,
            document.content.len()
        );

        match format {
            InputFormat::Spreadsheet | InputFormat::Csv => self.extract_local(document.content, format),
            InputFormat::Pdf => {
                let gateway = self.gateway.as_deref().ok_or(TabexError::MissingCredential)?;
                let csv = try_extract_csv_from_pdf(
                    gateway,
                    &self.options.llm,
                    document.content,
                    self.options.hint(),
                )
                .await?;
                let table = CsvBackend::with_delimiter(b';').parse_str(&csv)?;
                Ok(self.finish(table, ExtractionMethod::PdfViaAiCsv, Some(csv)))
            }
            InputFormat::Unsupported => Err(TabexError::FormatError(format!(
                "Unsupported file: {} ({})",
                document.filename, document.content_type
            ))),
        }
    }

    /// Deterministic extraction for spreadsheet and CSV bytes.
    ///
    /// # Errors
    /// [`TabexError::FormatError`] if `format` has no deterministic path,
    /// otherwise the backend's error.
    pub fn extract_local(&self, data: &[u8], format: InputFormat) -> Result<ExtractionResult> {
        let (table, method) = match format {
            InputFormat::Spreadsheet => (
                SpreadsheetBackend::new().parse_bytes(data)?,
                ExtractionMethod::DirectSpreadsheet,
            ),
            InputFormat::Csv => (CsvBackend::new().parse_bytes(data)?, ExtractionMethod::DirectCsv),
            other => {
                return Err(TabexError::FormatError(format!(
                    "No deterministic parser for {other}"
                )))
            }
        };
        Ok(self.finish(table, method, None))
    }

    fn finish(
        &self,
        table: ParsedTable,
        extraction_method: ExtractionMethod,
        csv_text: Option<String>,
    ) -> ExtractionResult {
        let column_mapping = self.rules.classify(&table);
        ExtractionResult {
            row_count: table.row_count(),
            table,
            extraction_method,
            column_mapping,
            csv_text,
        }
    }

    /// Reconstruct property records from a parsed table.
    ///
    /// Without a gateway the result is empty with one issue.
    pub async fn extract_records(
        &self,
        table: &ParsedTable,
        filename: Option<&str>,
    ) -> RecordExtraction {
        let Some(gateway) = self.gateway.as_deref() else {
            return RecordExtraction::failed(
                table.row_count(),
                records::failure_issue(&TabexError::MissingCredential),
            );
        };

        let mut input = RecordInput::from_table(table).with_hint(self.options.hint());
        if let Some(name) = filename {
            input = input.with_file_name(name);
        }
        records::extract_records(gateway, &self.options.llm, &input).await
    }
}
