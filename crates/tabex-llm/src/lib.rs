//! # tabex-llm
//!
//! The two AI-backed stages of the tabex pipeline:
//!
//! - [`table`] converts a PDF into semicolon CSV, which the deterministic
//!   parser then reads like any uploaded CSV file
//! - [`records`] reconstructs property records from tables whose columns do
//!   not map cleanly onto canonical fields
//!
//! Both talk to an OpenAI-compatible chat-completions endpoint through the
//! [`ChatGateway`] trait. Calls are made once; a failed call is reported, not
//! retried.

pub mod gateway;
pub mod records;
pub mod table;

pub use gateway::{ChatGateway, ChatRequest, GatewayConfig, GatewayReply, HttpGateway};
pub use records::{
    extract_records, try_extract_records, PropertyRecord, RecordExtraction, RecordInput,
    RecordSummary,
};
pub use table::{extract_csv_from_pdf, try_extract_csv_from_pdf};

/// Default model for PDF table conversion.
pub const DEFAULT_TABLE_MODEL: &str = "google/gemini-2.5-flash";

/// Default model for record extraction.
pub const DEFAULT_RECORD_MODEL: &str = "google/gemini-2.5-pro";

/// Default output-token budget for PDF table conversion.
pub const DEFAULT_MAX_TOKENS: u32 = 32_000;

/// Converted CSV at or below this many characters is treated as a failure.
pub const DEFAULT_MIN_CSV_CHARS: usize = 10;

/// Model selection and limits for the AI stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmOptions {
    pub table_model: String,
    pub record_model: String,
    pub max_tokens: u32,
    pub min_csv_chars: usize,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            table_model: DEFAULT_TABLE_MODEL.to_string(),
            record_model: DEFAULT_RECORD_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            min_csv_chars: DEFAULT_MIN_CSV_CHARS,
        }
    }
}
