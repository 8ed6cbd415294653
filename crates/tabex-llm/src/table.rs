//! PDF to CSV conversion through a vision-capable model.
//!
//! The model is used strictly as a format converter: it returns
//! semicolon-delimited CSV which is then parsed by the same deterministic CSV
//! reader as uploaded CSV files. Classification and normalization never see
//! model output directly.

use crate::gateway::{ChatGateway, ChatRequest, ContentPart, ImageUrl, Message, MessageContent};
use crate::LlmOptions;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use tabex_core::{Result, TabexError};
use tracing::{info, warn};

const CSV_EXTRACTION_PROMPT: &str = "Du bist ein präziser Tabellen-Extraktor. Gib ALLE Tabellenzeilen \
dieses Dokuments als CSV aus.

Regeln:
- Erste Zeile: die Spaltenüberschriften genau wie im Dokument
- Jede weitere Zeile: genau eine Datenzeile des Dokuments
- Trennzeichen ist das Semikolon (;)
- Zahlen mit Punkt als Dezimaltrennzeichen und ohne Tausenderpunkte (149900.00 statt 149.900,00)
- Währungszeichen (€, EUR) und Prozentzeichen entfernen (4.5 statt 4,5%)
- Leere Felder leer lassen (zwei Semikolons hintereinander)
- Keine Zeile auslassen, auch keine Summen- oder Zwischenzeilen
- Kein Markdown, kein Codeblock, keine Backticks, keine Erklärungen

Antworte ausschließlich mit dem CSV-Text.";

const CSV_USER_INSTRUCTION: &str = "Extrahiere alle Tabellenzeilen aus diesem PDF als CSV.";

static LEADING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```(?:csv)?[ \t]*\r?\n?").expect("valid fence regex"));
static TRAILING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r?\n?```\s*$").expect("valid fence regex"));

/// Build the conversion request for a PDF.
#[must_use]
pub fn build_table_request(options: &LlmOptions, pdf: &[u8], hint: Option<&str>) -> ChatRequest {
    let mut system_prompt = CSV_EXTRACTION_PROMPT.to_string();
    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        system_prompt.push_str("\n\nKONTEXT: ");
        system_prompt.push_str(hint);
    }

    let encoded = base64::engine::general_purpose::STANDARD.encode(pdf);

    ChatRequest {
        model: options.table_model.clone(),
        messages: vec![
            Message::system(system_prompt),
            Message::user(MessageContent::Parts(vec![
                ContentPart::Text {
                    text: CSV_USER_INSTRUCTION.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:application/pdf;base64,{encoded}"),
                    },
                },
            ])),
        ],
        temperature: Some(0.0),
        max_tokens: Some(options.max_tokens),
        tools: None,
        tool_choice: None,
    }
}

/// Remove a leading ```` ```csv ```` and a trailing ```` ``` ```` if the model added them.
#[must_use]
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let without_leading = LEADING_FENCE.replace(trimmed, "");
    let without_trailing = TRAILING_FENCE.replace(&without_leading, "");
    without_trailing.trim().to_string()
}

/// Convert a PDF to semicolon-delimited CSV text.
///
/// # Errors
///
/// - [`TabexError::GatewayError`] for a non-success status
/// - [`TabexError::GatewayUnavailable`] if the request could not be sent
/// - [`TabexError::ImplausibleResponse`] if the cleaned text is not longer
///   than `options.min_csv_chars`
pub async fn try_extract_csv_from_pdf(
    gateway: &dyn ChatGateway,
    options: &LlmOptions,
    pdf: &[u8],
    hint: Option<&str>,
) -> Result<String> {
    info!(bytes = pdf.len(), "Extracting tables from PDF via AI gateway");

    let request = build_table_request(options, pdf, hint);
    let response = gateway.send(&request).await?.into_response()?;

    let content = response
        .first_message()
        .and_then(|m| m.content.as_deref())
        .unwrap_or_default();
    let csv = strip_code_fences(content);

    if csv.chars().count() <= options.min_csv_chars {
        return Err(TabexError::ImplausibleResponse {
            chars: csv.chars().count(),
        });
    }

    let data_rows = csv
        .lines()
        .filter(|l| !l.trim().is_empty())
        .count()
        .saturating_sub(1);
    info!(data_rows, chars = csv.len(), "CSV extracted from PDF");

    Ok(csv)
}

/// Convert a PDF to CSV text, or `None` if the gateway failed.
///
/// Failures are logged with status and truncated body; nothing is retried.
pub async fn extract_csv_from_pdf(
    gateway: &dyn ChatGateway,
    options: &LlmOptions,
    pdf: &[u8],
    hint: Option<&str>,
) -> Option<String> {
    match try_extract_csv_from_pdf(gateway, options, pdf, hint).await {
        Ok(csv) => Some(csv),
        Err(e) => {
            warn!(error = %e, "CSV extraction from PDF failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```csv\nA;B\n1;2\n```"), "A;B\n1;2");
        assert_eq!(strip_code_fences("```CSV\nA;B\n```  "), "A;B");
        assert_eq!(strip_code_fences("```\nA;B\n```"), "A;B");
        assert_eq!(strip_code_fences("  A;B\n1;2  "), "A;B\n1;2");
    }

    #[test]
    fn test_strip_code_fences_keeps_inner_content() {
        let csv = "Whg;Kaufpreis\n1;149900.00";
        assert_eq!(strip_code_fences(csv), csv);
    }

    #[test]
    fn test_build_request_with_hint() {
        let options = LlmOptions::default();
        let request = build_table_request(&options, b"%PDF-1.7", Some("Preisliste Neubau"));

        assert_eq!(request.model, options.table_model);
        assert_eq!(request.temperature, Some(0.0));
        assert_eq!(request.max_tokens, Some(32_000));

        let value = serde_json::to_value(&request).unwrap();
        let system = value["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("Semikolon"), "prompt must force semicolons");
        assert!(system.ends_with("KONTEXT: Preisliste Neubau"));

        let url = value["messages"][1]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert_eq!(url, "data:application/pdf;base64,JVBERi0xLjc=");
    }

    #[test]
    fn test_build_request_ignores_blank_hint() {
        let request = build_table_request(&LlmOptions::default(), b"x", Some("   "));
        let value = serde_json::to_value(&request).unwrap();
        let system = value["messages"][0]["content"].as_str().unwrap();
        assert!(!system.contains("KONTEXT"));
    }
}
