//! Free-form record extraction.
//!
//! Used when a table does not map onto columns cleanly: several attributes
//! packed into one cell, combined address fields, counts hidden in
//! descriptions. The flattened table is sent to the model together with a
//! fixed property-record schema, and the model reconstructs one record per
//! property from the content.
//!
//! The schema is only a request. Every record that comes back is validated
//! and coerced against [`PROPERTY_FIELDS`] before it is returned, and the
//! summary is recomputed from the validated records.

use crate::gateway::{ChatGateway, ChatRequest, Message, MessageContent, ResponseMessage};
use crate::LlmOptions;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tabex_core::{parse_locale_number, CellValue, ParsedTable, Result, TabexError};
use tracing::{debug, info, warn};

/// Name of the forced tool call.
pub const TOOL_NAME: &str = "extract_properties";

/// Confidence assumed for records that carry none.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const RECORD_SYSTEM_PROMPT: &str = "Du bist Analyst für Immobilienbestände und extrahierst \
strukturierte Objektdaten aus Tabellen, die aus Excel- oder CSV-Dateien stammen.

Lies jede Zeile und ordne jede Zahl dem passenden Feld zu, auch bei ungewöhnlichen oder \
abgekürzten Spaltennamen.

Adressen:
- Kombinierte Angaben zerlegen: \"Lindenstraße 4, 80331 München\" ergibt adresse=\"Lindenstraße 4\", plz=\"80331\", ort=\"München\"
- Fehlen PLZ oder Ort, bleiben die Felder leer

Zahlen:
- Deutsche Schreibweise: Punkt trennt Tausender, Komma trennt Dezimalstellen
- Währungs- und Prozentzeichen weglassen
- Werte mit \"p.a.\" sind Jahreswerte (jahresmiete), Werte pro Monat gehören in kaltmiete, annuitaetMonat oder tilgungMonat
- Eine jährliche Annuität wird durch 12 geteilt
- kaufpreis und marktwert sind verschiedene Felder

Objektart:
- \"Wohnen MFH 6 Einheiten\" ergibt art=\"MFH\", nutzung=\"Wohnen\", einheiten=6
- \"ETW\" ergibt art=\"ETW\", nutzung=\"Wohnen\", einheiten=1

Summenzeilen, Leerzeilen und wiederholte Überschriften überspringen.
Eine Zeile pro Objekt, nicht pro Einheit. Fehlt ein Objektcode, vergib OBJ-001, OBJ-002 usw.
Setze confidence ehrlich zwischen 0 und 1 und erkläre Unsicherheiten in notes.";

/// Value type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
}

impl FieldKind {
    const fn json_type(self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Number => "number",
        }
    }
}

/// One field of the property-record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

const fn field(
    name: &'static str,
    kind: FieldKind,
    required: bool,
    description: &'static str,
) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required,
        description,
    }
}

/// The property-record schema, in tool-schema order.
///
/// `confidence` is handled separately; it is always present on a validated record.
pub const PROPERTY_FIELDS: &[FieldSpec] = &[
    field("code", FieldKind::Text, true, "Property code such as OBJ-001"),
    field("art", FieldKind::Text, true, "Property type: MFH, DHH, ETW, RH, EFH, Gewerbe"),
    field("adresse", FieldKind::Text, true, "Street and house number only"),
    field("ort", FieldKind::Text, true, "City name only"),
    field("plz", FieldKind::Text, true, "Five-digit postal code"),
    field("nutzung", FieldKind::Text, false, "Usage: Wohnen, Gewerbe, Gemischt"),
    field("qm", FieldKind::Number, false, "Total area in square metres"),
    field("einheiten", FieldKind::Number, false, "Number of units (1 for ETW/EFH)"),
    field("baujahr", FieldKind::Number, false, "Year built, four digits"),
    field("kaltmiete", FieldKind::Number, false, "Monthly cold rent in EUR, never annual"),
    field("jahresmiete", FieldKind::Number, false, "Annual rental income in EUR, never monthly"),
    field("marktwert", FieldKind::Number, false, "Current market value (Verkehrswert) in EUR"),
    field("kaufpreis", FieldKind::Number, false, "Original purchase price in EUR, distinct from marktwert"),
    field("restschuld", FieldKind::Number, false, "Outstanding loan balance in EUR"),
    field("annuitaetMonat", FieldKind::Number, false, "Monthly loan payment in EUR"),
    field("tilgungMonat", FieldKind::Number, false, "Monthly principal repayment in EUR"),
    field("zinsfestschreibungBis", FieldKind::Text, false, "End of the fixed-interest period (ISO or DD.MM.YYYY)"),
    field("ueberschussJahr", FieldKind::Number, false, "Annual cash-flow surplus or deficit in EUR"),
    field("bank", FieldKind::Text, false, "Lending bank"),
    field("notes", FieldKind::Text, false, "What was unclear, estimated or possibly wrong"),
];

/// A validated property record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub art: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adresse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plz: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutzung: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub einheiten: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baujahr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kaltmiete: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jahresmiete: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marktwert: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kaufpreis: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restschuld: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annuitaet_monat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tilgung_monat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zinsfestschreibung_bis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ueberschuss_jahr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub confidence: f64,
}

impl PropertyRecord {
    /// Validate one raw record object from the model.
    ///
    /// Returns the record and the names of required fields it lacks.
    #[must_use]
    pub fn from_raw(raw: &Map<String, Value>) -> (Self, Vec<&'static str>) {
        let text = |name: &str| raw.get(name).and_then(coerce_text);
        let number = |name: &str| raw.get(name).and_then(coerce_number);

        let record = Self {
            code: text("code"),
            art: text("art"),
            adresse: text("adresse"),
            ort: text("ort"),
            plz: text("plz"),
            nutzung: text("nutzung"),
            qm: number("qm"),
            einheiten: number("einheiten"),
            baujahr: number("baujahr"),
            kaltmiete: number("kaltmiete"),
            jahresmiete: number("jahresmiete"),
            marktwert: number("marktwert"),
            kaufpreis: number("kaufpreis"),
            restschuld: number("restschuld"),
            annuitaet_monat: number("annuitaetMonat"),
            tilgung_monat: number("tilgungMonat"),
            zinsfestschreibung_bis: text("zinsfestschreibungBis"),
            ueberschuss_jahr: number("ueberschussJahr"),
            bank: text("bank"),
            notes: text("notes"),
            confidence: raw
                .get("confidence")
                .and_then(coerce_number)
                .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0)),
        };

        let missing = PROPERTY_FIELDS
            .iter()
            .filter(|spec| spec.required)
            .filter(|spec| !record.has_text(spec.name))
            .map(|spec| spec.name)
            .collect();

        (record, missing)
    }

    fn has_text(&self, name: &str) -> bool {
        match name {
            "code" => self.code.is_some(),
            "art" => self.art.is_some(),
            "adresse" => self.adresse.is_some(),
            "ort" => self.ort.is_some(),
            "plz" => self.plz.is_some(),
            _ => true,
        }
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) if !s.trim().is_empty() => Some(parse_locale_number(s)),
        _ => None,
    }
}

/// Recomputed summary of a record extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    /// Data rows that were sent to the model
    pub row_count: usize,
    /// Distinct entities among the returned records
    pub unique_entities: usize,
    pub avg_confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_portfolio_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_annual_income: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_debt: Option<f64>,
    pub issues: Vec<String>,
}

/// Records plus summary. An empty record list is a normal outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordExtraction {
    pub records: Vec<PropertyRecord>,
    pub summary: RecordSummary,
}

impl RecordExtraction {
    /// An empty result carrying one issue.
    #[must_use]
    pub fn failed(row_count: usize, issue: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            summary: RecordSummary {
                row_count,
                issues: vec![issue.into()],
                ..RecordSummary::default()
            },
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Table content handed to the record extractor.
#[derive(Debug, Clone, Copy)]
pub struct RecordInput<'a> {
    pub headers: &'a [String],
    pub rows: &'a [Vec<CellValue>],
    pub file_name: Option<&'a str>,
    pub hint: Option<&'a str>,
}

impl<'a> RecordInput<'a> {
    /// Use a parsed table, keeping the headers as written in the source.
    #[must_use]
    pub fn from_table(table: &'a ParsedTable) -> Self {
        Self {
            headers: &table.raw_headers,
            rows: &table.rows,
            file_name: None,
            hint: None,
        }
    }

    #[must_use]
    pub const fn with_file_name(mut self, file_name: &'a str) -> Self {
        self.file_name = Some(file_name);
        self
    }

    #[must_use]
    pub const fn with_hint(mut self, hint: Option<&'a str>) -> Self {
        self.hint = hint;
        self
    }
}

/// Render headers and rows as `a | b | c` lines under a dashed rule.
#[must_use]
pub fn flatten_table(headers: &[String], rows: &[Vec<CellValue>]) -> String {
    let header_line = headers.join(" | ");
    let rule = "-".repeat(header_line.chars().count());
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(header_line);
    lines.push(rule);
    for row in rows {
        let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
        lines.push(cells.join(" | "));
    }
    lines.join("\n")
}

/// JSON schema of the `extract_properties` tool.
#[must_use]
pub fn tool_schema() -> Value {
    let mut properties = Map::new();
    for spec in PROPERTY_FIELDS {
        let mut def = json!({
            "type": spec.kind.json_type(),
            "description": spec.description,
        });
        if !spec.required {
            def["nullable"] = Value::Bool(true);
        }
        properties.insert(spec.name.to_string(), def);
    }
    properties.insert(
        "confidence".to_string(),
        json!({ "type": "number", "description": "Extraction confidence between 0.0 and 1.0" }),
    );

    let mut required: Vec<&str> = PROPERTY_FIELDS
        .iter()
        .filter(|spec| spec.required)
        .map(|spec| spec.name)
        .collect();
    required.push("confidence");

    json!({
        "type": "function",
        "function": {
            "name": TOOL_NAME,
            "description": "Extract every property in the table with all financial figures that can be found.",
            "parameters": {
                "type": "object",
                "properties": {
                    "properties": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": properties,
                            "required": required,
                        },
                    },
                    "summary": {
                        "type": "object",
                        "properties": {
                            "totalRows": { "type": "number", "description": "Data rows in the table" },
                            "uniqueProperties": { "type": "number", "description": "Distinct properties extracted" },
                            "avgConfidence": { "type": "number", "description": "Average confidence" },
                            "issues": {
                                "type": "array",
                                "items": { "type": "string" },
                                "description": "Data quality issues and observations",
                            },
                        },
                    },
                },
                "required": ["properties", "summary"],
            },
        },
    })
}

/// Build the record-extraction request.
#[must_use]
pub fn build_record_request(options: &LlmOptions, input: &RecordInput<'_>) -> ChatRequest {
    let mut system_prompt = RECORD_SYSTEM_PROMPT.to_string();
    if let Some(hint) = input.hint.map(str::trim).filter(|h| !h.is_empty()) {
        system_prompt.push_str("\n\nKONTEXT: ");
        system_prompt.push_str(hint);
    }

    let user_text = format!(
        "Analysiere diese Immobilien-Tabelle.\n\nDateiname: {}\nDatenzeilen: {}\nSpalten: {}\nSpaltenköpfe: {}\n\nTabelle:\n{}",
        input.file_name.unwrap_or("unbekannt"),
        input.rows.len(),
        input.headers.len(),
        input.headers.join(", "),
        flatten_table(input.headers, input.rows),
    );

    ChatRequest {
        model: options.record_model.clone(),
        messages: vec![
            Message::system(system_prompt),
            Message::user(MessageContent::Text(user_text)),
        ],
        temperature: None,
        max_tokens: None,
        tools: Some(vec![tool_schema()]),
        tool_choice: Some(json!({ "type": "function", "function": { "name": TOOL_NAME } })),
    }
}

/// Raw records and model-reported issues, before validation.
#[derive(Debug, Default)]
struct DecodedPayload {
    records: Vec<Map<String, Value>>,
    issues: Vec<String>,
}

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("valid fence regex"));

/// Interpret a JSON value as a payload: an object with a `properties`
/// array, or a bare array of records.
fn payload_from_value(value: Value) -> Option<DecodedPayload> {
    let (items, issues) = match value {
        Value::Array(items) => (items, Vec::new()),
        Value::Object(mut obj) => {
            let items = match obj.remove("properties") {
                Some(Value::Array(items)) => items,
                _ => return None,
            };
            let issues = obj
                .get("summary")
                .and_then(|s| s.get("issues"))
                .and_then(Value::as_array)
                .map(|list| list.iter().filter_map(coerce_text).collect())
                .unwrap_or_default();
            (items, issues)
        }
        _ => return None,
    };

    let records: Vec<Map<String, Value>> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(obj) => Some(obj),
            _ => None,
        })
        .collect();

    (!records.is_empty()).then_some(DecodedPayload { records, issues })
}

/// Find the records in a response, trying each place a model puts them.
fn decode_payload(message: &ResponseMessage) -> Option<DecodedPayload> {
    if let Some(call) = message.tool_calls.first() {
        let args = match &call.function.arguments {
            Value::String(s) => serde_json::from_str(s).ok(),
            other @ Value::Object(_) => Some(other.clone()),
            _ => None,
        };
        if let Some(payload) = args.and_then(payload_from_value) {
            debug!("Records decoded from tool call");
            return Some(payload);
        }
    }

    let content = message.content.as_deref()?.trim();

    if let Some(payload) = serde_json::from_str(content).ok().and_then(payload_from_value) {
        debug!("Records decoded from message content");
        return Some(payload);
    }

    if let Some(payload) = FENCED_JSON
        .captures(content)
        .and_then(|c| serde_json::from_str(c[1].trim()).ok())
        .and_then(payload_from_value)
    {
        debug!("Records decoded from fenced block");
        return Some(payload);
    }

    let start = content.find('[')?;
    let end = content.rfind(']')?;
    if end <= start {
        return None;
    }
    let payload = serde_json::from_str(&content[start..=end])
        .ok()
        .and_then(payload_from_value)?;
    debug!("Records decoded from bracketed array");
    Some(payload)
}

/// Validate decoded records and recompute the summary.
fn validate(payload: DecodedPayload, row_count: usize) -> RecordExtraction {
    let mut issues = payload.issues;
    let mut records = Vec::with_capacity(payload.records.len());

    for (idx, raw) in payload.records.iter().enumerate() {
        let (record, missing) = PropertyRecord::from_raw(raw);
        if !missing.is_empty() {
            let label = record
                .code
                .clone()
                .unwrap_or_else(|| format!("#{}", idx + 1));
            issues.push(format!("Record {label}: missing {}", missing.join(", ")));
        }
        records.push(record);
    }

    let summary = summarize(&records, row_count, issues);
    RecordExtraction { records, summary }
}

fn summarize(records: &[PropertyRecord], row_count: usize, issues: Vec<String>) -> RecordSummary {
    let mut codes = HashSet::new();
    let mut uncoded = 0;
    for record in records {
        match &record.code {
            Some(code) => {
                codes.insert(code.as_str());
            }
            None => uncoded += 1,
        }
    }

    let avg_confidence = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.confidence).sum::<f64>() / records.len() as f64
    };

    let total = |get: fn(&PropertyRecord) -> Option<f64>| -> Option<f64> {
        let values: Vec<f64> = records.iter().filter_map(get).collect();
        (!values.is_empty()).then(|| values.iter().sum())
    };

    RecordSummary {
        row_count,
        unique_entities: codes.len() + uncoded,
        avg_confidence,
        total_portfolio_value: total(|r| r.marktwert),
        total_annual_income: total(|r| r.jahresmiete),
        total_debt: total(|r| r.restschuld),
        issues,
    }
}

/// Issue text for a failed record extraction.
#[must_use]
pub fn failure_issue(err: &TabexError) -> String {
    match err {
        TabexError::GatewayError { status: 429, .. } => {
            "Rate limit reached, try again later".to_string()
        }
        TabexError::GatewayError { status: 402, .. } => "AI credits exhausted".to_string(),
        TabexError::ImplausibleResponse { .. } => "No property records recognised".to_string(),
        other => format!("Record extraction failed: {other}"),
    }
}

/// Extract property records from a table.
///
/// # Errors
///
/// - [`TabexError::GatewayError`] for a non-success status (429 and 402 included)
/// - [`TabexError::GatewayUnavailable`] if the request could not be sent
/// - [`TabexError::ImplausibleResponse`] if no records could be decoded
pub async fn try_extract_records(
    gateway: &dyn ChatGateway,
    options: &LlmOptions,
    input: &RecordInput<'_>,
) -> Result<RecordExtraction> {
    info!(
        rows = input.rows.len(),
        columns = input.headers.len(),
        file = input.file_name.unwrap_or("unknown"),
        "Extracting property records via AI gateway"
    );

    let request = build_record_request(options, input);
    let response = gateway.send(&request).await?.into_response()?;
    let message = response.first_message().cloned().unwrap_or_default();

    debug!(
        tool_calls = message.tool_calls.len(),
        has_content = message.content.is_some(),
        "Record response received"
    );

    let payload = decode_payload(&message).ok_or_else(|| TabexError::ImplausibleResponse {
        chars: message.content.as_deref().map_or(0, |c| c.chars().count()),
    })?;

    let extraction = validate(payload, input.rows.len());
    info!(
        records = extraction.records.len(),
        issues = extraction.summary.issues.len(),
        "Property records extracted"
    );
    Ok(extraction)
}

/// Extract property records, reporting any failure as a summary issue.
pub async fn extract_records(
    gateway: &dyn ChatGateway,
    options: &LlmOptions,
    input: &RecordInput<'_>,
) -> RecordExtraction {
    match try_extract_records(gateway, options, input).await {
        Ok(extraction) => extraction,
        Err(e) => {
            warn!(error = %e, "Record extraction failed");
            RecordExtraction::failed(input.rows.len(), failure_issue(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: Option<&str>, arguments: Option<Value>) -> ResponseMessage {
        let mut value = json!({ "content": content });
        if let Some(args) = arguments {
            value["tool_calls"] = json!([{ "function": { "name": TOOL_NAME, "arguments": args } }]);
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_flatten_table() {
        let headers = vec!["Objekt".to_string(), "Miete".to_string()];
        let rows = vec![
            vec![CellValue::from("MFH Lindenstraße"), CellValue::Number(1450.0)],
            vec![CellValue::from("ETW"), CellValue::empty()],
        ];
        assert_eq!(
            flatten_table(&headers, &rows),
            "Objekt | Miete\n--------------\nMFH Lindenstraße | 1450\nETW | "
        );
    }

    #[test]
    fn test_tool_schema_marks_required_fields() {
        let schema = tool_schema();
        let items = &schema["function"]["parameters"]["properties"]["properties"]["items"];
        let required: Vec<&str> = items["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, ["code", "art", "adresse", "ort", "plz", "confidence"]);
        assert_eq!(items["properties"]["qm"]["type"], "number");
        assert_eq!(items["properties"]["qm"]["nullable"], true);
        assert!(items["properties"]["plz"].get("nullable").is_none());
        assert_eq!(schema["function"]["name"], TOOL_NAME);
    }

    #[test]
    fn test_from_raw_coerces_values() {
        let raw = json!({
            "code": " OBJ-001 ",
            "art": "MFH",
            "adresse": "Lindenstraße 4",
            "ort": "München",
            "plz": 80331,
            "marktwert": "1.294.020 €",
            "kaltmiete": 2450.5,
            "bank": "",
            "confidence": 1.7,
        });
        let (record, missing) = PropertyRecord::from_raw(raw.as_object().unwrap());

        assert!(missing.is_empty(), "all required fields present: {missing:?}");
        assert_eq!(record.code.as_deref(), Some("OBJ-001"));
        assert_eq!(record.plz.as_deref(), Some("80331"));
        assert_eq!(record.marktwert, Some(1_294_020.0));
        assert_eq!(record.kaltmiete, Some(2450.5));
        assert_eq!(record.bank, None, "blank strings become absent");
        assert_eq!(record.confidence, 1.0, "confidence is clamped");
    }

    #[test]
    fn test_from_raw_reports_missing_required() {
        let raw = json!({ "code": "OBJ-002", "art": "ETW" });
        let (record, missing) = PropertyRecord::from_raw(raw.as_object().unwrap());
        assert_eq!(missing, ["adresse", "ort", "plz"]);
        assert_eq!(record.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_decode_tool_call_string_arguments() {
        let args = json!({
            "properties": [{ "code": "OBJ-001" }],
            "summary": { "issues": ["Summenzeile ignoriert"] },
        })
        .to_string();
        let payload = decode_payload(&message(None, Some(Value::String(args)))).unwrap();
        assert_eq!(payload.records.len(), 1);
        assert_eq!(payload.issues, ["Summenzeile ignoriert"]);
    }

    #[test]
    fn test_decode_tool_call_object_arguments() {
        let args = json!({ "properties": [{ "code": "A" }, { "code": "B" }] });
        let payload = decode_payload(&message(None, Some(args))).unwrap();
        assert_eq!(payload.records.len(), 2);
    }

    #[test]
    fn test_decode_falls_back_to_content() {
        let as_object = r#"{"properties":[{"code":"OBJ-001"}]}"#;
        assert!(decode_payload(&message(Some(as_object), None)).is_some());

        let as_array = r#"[{"code":"OBJ-001"}]"#;
        assert!(decode_payload(&message(Some(as_array), None)).is_some());

        let fenced = "Hier die Daten:\n```json\n[{\"code\":\"OBJ-001\"}]\n```";
        assert!(decode_payload(&message(Some(fenced), None)).is_some());

        let inline = "Ergebnis: [{\"code\":\"OBJ-001\"}] fertig";
        assert!(decode_payload(&message(Some(inline), None)).is_some());
    }

    #[test]
    fn test_decode_skips_empty_tool_call() {
        let args = Value::String(r#"{"properties":[],"summary":{}}"#.to_string());
        let content = r#"[{"code":"OBJ-009"}]"#;
        let payload = decode_payload(&message(Some(content), Some(args))).unwrap();
        assert_eq!(payload.records[0]["code"], "OBJ-009");
    }

    #[test]
    fn test_decode_nothing_usable() {
        assert!(decode_payload(&message(Some("Keine Daten gefunden."), None)).is_none());
        assert!(decode_payload(&message(None, None)).is_none());
    }

    #[test]
    fn test_summary_is_recomputed() {
        let payload = DecodedPayload {
            records: vec![
                json!({ "code": "A", "art": "MFH", "adresse": "x", "ort": "y", "plz": "1",
                        "marktwert": 100.0, "confidence": 0.9 }),
                json!({ "code": "A", "marktwert": 50.0, "restschuld": 20.0, "confidence": 0.5 }),
                json!({ "confidence": 0.1 }),
            ]
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect(),
            issues: vec!["from model".to_string()],
        };

        let extraction = validate(payload, 7);
        let summary = &extraction.summary;
        assert_eq!(summary.row_count, 7);
        assert_eq!(summary.unique_entities, 2, "duplicate code counted once, uncoded once");
        assert!((summary.avg_confidence - 0.5).abs() < 1e-9);
        assert_eq!(summary.total_portfolio_value, Some(150.0));
        assert_eq!(summary.total_debt, Some(20.0));
        assert_eq!(summary.total_annual_income, None);
        assert_eq!(summary.issues[0], "from model");
        assert_eq!(summary.issues.len(), 3, "two records lack required fields");
    }

    #[test]
    fn test_failure_issue_distinguishes_statuses() {
        assert!(failure_issue(&TabexError::gateway(429, "")).contains("Rate limit"));
        assert!(failure_issue(&TabexError::gateway(402, "")).contains("credits"));
        assert!(failure_issue(&TabexError::gateway(500, "boom")).contains("500"));
    }
}
