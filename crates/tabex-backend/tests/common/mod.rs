//! Shared fixtures for the pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::io::{Cursor, Write as IoWrite};
use std::sync::atomic::{AtomicUsize, Ordering};
use tabex_core::Result;
use tabex_llm::{ChatGateway, ChatRequest, GatewayReply};
use zip::write::FileOptions;
use zip::ZipWriter;

/// A worksheet cell for [`build_xlsx`].
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

fn column_letter(idx: usize) -> char {
    char::from(b'A' + u8::try_from(idx).unwrap())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Build a minimal single-sheet XLSX package in memory.
pub fn build_xlsx(rows: &[Vec<Cell<'_>>]) -> Vec<u8> {
    let mut sheet_rows = String::new();
    for (r, row) in rows.iter().enumerate() {
        sheet_rows.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letter(c), r + 1);
            match cell {
                Cell::Text(text) => sheet_rows.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    escape(text)
                )),
                Cell::Number(n) => {
                    sheet_rows.push_str(&format!(r#"<c r="{reference}"><v>{n}</v></c>"#));
                }
                Cell::Empty => {}
            }
        }
        sheet_rows.push_str("</row>");
    }

    let files = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#
                .to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#
                .to_string(),
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Preisliste" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#
                .to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#
                .to_string(),
        ),
        (
            "xl/worksheets/sheet1.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
            ),
        ),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<()> = FileOptions::default();
    for (name, content) in files {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A gateway that answers every request with the same reply and counts calls.
pub struct StubGateway {
    status: u16,
    body: String,
    calls: AtomicUsize,
}

impl StubGateway {
    pub fn replying(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// A successful chat reply whose message content is `content`.
    pub fn with_content(content: &str) -> Self {
        let body = serde_json::json!({ "choices": [{ "message": { "content": content } }] });
        Self::replying(200, body.to_string())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatGateway for StubGateway {
    async fn send(&self, _request: &ChatRequest) -> Result<GatewayReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayReply {
            status: self.status,
            body: self.body.clone(),
        })
    }
}
