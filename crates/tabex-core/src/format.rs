//! Input format detection
//!
//! A file is classified from its name first and its declared MIME type
//! second. Anything unrecognised is [`InputFormat::Unsupported`], which the
//! pipeline treats as "nothing to extract", not as a failure.

use serde::{Deserialize, Serialize};

/// Tabular input format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Excel or OpenDocument workbook (.xlsx, .xlsm, .xlsb, .xls, .ods)
    Spreadsheet,
    /// Delimited text (.csv)
    Csv,
    /// PDF rendering a table
    Pdf,
    /// Anything else
    Unsupported,
}

impl InputFormat {
    /// Detect the format of a document.
    ///
    /// The filename extension wins; the MIME type is only consulted when the
    /// extension is missing or unknown.
    #[must_use]
    pub fn detect(filename: &str, content_type: &str) -> Self {
        let by_extension = extension_of(filename).and_then(Self::from_extension);
        by_extension
            .or_else(|| Self::from_mime(content_type))
            .unwrap_or(Self::Unsupported)
    }

    /// Map a file extension (without the dot) to a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Spreadsheet),
            "csv" => Some(Self::Csv),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Map a declared MIME type to a format by substring.
    #[must_use]
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let mime = content_type.to_lowercase();
        if mime.contains("spreadsheet") || mime.contains("excel") {
            Some(Self::Spreadsheet)
        } else if mime.contains("text/csv") {
            Some(Self::Csv)
        } else if mime.contains("pdf") {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    /// Whether the pipeline has a path for this format.
    #[inline]
    #[must_use]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Spreadsheet => "spreadsheet",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{s}")
    }
}

fn extension_of(filename: &str) -> Option<&str> {
    let (_, ext) = filename.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_detection() {
        assert_eq!(InputFormat::detect("Mietliste.XLSX", ""), InputFormat::Spreadsheet);
        assert_eq!(InputFormat::detect("alt.xls", ""), InputFormat::Spreadsheet);
        assert_eq!(InputFormat::detect("bestand.ods", ""), InputFormat::Spreadsheet);
        assert_eq!(InputFormat::detect("export.csv", ""), InputFormat::Csv);
        assert_eq!(InputFormat::detect("expose.pdf", ""), InputFormat::Pdf);
    }

    #[test]
    fn test_extension_wins_over_mime() {
        assert_eq!(
            InputFormat::detect("liste.csv", "application/pdf"),
            InputFormat::Csv,
            "extension must be decided before MIME type"
        );
    }

    #[test]
    fn test_mime_fallback() {
        assert_eq!(
            InputFormat::detect(
                "upload",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            ),
            InputFormat::Spreadsheet
        );
        assert_eq!(
            InputFormat::detect("upload.bin", "application/vnd.ms-excel"),
            InputFormat::Spreadsheet
        );
        assert_eq!(InputFormat::detect("blob", "text/csv; charset=utf-8"), InputFormat::Csv);
        assert_eq!(InputFormat::detect("blob", "application/pdf"), InputFormat::Pdf);
    }

    #[test]
    fn test_unsupported() {
        let format = InputFormat::detect("foto.jpg", "image/jpeg");
        assert_eq!(format, InputFormat::Unsupported);
        assert!(!format.is_supported());
        assert_eq!(InputFormat::detect("", ""), InputFormat::Unsupported);
        assert_eq!(InputFormat::detect("trailingdot.", ""), InputFormat::Unsupported);
    }

    #[test]
    fn test_display() {
        assert_eq!(InputFormat::Pdf.to_string(), "pdf");
        assert_eq!(InputFormat::Spreadsheet.to_string(), "spreadsheet");
    }
}
