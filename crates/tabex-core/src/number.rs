//! Numeric/locale normalization
//!
//! Cells arrive either as native numbers (spreadsheets) or as text written
//! in German conventions (`1.294.020`, `450,00`, `4,5%`, `55.000 €`).
//! [`parse_locale_number`] turns any of these into a finite `f64`, falling
//! back to `0.0` for anything it cannot read.
//!
//! # Separator convention
//!
//! After stripping everything except digits, `.`, `,` and `-`:
//!
//! 1. A single `,` is the decimal separator; every `.` is a thousands separator.
//! 2. More than one `,` means the commas are thousands separators.
//! 3. With no `,`, more than one `.` means the dots are thousands separators.
//! 4. A single `.` followed by exactly three digits, with a non-zero integer
//!    part, is a thousands separator (`55.000` is fifty-five thousand).
//! 5. Any other single `.` is a decimal point (`149900.00`, `4.5`, `0.125`).
//!
//! Rule 4 means a dot-decimal value with exactly three fractional digits
//! (`1.250` meaning 1.25) is read as 1250. The AI table extractor is told to
//! emit plain dot-decimals without thousands grouping, so its output never
//! hits that case with more than two fractional digits in practice.

use serde::{Deserialize, Serialize};

/// A raw cell as it comes out of a parser.
///
/// CSV sources only ever produce [`CellValue::Text`]; spreadsheets keep
/// numeric cells as [`CellValue::Number`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// A native numeric cell
    Number(f64),
    /// Anything else, including empty cells (`""`)
    Text(String),
}

impl CellValue {
    /// An empty text cell, used for padding.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self::Text(String::new())
    }

    /// Whether the cell is blank (empty or whitespace-only text).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Normalize to a finite number; unparseable input yields `0.0`.
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> f64 {
        match self {
            Self::Number(n) if n.is_finite() => *n,
            Self::Number(_) => 0.0,
            Self::Text(s) => parse_locale_number(s),
        }
    }

    /// Normalize to a trimmed string; numbers use their shortest display.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => n.to_string(),
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Parse a German-formatted number. Never panics, never returns NaN or infinity.
#[must_use]
pub fn parse_locale_number(raw: &str) -> f64 {
    let stripped: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if stripped.is_empty() {
        return 0.0;
    }

    let canonical = canonicalize_separators(&stripped);
    match canonical.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            log::debug!("Unparseable numeric cell {raw:?}, defaulting to 0");
            0.0
        }
    }
}

fn canonicalize_separators(stripped: &str) -> String {
    let commas = stripped.matches(',').count();
    let dots = stripped.matches('.').count();

    match (commas, dots) {
        (1, _) => stripped.replace('.', "").replace(',', "."),
        (c, _) if c > 1 => stripped.replace(',', ""),
        (_, d) if d > 1 => stripped.replace('.', ""),
        (_, 1) if is_thousands_group(stripped) => stripped.replace('.', ""),
        _ => stripped.to_string(),
    }
}

/// A single dot followed by exactly three digits after a non-zero integer part.
fn is_thousands_group(stripped: &str) -> bool {
    let Some((int_part, frac_part)) = stripped.split_once('.') else {
        return false;
    };
    let int_digits = int_part.trim_start_matches('-');
    frac_part.len() == 3
        && frac_part.chars().all(|c| c.is_ascii_digit())
        && !int_digits.is_empty()
        && int_digits.chars().any(|c| c != '0')
}
