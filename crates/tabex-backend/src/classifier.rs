//! Fuzzy column classifier
//!
//! Maps arbitrary, human-written column headers onto canonical fields using
//! an ordered rule list. Order is part of the contract: specific rules come
//! before the general rules they overlap with (`pricePerSqm` before `price`,
//! `rentPerSqm` before `currentRent`).
//!
//! For each column, rules are tried in order. A rule whose field is already
//! claimed by an earlier column is skipped, and the first remaining rule
//! whose pattern matches (and whose exclusion does not) claims the column.
//! A column headed "garantierte … miete" that no rule claims is resolved on
//! the spot by sampling the first data row.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use tabex_core::{ColumnMapping, ColumnMappingEntry, ParsedTable, Result, TabexError};

pub const UNIT_NUMBER: &str = "unitNumber";
pub const TYPE: &str = "type";
pub const AREA: &str = "area";
pub const ROOMS: &str = "rooms";
pub const FLOOR: &str = "floor";
pub const PRICE_PER_SQM: &str = "pricePerSqm";
pub const PRICE: &str = "price";
pub const RENT_PER_SQM: &str = "rentPerSqm";
pub const CURRENT_RENT: &str = "currentRent";
pub const HAUSGELD: &str = "hausgeld";
pub const INSTANDHALTUNG: &str = "instandhaltung";
pub const WEG: &str = "weg";
pub const AMOUNT: &str = "amount";
pub const DATE: &str = "date";
pub const DESCRIPTION: &str = "description";
pub const NAME: &str = "name";
pub const NUMBER: &str = "number";

/// A guaranteed rent above this is a monthly amount, at or below it a rate per m².
pub const RENT_RATE_THRESHOLD: f64 = 10.0;

const PER_SQM: &str = r"(/|pro|je)\s*(qm|m²|m2)";

static GUARANTEED_RENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)garantierte.*miete").expect("Invalid guaranteed rent regex"));

static STANDARD_RULES: Lazy<RuleSet> = Lazy::new(|| {
    let rule = |field: &str, pattern: &str| {
        ColumnRule::new(field, pattern).expect("Invalid standard column pattern")
    };

    RuleSet::new(vec![
        rule(UNIT_NUMBER, r"^(whg|we\b|einheit|nr|top|obj|wohnung|lf\b|unit)"),
        rule(TYPE, r"^(typ|art|nutzung|kategorie)"),
        rule(AREA, r"^(wfl|wohn.*fl|fläche|flaeche|qm|m²|m2|nutzfl)"),
        rule(ROOMS, r"^(zimmer|zi\b|räume|raeume)"),
        rule(FLOOR, r"^(etage|geschoss|og\b|stockwerk|lage|ebene)"),
        rule(
            PRICE_PER_SQM,
            r"^(kaufpreis.*(qm|m²|m2|pro)|preis.*/\s*(qm|m²|m2)|€.*/\s*(qm|m²|m2))",
        ),
        rule(PRICE, r"^(kaufpreis|gesamtkauf|gesamtpreis|vk\b|verkaufspreis|kp\b)")
            .excluding(r"^kaufpreis.*(qm|m²|m2|pro)")
            .expect("Invalid price exclusion"),
        rule(RENT_PER_SQM, &format!(r"^(miete|ist.*miete|kaltmiete|nettomiete|soll.*miete).*{PER_SQM}")),
        rule(
            CURRENT_RENT,
            r"^(miete|ist.*miete|monatsmiete|kaltmiete|nettomiete|akt.*miete|mietein)",
        )
        .excluding(PER_SQM)
        .expect("Invalid rent exclusion"),
        rule(HAUSGELD, r"^(hausgeld|hg\b|eigentümer.*kost)"),
        rule(INSTANDHALTUNG, r"^(instandhaltung|ihr\b|rücklage)"),
        rule(WEG, r"^(weg\b|eigentümer.*gem)"),
        rule(AMOUNT, r"^(betrag|summe|wert|value|amount)"),
        rule(DATE, r"^(datum|date|stichtag|fällig)"),
        rule(DESCRIPTION, r"^(bezeichnung|beschreibung|position|text)"),
        rule(NAME, r"^(name|nachname|firma|company)"),
        rule(NUMBER, r"^(nummer|no\b|vertragsnr|policennr)"),
    ])
});

fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| TabexError::BackendError(format!("Invalid column pattern {pattern:?}: {e}")))
}

/// One `(field, pattern, exclude, priority)` rule.
#[derive(Debug, Clone)]
pub struct ColumnRule {
    field: String,
    pattern: Regex,
    exclude: Option<Regex>,
    priority: u32,
}

impl ColumnRule {
    /// Create a rule. Patterns are matched case-insensitively.
    ///
    /// # Errors
    /// [`TabexError::BackendError`] if the pattern does not compile.
    pub fn new(field: impl Into<String>, pattern: &str) -> Result<Self> {
        Ok(Self {
            field: field.into(),
            pattern: compile(pattern)?,
            exclude: None,
            priority: 0,
        })
    }

    /// Reject headers matching `pattern` even if the main pattern matches.
    ///
    /// # Errors
    /// [`TabexError::BackendError`] if the pattern does not compile.
    pub fn excluding(mut self, pattern: &str) -> Result<Self> {
        self.exclude = Some(compile(pattern)?);
        Ok(self)
    }

    /// Set an explicit priority; lower values are tried first.
    #[inline]
    #[must_use]
    pub const fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    #[inline]
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[inline]
    #[must_use]
    pub const fn priority(&self) -> u32 {
        self.priority
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn exclude(&self) -> Option<&str> {
        self.exclude.as_ref().map(Regex::as_str)
    }

    /// Whether this rule accepts `header`.
    #[must_use]
    pub fn matches(&self, header: &str) -> bool {
        self.pattern.is_match(header)
            && !self.exclude.as_ref().is_some_and(|ex| ex.is_match(header))
    }
}

/// An ordered list of column rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<ColumnRule>,
}

impl RuleSet {
    /// Build a rule set.
    ///
    /// Rules without an explicit priority keep their list position; the
    /// list is then stably sorted by priority.
    #[must_use]
    pub fn new(rules: Vec<ColumnRule>) -> Self {
        let mut rules: Vec<ColumnRule> = rules
            .into_iter()
            .enumerate()
            .map(|(idx, rule)| {
                if rule.priority == 0 {
                    let position = u32::try_from(idx).unwrap_or(u32::MAX);
                    rule.with_priority(position.saturating_add(1).saturating_mul(10))
                } else {
                    rule
                }
            })
            .collect();
        rules.sort_by_key(ColumnRule::priority);
        Self { rules }
    }

    /// The built-in rules for German real-estate and financial documents.
    #[must_use]
    pub fn standard() -> &'static Self {
        &STANDARD_RULES
    }

    /// Rules in evaluation order.
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[ColumnRule] {
        &self.rules
    }

    /// Classify the columns of `table`.
    #[must_use]
    pub fn classify(&self, table: &ParsedTable) -> ColumnMapping {
        let mut claimed: HashSet<&str> = HashSet::new();
        let mut entries = Vec::new();

        for (idx, header) in table.headers.iter().enumerate() {
            let hit = self
                .rules
                .iter()
                .filter(|rule| !claimed.contains(rule.field()))
                .find(|rule| rule.matches(header));

            if let Some(rule) = hit {
                claimed.insert(rule.field());
                entries.push(entry(table, idx, rule.field()));
                continue;
            }

            if !GUARANTEED_RENT.is_match(header) {
                continue;
            }
            if let Some(field) = classify_guaranteed_rent(table, idx) {
                if claimed.insert(field) {
                    log::debug!(
                        "Column {:?} classified as {field} from its first value",
                        table.raw_headers[idx]
                    );
                    entries.push(entry(table, idx, field));
                }
            }
        }

        ColumnMapping::new(entries)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard().clone()
    }
}

fn entry(table: &ParsedTable, idx: usize, field: &str) -> ColumnMappingEntry {
    ColumnMappingEntry {
        original_column: table.raw_headers[idx].clone(),
        mapped_field: field.to_string(),
        column_index: idx,
    }
}

/// A guaranteed rent is either a monthly amount or a rate per m²; the
/// header does not say which, so the first value decides.
fn classify_guaranteed_rent(table: &ParsedTable, idx: usize) -> Option<&'static str> {
    let sample = table
        .first_row()
        .and_then(|row| row.get(idx))
        .filter(|cell| !cell.is_blank())?
        .as_number();

    if sample > RENT_RATE_THRESHOLD {
        Some(CURRENT_RENT)
    } else if sample > 0.0 {
        Some(RENT_PER_SQM)
    } else {
        None
    }
}

/// Classify `table` with the standard rules.
#[must_use]
pub fn classify(table: &ParsedTable) -> ColumnMapping {
    RuleSet::standard().classify(table)
}
