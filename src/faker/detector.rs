//! PII pattern detection over sampled rows.
//!
//! A column is classified only from at least [`MIN_SAMPLES`] usable values,
//! and a pattern qualifies only when at least 80% of them match it.

use super::identity::Gender;
use crate::config::{FakerColumns, PatternType};
use crate::connection::{Connection, Row, Value};
use crate::error::Result;
use crate::platform::Platform;
use crate::schema::{SchemaInspector, TableKey, SAMPLE_SIZE};
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;

/// Fewest usable values a column needs before it is classified
pub const MIN_SAMPLES: usize = 10;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").unwrap());

// Digits only: optional 7/8 country prefix, then a 9xx mobile number
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[78]?9\d{9}$").unwrap());

static FULL_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[А-ЯЁ][а-яё]+(?:-[А-ЯЁ][а-яё]+)?(?:\s+[А-ЯЁ][а-яё]+(?:-[А-ЯЁ][а-яё]+)?){2}$")
        .unwrap()
});

static SHORT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[А-ЯЁ][а-яё]+(?:-[А-ЯЁ][а-яё]+)?\s+[А-ЯЁ]\.\s?[А-ЯЁ]\.$").unwrap()
});

static SINGLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[А-ЯЁ][а-яё]+(?:-[А-ЯЁ][а-яё]+)?$").unwrap());

type Matcher = fn(&str) -> bool;

/// Value detectors in priority order
const VALUE_DETECTORS: &[(PatternType, Matcher)] = &[
    (PatternType::Email, is_email),
    (PatternType::Phone, is_phone),
    (PatternType::FullName, is_full_name),
    (PatternType::ShortName, is_short_name),
];

fn is_email(v: &str) -> bool {
    EMAIL_RE.is_match(v)
}

fn is_phone(v: &str) -> bool {
    let digits: String = v.chars().filter(char::is_ascii_digit).collect();
    PHONE_RE.is_match(&digits)
}

fn is_full_name(v: &str) -> bool {
    FULL_NAME_RE.is_match(v)
}

fn is_short_name(v: &str) -> bool {
    SHORT_NAME_RE.is_match(v)
}

fn is_single_name(v: &str) -> bool {
    SINGLE_NAME_RE.is_match(v)
}

fn is_gender_token(v: &str) -> bool {
    Gender::parse_token(v).is_some()
}

/// Pattern suggested by a column name, with the matcher its values must pass
fn name_hint(column: &str) -> Option<(PatternType, Matcher)> {
    let name = column.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| name.contains(n));

    if name == "pol" || name.ends_with("_pol") || has(&["gender", "sex"]) {
        Some((PatternType::Gender, is_gender_token))
    } else if has(&["patronymic", "middle_name", "middlename", "otchestvo"]) {
        Some((PatternType::Patronymic, is_single_name))
    } else if has(&["last_name", "lastname", "surname", "family_name", "familiya", "familia"]) {
        Some((PatternType::LastName, is_single_name))
    } else if has(&["first_name", "firstname", "given_name", "imya"]) {
        Some((PatternType::FirstName, is_single_name))
    } else {
        None
    }
}

/// Samples tables and classifies their columns
pub struct PatternDetector;

impl PatternDetector {
    /// Sample up to 200 random rows of a table and classify its columns
    pub fn detect(
        connection: &mut dyn Connection,
        platform: &dyn Platform,
        schema: &str,
        table: &str,
    ) -> Result<FakerColumns> {
        let key = TableKey::new(schema, table);
        let rows = SchemaInspector::new(connection, platform).sample_rows(&key, SAMPLE_SIZE)?;
        let detected = Self::classify(&rows);
        if !detected.is_empty() {
            tracing::debug!(table = %key, columns = detected.len(), "detected PII columns");
        }
        Ok(detected)
    }

    /// Classify every column of `rows`
    pub fn classify(rows: &[Row]) -> FakerColumns {
        let columns: IndexSet<&String> = rows.iter().flat_map(|row| row.keys()).collect();

        let mut detected = FakerColumns::new();
        for column in columns {
            let numeric_ok = is_phone_column(column);
            let values: Vec<String> = rows
                .iter()
                .filter_map(|row| row.get(column))
                .filter_map(|value| usable_text(value, numeric_ok))
                .collect();
            if let Some(pattern) = Self::classify_column(column, &values) {
                detected.insert(column.clone(), pattern);
            }
        }
        detected
    }

    /// Classify one column from its usable values
    pub fn classify_column(column: &str, values: &[String]) -> Option<PatternType> {
        if values.len() < MIN_SAMPLES {
            return None;
        }

        VALUE_DETECTORS
            .iter()
            .find(|(_, matcher)| qualifies(values, *matcher))
            .map(|(pattern, _)| *pattern)
            .or_else(|| {
                name_hint(column)
                    .filter(|(_, matcher)| qualifies(values, *matcher))
                    .map(|(pattern, _)| pattern)
            })
    }
}

/// At least 80% of `values` match, compared in integers
fn qualifies(values: &[String], matcher: Matcher) -> bool {
    let matches = values.iter().filter(|v| matcher(v)).count();
    matches * 5 >= values.len() * 4
}

/// Phone numbers stored in numeric columns
fn is_phone_column(column: &str) -> bool {
    let name = column.to_lowercase();
    ["phone", "tel", "mobile"].iter().any(|n| name.contains(n))
}

/// Non-null, non-boolean, non-blank value as trimmed text. Numbers count
/// only in phone-named columns.
fn usable_text(value: &Value, numeric_ok: bool) -> Option<String> {
    match value {
        Value::Null | Value::Bool(_) => None,
        Value::Int(_) | Value::Float(_) if !numeric_ok => None,
        other => other
            .to_text()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    }
}
