//! Field type classification from sampled cells.
//!
//! Only the first non-empty sample decides the type. Checks run in a fixed
//! priority (number, date, boolean, text), so a bare year such as `2024` is a
//! NUMBER and never reaches the date rules.

use std::sync::OnceLock;

use regex::Regex;

use crate::{
    data::{RawValue, parse_calendar_date, parse_finite_number},
    schema::FieldType,
};

const BOOLEAN_TOKENS: &[&str] = &["true", "false", "yes", "no", "نعم", "لا"];

static DATE_PREFIXES: OnceLock<Vec<Regex>> = OnceLock::new();

fn date_prefixes() -> &'static [Regex] {
    DATE_PREFIXES.get_or_init(|| {
        [
            r"^[0-9]{4}-[0-9]{2}-[0-9]{2}",
            r"^[0-9]{1,2}/[0-9]{1,2}/[0-9]{4}",
            r"^[0-9]{1,2}-[0-9]{1,2}-[0-9]{4}",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Classifies a column from its samples in source order.
pub fn classify<'a, I>(samples: I) -> FieldType
where
    I: IntoIterator<Item = &'a RawValue>,
{
    samples
        .into_iter()
        .find(|sample| !sample.is_empty())
        .map(classify_value)
        .unwrap_or(FieldType::Text)
}

pub fn classify_value(value: &RawValue) -> FieldType {
    match value {
        RawValue::Empty => FieldType::Text,
        RawValue::Number(number) if number.is_finite() => FieldType::Number,
        RawValue::Number(_) => FieldType::Text,
        RawValue::Boolean(_) => FieldType::Boolean,
        RawValue::Text(text) => classify_text(text),
    }
}

fn classify_text(text: &str) -> FieldType {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        FieldType::Text
    } else if parse_finite_number(trimmed).is_some() {
        FieldType::Number
    } else if looks_like_date(trimmed) {
        FieldType::Date
    } else if is_boolean_token(trimmed) {
        FieldType::Boolean
    } else {
        FieldType::Text
    }
}

pub fn looks_like_date(value: &str) -> bool {
    date_prefixes().iter().any(|pattern| pattern.is_match(value))
        || parse_calendar_date(value).is_some()
}

pub fn is_boolean_token(value: &str) -> bool {
    let lowered = value.trim().to_lowercase();
    BOOLEAN_TOKENS.contains(&lowered.as_str())
}
