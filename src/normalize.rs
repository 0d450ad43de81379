//! Type-directed value normalization.
//!
//! [`normalize_value`] is total: spreadsheet cells are uncontrolled, so any
//! value that does not fit its column type is passed through as-is instead of
//! failing the load.

use crate::{
    data::{FieldValue, RawValue, parse_calendar_date, parse_finite_number},
    schema::FieldType,
};

const TRUTHY_TOKENS: &[&str] = &["true", "yes", "نعم", "1"];

pub fn normalize_value(raw: &RawValue, field_type: FieldType) -> FieldValue {
    if raw.is_empty() {
        return FieldValue::Empty;
    }
    match field_type {
        FieldType::Number => normalize_number(raw),
        FieldType::Date => normalize_date(raw),
        FieldType::Boolean => FieldValue::Boolean(is_truthy(raw)),
        FieldType::Text => FieldValue::Text(raw.as_display().trim().to_string()),
    }
}

/// Normalizes free-form text typed into a form control.
pub fn normalize_input(input: &str, field_type: FieldType) -> FieldValue {
    normalize_value(&RawValue::from(input), field_type)
}

fn normalize_number(raw: &RawValue) -> FieldValue {
    match raw {
        RawValue::Number(number) => FieldValue::Number(*number),
        RawValue::Text(text) => match parse_finite_number(text) {
            Some(number) => FieldValue::Number(number),
            None => FieldValue::from(raw),
        },
        other => FieldValue::from(other),
    }
}

fn normalize_date(raw: &RawValue) -> FieldValue {
    match raw {
        RawValue::Text(text) => match format_calendar_date(text) {
            Some(formatted) => FieldValue::Text(formatted),
            None => FieldValue::from(raw),
        },
        other => FieldValue::from(other),
    }
}

/// Reformats a parseable date as `YYYY-MM-DD`.
pub fn format_calendar_date(value: &str) -> Option<String> {
    parse_calendar_date(value).map(|date| date.format("%Y-%m-%d").to_string())
}

pub fn is_truthy(raw: &RawValue) -> bool {
    match raw {
        RawValue::Boolean(flag) => *flag,
        RawValue::Number(number) => *number == 1.0,
        RawValue::Text(text) => {
            let lowered = text.trim().to_lowercase();
            TRUTHY_TOKENS.contains(&lowered.as_str())
        }
        RawValue::Empty => false,
    }
}
