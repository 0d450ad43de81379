//! Raw spreadsheet cells, normalized field values, and the number/date
//! parsing shared by classification, normalization and status resolution.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, MapAccess, Visitor},
    ser::SerializeMap,
};

/// A single cell as handed over by the spreadsheet export.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl RawValue {
    /// Missing cells, nulls and whitespace-only strings carry no data.
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(text) => text.trim().is_empty(),
            RawValue::Number(_) | RawValue::Boolean(_) => false,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            RawValue::Empty => String::new(),
            RawValue::Text(text) => text.clone(),
            RawValue::Number(number) => format_number(*number),
            RawValue::Boolean(flag) => flag.to_string(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::from(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            RawValue::Empty
        } else {
            RawValue::Text(value)
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Number(value as f64)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Boolean(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl Serialize for RawValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RawValue::Empty => serializer.serialize_none(),
            RawValue::Text(text) => serializer.serialize_str(text),
            RawValue::Number(number) => serialize_number(*number, serializer),
            RawValue::Boolean(flag) => serializer.serialize_bool(*flag),
        }
    }
}

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = RawValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string, number, boolean or null")
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<RawValue, E> {
        Ok(RawValue::Boolean(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<RawValue, E> {
        Ok(RawValue::Number(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<RawValue, E> {
        Ok(RawValue::Number(value as f64))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<RawValue, E> {
        Ok(RawValue::Number(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<RawValue, E> {
        Ok(RawValue::from(value))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<RawValue, E> {
        Ok(RawValue::from(value))
    }

    fn visit_none<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Empty)
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Empty)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<RawValue, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

/// One spreadsheet row keyed by column header, in source column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: Vec<(String, RawValue)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a cell, returning the previous value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Option<RawValue> {
        let key = key.into();
        let value = value.into();
        if let Some((_, existing)) = self.fields.iter_mut().find(|(name, _)| *name == key) {
            return Some(std::mem::replace(existing, value));
        }
        self.fields.push((key, value));
        None
    }

    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<String>,
    V: Into<RawValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = RawRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

impl Serialize for RawRecord {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = RawRecord;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a flat object of column names to scalar values")
    }

    fn visit_map<A>(self, mut access: A) -> Result<RawRecord, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut record = RawRecord::new();
        while let Some((key, value)) = access.next_entry::<String, RawValue>()? {
            record.insert(key, value);
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for RawRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RecordVisitor)
    }
}

/// A dynamic field value after type-directed normalization.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(number) => Some(*number),
            FieldValue::Text(text) => parse_finite_number(text),
            _ => None,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::Number(number) => format_number(*number),
            FieldValue::Boolean(flag) => flag.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<&RawValue> for FieldValue {
    fn from(value: &RawValue) -> Self {
        match value {
            RawValue::Empty => FieldValue::Empty,
            RawValue::Text(text) => FieldValue::Text(text.clone()),
            RawValue::Number(number) => FieldValue::Number(*number),
            RawValue::Boolean(flag) => FieldValue::Boolean(*flag),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FieldValue::Empty => serializer.serialize_str(""),
            FieldValue::Text(text) => serializer.serialize_str(text),
            FieldValue::Number(number) => serialize_number(*number, serializer),
            FieldValue::Boolean(flag) => serializer.serialize_bool(*flag),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawValue::deserialize(deserializer)?;
        Ok(FieldValue::from(&raw))
    }
}

/// Whole numbers are written as integers so `500` round-trips as `500`.
fn serialize_number<S: Serializer>(number: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        serializer.serialize_i64(number as i64)
    } else {
        serializer.serialize_f64(number)
    }
}

/// Parses a trimmed token as a finite `f64`; `inf`/`NaN` spellings are rejected.
pub fn parse_finite_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|number| number.is_finite())
}

pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

/// Resolves a calendar date from the layouts spreadsheets commonly emit.
///
/// Slash and hyphen day/month layouts are read month-first; day-first is only
/// tried when month-first is impossible (e.g. `25/12/2024`). Values carrying a
/// UTC offset keep the calendar date as written rather than shifting zones.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let dated = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok().filter(has_full_year));
    if dated.is_some() {
        return dated;
    }
    let timed = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDateTime::parse_from_str(trimmed, fmt)
                .ok()
                .map(|parsed| parsed.date())
                .filter(has_full_year)
        });
    if timed.is_some() {
        return timed;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.date_naive());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(parsed.date_naive());
    }
    None
}

/// `%Y` also accepts one to three digits; `5/6/24` must not become year 24.
fn has_full_year(date: &NaiveDate) -> bool {
    date.year() >= 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_calendar_date_supports_multiple_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(parse_calendar_date("2024-05-06"), Some(expected));
        assert_eq!(parse_calendar_date("5/6/2024"), Some(expected));
        assert_eq!(parse_calendar_date("05-06-2024"), Some(expected));
        assert_eq!(parse_calendar_date("2024-05-06T14:30:00"), Some(expected));
        assert_eq!(parse_calendar_date("2024-05-06T23:30:00-05:00"), Some(expected));
        assert_eq!(parse_calendar_date("May 6, 2024"), Some(expected));
    }

    #[test]
    fn parse_calendar_date_falls_back_to_day_first() {
        let expected = NaiveDate::from_ymd_opt(2024, 12, 25).unwrap();
        assert_eq!(parse_calendar_date("25/12/2024"), Some(expected));
    }

    #[test]
    fn parse_calendar_date_rejects_garbage() {
        assert_eq!(parse_calendar_date(""), None);
        assert_eq!(parse_calendar_date("not a date"), None);
        assert_eq!(parse_calendar_date("2024-13-45"), None);
    }

    #[test]
    fn parse_calendar_date_rejects_short_years() {
        assert_eq!(parse_calendar_date("5/6/24"), None);
        assert_eq!(parse_calendar_date("24-05-06"), None);
        assert_eq!(parse_calendar_date("5/6/24 10:30"), None);
    }

    #[test]
    fn parse_finite_number_rejects_non_finite_tokens() {
        assert_eq!(parse_finite_number(" 500 "), Some(500.0));
        assert_eq!(parse_finite_number("1e3"), Some(1000.0));
        assert_eq!(parse_finite_number("inf"), None);
        assert_eq!(parse_finite_number("NaN"), None);
        assert_eq!(parse_finite_number("1,000"), None);
    }

    #[test]
    fn raw_record_preserves_column_order_and_replaces_duplicates() {
        let mut record: RawRecord = [("Name", "Ali"), ("Bonus", "500")].into_iter().collect();
        let previous = record.insert("Name", "Sara");
        assert_eq!(previous, Some(RawValue::Text("Ali".to_string())));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["Name", "Bonus"]);
        assert_eq!(record.get("Name"), Some(&RawValue::Text("Sara".to_string())));
    }

    #[test]
    fn raw_record_deserializes_mixed_scalars() {
        let record: RawRecord =
            serde_json::from_str(r#"{"Name":"Ali","Bonus":500,"Active":true,"Notes":null,"Extra":""}"#)
                .unwrap();
        assert_eq!(record.get("Bonus"), Some(&RawValue::Number(500.0)));
        assert_eq!(record.get("Active"), Some(&RawValue::Boolean(true)));
        assert_eq!(record.get("Notes"), Some(&RawValue::Empty));
        assert_eq!(record.get("Extra"), Some(&RawValue::Empty));
        assert_eq!(record.keys().next(), Some("Name"));
    }

    #[test]
    fn field_value_empty_serializes_as_blank_string() {
        let json = serde_json::to_string(&FieldValue::Empty).unwrap();
        assert_eq!(json, "\"\"");
        let back: FieldValue = serde_json::from_str("\"\"").unwrap();
        assert_eq!(back, FieldValue::Empty);
        assert_eq!(serde_json::to_string(&FieldValue::Number(500.0)).unwrap(), "500");
        assert_eq!(serde_json::to_string(&FieldValue::Number(2.5)).unwrap(), "2.5");
    }

    #[test]
    fn format_number_drops_trailing_fraction() {
        assert_eq!(format_number(500.0), "500");
        assert_eq!(format_number(12.5), "12.5");
    }
}
