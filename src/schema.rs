//! Dynamic schema discovery.
//!
//! This module owns [`FieldType`], the [`FieldDescriptor`] produced for every
//! spreadsheet column the alias tables do not recognise, and the
//! [`SchemaContext`] that holds the alias tables together with the descriptors
//! of the most recent load.
//!
//! ## Responsibilities
//!
//! - Union of column headers across a whole batch, in first-seen order
//! - Exclusion of headers listed in the known-field alias map
//! - Type classification from the first non-empty sample of each column
//! - Storage-safe name normalization and collision resolution
//!
//! Descriptors are rebuilt from scratch on every [`SchemaContext::refresh`];
//! nothing from a previous load survives.

use std::{collections::HashMap, fmt};

use anyhow::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    aliases::AliasTable,
    classify::classify,
    data::{RawRecord, RawValue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Boolean,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub original_name: String,
    pub normalized_name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub is_core: bool,
}

impl FieldDescriptor {
    pub fn new(original_name: &str, field_type: FieldType, is_core: bool) -> Self {
        Self {
            original_name: original_name.to_string(),
            normalized_name: normalize_field_name(original_name),
            field_type,
            is_core,
        }
    }
}

/// Derives the storage-safe key for a column header.
///
/// Whitespace runs become `_`; anything other than ASCII letters, digits,
/// `_` and the Arabic block (U+0600..=U+06FF) is dropped; ASCII is lowercased.
pub fn normalize_field_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_whitespace = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                normalized.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if ch.is_ascii_alphanumeric() || ch == '_' || is_arabic(ch) {
            normalized.push(ch.to_ascii_lowercase());
        }
    }
    normalized
}

fn is_arabic(ch: char) -> bool {
    ('\u{0600}'..='\u{06FF}').contains(&ch)
}

/// Discovers the dynamic fields of a batch.
///
/// When two headers normalize to the same key the first-seen header keeps it
/// and the later one is dropped, so every normalized name maps to exactly one
/// descriptor.
pub fn discover(records: &[RawRecord], aliases: &AliasTable) -> Vec<FieldDescriptor> {
    let mut order: Vec<&str> = Vec::new();
    let mut samples: HashMap<&str, Option<&RawValue>> = HashMap::new();
    for record in records {
        for (key, value) in record.iter() {
            if aliases.is_known(key) {
                continue;
            }
            let sample = samples.entry(key).or_insert_with(|| {
                order.push(key);
                None
            });
            if sample.is_none() && !value.is_empty() {
                *sample = Some(value);
            }
        }
    }

    let mut claimed: HashMap<String, &str> = HashMap::with_capacity(order.len());
    let mut fields = Vec::with_capacity(order.len());
    for key in order {
        let normalized_name = normalize_field_name(key);
        if let Some(winner) = claimed.get(&normalized_name) {
            warn!(
                "Column '{key}' normalizes to '{normalized_name}' which is already taken by '{winner}'; ignoring it"
            );
            continue;
        }
        claimed.insert(normalized_name.clone(), key);
        let field_type = classify(samples.get(key).copied().flatten());
        fields.push(FieldDescriptor {
            original_name: key.to_string(),
            normalized_name,
            field_type,
            is_core: aliases.is_core(key),
        });
    }
    fields
}

/// Alias tables plus the descriptors discovered by the latest load.
#[derive(Debug, Clone, Default)]
pub struct SchemaContext {
    aliases: AliasTable,
    fields: Vec<FieldDescriptor>,
}

impl SchemaContext {
    pub fn new(aliases: AliasTable) -> Self {
        Self {
            aliases,
            fields: Vec::new(),
        }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Replaces the current descriptors with a fresh discovery over `records`.
    pub fn refresh(&mut self, records: &[RawRecord]) -> &[FieldDescriptor] {
        self.fields = discover(records, &self.aliases);
        debug!(
            "Discovered {} dynamic field(s) across {} record(s)",
            self.fields.len(),
            records.len()
        );
        &self.fields
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn non_core_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| !field.is_core)
    }

    pub fn field(&self, normalized_name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|field| field.normalized_name == normalized_name)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.fields)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(pairs: &[(&str, &str)]) -> RawRecord {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn normalize_field_name_handles_spaces_symbols_and_arabic() {
        assert_eq!(normalize_field_name("Bonus Amount"), "bonus_amount");
        assert_eq!(normalize_field_name("  Years   of Service (yrs) "), "_years_of_service_yrs_");
        assert_eq!(normalize_field_name("Salary $"), "salary_");
        assert_eq!(normalize_field_name("رقم الهاتف"), "رقم_الهاتف");
    }

    #[test]
    fn discover_reports_unknown_columns_with_types() {
        let records = vec![record(&[
            ("Name", "Ali"),
            ("Department", "IT"),
            ("Bonus", "500"),
            ("Active", "yes"),
        ])];
        let fields = discover(&records, &AliasTable::default());
        assert_eq!(
            fields,
            vec![
                FieldDescriptor::new("Bonus", FieldType::Number, false),
                FieldDescriptor::new("Active", FieldType::Boolean, false),
            ]
        );
    }

    #[test]
    fn discover_includes_columns_seen_in_a_single_record() {
        let records = vec![
            record(&[("Name", "Ali")]),
            record(&[("Name", "Sara"), ("Hire Source", "Referral")]),
            record(&[("Name", "Omar")]),
        ];
        let fields = discover(&records, &AliasTable::default());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].normalized_name, "hire_source");
        assert_eq!(fields[0].field_type, FieldType::Text);
    }

    #[test]
    fn discover_uses_first_non_empty_value_across_records() {
        let records = vec![
            record(&[("Name", "Ali"), ("Review", "")]),
            record(&[("Name", "Sara"), ("Review", "2024-03-01")]),
            record(&[("Name", "Omar"), ("Review", "pending")]),
        ];
        let fields = discover(&records, &AliasTable::default());
        assert_eq!(fields[0].field_type, FieldType::Date);
    }

    #[test]
    fn discover_keeps_first_header_on_normalized_collision() {
        let records = vec![record(&[("Name", "Ali"), ("Bonus Pay", "10"), ("bonus pay", "x")])];
        let fields = discover(&records, &AliasTable::default());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].original_name, "Bonus Pay");
        assert_eq!(fields[0].field_type, FieldType::Number);
    }

    #[test]
    fn discover_flags_core_names_outside_the_alias_map() {
        let aliases = AliasTable::new(
            [("Name".to_string(), crate::aliases::KnownField::Name)],
            ["Email".to_string()],
        );
        let records = vec![record(&[("Name", "Ali"), ("Email", "ali@example.com")])];
        let fields = discover(&records, &aliases);
        assert_eq!(fields.len(), 1);
        assert!(fields[0].is_core);
    }

    #[test]
    fn refresh_discards_previous_descriptors() {
        let mut context = SchemaContext::default();
        context.refresh(&[record(&[("Name", "Ali"), ("Bonus", "5")])]);
        assert!(context.field("bonus").is_some());
        context.refresh(&[record(&[("Name", "Ali"), ("Shift", "night")])]);
        assert!(context.field("bonus").is_none());
        assert_eq!(context.fields().len(), 1);
        context.refresh(&[]);
        assert!(context.fields().is_empty());
    }

    #[test]
    fn descriptor_serializes_with_camel_case_keys() {
        let descriptor = FieldDescriptor::new("Bonus", FieldType::Number, false);
        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "originalName": "Bonus",
                "normalizedName": "bonus",
                "type": "number",
                "isCore": false
            })
        );
    }

    proptest! {
        #[test]
        fn normalize_field_name_is_idempotent(name in ".*") {
            let once = normalize_field_name(&name);
            prop_assert_eq!(normalize_field_name(&once), once.clone());
        }

        #[test]
        fn discover_never_reports_known_headers(
            extra in proptest::collection::vec("[A-Za-z ]{1,12}", 0..5)
        ) {
            let aliases = AliasTable::default();
            let mut raw = RawRecord::new();
            for header in aliases.known_headers() {
                raw.insert(header, "value");
            }
            for header in &extra {
                raw.insert(header.as_str(), "1");
            }
            let fields = discover(&[raw], &aliases);
            for field in fields {
                prop_assert!(!aliases.is_known(&field.original_name));
            }
        }
    }
}
