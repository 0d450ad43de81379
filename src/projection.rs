//! Projections of the discovered schema onto forms and tables.
//!
//! Each [`FieldType`] maps to exactly one form control and one display rule,
//! so renderers never branch on dynamic field names. The employee form lists
//! the fixed attributes first, then the editable dynamic fields.

use std::{borrow::Cow, collections::BTreeMap};

use anyhow::Result;
use heck::ToTitleCase;
use serde::Serialize;

use crate::{
    aliases::KnownField,
    data::{FieldValue, format_number},
    normalize::{format_calendar_date, normalize_input},
    schema::{FieldDescriptor, FieldType},
    transform::{CanonicalRecord, EmployeeStatus},
};

pub const FORM_FIELD_PREFIX: &str = "dynamic_";

/// Fixed attributes on the employee form, in display order.
pub const FORM_CORE_FIELDS: &[KnownField] = &[
    KnownField::Name,
    KnownField::Id,
    KnownField::Email,
    KnownField::Nationality,
    KnownField::Department,
    KnownField::JobTitle,
    KnownField::Location,
    KnownField::Status,
    KnownField::StartDate,
    KnownField::EndDate,
    KnownField::Notes,
];

const TABLE_CORE_COLUMNS: &[KnownField] = &[
    KnownField::Name,
    KnownField::Id,
    KnownField::Department,
    KnownField::JobTitle,
    KnownField::Location,
    KnownField::Status,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ControlKind {
    Text,
    Email,
    Textarea,
    Number,
    Date,
    Select { options: Vec<SelectOption> },
}

fn option(value: &str, label: &str) -> SelectOption {
    SelectOption {
        value: value.to_string(),
        label: label.to_string(),
    }
}

impl FieldType {
    pub fn control_kind(&self) -> ControlKind {
        match self {
            FieldType::Text => ControlKind::Text,
            FieldType::Number => ControlKind::Number,
            FieldType::Date => ControlKind::Date,
            FieldType::Boolean => ControlKind::Select {
                options: vec![option("true", "Yes"), option("false", "No")],
            },
        }
    }
}

impl KnownField {
    pub fn control_kind(&self) -> ControlKind {
        match self {
            KnownField::Email => ControlKind::Email,
            KnownField::Notes => ControlKind::Textarea,
            KnownField::StartDate | KnownField::EndDate => ControlKind::Date,
            KnownField::Status => ControlKind::Select {
                options: [EmployeeStatus::Active, EmployeeStatus::Inactive]
                    .into_iter()
                    .map(|status| option(status.as_str(), status_label(status)))
                    .collect(),
            },
            _ => ControlKind::Text,
        }
    }
}

impl ControlKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlKind::Text => "text",
            ControlKind::Email => "email",
            ControlKind::Textarea => "textarea",
            ControlKind::Number => "number",
            ControlKind::Date => "date",
            ControlKind::Select { .. } => "select",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormControl {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: ControlKind,
    pub value: String,
}

pub fn form_field_name(field: &FieldDescriptor) -> String {
    format!("{FORM_FIELD_PREFIX}{}", field.normalized_name)
}

/// Human label for a column header.
///
/// Underscores become spaces; pure-ASCII labels are title-cased while other
/// scripts are left exactly as written.
pub fn format_field_label(name: &str) -> Cow<'_, str> {
    if name.is_ascii() {
        Cow::Owned(name.to_title_case())
    } else if name.contains('_') {
        Cow::Owned(name.replace('_', " "))
    } else {
        Cow::Borrowed(name)
    }
}

/// Text shown for a normalized value in tables and cards.
pub fn display_value(value: &FieldValue, field_type: FieldType) -> String {
    match (value, field_type) {
        (FieldValue::Empty, _) => String::new(),
        (FieldValue::Number(number), FieldType::Number) => group_thousands(*number),
        (FieldValue::Text(text), FieldType::Date) => {
            format_calendar_date(text).unwrap_or_else(|| text.clone())
        }
        (FieldValue::Boolean(flag), FieldType::Boolean) => yes_no(*flag).to_string(),
        (FieldValue::Text(text), FieldType::Boolean) => {
            let truthy = matches!(normalize_input(text, FieldType::Boolean), FieldValue::Boolean(true));
            yes_no(truthy).to_string()
        }
        (other, _) => other.as_display(),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn input_value(value: Option<&FieldValue>) -> String {
    value.map(FieldValue::as_display).unwrap_or_default()
}

/// The employee form pre-filled from `record`: fixed attributes first, then
/// the editable dynamic fields.
///
/// Core-flagged and hidden dynamic fields are left out. A new employee's
/// status starts as active.
pub fn form_controls(
    fields: &[FieldDescriptor],
    hidden: &[String],
    record: Option<&CanonicalRecord>,
) -> Vec<FormControl> {
    let core = FORM_CORE_FIELDS.iter().map(|field| FormControl {
        name: field.as_str().to_string(),
        label: format_field_label(field.as_str()).into_owned(),
        kind: field.control_kind(),
        value: match record {
            Some(record) => record.attribute(*field).to_string(),
            None if *field == KnownField::Status => EmployeeStatus::default().as_str().to_string(),
            None => String::new(),
        },
    });
    let dynamic = editable_fields(fields, hidden).map(|field| FormControl {
        name: form_field_name(field),
        label: format_field_label(&field.original_name).into_owned(),
        kind: field.field_type.control_kind(),
        value: input_value(record.and_then(|record| record.dynamic(&field.normalized_name))),
    });
    core.chain(dynamic).collect()
}

/// Submitted inputs naming a fixed attribute, such as `name` or `jobTitle`.
pub fn read_core_form(submitted: &BTreeMap<String, String>) -> Vec<(KnownField, &str)> {
    FORM_CORE_FIELDS
        .iter()
        .filter_map(|field| {
            submitted
                .get(field.as_str())
                .map(|input| (*field, input.as_str()))
        })
        .collect()
}

/// True when `name` is an input of the employee form.
pub fn is_form_input(name: &str) -> bool {
    name.starts_with(FORM_FIELD_PREFIX) || FORM_CORE_FIELDS.iter().any(|field| field.as_str() == name)
}

/// Reads submitted `dynamic_*` inputs back into normalized dynamic values.
///
/// Only editable fields whose input was submitted are returned.
pub fn read_form(
    fields: &[FieldDescriptor],
    hidden: &[String],
    submitted: &BTreeMap<String, String>,
) -> BTreeMap<String, FieldValue> {
    editable_fields(fields, hidden)
        .filter_map(|field| {
            let input = submitted.get(&form_field_name(field))?;
            Some((
                field.normalized_name.clone(),
                normalize_input(input, field.field_type),
            ))
        })
        .collect()
}

/// Applies a form submission to a record; hidden and unsubmitted fields are
/// left untouched.
///
/// Dates typed into start and end date are stored as `YYYY-MM-DD` when they
/// parse. An unknown status is an error and leaves the record unchanged.
pub fn apply_form(
    record: &mut CanonicalRecord,
    fields: &[FieldDescriptor],
    hidden: &[String],
    submitted: &BTreeMap<String, String>,
) -> Result<()> {
    let mut updated = record.clone();
    for (field, input) in read_core_form(submitted) {
        match field {
            KnownField::StartDate | KnownField::EndDate => {
                let formatted = format_calendar_date(input);
                updated.set_attribute(field, formatted.as_deref().unwrap_or(input))?;
            }
            _ => updated.set_attribute(field, input)?,
        }
    }
    updated
        .dynamic_fields
        .extend(read_form(fields, hidden, submitted));
    *record = updated;
    Ok(())
}

fn editable_fields<'a>(
    fields: &'a [FieldDescriptor],
    hidden: &'a [String],
) -> impl Iterator<Item = &'a FieldDescriptor> {
    fields
        .iter()
        .filter(|field| !field.is_core && !hidden.contains(&field.normalized_name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Employee table: fixed core columns followed by visible dynamic columns.
pub fn table_view(
    records: &[CanonicalRecord],
    fields: &[FieldDescriptor],
    hidden: &[String],
) -> TableView {
    let columns: Vec<&FieldDescriptor> = editable_fields(fields, hidden).collect();
    let headers = TABLE_CORE_COLUMNS
        .iter()
        .map(|field| format_field_label(&field.as_str().to_title_case()).into_owned())
        .chain(
            columns
                .iter()
                .map(|field| format_field_label(&field.original_name).into_owned()),
        )
        .collect();
    let rows = records
        .iter()
        .map(|record| {
            TABLE_CORE_COLUMNS
                .iter()
                .map(|field| match field {
                    KnownField::Status => status_label(record.status).to_string(),
                    other => record.attribute(*other).to_string(),
                })
                .chain(columns.iter().map(|field| {
                    record
                        .dynamic(&field.normalized_name)
                        .map(|value| display_value(value, field.field_type))
                        .unwrap_or_default()
                }))
                .collect()
        })
        .collect();
    TableView { headers, rows }
}

pub fn status_label(status: EmployeeStatus) -> &'static str {
    match status {
        EmployeeStatus::Active => "Active",
        EmployeeStatus::Inactive => "Inactive",
    }
}

/// Formats with `,` thousands separators and at most three fraction digits.
pub fn group_thousands(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    let rendered = format_number(rounded);
    let (sign, unsigned) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };
    if !integer.chars().all(|c| c.is_ascii_digit()) {
        return rendered.clone();
    }
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (idx, ch) in integer.chars().enumerate() {
        if idx > 0 && (integer.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    match fraction {
        Some(fraction) => format!("{sign}{grouped}.{fraction}"),
        None => format!("{sign}{grouped}"),
    }
}
