//! Raw rows to canonical employee records.
//!
//! A batch is transformed in one pass: discovery runs once over every row,
//! then each row is projected onto the fixed employee attributes plus the
//! normalized `dynamicFields` of the non-core descriptors.

use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    aliases::{AliasTable, KnownField},
    data::{FieldValue, RawRecord, parse_calendar_date},
    normalize::normalize_value,
    schema::{FieldDescriptor, SchemaContext},
};

const GENERATED_ID_PREFIX: &str = "EMP";
const GENERATED_ID_SPACE: u128 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    #[default]
    Active,
    Inactive,
}

impl EmployeeStatus {
    /// Recognises explicit status spellings, case-insensitively.
    pub fn from_synonym(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "active" | "نشط" => Some(EmployeeStatus::Active),
            "inactive" | "غير نشط" => Some(EmployeeStatus::Inactive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub name: String,
    pub id: String,
    pub email: String,
    pub department: String,
    pub job_title: String,
    pub location: String,
    pub nationality: String,
    pub status: EmployeeStatus,
    pub start_date: String,
    pub end_date: String,
    pub notes: String,
    #[serde(default)]
    pub dynamic_fields: BTreeMap<String, FieldValue>,
}

impl CanonicalRecord {
    pub fn attribute(&self, field: KnownField) -> &str {
        match field {
            KnownField::Name => &self.name,
            KnownField::Id => &self.id,
            KnownField::Email => &self.email,
            KnownField::Department => &self.department,
            KnownField::JobTitle => &self.job_title,
            KnownField::Location => &self.location,
            KnownField::Nationality => &self.nationality,
            KnownField::Status => self.status.as_str(),
            KnownField::StartDate => &self.start_date,
            KnownField::EndDate => &self.end_date,
            KnownField::Notes => &self.notes,
        }
    }

    /// Overwrites one fixed attribute with a trimmed value.
    ///
    /// Status accepts the same synonyms as spreadsheet cells.
    pub fn set_attribute(&mut self, field: KnownField, value: &str) -> Result<()> {
        let value = value.trim().to_string();
        let slot = match field {
            KnownField::Name => &mut self.name,
            KnownField::Id => &mut self.id,
            KnownField::Email => &mut self.email,
            KnownField::Department => &mut self.department,
            KnownField::JobTitle => &mut self.job_title,
            KnownField::Location => &mut self.location,
            KnownField::Nationality => &mut self.nationality,
            KnownField::Status => {
                self.status = EmployeeStatus::from_synonym(&value).ok_or_else(|| {
                    anyhow!("Unknown status '{value}'; expected active or inactive")
                })?;
                return Ok(());
            }
            KnownField::StartDate => &mut self.start_date,
            KnownField::EndDate => &mut self.end_date,
            KnownField::Notes => &mut self.notes,
        };
        *slot = value;
        Ok(())
    }

    pub fn dynamic(&self, normalized_name: &str) -> Option<&FieldValue> {
        self.dynamic_fields.get(normalized_name)
    }
}

/// Supplies placeholder IDs for rows without one.
pub trait IdSource {
    fn next_id(&mut self) -> String;
}

/// `EMPnnnn` placeholders drawn at random from a 10 000-value space.
///
/// Duplicates across a batch are possible and accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self) -> String {
        let draw = Uuid::new_v4().as_u128() % GENERATED_ID_SPACE;
        format!("{GENERATED_ID_PREFIX}{draw:04}")
    }
}

/// Deterministic `EMP0001`, `EMP0002`, ... placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialIds {
    next: u32,
}

impl IdSource for SequentialIds {
    fn next_id(&mut self) -> String {
        self.next += 1;
        format!("{GENERATED_ID_PREFIX}{:04}", self.next)
    }
}

pub struct Transformer<S = RandomIds> {
    ids: S,
    today: NaiveDate,
}

impl<S: IdSource> Transformer<S> {
    pub fn with_ids(ids: S, today: NaiveDate) -> Self {
        Self { ids, today }
    }

    /// Rediscovers the schema into `context` and transforms the batch.
    ///
    /// Rows whose resolved name is empty are dropped.
    pub fn transform(
        &mut self,
        context: &mut SchemaContext,
        records: &[RawRecord],
    ) -> Vec<CanonicalRecord> {
        context.refresh(records);
        let fields: Vec<&FieldDescriptor> = context.non_core_fields().collect();
        let aliases = context.aliases();
        let transformed: Vec<CanonicalRecord> = records
            .iter()
            .map(|record| self.transform_record(record, aliases, &fields))
            .filter(|record| !record.name.is_empty())
            .collect();
        let dropped = records.len() - transformed.len();
        if dropped > 0 {
            debug!("Dropped {dropped} row(s) without a name");
        }
        info!(
            "Transformed {} record(s) with {} dynamic field(s)",
            transformed.len(),
            fields.len()
        );
        transformed
    }

    fn transform_record(
        &mut self,
        record: &RawRecord,
        aliases: &AliasTable,
        fields: &[&FieldDescriptor],
    ) -> CanonicalRecord {
        let lookup = |field: KnownField| lookup_attribute(record, aliases, field).unwrap_or_default();
        let id = match lookup_attribute(record, aliases, KnownField::Id) {
            Some(id) => id,
            None => self.ids.next_id(),
        };
        let dynamic_fields = fields
            .iter()
            .map(|field| {
                let value = record
                    .get(&field.original_name)
                    .map(|raw| normalize_value(raw, field.field_type))
                    .unwrap_or_default();
                (field.normalized_name.clone(), value)
            })
            .collect();

        CanonicalRecord {
            name: lookup(KnownField::Name),
            id,
            email: lookup(KnownField::Email),
            department: lookup(KnownField::Department),
            job_title: lookup(KnownField::JobTitle),
            location: lookup(KnownField::Location),
            nationality: lookup(KnownField::Nationality),
            status: resolve_status(record, aliases, self.today),
            start_date: lookup(KnownField::StartDate),
            end_date: lookup(KnownField::EndDate),
            notes: lookup(KnownField::Notes),
            dynamic_fields,
        }
    }
}

/// First candidate header carrying a non-blank value, trimmed.
pub fn lookup_attribute(record: &RawRecord, aliases: &AliasTable, field: KnownField) -> Option<String> {
    aliases
        .candidates(field)
        .iter()
        .filter_map(|key| record.get(key))
        .find(|value| !value.is_empty())
        .map(|value| value.as_display().trim().to_string())
}

/// Explicit status wins; otherwise a parseable end date decides; otherwise active.
pub fn resolve_status(record: &RawRecord, aliases: &AliasTable, today: NaiveDate) -> EmployeeStatus {
    if let Some(status) = lookup_attribute(record, aliases, KnownField::Status)
        .as_deref()
        .and_then(EmployeeStatus::from_synonym)
    {
        return status;
    }
    let end_date = lookup_attribute(record, aliases, KnownField::EndDate);
    match end_date.as_deref().and_then(parse_calendar_date) {
        Some(end) if end >= today => EmployeeStatus::Active,
        Some(_) => EmployeeStatus::Inactive,
        None => {
            if let Some(raw) = &end_date {
                debug!("Ignoring unparseable end date '{raw}'");
            }
            EmployeeStatus::Active
        }
    }
}
