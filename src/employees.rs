//! Employee edits made through the record editor.
//!
//! Spreadsheet rows are re-read on every run, so adds, updates and deletes are
//! kept as a separate layer keyed by employee ID and applied over each
//! transformed batch. A saved record replaces the batch record with the same
//! ID, or is appended when the batch has none.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    data::FieldValue,
    schema::FieldDescriptor,
    transform::{CanonicalRecord, IdSource},
};

/// Draws bounded by the placeholder space before giving up on a free ID.
const MAX_ID_DRAWS: usize = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmployeeError {
    #[error("No employee with ID '{0}'")]
    NotFound(String),
    #[error("An employee with ID '{0}' already exists")]
    DuplicateId(String),
    #[error("Employee name is required")]
    MissingName,
    #[error("Employee ID is required")]
    MissingId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeEdits {
    #[serde(default)]
    pub saved: Vec<CanonicalRecord>,
    #[serde(default)]
    pub deleted: Vec<String>,
}

impl EmployeeEdits {
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty() && self.deleted.is_empty()
    }

    /// Overlays the edits on a transformed batch.
    ///
    /// Every returned record carries every non-core field of `fields`, so
    /// records saved under an older schema gain blank values for new columns.
    pub fn apply(&self, records: Vec<CanonicalRecord>, fields: &[FieldDescriptor]) -> Vec<CanonicalRecord> {
        let deleted: BTreeSet<&str> = self.deleted.iter().map(String::as_str).collect();
        let mut merged: Vec<CanonicalRecord> = records
            .into_iter()
            .filter(|record| !deleted.contains(record.id.as_str()))
            .map(|record| match self.saved_record(&record.id) {
                Some(saved) => saved.clone(),
                None => record,
            })
            .collect();
        for saved in &self.saved {
            if find(&merged, &saved.id).is_none() {
                merged.push(saved.clone());
            }
        }
        for record in &mut merged {
            for field in fields.iter().filter(|field| !field.is_core) {
                record
                    .dynamic_fields
                    .entry(field.normalized_name.clone())
                    .or_insert(FieldValue::Empty);
            }
        }
        merged
    }

    /// Saves a new employee. `roster` is the batch with the edits applied.
    pub fn add(&mut self, roster: &[CanonicalRecord], record: CanonicalRecord) -> Result<(), EmployeeError> {
        validate(&record)?;
        if find(roster, &record.id).is_some() {
            return Err(EmployeeError::DuplicateId(record.id));
        }
        self.deleted.retain(|id| id != &record.id);
        self.saved.retain(|saved| saved.id != record.id);
        self.saved.push(record);
        Ok(())
    }

    /// Saves new values for an employee already in `roster`.
    pub fn update(&mut self, roster: &[CanonicalRecord], record: CanonicalRecord) -> Result<(), EmployeeError> {
        validate(&record)?;
        if find(roster, &record.id).is_none() {
            return Err(EmployeeError::NotFound(record.id));
        }
        match self.saved.iter_mut().find(|saved| saved.id == record.id) {
            Some(saved) => *saved = record,
            None => self.saved.push(record),
        }
        Ok(())
    }

    pub fn delete(&mut self, roster: &[CanonicalRecord], id: &str) -> Result<(), EmployeeError> {
        if find(roster, id).is_none() {
            return Err(EmployeeError::NotFound(id.to_string()));
        }
        self.saved.retain(|saved| saved.id != id);
        if !self.deleted.iter().any(|deleted| deleted == id) {
            self.deleted.push(id.to_string());
        }
        Ok(())
    }

    fn saved_record(&self, id: &str) -> Option<&CanonicalRecord> {
        self.saved.iter().find(|saved| saved.id == id)
    }
}

/// First employee in `records` with `id`.
pub fn find<'a>(records: &'a [CanonicalRecord], id: &str) -> Option<&'a CanonicalRecord> {
    records.iter().find(|record| record.id == id)
}

/// Next placeholder from `ids` not already used in `roster`.
///
/// Gives up after a bounded number of draws and returns the last one, which
/// [`EmployeeEdits::add`] then rejects as a duplicate.
pub fn unused_id<S: IdSource>(ids: &mut S, roster: &[CanonicalRecord]) -> String {
    let mut id = ids.next_id();
    for _ in 1..MAX_ID_DRAWS {
        if find(roster, &id).is_none() {
            break;
        }
        id = ids.next_id();
    }
    id
}

fn validate(record: &CanonicalRecord) -> Result<(), EmployeeError> {
    if record.name.trim().is_empty() {
        return Err(EmployeeError::MissingName);
    }
    if record.id.trim().is_empty() {
        return Err(EmployeeError::MissingId);
    }
    Ok(())
}
