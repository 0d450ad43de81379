//! Persisted field visibility and stats selection.
//!
//! Two independent name sets live in a small key/value store, each as a JSON
//! blob: the dynamic fields hidden from forms (`hr_field_settings`) and the
//! dynamic fields enabled for aggregate stat cards (`hr_stats_settings`). The
//! last raw batch is cached alongside them (`hr_raw_rows`), as are the saved
//! employee edits (`hr_employees`).
//!
//! Reads never fail: a missing or corrupt blob is an empty set. Writes replace
//! the whole blob, so the last writer wins.
//!
//! Resetting clears a set in both cases, but the effect is opposite: an empty
//! hidden set shows every field, while an empty stats set shows no cards.

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::PathBuf,
};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::{data::RawRecord, employees::EmployeeEdits, schema::FieldDescriptor};

pub const FIELD_SETTINGS_KEY: &str = "hr_field_settings";
pub const STATS_SETTINGS_KEY: &str = "hr_stats_settings";
pub const RAW_ROWS_KEY: &str = "hr_raw_rows";
pub const EMPLOYEES_KEY: &str = "hr_employees";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings entry '{key}' could not be read: {source}")]
    Read { key: String, source: io::Error },
    #[error("settings entry '{key}' could not be written: {source}")]
    Write { key: String, source: io::Error },
    #[error("settings entry '{key}' could not be serialized: {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
}

/// String blobs addressed by key, the shape of browser local storage.
pub trait SettingsStore {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), SettingsError>;
    fn remove(&mut self, key: &str) -> Result<(), SettingsError>;
}

/// One `<key>.json` file per entry under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SettingsStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SettingsError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        let write_err = |source: io::Error| SettingsError::Write {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(write_err)?;
        let mut temp = NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        temp.write_all(value.as_bytes()).map_err(write_err)?;
        temp.persist(self.entry_path(key))
            .map_err(|err| write_err(err.error))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SettingsError::Write {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl SettingsStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisibilityBlob {
    #[serde(default)]
    hidden_fields: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsBlob {
    #[serde(default)]
    enabled_fields: Vec<String>,
}

pub struct Settings<S> {
    store: S,
}

impl<S: SettingsStore> Settings<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        self.list_hidden().iter().any(|hidden| hidden == name)
    }

    pub fn list_hidden(&self) -> Vec<String> {
        self.load::<VisibilityBlob>(FIELD_SETTINGS_KEY)
            .hidden_fields
    }

    pub fn hide(&mut self, name: &str) -> Result<(), SettingsError> {
        let mut hidden = self.list_hidden();
        if hidden.iter().any(|existing| existing == name) {
            return Ok(());
        }
        hidden.push(name.to_string());
        self.save_hidden(hidden)
    }

    pub fn show(&mut self, name: &str) -> Result<(), SettingsError> {
        let mut hidden = self.list_hidden();
        hidden.retain(|existing| existing != name);
        self.save_hidden(hidden)
    }

    /// Clears the hidden set: every field becomes visible.
    pub fn reset_visibility(&mut self) -> Result<(), SettingsError> {
        self.save_hidden(Vec::new())
    }

    pub fn is_stats_enabled(&self, name: &str) -> bool {
        self.list_stats_enabled().iter().any(|enabled| enabled == name)
    }

    pub fn list_stats_enabled(&self) -> Vec<String> {
        self.load::<StatsBlob>(STATS_SETTINGS_KEY).enabled_fields
    }

    pub fn enable_stats(&mut self, name: &str) -> Result<(), SettingsError> {
        let mut enabled = self.list_stats_enabled();
        if enabled.iter().any(|existing| existing == name) {
            return Ok(());
        }
        enabled.push(name.to_string());
        self.save_stats(enabled)
    }

    pub fn disable_stats(&mut self, name: &str) -> Result<(), SettingsError> {
        let mut enabled = self.list_stats_enabled();
        enabled.retain(|existing| existing != name);
        self.save_stats(enabled)
    }

    /// Replaces the stats set with every non-core field of `fields`.
    pub fn enable_all_stats(&mut self, fields: &[FieldDescriptor]) -> Result<Vec<String>, SettingsError> {
        let enabled: Vec<String> = fields
            .iter()
            .filter(|field| !field.is_core)
            .map(|field| field.normalized_name.clone())
            .collect();
        self.save_stats(enabled.clone())?;
        Ok(enabled)
    }

    /// Clears the stats set: no field is enabled for stat cards.
    pub fn reset_stats(&mut self) -> Result<(), SettingsError> {
        self.save_stats(Vec::new())
    }

    pub fn cache_records(&mut self, records: &[RawRecord]) -> Result<(), SettingsError> {
        self.save(RAW_ROWS_KEY, &records)
    }

    pub fn cached_records(&self) -> Vec<RawRecord> {
        self.load::<Vec<RawRecord>>(RAW_ROWS_KEY)
    }

    pub fn employee_edits(&self) -> EmployeeEdits {
        self.load(EMPLOYEES_KEY)
    }

    pub fn save_employee_edits(&mut self, edits: &EmployeeEdits) -> Result<(), SettingsError> {
        self.save(EMPLOYEES_KEY, edits)
    }

    /// Drops every saved add, update and delete.
    pub fn reset_employee_edits(&mut self) -> Result<(), SettingsError> {
        self.store.remove(EMPLOYEES_KEY)
    }

    fn save_hidden(&mut self, hidden_fields: Vec<String>) -> Result<(), SettingsError> {
        self.save(FIELD_SETTINGS_KEY, &VisibilityBlob { hidden_fields })
    }

    fn save_stats(&mut self, enabled_fields: Vec<String>) -> Result<(), SettingsError> {
        self.save(STATS_SETTINGS_KEY, &StatsBlob { enabled_fields })
    }

    fn load<T>(&self, key: &str) -> T
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        let contents = match self.store.read(key) {
            Ok(Some(contents)) => contents,
            Ok(None) => return T::default(),
            Err(err) => {
                warn!("{err}; using empty settings");
                return T::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(err) => {
                warn!("Settings entry '{key}' is corrupt ({err}); using empty settings");
                T::default()
            }
        }
    }

    fn save<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), SettingsError> {
        let json = serde_json::to_string(value).map_err(|source| SettingsError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.store.write(key, &json)?;
        debug!("Saved settings entry '{key}'");
        Ok(())
    }
}
