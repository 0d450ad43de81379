//! One CLI invocation's view of the data: the loaded batch, the schema
//! context built over it, and the persisted settings and employee edits.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Local;
use log::{debug, info};

use crate::{
    aliases::AliasTable,
    cli::{BatchArgs, SourceArgs},
    data::RawRecord,
    io_utils,
    schema::{FieldDescriptor, SchemaContext},
    settings::{FileStore, Settings},
    transform::{CanonicalRecord, RandomIds, SequentialIds, Transformer},
};

pub struct Session {
    pub context: SchemaContext,
    pub raw: Vec<RawRecord>,
    pub settings: Settings<FileStore>,
}

impl Session {
    /// Loads `--input`, or the cached batch when no input is given.
    ///
    /// A freshly read input replaces the cache unless `--no-cache` is set.
    pub fn open(source: &SourceArgs) -> Result<Self> {
        let rows = &source.rows;
        let aliases = AliasTable::load_or_default(rows.aliases.as_deref())?;
        let mut settings = Settings::new(FileStore::new(&source.settings_dir));
        let raw = match &rows.input {
            Some(path) => {
                let encoding = io_utils::resolve_encoding(rows.input_encoding.as_deref())?;
                let records = io_utils::read_records(path, rows.delimiter, encoding)?;
                if !source.no_cache {
                    settings
                        .cache_records(&records)
                        .with_context(|| format!("Caching rows in {:?}", source.settings_dir))?;
                }
                info!("Loaded {} row(s) from {}", records.len(), display_path(path));
                records
            }
            None => {
                let cached = settings.cached_records();
                if cached.is_empty() {
                    bail!(
                        "No --input given and no cached rows found in {:?}",
                        source.settings_dir
                    );
                }
                info!("Loaded {} cached row(s)", cached.len());
                cached
            }
        };
        Ok(Self {
            context: SchemaContext::new(aliases),
            raw,
            settings,
        })
    }

    pub fn discover(&mut self) -> &[FieldDescriptor] {
        self.context.refresh(&self.raw)
    }

    /// Transforms the batch, then overlays the saved employee edits.
    pub fn transform(&mut self, batch: &BatchArgs) -> Vec<CanonicalRecord> {
        let records = self.transform_rows(batch);
        let edits = self.settings.employee_edits();
        if edits.is_empty() {
            return records;
        }
        debug!(
            "Applying {} saved and {} deleted employee edit(s)",
            edits.saved.len(),
            edits.deleted.len()
        );
        edits.apply(records, self.context.fields())
    }

    fn transform_rows(&mut self, batch: &BatchArgs) -> Vec<CanonicalRecord> {
        let today = batch.today.unwrap_or_else(|| Local::now().date_naive());
        if batch.sequential_ids {
            Transformer::with_ids(SequentialIds::default(), today).transform(&mut self.context, &self.raw)
        } else {
            Transformer::with_ids(RandomIds, today).transform(&mut self.context, &self.raw)
        }
    }

    pub fn hidden_fields(&self) -> Vec<String> {
        self.settings.list_hidden()
    }
}

fn display_path(path: &Path) -> String {
    if io_utils::is_dash(path) {
        "stdin".to_string()
    } else {
        path.display().to_string()
    }
}
