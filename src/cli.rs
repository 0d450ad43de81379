use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Discover dynamic fields in HR spreadsheets and normalize employee records",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Discover the dynamic fields of a spreadsheet and report their inferred types
    Probe(ProbeArgs),
    /// Transform spreadsheet rows into canonical employee records
    Transform(TransformArgs),
    /// Produce stat cards for dynamic fields plus a roster summary
    Stats(StatsArgs),
    /// Render the employee data-entry form, optionally applying submitted values
    Form(FormArgs),
    /// Add, update, delete or show employees; edits persist over every loaded batch
    Employee(EmployeeArgs),
    /// Manage persisted field visibility and stats selection
    Fields(FieldsArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Args)]
pub struct RowArgs {
    /// Spreadsheet export to load (CSV, TSV or JSON; `-` reads CSV from stdin).
    /// Falls back to the cached batch when omitted
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML file extending or replacing the known-field alias tables
    #[arg(long)]
    pub aliases: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    #[command(flatten)]
    pub rows: RowArgs,
    /// Directory holding persisted settings and the cached batch
    #[arg(long = "settings-dir", default_value = ".hr-sheet")]
    pub settings_dir: PathBuf,
    /// Do not refresh the cached batch after reading --input
    #[arg(long = "no-cache")]
    pub no_cache: bool,
}

/// Options shared by every command that turns rows into employee records.
#[derive(Debug, Clone, Default, Args)]
pub struct BatchArgs {
    /// Reference date for end-date status resolution (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub today: Option<NaiveDate>,
    /// Number placeholder IDs sequentially (EMP0001, EMP0002, ...) instead of at random
    #[arg(long = "sequential-ids")]
    pub sequential_ids: bool,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Output format for the discovered descriptors
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct TransformArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub batch: BatchArgs,
    /// Output JSON file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Render the employee table to stdout instead of JSON
    #[arg(long = "table", conflicts_with = "output")]
    pub table: bool,
    /// Include hidden dynamic columns in the table
    #[arg(long = "include-hidden", requires = "table")]
    pub include_hidden: bool,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub batch: BatchArgs,
    /// Build cards for every dynamic field, ignoring the stats selection
    #[arg(long)]
    pub all: bool,
    /// Output format (table or json)
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct FormArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub batch: BatchArgs,
    /// Pre-fill the form from the employee with this ID
    #[arg(long = "record")]
    pub record: Option<String>,
    #[command(flatten)]
    pub values: FormValues,
    /// Output format (table or json)
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct FormValues {
    /// Submitted form input as `<input>=value`, where the input is a core
    /// attribute such as `name` or `jobTitle`, or `dynamic_<field>`
    #[arg(long = "set", value_parser = parse_assignment, action = clap::ArgAction::Append)]
    pub set: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct EmployeeArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub batch: BatchArgs,
    #[command(subcommand)]
    pub action: EmployeeAction,
}

#[derive(Debug, Subcommand)]
pub enum EmployeeAction {
    /// Add an employee; a blank ID gets a generated placeholder
    Add(FormValues),
    /// Update an employee; inputs that are not submitted keep their value
    Update {
        id: String,
        #[command(flatten)]
        values: FormValues,
    },
    /// Delete an employee
    Delete { id: String },
    /// Show one employee
    Show {
        id: String,
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Discard every saved add, update and delete
    Reset,
}

#[derive(Debug, Args)]
pub struct FieldsArgs {
    /// Directory holding persisted settings
    #[arg(long = "settings-dir", default_value = ".hr-sheet")]
    pub settings_dir: PathBuf,
    #[command(subcommand)]
    pub action: FieldsAction,
}

#[derive(Debug, Subcommand)]
pub enum FieldsAction {
    /// Hide dynamic fields from forms and tables
    Hide(FieldNames),
    /// Make hidden dynamic fields visible again
    Show(FieldNames),
    /// Enable stat cards for dynamic fields
    EnableStats(EnableStatsArgs),
    /// Disable stat cards for dynamic fields
    DisableStats(FieldNames),
    /// List hidden and stats-enabled fields
    List,
    /// Clear a persisted selection
    Reset {
        #[arg(value_enum)]
        target: ResetTarget,
    },
}

#[derive(Debug, Args)]
pub struct FieldNames {
    /// Field names, either as spreadsheet headers or normalized names
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Debug, Args)]
pub struct EnableStatsArgs {
    /// Field names, either as spreadsheet headers or normalized names
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub names: Vec<String>,
    /// Enable every non-core field discovered in the loaded batch
    #[arg(long)]
    pub all: bool,
    #[command(flatten)]
    pub rows: RowArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum ResetTarget {
    /// Show every field
    Visibility,
    /// Disable every stat card
    Stats,
    /// Both of the above
    All,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("Expected a YYYY-MM-DD date: {err}"))
}

pub fn parse_assignment(value: &str) -> Result<(String, String), String> {
    let (name, input) = value
        .split_once('=')
        .ok_or_else(|| format!("Expected name=value, got '{value}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("Field name cannot be empty".to_string());
    }
    Ok((name.to_string(), input.to_string()))
}
