//! Known-field alias tables.
//!
//! Spreadsheet headers arrive in English, Arabic and assorted casings. The
//! [`AliasTable`] maps every accepted spelling onto one [`KnownField`] and also
//! carries the core-exclusion list used to flag dynamic fields as `isCore`.
//! Tables are static configuration: built-in defaults, optionally replaced or
//! extended from a YAML file loaded once at startup.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KnownField {
    Name,
    Id,
    Email,
    Department,
    JobTitle,
    Location,
    Nationality,
    Status,
    StartDate,
    EndDate,
    Notes,
}

impl KnownField {
    pub const ALL: [KnownField; 11] = [
        KnownField::Name,
        KnownField::Id,
        KnownField::Email,
        KnownField::Department,
        KnownField::JobTitle,
        KnownField::Location,
        KnownField::Nationality,
        KnownField::Status,
        KnownField::StartDate,
        KnownField::EndDate,
        KnownField::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KnownField::Name => "name",
            KnownField::Id => "id",
            KnownField::Email => "email",
            KnownField::Department => "department",
            KnownField::JobTitle => "jobTitle",
            KnownField::Location => "location",
            KnownField::Nationality => "nationality",
            KnownField::Status => "status",
            KnownField::StartDate => "startDate",
            KnownField::EndDate => "endDate",
            KnownField::Notes => "notes",
        }
    }

    /// Source headers tried, in order, when extracting this attribute.
    pub fn lookup_keys(&self) -> &'static [&'static str] {
        match self {
            KnownField::Name => &["Name", "name", "الاسم"],
            KnownField::Id => &["ID", "id", "رقم_الموظف"],
            KnownField::Email => &["Email", "email", "البريد_الإلكتروني"],
            KnownField::Department => &["Department", "department", "القسم"],
            KnownField::JobTitle => &["Job Title", "Job title", "jobTitle", "المسمى_الوظيفي"],
            KnownField::Location => &["Location", "location", "الموقع"],
            KnownField::Nationality => &["Nationality", "nationality", "الجنسية"],
            KnownField::Status => &["Status", "status", "الحالة"],
            KnownField::StartDate => &["Start Date", "startDate", "تاريخ_البدء"],
            KnownField::EndDate => &["End Date", "endDate", "تاريخ_الانتهاء"],
            KnownField::Notes => &["Notes", "Note", "notes", "ملاحظات"],
        }
    }
}

impl fmt::Display for KnownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnownField {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        KnownField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                anyhow!(
                    "Unknown field '{value}'. Supported fields: {}",
                    KnownField::ALL.map(|field| field.as_str()).join(", ")
                )
            })
    }
}

const DEFAULT_KNOWN_FIELDS: &[(&str, KnownField)] = &[
    ("name", KnownField::Name),
    ("id", KnownField::Id),
    ("email", KnownField::Email),
    ("department", KnownField::Department),
    ("jobTitle", KnownField::JobTitle),
    ("location", KnownField::Location),
    ("nationality", KnownField::Nationality),
    ("status", KnownField::Status),
    ("startDate", KnownField::StartDate),
    ("endDate", KnownField::EndDate),
    ("notes", KnownField::Notes),
    ("الاسم", KnownField::Name),
    ("رقم_الموظف", KnownField::Id),
    ("البريد_الإلكتروني", KnownField::Email),
    ("القسم", KnownField::Department),
    ("المسمى_الوظيفي", KnownField::JobTitle),
    ("الموقع", KnownField::Location),
    ("الجنسية", KnownField::Nationality),
    ("الحالة", KnownField::Status),
    ("تاريخ_البدء", KnownField::StartDate),
    ("تاريخ_الانتهاء", KnownField::EndDate),
    ("ملاحظات", KnownField::Notes),
    ("Name", KnownField::Name),
    ("ID", KnownField::Id),
    ("Email", KnownField::Email),
    ("Department", KnownField::Department),
    ("Job Title", KnownField::JobTitle),
    ("Job title", KnownField::JobTitle),
    ("Location", KnownField::Location),
    ("Nationality", KnownField::Nationality),
    ("Status", KnownField::Status),
    ("Start Date", KnownField::StartDate),
    ("End Date", KnownField::EndDate),
    ("Notes", KnownField::Notes),
    ("Note", KnownField::Notes),
];

const DEFAULT_CORE_FIELDS: &[&str] = &[
    "name",
    "id",
    "email",
    "الاسم",
    "رقم_الموظف",
    "البريد_الإلكتروني",
    "Name",
    "ID",
    "Email",
];

/// On-disk shape of an alias override file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AliasConfig {
    /// Drop the built-in tables instead of extending them.
    #[serde(default)]
    pub replace_defaults: bool,
    #[serde(default)]
    pub known_fields: BTreeMap<String, KnownField>,
    #[serde(default)]
    pub core_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    known: BTreeMap<String, KnownField>,
    core: BTreeSet<String>,
    lookup: BTreeMap<KnownField, Vec<String>>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::new(
            DEFAULT_KNOWN_FIELDS
                .iter()
                .map(|(source, field)| (source.to_string(), *field)),
            DEFAULT_CORE_FIELDS.iter().map(|name| name.to_string()),
        )
    }
}

impl AliasTable {
    pub fn new<K, C>(known: K, core: C) -> Self
    where
        K: IntoIterator<Item = (String, KnownField)>,
        C: IntoIterator<Item = String>,
    {
        let known: BTreeMap<String, KnownField> = known.into_iter().collect();
        let core = core.into_iter().collect();
        let lookup = build_lookup(&known);
        Self {
            known,
            core,
            lookup,
        }
    }

    pub fn from_config(config: AliasConfig) -> Self {
        let mut table = if config.replace_defaults {
            AliasTable::new(std::iter::empty(), std::iter::empty())
        } else {
            AliasTable::default()
        };
        table.known.extend(config.known_fields);
        table.core.extend(config.core_fields);
        table.lookup = build_lookup(&table.known);
        table
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening alias file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: AliasConfig = serde_yaml::from_reader(reader)
            .with_context(|| format!("Parsing alias YAML {path:?}"))?;
        Ok(Self::from_config(config))
    }

    /// Loads `path` when given, otherwise the built-in tables.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Exact, case-sensitive membership in the known-field map.
    pub fn is_known(&self, header: &str) -> bool {
        self.known.contains_key(header)
    }

    pub fn known_field(&self, header: &str) -> Option<KnownField> {
        self.known.get(header).copied()
    }

    pub fn is_core(&self, header: &str) -> bool {
        self.core.contains(header)
    }

    pub fn known_headers(&self) -> impl Iterator<Item = &str> {
        self.known.keys().map(String::as_str)
    }

    /// Extraction candidates for `field`: the fixed fallback order first,
    /// restricted to spellings the table still maps to `field`, then any
    /// further configured spellings in sorted order.
    pub fn candidates(&self, field: KnownField) -> &[String] {
        self.lookup.get(&field).map(Vec::as_slice).unwrap_or_default()
    }
}

fn build_lookup(known: &BTreeMap<String, KnownField>) -> BTreeMap<KnownField, Vec<String>> {
    let mut lookup = BTreeMap::new();
    for field in KnownField::ALL {
        let mut keys: Vec<String> = field
            .lookup_keys()
            .iter()
            .filter(|key| known.get(**key) == Some(&field))
            .map(|key| key.to_string())
            .collect();
        for (source, mapped) in known {
            if *mapped == field && !keys.iter().any(|key| key == source) {
                keys.push(source.clone());
            }
        }
        lookup.insert(field, keys);
    }
    lookup
}
