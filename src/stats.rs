//! Stat cards over a transformed batch.
//!
//! Each non-core field gets one card shaped by its [`FieldType`]; DATE fields
//! have no aggregate and produce none. Unless every field is requested, only
//! fields enabled in the stats selection are carried. The report also holds
//! top-value distributions of the categorical employee attributes.

use std::collections::HashMap;

use anyhow::Result;
use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::{
    aliases::KnownField,
    cli::{OutputFormat, StatsArgs},
    data::FieldValue,
    io_utils,
    normalize::normalize_input,
    projection::{format_field_label, group_thousands},
    schema::{FieldDescriptor, FieldType},
    session::Session,
    table::{self, Table},
    transform::{CanonicalRecord, EmployeeStatus},
};

pub const TOP_VALUES: usize = 5;
pub const UNSPECIFIED: &str = "unspecified";

/// Always charted, even when every value is blank.
const ALWAYS_DISTRIBUTED: &[KnownField] = &[KnownField::Department, KnownField::Location];
/// Charted only when at least one employee carries a value.
const DISTRIBUTED_WHEN_PRESENT: &[KnownField] =
    &[KnownField::JobTitle, KnownField::Status, KnownField::Nationality];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct NumericStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStats {
    pub unique_count: usize,
    pub top_values: Vec<ValueCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanStats {
    pub true_count: usize,
    pub false_count: usize,
    pub true_percentage: u32,
    pub false_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "stats", rename_all = "lowercase")]
pub enum CardStats {
    Numeric(NumericStats),
    Text(TextStats),
    Boolean(BooleanStats),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatCard {
    pub field: String,
    pub label: String,
    #[serde(flatten)]
    pub stats: CardStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RosterSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub summary: RosterSummary,
    pub distributions: Vec<StatCard>,
    pub cards: Vec<StatCard>,
}

pub fn summarize(records: &[CanonicalRecord]) -> RosterSummary {
    let active = records
        .iter()
        .filter(|record| record.status == EmployeeStatus::Active)
        .count();
    RosterSummary {
        total: records.len(),
        active,
        inactive: records.len() - active,
    }
}

fn field_values<'a>(
    records: &'a [CanonicalRecord],
    field: &'a str,
) -> impl Iterator<Item = &'a FieldValue> + 'a {
    records.iter().filter_map(move |record| record.dynamic(field))
}

/// Min/max/average/sum over the numeric values; all zero when there are none.
pub fn numeric_stats(records: &[CanonicalRecord], field: &str) -> NumericStats {
    let values: Vec<f64> = field_values(records, field)
        .filter_map(FieldValue::as_number)
        .collect();
    if values.is_empty() {
        return NumericStats::default();
    }
    let sum: f64 = values.iter().sum();
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
            (min.min(*value), max.max(*value))
        });
    NumericStats {
        count: values.len(),
        min,
        max,
        average: sum / values.len() as f64,
        sum,
    }
}

/// Distinct-value count and the most frequent values.
///
/// Blank values count as [`UNSPECIFIED`]; ties keep first-seen order.
pub fn text_stats(records: &[CanonicalRecord], field: &str) -> TextStats {
    tally(field_values(records, field).map(FieldValue::as_display))
}

/// Top values of a fixed employee attribute such as `department`.
pub fn attribute_stats(records: &[CanonicalRecord], field: KnownField) -> TextStats {
    tally(records.iter().map(|record| record.attribute(field).to_string()))
}

fn tally(values: impl Iterator<Item = String>) -> TextStats {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<ValueCount> = Vec::new();
    for display in values {
        let trimmed = display.trim();
        let key = if trimmed.is_empty() { UNSPECIFIED } else { trimmed };
        match positions.get(key).copied() {
            Some(idx) => counts[idx].count += 1,
            None => {
                positions.insert(key.to_string(), counts.len());
                counts.push(ValueCount {
                    value: key.to_string(),
                    count: 1,
                });
            }
        }
    }
    let unique_count = counts.len();
    let top_values = counts
        .into_iter()
        .sorted_by(|a, b| b.count.cmp(&a.count))
        .take(TOP_VALUES)
        .collect();
    TextStats {
        unique_count,
        top_values,
    }
}

/// True/false split; blank or unrecognised values count as false.
pub fn boolean_stats(records: &[CanonicalRecord], field: &str) -> BooleanStats {
    let mut total = 0usize;
    let mut true_count = 0usize;
    for value in field_values(records, field) {
        total += 1;
        if is_true(value) {
            true_count += 1;
        }
    }
    let false_count = total - true_count;
    let denominator = total.max(1) as f64;
    BooleanStats {
        true_count,
        false_count,
        true_percentage: percentage(true_count, denominator),
        false_percentage: percentage(false_count, denominator),
    }
}

fn is_true(value: &FieldValue) -> bool {
    match value {
        FieldValue::Boolean(flag) => *flag,
        FieldValue::Number(number) => *number == 1.0,
        FieldValue::Text(text) => {
            matches!(normalize_input(text, FieldType::Boolean), FieldValue::Boolean(true))
        }
        FieldValue::Empty => false,
    }
}

fn percentage(count: usize, denominator: f64) -> u32 {
    ((count as f64 / denominator) * 100.0).round() as u32
}

pub fn stat_card(records: &[CanonicalRecord], field: &FieldDescriptor) -> Option<StatCard> {
    let name = field.normalized_name.as_str();
    let stats = match field.field_type {
        FieldType::Number => CardStats::Numeric(numeric_stats(records, name)),
        FieldType::Text => CardStats::Text(text_stats(records, name)),
        FieldType::Boolean => CardStats::Boolean(boolean_stats(records, name)),
        FieldType::Date => return None,
    };
    Some(StatCard {
        field: field.normalized_name.clone(),
        label: format_field_label(&field.original_name).into_owned(),
        stats,
    })
}

/// Cards for the non-core fields, restricted to `enabled` when given.
pub fn stat_cards(
    records: &[CanonicalRecord],
    fields: &[FieldDescriptor],
    enabled: Option<&[String]>,
) -> Vec<StatCard> {
    fields
        .iter()
        .filter(|field| !field.is_core)
        .filter(|field| enabled.is_none_or(|names| names.contains(&field.normalized_name)))
        .filter_map(|field| stat_card(records, field))
        .collect()
}

/// Distribution cards for department and location, then job title, status
/// and nationality when any employee has one.
pub fn distribution_cards(records: &[CanonicalRecord]) -> Vec<StatCard> {
    let present = |field: &&KnownField| {
        records
            .iter()
            .any(|record| !record.attribute(**field).trim().is_empty())
    };
    ALWAYS_DISTRIBUTED
        .iter()
        .chain(DISTRIBUTED_WHEN_PRESENT.iter().filter(present))
        .map(|field| StatCard {
            field: field.as_str().to_string(),
            label: format_field_label(field.as_str()).into_owned(),
            stats: CardStats::Text(attribute_stats(records, *field)),
        })
        .collect()
}

pub fn execute(args: &StatsArgs) -> Result<()> {
    let mut session = Session::open(&args.source)?;
    let records = session.transform(&args.batch);
    let enabled = (!args.all).then(|| session.settings.list_stats_enabled());
    let report = StatsReport {
        summary: summarize(&records),
        distributions: distribution_cards(&records),
        cards: stat_cards(&records, session.context.fields(), enabled.as_deref()),
    };
    if report.cards.is_empty() && !args.all {
        info!("No dynamic fields are enabled for stats; use `fields enable-stats` or --all");
    }
    match args.format {
        OutputFormat::Json => io_utils::write_json(None, &report)?,
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Table => print_report(&report),
    }
    info!(
        "Computed {} stat card(s) over {} record(s)",
        report.cards.len(),
        report.summary.total
    );
    Ok(())
}

fn print_report(report: &StatsReport) {
    print!(
        "{}",
        table::render_pairs(&[
            ("total".to_string(), report.summary.total.to_string()),
            ("active".to_string(), report.summary.active.to_string()),
            ("inactive".to_string(), report.summary.inactive.to_string()),
        ])
    );
    for card in report.distributions.iter().chain(&report.cards) {
        println!();
        println!("{} ({})", card.label, card.field);
        card_table(&card.stats).print();
    }
}

fn card_table(stats: &CardStats) -> Table {
    match stats {
        CardStats::Numeric(stats) => {
            let mut table = Table::new(["count", "min", "max", "average", "sum"]);
            table.push_row([
                stats.count.to_string(),
                group_thousands(stats.min),
                group_thousands(stats.max),
                group_thousands(stats.average),
                group_thousands(stats.sum),
            ]);
            table
        }
        CardStats::Text(stats) => {
            let rows = stats
                .top_values
                .iter()
                .map(|entry| vec![entry.value.clone(), entry.count.to_string()])
                .collect();
            Table::new([
                "value".to_string(),
                format!("count ({} unique)", stats.unique_count),
            ])
            .with_rows(rows)
        }
        CardStats::Boolean(stats) => {
            let mut table = Table::new(["value", "count", "percent"]);
            table.push_row([
                "Yes".to_string(),
                stats.true_count.to_string(),
                format!("{}%", stats.true_percentage),
            ]);
            table.push_row([
                "No".to_string(),
                stats.false_count.to_string(),
                format!("{}%", stats.false_percentage),
            ]);
            table
        }
    }
}
