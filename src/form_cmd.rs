use std::collections::BTreeMap;

use anyhow::{Result, anyhow};
use log::{info, warn};
use serde::Serialize;

use crate::{
    cli::{FormArgs, OutputFormat},
    employees, io_utils,
    projection::{self, FORM_FIELD_PREFIX, FormControl},
    session::Session,
    table::Table,
    transform::CanonicalRecord,
};

#[derive(Debug, Serialize)]
struct FormOutput<'a> {
    controls: &'a [FormControl],
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<&'a CanonicalRecord>,
}

/// Collects `--set` pairs, warning about names that are not form inputs.
pub(crate) fn submitted_values(pairs: &[(String, String)]) -> BTreeMap<String, String> {
    let submitted: BTreeMap<String, String> = pairs.iter().cloned().collect();
    for name in submitted.keys() {
        if !projection::is_form_input(name) {
            warn!(
                "Ignoring '{name}': form inputs are core attributes such as 'jobTitle' or '{FORM_FIELD_PREFIX}<field>'"
            );
        }
    }
    submitted
}

pub fn execute(args: &FormArgs) -> Result<()> {
    let mut session = Session::open(&args.source)?;
    let records = session.transform(&args.batch);
    let hidden = session.hidden_fields();
    let fields = session.context.fields();

    let mut record = match &args.record {
        Some(id) => Some(
            employees::find(&records, id)
                .cloned()
                .ok_or_else(|| anyhow!("No employee with ID '{id}' in the loaded rows"))?,
        ),
        None => None,
    };

    if !args.values.set.is_empty() {
        let submitted = submitted_values(&args.values.set);
        let target = record.get_or_insert_with(CanonicalRecord::default);
        projection::apply_form(target, fields, &hidden, &submitted)?;
        info!("Applied {} submitted value(s)", submitted.len());
    }

    let controls = projection::form_controls(fields, &hidden, record.as_ref());
    match args.format {
        OutputFormat::Json => io_utils::write_json(
            None,
            &FormOutput {
                controls: &controls,
                record: record.as_ref(),
            },
        )?,
        OutputFormat::Yaml => print!(
            "{}",
            serde_yaml::to_string(&FormOutput {
                controls: &controls,
                record: record.as_ref(),
            })?
        ),
        OutputFormat::Table => {
            let mut table = Table::new(["input", "label", "control", "value"]);
            for control in &controls {
                table.push_row([
                    control.name.clone(),
                    control.label.clone(),
                    control.kind.as_str().to_string(),
                    control.value.clone(),
                ]);
            }
            table.print();
        }
    }
    Ok(())
}
