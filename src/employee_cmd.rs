use anyhow::{Context, Result, anyhow, bail};
use log::info;

use crate::{
    aliases::KnownField,
    cli::{BatchArgs, EmployeeAction, EmployeeArgs, FormValues, OutputFormat},
    employees::{self, EmployeeError},
    form_cmd::submitted_values,
    io_utils,
    projection::{self, FORM_CORE_FIELDS, display_value, format_field_label},
    schema::FieldDescriptor,
    session::Session,
    table,
    transform::{CanonicalRecord, RandomIds, SequentialIds},
};

pub fn execute(args: &EmployeeArgs) -> Result<()> {
    let mut session = Session::open(&args.source)?;
    let roster = session.transform(&args.batch);
    let context = || format!("Saving employee edits in {:?}", args.source.settings_dir);
    match &args.action {
        EmployeeAction::Add(values) => {
            let record = new_employee(&session, &args.batch, &roster, values)?;
            let id = record.id.clone();
            let mut edits = session.settings.employee_edits();
            edits.add(&roster, record)?;
            session.settings.save_employee_edits(&edits).with_context(context)?;
            info!("Added employee {id}");
            println!("{id}");
        }
        EmployeeAction::Update { id, values } => {
            let mut record = existing(&roster, id)?;
            let submitted = submitted_values(&values.set);
            if let Some(new_id) = submitted.get(KnownField::Id.as_str()) {
                if new_id.trim() != id.as_str() {
                    bail!("Employee IDs cannot change; delete '{id}' and add '{}' instead", new_id.trim());
                }
            }
            let hidden = session.hidden_fields();
            projection::apply_form(&mut record, session.context.fields(), &hidden, &submitted)?;
            let mut edits = session.settings.employee_edits();
            edits.update(&roster, record)?;
            session.settings.save_employee_edits(&edits).with_context(context)?;
            info!("Updated employee {id}");
        }
        EmployeeAction::Delete { id } => {
            let mut edits = session.settings.employee_edits();
            edits.delete(&roster, id)?;
            session.settings.save_employee_edits(&edits).with_context(context)?;
            info!("Deleted employee {id}");
        }
        EmployeeAction::Show { id, format } => {
            let record = existing(&roster, id)?;
            match format {
                OutputFormat::Json => io_utils::write_json(None, &record)?,
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&record)?),
                OutputFormat::Table => {
                    print!("{}", table::render_pairs(&record_pairs(&record, session.context.fields())))
                }
            }
        }
        EmployeeAction::Reset => {
            session.settings.reset_employee_edits().with_context(context)?;
            info!("Discarded every saved employee edit");
        }
    }
    Ok(())
}

fn existing(roster: &[CanonicalRecord], id: &str) -> Result<CanonicalRecord> {
    employees::find(roster, id)
        .cloned()
        .ok_or_else(|| anyhow!(EmployeeError::NotFound(id.to_string())))
}

/// A record built from a blank form; a blank ID gets a free placeholder.
fn new_employee(
    session: &Session,
    batch: &BatchArgs,
    roster: &[CanonicalRecord],
    values: &FormValues,
) -> Result<CanonicalRecord> {
    let submitted = submitted_values(&values.set);
    let hidden = session.hidden_fields();
    let mut record = CanonicalRecord::default();
    projection::apply_form(&mut record, session.context.fields(), &hidden, &submitted)?;
    if record.id.is_empty() {
        record.id = if batch.sequential_ids {
            employees::unused_id(&mut SequentialIds::default(), roster)
        } else {
            employees::unused_id(&mut RandomIds, roster)
        };
    }
    Ok(record)
}

fn record_pairs(record: &CanonicalRecord, fields: &[FieldDescriptor]) -> Vec<(String, String)> {
    let core = FORM_CORE_FIELDS.iter().map(|field| {
        let value = match field {
            KnownField::Status => projection::status_label(record.status).to_string(),
            other => record.attribute(*other).to_string(),
        };
        (format_field_label(field.as_str()).into_owned(), value)
    });
    let dynamic = fields.iter().filter(|field| !field.is_core).map(|field| {
        let value = record
            .dynamic(&field.normalized_name)
            .map(|value| display_value(value, field.field_type))
            .unwrap_or_default();
        (format_field_label(&field.original_name).into_owned(), value)
    });
    core.chain(dynamic).collect()
}
