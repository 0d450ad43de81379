pub mod aliases;
pub mod classify;
pub mod cli;
pub mod data;
pub mod employee_cmd;
pub mod employees;
pub mod fields_cmd;
pub mod form_cmd;
pub mod io_utils;
pub mod normalize;
pub mod projection;
pub mod schema;
pub mod session;
pub mod settings;
pub mod stats;
pub mod table;
pub mod transform;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, OutputFormat},
    session::Session,
    table::Table,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("hr_sheet", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Transform(args) => handle_transform(&args),
        Commands::Stats(args) => stats::execute(&args),
        Commands::Form(args) => form_cmd::execute(&args),
        Commands::Employee(args) => employee_cmd::execute(&args),
        Commands::Fields(args) => fields_cmd::execute(&args),
    }
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let mut session = Session::open(&args.source)?;
    let hidden = session.hidden_fields();
    let enabled = session.settings.list_stats_enabled();
    let row_count = session.raw.len();
    session.discover();
    let fields = session.context.fields();
    info!(
        "Discovered {} dynamic field(s) across {} row(s)",
        fields.len(),
        row_count
    );
    match args.format {
        OutputFormat::Json => io_utils::write_json(None, fields)?,
        OutputFormat::Yaml => print!("{}", session.context.to_yaml_string()?),
        OutputFormat::Table => {
            let mut table = Table::new(["field", "name", "type", "core", "hidden", "stats"]);
            for field in fields {
                table.push_row([
                    field.original_name.clone(),
                    field.normalized_name.clone(),
                    field.field_type.to_string(),
                    flag(field.is_core),
                    flag(hidden.contains(&field.normalized_name)),
                    flag(enabled.contains(&field.normalized_name)),
                ]);
            }
            table.print();
        }
    }
    Ok(())
}

fn handle_transform(args: &cli::TransformArgs) -> Result<()> {
    let mut session = Session::open(&args.source)?;
    let records = session.transform(&args.batch);
    if args.table {
        let hidden = if args.include_hidden {
            Vec::new()
        } else {
            session.hidden_fields()
        };
        debug!("Hiding {} column(s) from the table", hidden.len());
        let view = projection::table_view(&records, session.context.fields(), &hidden);
        Table::new(view.headers).with_rows(view.rows).print();
        return Ok(());
    }
    io_utils::write_json(args.output.as_deref(), &records)
        .with_context(|| format!("Writing {} record(s)", records.len()))?;
    if let Some(path) = &args.output {
        info!("Wrote {} record(s) to {:?}", records.len(), path);
    }
    Ok(())
}

fn flag(value: bool) -> String {
    if value { "yes" } else { "" }.to_string()
}
