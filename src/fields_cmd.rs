use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;

use crate::{
    cli::{EnableStatsArgs, FieldsAction, FieldsArgs, ResetTarget, SourceArgs},
    schema::normalize_field_name,
    session::Session,
    settings::{FileStore, Settings, SettingsError, SettingsStore},
    table::Table,
};

pub fn execute(args: &FieldsArgs) -> Result<()> {
    let mut settings = Settings::new(FileStore::new(&args.settings_dir));
    let context = || format!("Updating settings in {:?}", args.settings_dir);
    match &args.action {
        FieldsAction::Hide(names) => {
            let names =
                apply_each(&mut settings, &names.names, Settings::hide).with_context(context)?;
            info!("Hidden field(s): {}", names.join(", "));
        }
        FieldsAction::Show(names) => {
            let names =
                apply_each(&mut settings, &names.names, Settings::show).with_context(context)?;
            info!("Visible field(s): {}", names.join(", "));
        }
        FieldsAction::EnableStats(stats) if stats.all => {
            let names = enable_all(args, stats)?;
            info!("Stats enabled for all {} dynamic field(s)", names.len());
        }
        FieldsAction::EnableStats(stats) => {
            let names = apply_each(&mut settings, &stats.names, Settings::enable_stats)
                .with_context(context)?;
            info!("Stats enabled for: {}", names.join(", "));
        }
        FieldsAction::DisableStats(names) => {
            let names = apply_each(&mut settings, &names.names, Settings::disable_stats)
                .with_context(context)?;
            info!("Stats disabled for: {}", names.join(", "));
        }
        FieldsAction::List => list(&settings),
        FieldsAction::Reset { target } => {
            if matches!(target, ResetTarget::Visibility | ResetTarget::All) {
                settings.reset_visibility().with_context(context)?;
                info!("All fields are visible");
            }
            if matches!(target, ResetTarget::Stats | ResetTarget::All) {
                settings.reset_stats().with_context(context)?;
                info!("No fields are enabled for stats");
            }
        }
    }
    Ok(())
}

/// Discovers the loaded batch and enables stats for every non-core field.
fn enable_all(args: &FieldsArgs, stats: &EnableStatsArgs) -> Result<Vec<String>> {
    let source = SourceArgs {
        rows: stats.rows.clone(),
        settings_dir: args.settings_dir.clone(),
        no_cache: false,
    };
    let mut session = Session::open(&source)?;
    session.discover();
    let fields = session.context.fields();
    session
        .settings
        .enable_all_stats(fields)
        .with_context(|| format!("Updating settings in {:?}", args.settings_dir))
}

/// Normalizes each name and applies `op`, returning the normalized names.
fn apply_each<S, F>(
    settings: &mut Settings<S>,
    names: &[String],
    mut op: F,
) -> Result<Vec<String>, SettingsError>
where
    S: SettingsStore,
    F: FnMut(&mut Settings<S>, &str) -> Result<(), SettingsError>,
{
    let normalized: Vec<String> = names
        .iter()
        .map(|name| normalize_field_name(name.trim()))
        .filter(|name| !name.is_empty())
        .unique()
        .collect();
    for name in &normalized {
        op(settings, name)?;
    }
    Ok(normalized)
}

fn list<S: SettingsStore>(settings: &Settings<S>) {
    let hidden = settings.list_hidden();
    let enabled = settings.list_stats_enabled();
    let mut table = Table::new(["field", "hidden", "stats"]);
    for name in hidden.iter().chain(enabled.iter()).unique() {
        table.push_row([
            name.clone(),
            yes_no(hidden.contains(name)).to_string(),
            yes_no(enabled.contains(name)).to_string(),
        ]);
    }
    if table.is_empty() {
        println!("No hidden or stats-enabled fields.");
    } else {
        table.print();
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
