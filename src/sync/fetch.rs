//! Fetch: stored scripts into local files.
//!
//! A stored script is reassembled into the nested local form: the script row,
//! its variables, and its launch points with their variables and decoded
//! event flags.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::event::LaunchPointType;
use crate::model::{LaunchPoint, LaunchPointVariable, ScriptConfig, ScriptDefinition, Variable};
use crate::storage::{Repository, Row, SqliteStorage, Statement, Table};
use crate::sync::file::{atomic_write, config_path, read_if_exists, script_path};
use crate::sync::types::{FetchOutcome, FetchStats, SyncOptions};

/// Reassemble one stored script, or `None` if no row has that name.
///
/// # Errors
///
/// Returns an error if a query fails or a stored launch point type is unknown.
pub fn load_script(repo: &dyn Repository, name: &str) -> Result<Option<ScriptDefinition>> {
    let by_script = [("AUTOSCRIPT", Value::from(name))];

    let Some(script) = repo
        .query(&Statement::select(Table::Script, &[], &by_script))?
        .into_iter()
        .next()
    else {
        return Ok(None);
    };

    let variables = repo
        .query(&Statement::select(Table::Variable, &[], &by_script))?
        .iter()
        .map(variable_from_row)
        .collect();

    let mut launch_points = Vec::new();
    for row in repo.query(&Statement::select(Table::LaunchPoint, &[], &by_script))? {
        launch_points.push(launch_point_from_row(repo, name, &row)?);
    }

    let config = ScriptConfig {
        description: text(&script, "DESCRIPTION"),
        version: text(&script, "VERSION"),
        active: int(&script, "ACTIVE"),
        log_level: text(&script, "LOGLEVEL"),
        interface: int(&script, "INTERFACE"),
        id: int(&script, "AUTOSCRIPTID"),
        lang_code: text(&script, "LANGCODE"),
        script_language: text(&script, "SCRIPTLANGUAGE").unwrap_or_default(),
        variables,
        launch_points,
    };

    Ok(Some(ScriptDefinition {
        name: name.to_string(),
        source: text(&script, "SOURCE").unwrap_or_default(),
        config,
    }))
}

/// Like [`load_script`], but a missing script is an error.
///
/// # Errors
///
/// Returns `ScriptNotFound` if no stored script has that name.
pub fn require_script(repo: &dyn Repository, name: &str) -> Result<ScriptDefinition> {
    load_script(repo, name)?.ok_or_else(|| Error::ScriptNotFound {
        name: name.to_string(),
    })
}

fn variable_from_row(row: &Row) -> Variable {
    Variable {
        name: text(row, "VARNAME").unwrap_or_default(),
        description: text(row, "DESCRIPTION"),
        binding_type: text(row, "VARBINDINGTYPE"),
        var_type: text(row, "VARTYPE"),
        allow_override: int(row, "ALLOWOVERRIDE"),
        access_flag: text(row, "ACCESSFLAG"),
        binding_value: text(row, "VARBINDINGVALUE"),
        literal_data_type: text(row, "LITERALDATATYPE"),
        id: int(row, "AUTOSCRIPTVARSID"),
    }
}

fn launch_point_from_row(repo: &dyn Repository, script: &str, row: &Row) -> Result<LaunchPoint> {
    let name = text(row, "LAUNCHPOINTNAME").unwrap_or_default();
    let type_text = text(row, "LAUNCHPOINTTYPE").unwrap_or_default();
    let launch_point_type =
        LaunchPointType::parse(&type_text).ok_or_else(|| Error::InvalidEvent {
            launch_point: name.clone(),
            reason: format!("unknown launch point type '{type_text}'"),
        })?;

    let mut launch_point = LaunchPoint::new(&name, launch_point_type);
    launch_point.active = int(row, "ACTIVE");
    launch_point.description = text(row, "DESCRIPTION");
    launch_point.object_name = text(row, "OBJECTNAME");
    launch_point.attribute_name = text(row, "ATTRIBUTENAME");
    launch_point.condition = text(row, "CONDITION");
    launch_point.id = int(row, "SCRIPTLAUNCHPOINTID");

    if let Some(code) = int(row, "OBJECTEVENT") {
        if !launch_point.apply_object_event(code) {
            warn!(
                script,
                launch_point = %name,
                code,
                "unknown event code, keeping raw OBJECTEVENT"
            );
        }
    }

    let rows = repo.query(&Statement::select(
        Table::LaunchPointVariable,
        &[],
        &[
            ("AUTOSCRIPT", Value::from(script)),
            ("LAUNCHPOINTNAME", Value::from(name.as_str())),
        ],
    ))?;
    launch_point.variables = rows
        .iter()
        .map(|row| LaunchPointVariable {
            name: text(row, "VARNAME").unwrap_or_default(),
            binding_value: text(row, "VARBINDINGVALUE"),
            id: int(row, "LAUNCHPOINTVARSID"),
        })
        .collect();

    Ok(launch_point)
}

fn text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn int(row: &Row, column: &str) -> Option<i64> {
    match row.get(column)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Write one stored script into `script_dir`.
///
/// With both files present and no `force`, each file is rewritten only when
/// its content differs. Otherwise both are written and the script counts as
/// created.
///
/// # Errors
///
/// Returns `ScriptNotFound`, `UnsupportedLanguage`, or an IO/store error.
pub fn fetch_script(
    storage: &SqliteStorage,
    script_dir: &Path,
    name: &str,
    options: SyncOptions,
) -> Result<FetchOutcome> {
    let definition = require_script(storage.conn(), name)?;
    write_script(&definition, script_dir, options)
}

/// Write every stored script into `script_dir`.
///
/// # Errors
///
/// Returns the first store or file error.
pub fn fetch_all(
    storage: &SqliteStorage,
    script_dir: &Path,
    options: SyncOptions,
) -> Result<FetchStats> {
    let mut stats = FetchStats::default();
    for name in storage.list_script_names()? {
        let definition = require_script(storage.conn(), &name)?;
        stats.record(write_script(&definition, script_dir, options)?);
    }
    info!(
        total = stats.total,
        updated = stats.updated,
        created = stats.created,
        "fetch complete"
    );
    Ok(stats)
}

fn write_script(
    definition: &ScriptDefinition,
    script_dir: &Path,
    options: SyncOptions,
) -> Result<FetchOutcome> {
    let name = &definition.name;
    let source_path = script_path(script_dir, name, definition.config.language(name)?);
    let conf_path = config_path(script_dir, name);
    let config_json = definition.config.to_pretty_json()?;

    let existing = (read_if_exists(&source_path)?, read_if_exists(&conf_path)?);
    let (Some(local_source), Some(local_config)) = existing else {
        atomic_write(&source_path, &definition.source)?;
        atomic_write(&conf_path, &config_json)?;
        info!(script = %name, "created");
        return Ok(FetchOutcome::Created);
    };

    if options.force {
        atomic_write(&source_path, &definition.source)?;
        atomic_write(&conf_path, &config_json)?;
        info!(script = %name, "rewritten (forced)");
        return Ok(FetchOutcome::Created);
    }

    let mut updated = false;
    if local_source == definition.source {
        debug!(script = %name, "source unchanged");
    } else {
        atomic_write(&source_path, &definition.source)?;
        info!(script = %name, "source updated");
        updated = true;
    }
    if local_config == config_json {
        debug!(script = %name, "config unchanged");
    } else {
        atomic_write(&conf_path, &config_json)?;
        info!(script = %name, "config updated");
        updated = true;
    }

    Ok(if updated {
        FetchOutcome::Updated
    } else {
        FetchOutcome::Unchanged
    })
}
