//! Deploy: local script files into the store.
//!
//! One script deploys as a single transaction cascading through
//! script → variables → launch points → launch point variables. The order is
//! fixed: launch point variables are only written once their launch point
//! row exists.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{LaunchPoint, LaunchPointVariable, ScriptConfig, ScriptDefinition, Variable};
use crate::storage::{Repository, SqliteStorage, Statement, Table};
use crate::sync::allocator::IdAllocators;
use crate::sync::file::{config_path, discover_scripts, script_path};
use crate::sync::types::{DeployStats, Outcome, SyncOptions};
use crate::sync::upsert::{upsert, Applied, Candidate};

/// Author recorded on inserted and updated script rows.
pub const DEPLOY_USER: &str = "MAXADMIN";

/// Status of a newly inserted script.
pub const INITIAL_STATUS: &str = "Draft";

/// Language code used when the configuration has none.
pub const DEFAULT_LANGCODE: &str = "EN";

/// Store timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Read `<dir>/conf/<name>.json` and the matching source file.
///
/// The configuration is validated before the source is read, so an
/// unsupported language or a malformed launch point event fails here.
///
/// # Errors
///
/// Returns `ConfigFileNotFound`, `ScriptFileNotFound`, `UnsupportedLanguage`,
/// `InvalidEvent`, or a JSON/IO error.
pub fn read_script_from_files(name: &str, script_dir: &Path) -> Result<ScriptDefinition> {
    let conf_path = config_path(script_dir, name);
    if !conf_path.is_file() {
        return Err(Error::ConfigFileNotFound {
            name: name.to_string(),
            path: conf_path,
        });
    }
    let config = ScriptConfig::from_json(&fs::read_to_string(&conf_path)?)?;
    config.validate(name)?;

    let source_path = script_path(script_dir, name, config.language(name)?);
    if !source_path.is_file() {
        return Err(Error::ScriptFileNotFound { path: source_path });
    }
    let source = fs::read_to_string(&source_path)?;

    Ok(ScriptDefinition {
        name: name.to_uppercase(),
        source,
        config,
    })
}

/// Deploys scripts against one store, sharing id allocation across the run.
pub struct Deployer<'a> {
    storage: &'a mut SqliteStorage,
    options: SyncOptions,
    allocators: IdAllocators,
    timestamp: String,
}

impl<'a> Deployer<'a> {
    #[must_use]
    pub fn new(storage: &'a mut SqliteStorage, options: SyncOptions) -> Self {
        Self {
            storage,
            options,
            allocators: IdAllocators::default(),
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Ids handed out so far in this run.
    #[must_use]
    pub const fn ids_issued(&self) -> usize {
        self.allocators.issued()
    }

    /// Deploy one script inside its own transaction.
    ///
    /// # Errors
    ///
    /// Returns the first failure; nothing from this script is kept.
    pub fn deploy(&mut self, definition: &ScriptDefinition) -> Result<DeployStats> {
        let Self {
            storage,
            options,
            allocators,
            timestamp,
        } = self;

        info!(script = %definition.name, dry_run = options.dry_run, "deploying");
        let stats = storage.mutate("deploy", |conn| {
            Cascade {
                repo: conn,
                allocators,
                options,
                timestamp,
                script: &definition.name,
                stats: DeployStats::default(),
            }
            .run(definition)
        })?;
        info!(
            script = %definition.name,
            mutations = stats.mutations(),
            "deployed"
        );
        Ok(stats)
    }
}

/// Read and deploy one named script.
///
/// # Errors
///
/// Returns any file, validation or store error.
pub fn deploy_script(
    storage: &mut SqliteStorage,
    script_dir: &Path,
    name: &str,
    options: SyncOptions,
) -> Result<DeployStats> {
    let definition = read_script_from_files(name, script_dir)?;
    Deployer::new(storage, options).deploy(&definition)
}

/// Deploy every script found in `script_dir`.
///
/// The first failure aborts the batch. Scripts deployed before it stay
/// committed.
///
/// # Errors
///
/// Returns the first file, validation or store error.
pub fn deploy_all(
    storage: &mut SqliteStorage,
    script_dir: &Path,
    options: SyncOptions,
) -> Result<DeployStats> {
    let names = discover_scripts(script_dir)?;
    debug!(count = names.len(), dir = %script_dir.display(), "discovered scripts");

    let mut deployer = Deployer::new(storage, options);
    let mut total = DeployStats::default();
    for name in names {
        let definition = read_script_from_files(&name, script_dir)?;
        total.merge(deployer.deploy(&definition)?);
    }
    Ok(total)
}

/// State for one script's cascade inside its transaction.
struct Cascade<'r> {
    repo: &'r dyn Repository,
    allocators: &'r mut IdAllocators,
    options: &'r SyncOptions,
    timestamp: &'r str,
    script: &'r str,
    stats: DeployStats,
}

impl Cascade<'_> {
    fn run(mut self, definition: &ScriptDefinition) -> Result<DeployStats> {
        let config = &definition.config;

        self.apply(self.script_candidate(definition)?)?;

        for variable in &config.variables {
            self.apply(self.variable_candidate(variable))?;
        }

        // Launch points inserted under dry run are not in the store yet.
        let mut pending = HashSet::new();
        for launch_point in &config.launch_points {
            let outcome = self.apply(self.launch_point_candidate(launch_point)?)?;
            if self.options.dry_run && matches!(outcome, Outcome::Inserted(_)) {
                pending.insert(launch_point.name.as_str());
            }
        }

        for launch_point in &config.launch_points {
            for variable in &launch_point.variables {
                self.ensure_launch_point(launch_point, variable, &pending)?;
                self.apply(self.launch_point_variable_candidate(launch_point, variable))?;
            }
        }

        self.stats.scripts_deployed.push(self.script.to_string());
        Ok(self.stats)
    }

    fn apply(&mut self, candidate: Candidate) -> Result<Outcome> {
        let table = candidate.table;
        let Applied { outcome, statement } = upsert(
            self.repo,
            self.allocators.get_mut(table),
            candidate,
            self.options,
        )?;
        self.stats.record(table, outcome);
        if self.options.dry_run {
            if let Some(statement) = &statement {
                self.stats.push_statement(statement);
            }
        }
        Ok(outcome)
    }

    fn ensure_launch_point(
        &self,
        launch_point: &LaunchPoint,
        variable: &LaunchPointVariable,
        pending: &HashSet<&str>,
    ) -> Result<()> {
        if pending.contains(launch_point.name.as_str()) {
            return Ok(());
        }
        let rows = self.repo.query(&Statement::select(
            Table::LaunchPoint,
            &[Table::LaunchPoint.id_column()],
            &[
                ("AUTOSCRIPT", Value::from(self.script)),
                ("LAUNCHPOINTNAME", Value::from(launch_point.name.as_str())),
            ],
        ))?;
        if rows.is_empty() {
            return Err(Error::OrphanLaunchPointVariable {
                script: self.script.to_string(),
                launch_point: launch_point.name.clone(),
                variable: variable.name.clone(),
            });
        }
        Ok(())
    }

    fn script_candidate(&self, definition: &ScriptDefinition) -> Result<Candidate> {
        let config = &definition.config;
        let language = config.language(&definition.name)?;

        let mut candidate = Candidate::new(
            Table::Script,
            format!("script {}", definition.name),
            config.id,
        );
        candidate.key = vec![("AUTOSCRIPT", Value::from(self.script))];
        candidate
            .field("AUTOSCRIPT", Some(self.script))
            .field(
                "DESCRIPTION",
                Some(config.description.as_deref().unwrap_or_default()),
            )
            .field("SOURCE", Some(definition.source.as_str()))
            .field(
                "LANGCODE",
                Some(config.lang_code.as_deref().unwrap_or(DEFAULT_LANGCODE)),
            )
            .field("SCRIPTLANGUAGE", Some(language.to_string()))
            .field("LOGLEVEL", config.log_level.as_deref())
            .field("INTERFACE", config.interface)
            .field("ACTIVE", config.active)
            .field("VERSION", config.version.as_deref());

        for column in ["CREATEDDATE", "STATUSDATE", "CHANGEDATE"] {
            candidate
                .on_insert
                .insert(column.to_string(), Value::from(self.timestamp));
        }
        for column in ["OWNER", "CREATEDBY", "CHANGEBY"] {
            candidate
                .on_insert
                .insert(column.to_string(), Value::from(DEPLOY_USER));
        }
        candidate
            .on_insert
            .insert("STATUS".to_string(), Value::from(INITIAL_STATUS));
        candidate.on_insert.insert("HASLD".to_string(), Value::from(0));
        candidate
            .on_insert
            .insert("USERDEFINED".to_string(), Value::from(1));

        candidate
            .on_update
            .insert("CHANGEDATE".to_string(), Value::from(self.timestamp));
        candidate
            .on_update
            .insert("CHANGEBY".to_string(), Value::from(DEPLOY_USER));

        Ok(candidate)
    }

    fn variable_candidate(&self, variable: &Variable) -> Candidate {
        let mut candidate = Candidate::new(
            Table::Variable,
            format!("variable {}", variable.name),
            variable.id,
        );
        candidate.key = vec![
            ("AUTOSCRIPT", Value::from(self.script)),
            ("VARNAME", Value::from(variable.name.as_str())),
        ];
        candidate
            .field("AUTOSCRIPT", Some(self.script))
            .field("VARNAME", Some(variable.name.as_str()))
            .field("VARBINDINGTYPE", variable.binding_type.as_deref())
            .field("VARTYPE", variable.var_type.as_deref())
            .field("DESCRIPTION", variable.description.as_deref())
            .field("ALLOWOVERRIDE", variable.allow_override)
            .field("ACCESSFLAG", variable.access_flag.as_deref())
            .field("VARBINDINGVALUE", variable.binding_value.as_deref())
            .field("LITERALDATATYPE", variable.literal_data_type.as_deref());
        candidate
    }

    fn launch_point_candidate(&self, launch_point: &LaunchPoint) -> Result<Candidate> {
        let mut candidate = Candidate::new(
            Table::LaunchPoint,
            format!("launch point {}", launch_point.name),
            launch_point.id,
        );
        candidate.key = vec![
            ("AUTOSCRIPT", Value::from(self.script)),
            ("LAUNCHPOINTNAME", Value::from(launch_point.name.as_str())),
        ];
        candidate
            .field("LAUNCHPOINTNAME", Some(launch_point.name.as_str()))
            .field("AUTOSCRIPT", Some(self.script))
            .field("DESCRIPTION", launch_point.description.as_deref())
            .field(
                "LAUNCHPOINTTYPE",
                Some(launch_point.launch_point_type.as_str()),
            )
            .field("ACTIVE", launch_point.active)
            .field("OBJECTNAME", launch_point.object_name.as_deref())
            .field("OBJECTEVENT", launch_point.object_event_code()?)
            .field("ATTRIBUTENAME", launch_point.attribute_name.as_deref())
            .field("CONDITION", launch_point.condition.as_deref());
        Ok(candidate)
    }

    fn launch_point_variable_candidate(
        &self,
        launch_point: &LaunchPoint,
        variable: &LaunchPointVariable,
    ) -> Candidate {
        let mut candidate = Candidate::new(
            Table::LaunchPointVariable,
            format!("launch point variable {}.{}", launch_point.name, variable.name),
            variable.id,
        );
        candidate.key = vec![
            ("AUTOSCRIPT", Value::from(self.script)),
            ("LAUNCHPOINTNAME", Value::from(launch_point.name.as_str())),
            ("VARNAME", Value::from(variable.name.as_str())),
        ];
        candidate.compare_by = Some(vec![
            ("VARNAME", Value::from(variable.name.as_str())),
            ("LAUNCHPOINTNAME", Value::from(launch_point.name.as_str())),
        ]);
        candidate
            .field("LAUNCHPOINTNAME", Some(launch_point.name.as_str()))
            .field("AUTOSCRIPT", Some(self.script))
            .field("VARNAME", Some(variable.name.as_str()))
            .field("VARBINDINGVALUE", variable.binding_value.as_deref());
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Row;
    use crate::sync::fixtures::{script_dir, TEST1_CONF, TEST1_SOURCE};
    use serde_json::json;
    use tempfile::TempDir;

    fn rows(storage: &SqliteStorage, table: Table) -> Vec<Row> {
        storage
            .conn()
            .query(&Statement::select(table, &[], &[]))
            .unwrap()
    }

    #[test]
    fn test_read_script_from_files() {
        let dir = script_dir(TEST1_CONF);
        let definition = read_script_from_files("TEST1", dir.path()).unwrap();
        assert_eq!(definition.name, "TEST1");
        assert_eq!(definition.source, TEST1_SOURCE);
        assert_eq!(definition.config.launch_points.len(), 1);
    }

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        let err = read_script_from_files("NOPE", dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigFileNotFound { .. }));
    }

    #[test]
    fn test_missing_source_file() {
        let dir = script_dir(TEST1_CONF);
        fs::remove_file(dir.path().join("TEST1.js")).unwrap();
        let err = read_script_from_files("TEST1", dir.path()).unwrap_err();
        assert!(matches!(err, Error::ScriptFileNotFound { .. }));
    }

    #[test]
    fn test_unsupported_language() {
        let dir = script_dir(r#"{"SCRIPTLANGUAGE": "groovy"}"#);
        let err = read_script_from_files("TEST1", dir.path()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage { .. }));
    }

    #[test]
    fn test_deploy_inserts_every_record() {
        let dir = script_dir(TEST1_CONF);
        let mut storage = SqliteStorage::open_memory().unwrap();

        let stats =
            deploy_script(&mut storage, dir.path(), "TEST1", SyncOptions::default()).unwrap();
        assert_eq!(stats.inserted(), 4);
        assert_eq!(stats.scripts_deployed, vec!["TEST1"]);

        let script = &rows(&storage, Table::Script)[0];
        assert_eq!(script["SOURCE"], json!(TEST1_SOURCE));
        assert_eq!(script["STATUS"], json!("Draft"));
        assert_eq!(script["LANGCODE"], json!("EN"));
        assert_eq!(script["USERDEFINED"], json!(1));
        assert_eq!(script["CREATEDBY"], json!("MAXADMIN"));

        let launch_point = &rows(&storage, Table::LaunchPoint)[0];
        assert_eq!(launch_point["OBJECTEVENT"], json!(2));
        assert_eq!(launch_point["LAUNCHPOINTTYPE"], json!("OBJECT"));

        let lp_var = &rows(&storage, Table::LaunchPointVariable)[0];
        assert_eq!(lp_var["LAUNCHPOINTNAME"], json!("TEST1_LP"));
        assert_eq!(lp_var["VARBINDINGVALUE"], json!("7"));
    }

    #[test]
    fn test_redeploy_is_idempotent() {
        let dir = script_dir(TEST1_CONF);
        let mut storage = SqliteStorage::open_memory().unwrap();
        deploy_script(&mut storage, dir.path(), "TEST1", SyncOptions::default()).unwrap();
        let before = rows(&storage, Table::Script);

        let definition = read_script_from_files("TEST1", dir.path()).unwrap();
        let mut deployer = Deployer::new(&mut storage, SyncOptions::default());
        let stats = deployer.deploy(&definition).unwrap();
        assert_eq!(stats.mutations(), 0);
        assert_eq!(deployer.ids_issued(), 0);
        assert_eq!(rows(&storage, Table::Script), before);
    }

    #[test]
    fn test_changed_source_updates_script_only() {
        let dir = script_dir(TEST1_CONF);
        let mut storage = SqliteStorage::open_memory().unwrap();
        deploy_script(&mut storage, dir.path(), "TEST1", SyncOptions::default()).unwrap();

        fs::write(dir.path().join("TEST1.js"), "service.log('v2');\n").unwrap();
        let stats =
            deploy_script(&mut storage, dir.path(), "TEST1", SyncOptions::default()).unwrap();
        assert_eq!(stats.scripts.updated, 1);
        assert_eq!(stats.mutations(), 1);

        let script = &rows(&storage, Table::Script)[0];
        assert_eq!(script["SOURCE"], json!("service.log('v2');\n"));
        assert_eq!(script["STATUS"], json!("Draft"));
        assert_eq!(script["AUTOSCRIPTID"], json!(1));
    }

    #[test]
    fn test_numeric_looking_string_edit_is_deployed() {
        let dir = script_dir(TEST1_CONF);
        let mut storage = SqliteStorage::open_memory().unwrap();
        deploy_script(&mut storage, dir.path(), "TEST1", SyncOptions::default()).unwrap();

        let edited = TEST1_CONF.replace(r#""VARBINDINGVALUE": "42""#, r#""VARBINDINGVALUE": "042""#);
        fs::write(dir.path().join("conf").join("TEST1.json"), edited).unwrap();
        let stats =
            deploy_script(&mut storage, dir.path(), "TEST1", SyncOptions::default()).unwrap();
        assert_eq!(stats.variables.updated, 1);
        assert_eq!(stats.mutations(), 1);

        let variable = &rows(&storage, Table::Variable)[0];
        assert_eq!(variable["VARBINDINGVALUE"], json!("042"));
    }

    #[test]
    fn test_new_ids_follow_max() {
        let dir = script_dir(TEST1_CONF);
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .conn()
            .execute(
                "INSERT INTO AUTOSCRIPTVARS (AUTOSCRIPTVARSID, AUTOSCRIPT, VARNAME) VALUES (41, 'OTHER', 'X')",
                [],
            )
            .unwrap();

        deploy_script(&mut storage, dir.path(), "TEST1", SyncOptions::default()).unwrap();
        let vars = rows(&storage, Table::Variable);
        assert_eq!(vars[1]["AUTOSCRIPTVARSID"], json!(42));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = script_dir(TEST1_CONF);
        let mut storage = SqliteStorage::open_memory().unwrap();
        let options = SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        };

        let stats = deploy_script(&mut storage, dir.path(), "TEST1", options).unwrap();
        assert_eq!(stats.inserted(), 4);
        assert_eq!(stats.statements.len(), 4);
        assert!(stats.statements[0].contains("'it''''s here'"));
        assert!(rows(&storage, Table::Script).is_empty());
    }

    #[test]
    fn test_orphan_launch_point_variable_rolls_back() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .conn()
            .execute(
                "INSERT INTO SCRIPTLAUNCHPOINT (SCRIPTLAUNCHPOINTID, LAUNCHPOINTNAME, AUTOSCRIPT, LAUNCHPOINTTYPE)
                 VALUES (5, 'LP_OLD', 'TEST1', 'OBJECT')",
                [],
            )
            .unwrap();

        // The launch point claims id 5, which belongs to LP_OLD. Its update
        // matches no row, so LP_NEW never exists for its variable.
        let dir = script_dir(
            r#"{
                "SCRIPTLANGUAGE": "js",
                "launchPoints": [{
                    "LAUNCHPOINTNAME": "LP_NEW",
                    "LAUNCHPOINTTYPE": "OBJECT",
                    "SCRIPTLAUNCHPOINTID": 5,
                    "VARIABLES": [{"VARNAME": "V", "VARBINDINGVALUE": "1"}]
                }]
            }"#,
        );

        let err = deploy_script(&mut storage, dir.path(), "TEST1", SyncOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::OrphanLaunchPointVariable { ref launch_point, .. } if launch_point == "LP_NEW"
        ));

        assert!(rows(&storage, Table::Script).is_empty());
        assert!(rows(&storage, Table::LaunchPointVariable).is_empty());
        assert_eq!(rows(&storage, Table::LaunchPoint).len(), 1);
    }

    #[test]
    fn test_invalid_event_is_rejected_before_writing() {
        let conf = TEST1_CONF.replace("\"add\": true,", "");
        let dir = script_dir(&conf);
        let mut storage = SqliteStorage::open_memory().unwrap();

        let err = deploy_script(&mut storage, dir.path(), "TEST1", SyncOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEvent { .. }));
        assert!(rows(&storage, Table::Script).is_empty());
    }

    #[test]
    fn test_deploy_all_aborts_on_first_failure() {
        let dir = script_dir(TEST1_CONF);
        fs::write(dir.path().join("A_BROKEN.js"), "x").unwrap();
        let mut storage = SqliteStorage::open_memory().unwrap();

        let err = deploy_all(&mut storage, dir.path(), SyncOptions::default()).unwrap_err();
        assert!(matches!(err, Error::ConfigFileNotFound { .. }));
        assert!(rows(&storage, Table::Script).is_empty());
    }

    #[test]
    fn test_deploy_all() {
        let dir = script_dir(TEST1_CONF);
        fs::write(dir.path().join("TEST2.py"), "print('hi')\n").unwrap();
        fs::write(
            dir.path().join("conf").join("TEST2.json"),
            r#"{"SCRIPTLANGUAGE": "jython"}"#,
        )
        .unwrap();
        let mut storage = SqliteStorage::open_memory().unwrap();

        let stats = deploy_all(&mut storage, dir.path(), SyncOptions::default()).unwrap();
        assert_eq!(stats.scripts_deployed, vec!["TEST1", "TEST2"]);
        assert_eq!(storage.list_script_names().unwrap(), vec!["TEST1", "TEST2"]);
    }
}
