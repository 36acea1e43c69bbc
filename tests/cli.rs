//! End-to-end tests driving the `autoscript` binary.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TEST1_SOURCE: &str = "// TEST1\nvar msg = 'ready';\nservice.log(msg);\n";

const TEST1_CONF: &str = r#"{
    "DESCRIPTION": "Test script",
    "ACTIVE": 1,
    "LOGLEVEL": "ERROR",
    "SCRIPTLANGUAGE": "js",
    "variables": [
        {"VARNAME": "VAR1", "VARBINDINGTYPE": "LITERAL", "VARTYPE": "IN", "ALLOWOVERRIDE": 1, "VARBINDINGVALUE": "42"}
    ],
    "launchPoints": [
        {
            "LAUNCHPOINTNAME": "TEST1_LP",
            "LAUNCHPOINTTYPE": "OBJECT",
            "OBJECTNAME": "ASSET",
            "ACTIVE": 1,
            "EVENT_TYPE": "save",
            "before_save": true,
            "add": true
        }
    ]
}"#;

struct Workspace {
    root: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let scripts = root.path().join("scripts");
        fs::create_dir_all(scripts.join("conf")).unwrap();
        fs::write(scripts.join("TEST1.js"), TEST1_SOURCE).unwrap();
        fs::write(scripts.join("conf").join("TEST1.json"), TEST1_CONF).unwrap();
        Self { root }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    fn db(&self) -> PathBuf {
        self.path().join("store.db")
    }

    fn scripts(&self) -> PathBuf {
        self.path().join("scripts")
    }

    /// A command isolated from the caller's settings and home directory.
    fn bare(&self) -> Command {
        let mut cmd = Command::cargo_bin("autoscript").unwrap();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env_remove("AUTOSCRIPT_CONFIG")
            .env_remove("AUTOSCRIPT_DB")
            .env_remove("AUTOSCRIPT_SCRIPT_DIR")
            .env_remove("RUST_LOG")
            .arg("--no-color");
        cmd
    }

    fn cmd(&self, script_dir: &Path) -> Command {
        let mut cmd = self.bare();
        cmd.arg("--db").arg(self.db()).arg("--script-dir").arg(script_dir);
        cmd
    }

    fn stdout(&self, script_dir: &Path, args: &[&str]) -> String {
        let output = self.cmd(script_dir).args(args).assert().success();
        String::from_utf8(output.get_output().stdout.clone()).unwrap()
    }
}

#[test]
fn test_deploy_then_list() {
    let ws = Workspace::new();
    let out = ws.stdout(&ws.scripts(), &["deploy", "--script", "test1"]);
    assert!(out.contains("TEST1 deployed successfully"));

    let listed = ws.stdout(&ws.scripts(), &["list"]);
    assert_eq!(listed.trim(), "TEST1");
}

#[test]
fn test_deploy_all_twice_is_idempotent() {
    let ws = Workspace::new();
    ws.stdout(&ws.scripts(), &["deploy", "--all"]);

    let out = ws.stdout(&ws.scripts(), &["--json", "deploy", "--all"]);
    let payload: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(payload["success"], true);
    assert_eq!(payload["stats"]["scripts"]["inserted"], 0);
    assert_eq!(payload["stats"]["scripts"]["updated"], 0);
    assert_eq!(payload["stats"]["launch_points"]["skipped"], 1);
}

#[test]
fn test_dry_run_writes_nothing() {
    let ws = Workspace::new();
    let out = ws.stdout(&ws.scripts(), &["-v", "2", "deploy", "-a", "--dry-run"]);
    assert!(out.contains("INSERT INTO AUTOSCRIPT"));

    let listed = ws.stdout(&ws.scripts(), &["list"]);
    assert!(listed.trim().is_empty());
}

#[test]
fn test_fetch_creates_then_reports_no_changes() {
    let ws = Workspace::new();
    ws.stdout(&ws.scripts(), &["deploy", "--all"]);

    let fetched = ws.path().join("fetched");
    let out = ws.stdout(&fetched, &["fetch", "--all"]);
    assert!(out.contains("Total scripts: 1, Updated: 0, Created: 1"));
    assert_eq!(
        fs::read_to_string(fetched.join("TEST1.js")).unwrap(),
        TEST1_SOURCE
    );
    assert!(fetched.join("conf").join("TEST1.json").is_file());

    let out = ws.stdout(&fetched, &["fetch", "--all"]);
    assert!(out.contains("Total scripts: 1, Updated: 0, Created: 0"));
}

#[test]
fn test_diff_names_changed_line() {
    let ws = Workspace::new();
    ws.stdout(&ws.scripts(), &["deploy", "--all"]);
    let fetched = ws.path().join("fetched");
    ws.stdout(&fetched, &["fetch", "--all"]);

    let out = ws.stdout(&fetched, &["diff", "--script", "TEST1"]);
    assert!(out.contains("TEST1 is up to date"));

    let edited = TEST1_SOURCE.replace("service.log(msg);", "service.log('changed');");
    fs::write(fetched.join("TEST1.js"), edited).unwrap();

    let out = ws.stdout(&fetched, &["-v", "2", "diff", "--all"]);
    assert!(out.contains("Script TEST1 has been modified."));
    assert!(out.contains("line 3:"));
    assert!(out.contains("- service.log('changed');"));
    assert!(out.contains("+ service.log(msg);"));
    assert!(out.contains("1 scripts have been modified"));
}

#[test]
fn test_unknown_script_is_json_error() {
    let ws = Workspace::new();
    ws.stdout(&ws.scripts(), &["deploy", "--all"]);

    let output = ws
        .cmd(&ws.scripts())
        .args(["--json", "fetch", "--script", "NOPE"])
        .assert()
        .failure()
        .code(1);
    let stderr = String::from_utf8(output.get_output().stderr.clone()).unwrap();
    let payload: serde_json::Value = serde_json::from_str(stderr.trim()).unwrap();
    assert_eq!(payload["error"]["code"], "SCRIPT_NOT_FOUND");
}

#[test]
fn test_missing_settings_file_fails() {
    let ws = Workspace::new();
    let output = ws.bare().arg("list").assert().failure().code(1);
    let stderr = String::from_utf8(output.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("Configuration error"));
}

#[test]
fn test_settings_file_in_working_directory() {
    let ws = Workspace::new();
    fs::write(
        ws.path().join("autoscript.json"),
        r#"{"DATABASE": "store.db", "scriptDir": "scripts", "dirLocation": "relative"}"#,
    )
    .unwrap();

    ws.bare().args(["deploy", "--all"]).assert().success();
    assert!(ws.db().is_file());
}

#[test]
fn test_missing_config_file_fails_deploy() {
    let ws = Workspace::new();
    fs::remove_file(ws.scripts().join("conf").join("TEST1.json")).unwrap();
    ws.cmd(&ws.scripts())
        .args(["deploy", "--all"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_script_and_all_conflict() {
    let ws = Workspace::new();
    ws.cmd(&ws.scripts())
        .args(["deploy", "--script", "TEST1", "--all"])
        .assert()
        .failure();
}

#[test]
fn test_version() {
    let ws = Workspace::new();
    let output = ws.bare().arg("version").assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    assert!(stdout.starts_with("autoscript version "));
}
