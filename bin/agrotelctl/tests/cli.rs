//! ---
//! agrotel_section: "15-testing-qa"
//! agrotel_subsection: "integration"
//! agrotel_type: "source"
//! agrotel_scope: "test"
//! agrotel_description: "End-to-end checks of the agrotelctl binary."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self::with_simulator("command_latency_ms = 0\nhistory_latency_ms = 0\nrandom_seed = 42\n")
    }

    fn with_simulator(simulator: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = dir.path().join("records");
        let config = format!(
            "[simulator]\n{simulator}\n[storage]\ndirectory = {:?}\n",
            storage.display().to_string()
        );
        fs::write(dir.path().join("agrotel.toml"), config).expect("config");
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn ctl(&self) -> Command {
        let mut cmd = Command::cargo_bin("agrotelctl").expect("binary");
        cmd.env("AGROTEL_CONFIG", self.path().join("agrotel.toml"))
            .env("AGROTEL_LOG", "warn");
        cmd
    }

    fn stdout(&self, args: &[&str]) -> String {
        let output = self.ctl().args(args).assert().success().get_output().clone();
        String::from_utf8(output.stdout).expect("utf8 stdout")
    }
}

#[test]
fn version_flag_prints_package_version() {
    let fixture = Fixture::new();
    let out = fixture.stdout(&["-V"]);
    assert_eq!(out.trim(), format!("agrotelctl {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn history_for_a_day_prints_25_points() {
    let fixture = Fixture::new();
    let out = fixture.stdout(&["history", "sensor_001", "--range", "24h"]);
    let points: Vec<Value> = serde_json::from_str(&out).expect("json array");
    assert_eq!(points.len(), 25);
    assert!(points.iter().all(|p| p["sensor_id"] == "sensor_001"));
}

#[test]
fn unknown_range_falls_back_to_the_last_hour() {
    let fixture = Fixture::new();
    let out = fixture.stdout(&["history", "sensor_004", "--range", "3d"]);
    let points: Vec<Value> = serde_json::from_str(&out).expect("json array");
    assert_eq!(points.len(), 2);
}

#[test]
fn zero_length_run_prints_one_snapshot_per_sensor() {
    let fixture = Fixture::new();
    let out = fixture.stdout(&["run", "--duration-secs", "0"]);
    let events: Vec<Value> = out
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|event| event["kind"] == "snapshot"));
}

#[test]
fn command_is_acknowledged_with_parameters() {
    let fixture = Fixture::new();
    let out = fixture.stdout(&[
        "command",
        "pump_01",
        "start_irrigation",
        "--param",
        "duration=30",
        "--param",
        "zone=north",
    ]);
    let ack: Value = serde_json::from_str(&out).expect("ack json");
    assert_eq!(ack["success"], true);
    assert_eq!(ack["message"], "Command executed successfully");
    assert_eq!(ack["device_id"], "pump_01");
    assert_eq!(ack["parameters"]["duration"], 30);
    assert_eq!(ack["parameters"]["zone"], "north");
}

#[test]
fn rules_can_be_added_listed_and_removed() {
    let fixture = Fixture::new();
    let rule = fixture.path().join("rule.json");
    fs::write(
        &rule,
        r#"{
            "id": "dry-field-a",
            "name": "Irrigate Field A when dry",
            "sensor_id": "sensor_001",
            "condition": {"comparison": "below", "threshold": 35.0},
            "action": {"device_id": "pump_01", "command": "start_irrigation"}
        }"#,
    )
    .expect("rule file");
    let rule_arg = rule.display().to_string();

    assert_eq!(fixture.stdout(&["rules", "list"]).trim(), "[]");
    fixture.stdout(&["rules", "add", "--file", &rule_arg]);
    fixture.stdout(&["rules", "add", "--file", &rule_arg]);

    let listed: Vec<Value> =
        serde_json::from_str(&fixture.stdout(&["rules", "list"])).expect("rules json");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], "dry-field-a");
    assert_eq!(listed[0]["enabled"], true);

    fixture.stdout(&["rules", "remove", "dry-field-a"]);
    assert_eq!(fixture.stdout(&["rules", "list"]).trim(), "[]");
    fixture
        .ctl()
        .args(["rules", "remove", "dry-field-a"])
        .assert()
        .failure();
}

#[test]
fn alerts_show_defaults_until_replaced() {
    let fixture = Fixture::new();
    let defaults: Value =
        serde_json::from_str(&fixture.stdout(&["alerts", "show"])).expect("alerts json");
    assert_eq!(defaults["thresholds"]["moisture"]["min"], 30.0);

    let file = fixture.path().join("alerts.json");
    fs::write(
        &file,
        r#"{"thresholds": {"ph": {"min": 6.0, "max": 7.0}}, "notify_sms": true}"#,
    )
    .expect("alerts file");
    fixture.stdout(&["alerts", "set", "--file", &file.display().to_string()]);

    let stored: Value =
        serde_json::from_str(&fixture.stdout(&["alerts", "show"])).expect("alerts json");
    assert_eq!(stored["notify_sms"], true);
    assert_eq!(stored["notify_email"], false);
    assert!(stored["thresholds"].get("moisture").is_none());
}

#[test]
fn slow_rule_commands_do_not_hold_up_the_deadline() {
    let fixture = Fixture::with_simulator("tick_interval_ms = 100\ncommand_latency_ms = 60000\n");
    let rule = fixture.path().join("rule.json");
    fs::write(
        &rule,
        r#"{
            "id": "always-on",
            "name": "Fires on every Field A reading",
            "sensor_id": "sensor_001",
            "condition": {"comparison": "below", "threshold": 1000.0},
            "action": {"device_id": "pump_01", "command": "start_irrigation"}
        }"#,
    )
    .expect("rule file");
    fixture.stdout(&["rules", "add", "--file", &rule.display().to_string()]);

    let output = fixture
        .ctl()
        .args(["run", "--duration-secs", "1", "--apply-rules"])
        .timeout(Duration::from_secs(20))
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    let lines: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.iter().filter(|line| line["kind"] == "snapshot").count(), 5);
    assert!(lines.iter().all(|line| line.get("success").is_none()));
}
