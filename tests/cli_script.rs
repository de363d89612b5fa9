use std::collections::BTreeMap;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;
use sems_domain::{AddressCandidate, Alert, AlertType, LimitCondition, MeterIdentifier, MeterKind};
use sems_outbox_json::JsonOutbox;
use tempfile::tempdir;

const REGISTRATION_SCRIPT: &str = "\
wizard start
wizard set school_name \"Oak Primary\"
wizard set email office@oak.sch.uk
wizard set address_line_1 \"1 Acorn Way\"
wizard set city Bath
wizard set post_code \"BA1 1AA\"
wizard next
wizard set governance_type maintained
wizard set school_pupils_size count_200_499
wizard set company_number_status dont_know
wizard next
wizard set first_name Ada
wizard set last_name Lovelace
wizard set job_role Bursar
wizard set contact_email ada@oak.sch.uk
wizard set contact_phone_number \"01225 000000\"
wizard set password \"correct horse\"
wizard set password_confirmation \"correct horse\"
wizard next
wizard set annual_consumption 1500
wizard submit
exit
";

fn console(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sems_console_cli").unwrap();
    cmd.env("SEMS_CONSOLE_HOME", home)
        .env("SEMS_CONSOLE_CLI_SCRIPT", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn script_mode_submits_a_registration() {
    let home = tempdir().unwrap();

    console(home.path())
        .write_stdin(REGISTRATION_SCRIPT)
        .assert()
        .success()
        .stdout(contains("Registration submitted. Reference REG-"));

    let outbox = JsonOutbox::new(home.path().join("outbox")).unwrap();
    let files = outbox.list_registrations().unwrap();
    assert_eq!(files.len(), 1);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    let request = &raw["request"];
    assert_eq!(request["school_name"], "Oak Primary");
    assert_eq!(request["governance_type"], "local_authority");
    assert_eq!(request["school_pupils_size"], "between_200_and_499");
    assert_eq!(request["company_number"], serde_json::Value::Null);
    assert_eq!(request["annual_consumption"], 1_500_000);
    assert_eq!(request["address"]["post_code"], "BA1 1AA");
}

#[test]
fn invalid_step_is_reported_and_not_advanced() {
    let home = tempdir().unwrap();

    console(home.path())
        .write_stdin("wizard start\nwizard set email nope\nwizard next\nwizard status\n")
        .assert()
        .success()
        .stdout(contains("Enter a valid email address"))
        .stdout(contains("> 1. School Details"));
}

#[test]
fn status_marks_committed_steps_complete() {
    let home = tempdir().unwrap();

    console(home.path())
        .write_stdin(
            "wizard start\n\
             wizard set school_name \"Oak Primary\"\n\
             wizard set email office@oak.sch.uk\n\
             wizard set address_line_1 \"1 Acorn Way\"\n\
             wizard set city Bath\n\
             wizard set post_code \"BA1 1AA\"\n\
             wizard next\n\
             wizard back\n\
             wizard status\n",
        )
        .assert()
        .success()
        .stdout(contains("> 1. School Details   complete"))
        .stdout(contains("  2. School Profile   not started"))
        .stdout(contains("saved").not());
}

#[test]
fn unknown_command_offers_a_suggestion() {
    let home = tempdir().unwrap();

    console(home.path())
        .write_stdin("wizrd start\n")
        .assert()
        .success()
        .stdout(contains("Suggestion: `wizard`?"));
}

#[test]
fn lookup_prefills_the_address() {
    let home = tempdir().unwrap();
    let outbox = JsonOutbox::new(home.path().join("outbox")).unwrap();
    let mut addresses = BTreeMap::new();
    addresses.insert(
        "BA1 1AA".to_string(),
        vec![AddressCandidate {
            line_1: "1 Acorn Way".into(),
            line_2: None,
            city: "Bath".into(),
            post_code: "BA1 1AA".into(),
            latitude: Some(51.38),
            longitude: Some(-2.36),
            meters: vec![MeterIdentifier {
                kind: MeterKind::Electricity,
                identifier: "1200000000001".into(),
            }],
        }],
    );
    outbox.save_addresses(&addresses).unwrap();

    console(home.path())
        .write_stdin("wizard start\nwizard lookup ba11aa\nwizard use-address 1\nwizard fields\n")
        .assert()
        .success()
        .stdout(contains("1. 1 Acorn Way, Bath BA1 1AA"))
        .stdout(contains("Filled address_line_1, city, post_code, latitude, longitude."));

    let config = std::fs::read_to_string(home.path().join("config.json")).unwrap();
    assert!(config.contains("BA11AA"));
}

#[test]
fn alert_edit_is_saved_to_the_outbox() {
    let home = tempdir().unwrap();
    let outbox = JsonOutbox::new(home.path().join("outbox")).unwrap();
    outbox
        .save_alerts(&[Alert {
            id: 5,
            alert_type: AlertType::ElectricityConsumptionLevel,
            location_id: Some(1),
            meter_id: None,
            limit_condition: Some(LimitCondition::Above),
            energy_limit: Some(10.0),
            limit_duration: None,
            limit_period_start: None,
            limit_period_end: None,
            percentage_limit: None,
        }])
        .unwrap();

    console(home.path())
        .write_stdin("alert list\nalert edit 5\nalert set 5 energyLimit 20\nalert save 5\n")
        .assert()
        .success()
        .stdout(contains("Alert #5 saved."));

    let alerts = outbox.load_alerts().unwrap();
    assert_eq!(alerts[0].energy_limit, Some(20.0));
}

#[test]
fn config_changes_persist() {
    let home = tempdir().unwrap();

    console(home.path())
        .write_stdin("config set request_timeout_secs 12\nconfig show\n")
        .assert()
        .success()
        .stdout(contains("Configuration updated: request_timeout_secs."));

    let config = std::fs::read_to_string(home.path().join("config.json")).unwrap();
    assert!(config.contains("\"request_timeout_secs\": 12"));
}
