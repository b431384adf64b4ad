use crate::helpers::cli::VpcCommand;
use predicates::prelude::*;

#[test]
fn test_db_list_prints_embedded_migrations() {
    let vpc = VpcCommand::new();

    vpc.cmd()
        .args(["db", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("create_vpcs"))
        .stdout(predicate::str::contains("index_mux_fte_underlay (non-transactional)"));
}

#[test]
fn test_db_list_json() {
    let vpc = VpcCommand::new();

    let output = vpc
        .cmd()
        .args(["db", "list", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let versions: Vec<u64> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|step| step["version"].as_u64().unwrap())
        .collect();
    assert_eq!(versions, vec![1, 2, 3, 4]);
    assert_eq!(listed[3]["up_mode"], "non-transactional");
}

#[test]
fn test_db_migrate_unreachable_database_fails() {
    let vpc = VpcCommand::new();

    vpc.cmd()
        .args([
            "db",
            "migrate",
            "--host",
            "127.0.0.1",
            "--port",
            "1",
            "--connect-timeout",
            "2s",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("vpc db migrate failed (ConnectivityError)"));
}

#[test]
fn test_invalid_config_file_is_reported() {
    let vpc = VpcCommand::new();
    vpc.write_config("database:\n  hostname: typo\n");

    vpc.cmd()
        .args(["db", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_force_rejects_garbage_version() {
    let vpc = VpcCommand::new();

    vpc.cmd()
        .args(["db", "force", "latest"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected a migration version or 'none'"));
}

#[test]
fn test_invalid_lock_timeout_flag() {
    let vpc = VpcCommand::new();

    vpc.cmd()
        .args(["db", "up", "--lock-timeout", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("migration.lock_timeout"));
}
