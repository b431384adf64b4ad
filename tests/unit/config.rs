use anyhow::Result;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use vpc::config::{ConfigBuilder, ConfigInput, DatabaseInput, load_config};

#[test]
fn test_load_config_from_file_and_override_with_cli() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("vpc.yaml");
    fs::write(
        &config_path,
        r#"
database:
  host: cp-db.internal
  port: 6432
  database: vpc_control
  connect_timeout: 2s
migration:
  lock_timeout: 1m
  lock_poll_interval: 250ms
  version_table:
    schema: control
    name: schema_version
"#,
    )?;

    let file_config = load_config(config_path.to_str().unwrap())?;
    let cli_config = ConfigInput {
        database: Some(DatabaseInput {
            host: Some("127.0.0.1".to_string()),
            ..Default::default()
        }),
        migration: None,
    };

    let config = ConfigBuilder::new()
        .with_file(file_config)
        .with_cli_args(cli_config)
        .resolve()?;

    assert_eq!(config.database.host, "127.0.0.1");
    assert_eq!(config.database.port, 6432);
    assert_eq!(config.database.database, "vpc_control");
    assert_eq!(config.database.connect_timeout, Duration::from_secs(2));
    assert_eq!(config.migration.lock_timeout, Duration::from_secs(60));
    assert_eq!(
        config.migration.lock_poll_interval,
        Duration::from_millis(250)
    );
    assert_eq!(config.migration.version_table.schema, "control");
    assert_eq!(config.migration.version_table.name, "schema_version");

    Ok(())
}

#[test]
fn test_load_config_reports_malformed_yaml() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = temp_dir.path().join("vpc.yaml");
    fs::write(&config_path, "database: [not, a, mapping]\n")?;

    let err = load_config(config_path.to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));

    Ok(())
}

#[test]
fn test_empty_database_name_is_rejected() {
    let input = ConfigInput {
        database: Some(DatabaseInput {
            database: Some(String::new()),
            ..Default::default()
        }),
        migration: None,
    };

    assert!(ConfigBuilder::new().with_file(input).resolve().is_err());
}
