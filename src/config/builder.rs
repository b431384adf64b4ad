use crate::config::{merge::Merge, types::*};
use crate::migration::directives::parse_duration;
use crate::version_store::format_version_table_name;
use anyhow::{Context, Result, anyhow};
use std::time::Duration;

/// Environment variables consulted, in order, when no password is configured
const PASSWORD_ENV_VARS: [&str; 2] = ["VPC_DB_PASSWORD", "PGPASSWORD"];

pub struct ConfigBuilder {
    config_input: ConfigInput,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config_input: ConfigInput::default(),
        }
    }

    pub fn with_file(mut self, file_input: ConfigInput) -> Self {
        self.config_input = self.config_input.merge(file_input);
        self
    }

    pub fn with_cli_args(mut self, cli_input: ConfigInput) -> Self {
        self.config_input = self.config_input.merge(cli_input);
        self
    }

    pub fn resolve(self) -> Result<Config> {
        let defaults = Config::default();

        Ok(Config {
            database: self.resolve_database(&defaults.database)?,
            migration: self.resolve_migration(&defaults.migration)?,
        })
    }

    fn resolve_database(&self, defaults: &DatabaseConfig) -> Result<DatabaseConfig> {
        let db_input = self.config_input.database.as_ref();

        let password = db_input
            .and_then(|d| d.password.as_ref())
            .cloned()
            .or_else(|| {
                PASSWORD_ENV_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok())
            })
            .or_else(|| defaults.password.clone());

        let connect_timeout = resolve_duration(
            db_input.and_then(|d| d.connect_timeout.as_deref()),
            defaults.connect_timeout,
            "database.connect_timeout",
        )?;

        let database = db_input
            .and_then(|d| d.database.as_ref())
            .cloned()
            .unwrap_or_else(|| defaults.database.clone());

        if database.is_empty() {
            return Err(anyhow!("database.database must not be empty"));
        }

        Ok(DatabaseConfig {
            host: db_input
                .and_then(|d| d.host.as_ref())
                .cloned()
                .unwrap_or_else(|| defaults.host.clone()),
            port: db_input
                .and_then(|d| d.port)
                .unwrap_or(defaults.port),
            database,
            user: db_input
                .and_then(|d| d.user.as_ref())
                .cloned()
                .unwrap_or_else(|| defaults.user.clone()),
            password,
            connect_timeout,
        })
    }

    fn resolve_migration(&self, defaults: &MigrationConfig) -> Result<MigrationConfig> {
        let mig_input = self.config_input.migration.as_ref();

        let version_table = mig_input
            .and_then(|m| m.version_table.as_ref())
            .map(|t| VersionTable {
                schema: t
                    .schema
                    .as_ref()
                    .cloned()
                    .unwrap_or_else(|| defaults.version_table.schema.clone()),
                name: t
                    .name
                    .as_ref()
                    .cloned()
                    .unwrap_or_else(|| defaults.version_table.name.clone()),
            })
            .unwrap_or_else(|| defaults.version_table.clone());

        format_version_table_name(&version_table)
            .context("Invalid migration.version_table configuration")?;

        let lock_timeout = resolve_duration(
            mig_input.and_then(|m| m.lock_timeout.as_deref()),
            defaults.lock_timeout,
            "migration.lock_timeout",
        )?;

        let lock_poll_interval = resolve_duration(
            mig_input.and_then(|m| m.lock_poll_interval.as_deref()),
            defaults.lock_poll_interval,
            "migration.lock_poll_interval",
        )?;

        Ok(MigrationConfig {
            version_table,
            lock_timeout,
            lock_poll_interval,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_duration(input: Option<&str>, default: Duration, key: &str) -> Result<Duration> {
    match input {
        Some(value) => {
            parse_duration(value).with_context(|| format!("Invalid value for {}", key))
        }
        None => Ok(default),
    }
}
