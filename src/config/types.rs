use clap::Args;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw configuration input - all fields Optional for merging
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigInput {
    pub database: Option<DatabaseInput>,
    pub migration: Option<MigrationInput>,
}

/// Resolved configuration with all defaults applied
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub migration: MigrationConfig,
}

// Database configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseInput {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Duration string, e.g. "5s"
    pub connect_timeout: Option<String>,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub connect_timeout: Duration,
}

impl DatabaseConfig {
    /// Connection target for display, never includes the password
    pub fn display_target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

// Migration configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationInput {
    pub version_table: Option<VersionTableInput>,
    pub lock_timeout: Option<String>,
    pub lock_poll_interval: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VersionTableInput {
    pub schema: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub version_table: VersionTable,
    pub lock_timeout: Duration,
    pub lock_poll_interval: Duration,
}

/// Where the applied version is recorded inside the target database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTable {
    pub schema: String,
    pub name: String,
}

// CLI argument groups for command-specific options
#[derive(Debug, Clone, Default, Args)]
pub struct DatabaseArgs {
    #[arg(long, help = "Database host")]
    pub host: Option<String>,

    #[arg(long, help = "Database port")]
    pub port: Option<u16>,

    #[arg(long, help = "Database name")]
    pub database: Option<String>,

    #[arg(long, help = "Database user")]
    pub user: Option<String>,

    #[arg(long, help = "Database password (prefer VPC_DB_PASSWORD)")]
    pub password: Option<String>,

    #[arg(long, help = "Connect timeout, e.g. 5s")]
    pub connect_timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct MigrationArgs {
    #[arg(long, help = "How long to wait for the migration lock, e.g. 30s")]
    pub lock_timeout: Option<String>,
}

// Conversion functions from CLI args to config input
impl From<DatabaseArgs> for DatabaseInput {
    fn from(args: DatabaseArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            database: args.database,
            user: args.user,
            password: args.password,
            connect_timeout: args.connect_timeout,
        }
    }
}

impl From<MigrationArgs> for MigrationInput {
    fn from(args: MigrationArgs) -> Self {
        Self {
            version_table: None, // Version table location comes from file only
            lock_timeout: args.lock_timeout,
            lock_poll_interval: None,
        }
    }
}
