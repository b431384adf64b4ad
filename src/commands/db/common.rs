use crate::assets::EmbeddedAssets;
use crate::config::Config;
use crate::db::PgDatabase;
use crate::engine::{Migrator, MigratorOptions, ShutdownSignal};
use crate::error::MigrateError;
use crate::migration::Catalog;
use crate::progress::MigrationReporter;
use anyhow::Result;
use tracing::{debug, warn};

/// Process-wide settings shared by every `vpc db` command
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub shutdown: ShutdownSignal,
    pub reporter: MigrationReporter,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Human,
    /// JSON for scripts
    Json,
}

/// Wrap an engine failure so the CLI prints the failing command and error kind
pub fn command_error(command: &str, error: MigrateError) -> anyhow::Error {
    let kind = error.kind();
    anyhow::Error::new(error).context(format!("vpc db {} failed ({})", command, kind))
}

pub fn load_catalog(command: &str) -> Result<Catalog> {
    let catalog = Catalog::load(&EmbeddedAssets)
        .map_err(|e| command_error(command, MigrateError::from(e)))?;
    debug!("Loaded {} embedded migrations", catalog.len());
    Ok(catalog)
}

pub async fn connect(config: &Config, command: &str) -> Result<PgDatabase> {
    PgDatabase::open(&config.database, &config.migration.version_table)
        .await
        .map_err(|e| command_error(command, MigrateError::from(e)))
}

pub fn migrator<'a>(catalog: &'a Catalog, config: &Config, ctx: &CommandContext) -> Migrator<'a> {
    Migrator::new(catalog, MigratorOptions::from(&config.migration))
        .with_shutdown(ctx.shutdown.clone())
        .with_reporter(ctx.reporter.clone())
}

pub async fn disconnect(db: PgDatabase) {
    if let Err(e) = db.close().await {
        warn!("{}", e);
    }
}
