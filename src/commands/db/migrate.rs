use crate::commands::db::common::{CommandContext, command_error, connect, disconnect, load_catalog, migrator};
use crate::config::Config;
use crate::engine::Target;
use anyhow::Result;
use tracing::info;

/// Tear the schema down and build it again from the embedded migrations
pub async fn cmd_db_migrate(config: &Config, ctx: &CommandContext) -> Result<()> {
    let catalog = load_catalog("migrate")?;
    let mut db = connect(config, "migrate").await?;

    info!(
        "Resyncing {} to {} migrations",
        config.database.display_target(),
        catalog.len()
    );
    let result = migrator(&catalog, config, ctx).resync(&mut db).await;
    disconnect(db).await;

    let outcome = result.map_err(|e| command_error("migrate", e))?;
    info!(
        "Schema rebuilt: {} rolled back, {} applied",
        outcome.down.applied_versions.len(),
        outcome.up.applied_versions.len()
    );
    Ok(())
}

pub async fn cmd_db_up(config: &Config, ctx: &CommandContext) -> Result<()> {
    run_to_target(config, ctx, "up", Target::Latest).await
}

pub async fn cmd_db_down(config: &Config, ctx: &CommandContext) -> Result<()> {
    run_to_target(config, ctx, "down", Target::Empty).await
}

pub async fn cmd_db_goto(config: &Config, ctx: &CommandContext, version: u64) -> Result<()> {
    run_to_target(config, ctx, "goto", Target::Version(version)).await
}

async fn run_to_target(
    config: &Config,
    ctx: &CommandContext,
    command: &str,
    target: Target,
) -> Result<()> {
    let catalog = load_catalog(command)?;
    let mut db = connect(config, command).await?;

    info!(
        "Migrating {} to version {}",
        config.database.display_target(),
        target
    );
    let result = migrator(&catalog, config, ctx)
        .migrate_to(&mut db, target)
        .await;
    disconnect(db).await;

    result.map_err(|e| command_error(command, e))?;
    Ok(())
}
