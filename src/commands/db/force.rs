use crate::commands::db::common::{CommandContext, command_error, connect, disconnect, load_catalog, migrator};
use crate::config::Config;
use crate::error::display_version;
use anyhow::Result;

/// Parse a `force` argument: a version number or `none`
pub fn parse_forced_version(value: &str) -> Result<Option<u64>, String> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|_| format!("expected a migration version or 'none', got '{}'", value))
}

/// Mark the database as cleanly at `version` without running any script
pub async fn cmd_db_force(config: &Config, ctx: &CommandContext, version: Option<u64>) -> Result<()> {
    let catalog = load_catalog("force")?;
    let mut db = connect(config, "force").await?;

    let result = migrator(&catalog, config, ctx).force(&mut db, version).await;
    disconnect(db).await;
    let record = result.map_err(|e| command_error("force", e))?;

    println!("Version record set to {}", display_version(record.version));
    Ok(())
}
