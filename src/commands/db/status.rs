use crate::commands::db::common::{
    CommandContext, OutputFormat, command_error, connect, disconnect, load_catalog, migrator,
};
use crate::config::Config;
use crate::engine::Status;
use crate::error::display_version;
use anyhow::{Context, Result};
use console::style;

pub async fn cmd_db_status(config: &Config, ctx: &CommandContext, format: OutputFormat) -> Result<()> {
    let catalog = load_catalog("status")?;
    let mut db = connect(config, "status").await?;

    let result = migrator(&catalog, config, ctx).status(&mut db).await;
    disconnect(db).await;
    let status = result.map_err(|e| command_error("status", e))?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&status)
                .context("Failed to serialize migration status")?;
            println!("{}", json);
        }
        OutputFormat::Human => print!("{}", render_status(&status, &config.database.display_target())),
    }

    Ok(())
}

fn render_status(status: &Status, target: &str) -> String {
    let version = if status.record.dirty {
        style(status.record.to_string()).red().to_string()
    } else {
        status.record.to_string()
    };

    let pending = if status.pending.is_empty() {
        "none".to_string()
    } else {
        status
            .pending
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = format!(
        "Database: {}\nVersion:  {}\nLatest:   {}\nPending:  {}\n",
        target,
        version,
        display_version(status.latest),
        pending
    );

    if let Some(dirty_at) = status.record.version.filter(|_| status.record.dirty) {
        out.push_str(&format!(
            "\nMigration {} did not complete. Repair the schema, then run `vpc db force <version>`.\n",
            dirty_at
        ));
    }

    out
}
