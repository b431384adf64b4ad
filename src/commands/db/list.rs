use crate::commands::db::common::{OutputFormat, load_catalog};
use crate::migration::{Catalog, TransactionMode};
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ListedStep<'a> {
    version: u64,
    description: &'a str,
    up_mode: TransactionMode,
    down_mode: TransactionMode,
    up_checksum: &'a str,
    down_checksum: &'a str,
}

/// Print the migrations compiled into this binary
pub fn cmd_db_list(format: OutputFormat) -> Result<()> {
    let catalog = load_catalog("list")?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&listed_steps(&catalog))
                .context("Failed to serialize migration list")?;
            println!("{}", json);
        }
        OutputFormat::Human => {
            for step in catalog.steps() {
                let note = match (step.up.mode, step.down.mode) {
                    (TransactionMode::Transactional, TransactionMode::Transactional) => "",
                    _ => " (non-transactional)",
                };
                println!("{:>6}  {}{}", step.version, step.description, note);
            }
        }
    }

    Ok(())
}

fn listed_steps(catalog: &Catalog) -> Vec<ListedStep<'_>> {
    catalog
        .steps()
        .iter()
        .map(|step| ListedStep {
            version: step.version,
            description: &step.description,
            up_mode: step.up.mode,
            down_mode: step.down.mode,
            up_checksum: &step.up.checksum,
            down_checksum: &step.down.checksum,
        })
        .collect()
}
