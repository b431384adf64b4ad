pub mod builder;
pub mod defaults;
pub mod merge;
pub mod types;


pub use builder::ConfigBuilder;
pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load the YAML config file if it exists; a missing file means "all defaults"
pub fn load_config(config_file: &str) -> Result<ConfigInput> {
    let path = Path::new(config_file);

    if !path.exists() {
        return Ok(ConfigInput::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", config_file))?;

    serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", config_file))
}
