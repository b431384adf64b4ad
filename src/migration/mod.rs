pub mod catalog;
pub mod directives;
pub mod parsing;

use serde::Serialize;
use std::fmt;

pub use catalog::{Catalog, MigrationStep, Script};
pub use directives::{ScriptDirectives, TransactionMode, parse_directives};
pub use parsing::{ParsedAssetName, parse_asset_name};

/// Which of a step's two scripts is being applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => crate::constants::UP_MARKER,
            Direction::Down => crate::constants::DOWN_MARKER,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
