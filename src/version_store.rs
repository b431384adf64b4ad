//! The persisted record of which migration the database is at.

use crate::config::types::VersionTable;
use crate::db::DatabaseConnection;
use crate::error::{ConnectivityError, display_version};
use anyhow::Result;
use serde::Serialize;
use std::fmt;

/// Applied version plus the dirty flag, as stored in the version table.
///
/// A dirty record always names the step that was mid-application, so
/// `version` is `Some` whenever `dirty` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VersionRecord {
    pub version: Option<u64>,
    pub dirty: bool,
}

impl VersionRecord {
    /// No migration applied
    pub const fn empty() -> Self {
        Self {
            version: None,
            dirty: false,
        }
    }

    pub const fn clean(version: Option<u64>) -> Self {
        Self {
            version,
            dirty: false,
        }
    }

    pub const fn dirty_at(version: u64) -> Self {
        Self {
            version: Some(version),
            dirty: true,
        }
    }
}

impl fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display_version(self.version))?;
        if self.dirty {
            write!(f, " (dirty)")?;
        }
        Ok(())
    }
}

/// Read the current record, creating the version table on first use
pub async fn current_version<C>(conn: &mut C) -> Result<VersionRecord, ConnectivityError>
where
    C: DatabaseConnection + ?Sized,
{
    conn.ensure_version_table().await?;
    conn.read_version().await
}

pub async fn set_version<C>(conn: &mut C, record: VersionRecord) -> Result<(), ConnectivityError>
where
    C: DatabaseConnection + ?Sized,
{
    conn.write_version(record).await
}

/// Convert a migration version to the BIGINT stored in the database
pub fn version_to_db(version: u64) -> Result<i64, ConnectivityError> {
    i64::try_from(version).map_err(|_| {
        ConnectivityError::message(format!(
            "Migration version {} is too large for database storage (exceeds i64::MAX)",
            version
        ))
    })
}

/// Convert a stored BIGINT back to a migration version
pub fn version_from_db(version: i64) -> Result<u64, ConnectivityError> {
    u64::try_from(version).map_err(|_| {
        ConnectivityError::message(format!(
            "Found negative migration version {} in the version table; the record is corrupt",
            version
        ))
    })
}

/// Safely format a schema-qualified table name for SQL queries
pub fn format_version_table_name(table: &VersionTable) -> Result<String> {
    fn is_valid_sql_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
            _ => return false,
        }
        name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    }

    if !is_valid_sql_identifier(&table.schema) {
        return Err(anyhow::anyhow!(
            "Invalid schema name '{}': must contain only letters, numbers, underscores, and dollar signs, starting with letter or underscore",
            table.schema
        ));
    }

    if !is_valid_sql_identifier(&table.name) {
        return Err(anyhow::anyhow!(
            "Invalid table name '{}': must contain only letters, numbers, underscores, and dollar signs, starting with letter or underscore",
            table.name
        ));
    }

    Ok(format!(r#""{}"."{}""#, table.schema, table.name))
}
