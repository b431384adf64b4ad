//! Error kinds surfaced by the migration engine.
//!
//! Each failure class is its own variant so callers can tell a lock timeout
//! from a dirty database from a failed script without parsing messages.

use crate::migration::Direction;
use std::time::Duration;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The migration catalog could not be built from the asset store.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed migration asset '{name}': {reason}")]
    MalformedAsset { name: String, reason: String },

    #[error("migration {version} is defined twice: '{first}' and '{second}' ({direction} script)")]
    DuplicateVersion {
        version: u64,
        direction: Direction,
        first: String,
        second: String,
    },

    #[error("migration {version} ('{asset}') has no matching {missing} script")]
    MissingDirection {
        version: u64,
        asset: String,
        missing: Direction,
    },

    #[error("migration asset '{0}' not found")]
    NotFound(String),

    #[error("migration asset '{0}' is not valid UTF-8")]
    InvalidEncoding(String),

    #[error("invalid directive in '{asset}' at line {line}: {reason}")]
    InvalidDirective {
        asset: String,
        line: usize,
        reason: String,
    },
}

/// The database could not be reached, or a bookkeeping statement failed.
#[derive(Debug, Error)]
#[error("{context}")]
pub struct ConnectivityError {
    pub context: String,
    #[source]
    pub source: Option<BoxError>,
}

impl ConnectivityError {
    pub fn new(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            context: context.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            source: None,
        }
    }
}

/// A migration script was rejected by the database.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ScriptError {
    pub message: String,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ConnectivityError> for ScriptError {
    fn from(error: ConnectivityError) -> Self {
        let mut message = error.context.clone();
        if let Some(source) = &error.source {
            message.push_str(&format!(": {}", source));
        }
        Self { message }
    }
}

#[derive(Debug, Error)]
#[error("migration {version} failed while running its {direction} script")]
pub struct StepError {
    pub version: u64,
    pub direction: Direction,
    #[source]
    pub cause: ScriptError,
}

/// Every way a migration operation can fail.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    #[error("timed out after {waited:?} waiting for the migration lock on {database}")]
    LockTimeout { database: String, waited: Duration },

    #[error(
        "database is dirty at version {version}: a previous migration did not complete. \
         Repair the schema by hand, then run `vpc db force {version}`"
    )]
    DirtyState { version: u64 },

    #[error(transparent)]
    Step(#[from] StepError),

    #[error("version {version} is not in the migration catalog")]
    UnknownVersion { version: u64 },

    #[error("migration cancelled with the database at version {}", display_version(.version.clone()))]
    Cancelled { version: Option<u64> },
}

impl MigrateError {
    /// Short, stable name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            MigrateError::Load(_) => "LoadError",
            MigrateError::Connectivity(_) => "ConnectivityError",
            MigrateError::LockTimeout { .. } => "LockTimeoutError",
            MigrateError::DirtyState { .. } => "DirtyStateError",
            MigrateError::Step(_) => "StepError",
            MigrateError::UnknownVersion { .. } => "UnknownVersionError",
            MigrateError::Cancelled { .. } => "CancelledError",
        }
    }
}

/// Render an optional version the way the CLI prints it
pub fn display_version(version: Option<u64>) -> String {
    match version {
        Some(v) => v.to_string(),
        None => "none".to_string(),
    }
}
