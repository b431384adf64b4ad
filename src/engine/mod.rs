//! Drives a database from its recorded version to a target version.
//!
//! Every operation follows the same shape: ping, take the migration lock,
//! do the work, release the lock. The lock is released on every exit path and
//! an error from the work always wins over an error from releasing it.

pub mod executor;
pub mod resync;
pub mod shutdown;

pub use executor::StepExecutor;
pub use resync::ResyncOutcome;
pub use shutdown::ShutdownSignal;

use crate::config::types::MigrationConfig;
use crate::constants::{DEFAULT_LOCK_POLL_INTERVAL, DEFAULT_LOCK_TIMEOUT};
use crate::db::DatabaseConnection;
use crate::error::{ConnectivityError, MigrateError, display_version};
use crate::migration::{Catalog, Direction, MigrationStep};
use crate::progress::MigrationReporter;
use crate::version_store::{VersionRecord, current_version, set_version};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where the engine is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Locked,
    Running,
    Succeeded,
    Failed,
}

/// Version to migrate to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Highest version in the catalog
    Latest,
    /// No migration applied
    Empty,
    Version(u64),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Latest => f.write_str("latest"),
            Target::Empty => f.write_str("none"),
            Target::Version(v) => write!(f, "{}", v),
        }
    }
}

/// Outcome of a successful migration run.
///
/// `changed` is false when the database was already at the target, which
/// reads the same whether that target was "empty" or "fully migrated".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationResult {
    /// Versions whose scripts ran, in the order they ran
    pub applied_versions: Vec<u64>,
    pub final_version: Option<u64>,
    pub changed: bool,
}

impl MigrationResult {
    fn unchanged(version: Option<u64>) -> Self {
        Self {
            applied_versions: Vec::new(),
            final_version: version,
            changed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub record: VersionRecord,
    pub latest: Option<u64>,
    /// Catalog versions above the current one
    pub pending: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigratorOptions {
    /// How long to wait for another migrator to release the lock
    pub lock_timeout: Duration,
    pub lock_poll_interval: Duration,
}

impl Default for MigratorOptions {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_poll_interval: DEFAULT_LOCK_POLL_INTERVAL,
        }
    }
}

impl From<&MigrationConfig> for MigratorOptions {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            lock_timeout: config.lock_timeout,
            lock_poll_interval: config.lock_poll_interval,
        }
    }
}

pub struct Migrator<'a> {
    catalog: &'a Catalog,
    options: MigratorOptions,
    shutdown: ShutdownSignal,
    reporter: MigrationReporter,
    state: EngineState,
    last_outcome: Option<EngineState>,
}

impl<'a> Migrator<'a> {
    pub fn new(catalog: &'a Catalog, options: MigratorOptions) -> Self {
        Self {
            catalog,
            options,
            shutdown: ShutdownSignal::new(),
            reporter: MigrationReporter::silent(),
            state: EngineState::Idle,
            last_outcome: None,
        }
    }

    /// Stop between steps once `shutdown` is triggered
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_reporter(mut self, reporter: MigrationReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// `Idle` whenever no operation is in flight
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// How the most recent operation ended, `Succeeded` or `Failed`
    pub fn last_outcome(&self) -> Option<EngineState> {
        self.last_outcome
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Apply every pending step
    pub async fn up<C>(&mut self, conn: &mut C) -> Result<MigrationResult, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        self.migrate_to(conn, Target::Latest).await
    }

    /// Roll back every applied step
    pub async fn down<C>(&mut self, conn: &mut C) -> Result<MigrationResult, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        self.migrate_to(conn, Target::Empty).await
    }

    pub async fn migrate_to<C>(
        &mut self,
        conn: &mut C,
        target: Target,
    ) -> Result<MigrationResult, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        self.begin(conn).await?;
        let started = Instant::now();
        let result = self.walk(conn, target).await;
        if let Ok(outcome) = &result {
            self.reporter.finished(outcome, started.elapsed());
        }
        self.finish(conn, result).await
    }

    /// Current record and what is left to apply
    pub async fn status<C>(&mut self, conn: &mut C) -> Result<Status, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        self.begin(conn).await?;
        let result = self.read_status(conn).await;
        self.finish(conn, result).await
    }

    /// Overwrite the record with a clean `version` without running any script.
    ///
    /// This is how an operator clears a dirty record after repairing the
    /// schema by hand.
    pub async fn force<C>(
        &mut self,
        conn: &mut C,
        version: Option<u64>,
    ) -> Result<VersionRecord, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        if let Some(v) = version
            && !self.catalog.contains(v)
        {
            return Err(MigrateError::UnknownVersion { version: v });
        }

        self.begin(conn).await?;
        let result = self.write_forced(conn, version).await;
        self.finish(conn, result).await
    }

    async fn begin<C>(&mut self, conn: &mut C) -> Result<(), MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        self.last_outcome = None;
        let locked = match conn.ping().await {
            Ok(()) => self.acquire_lock(conn).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = locked {
            self.last_outcome = Some(EngineState::Failed);
            return Err(e);
        }
        self.state = EngineState::Locked;
        debug!("Holding migration lock on {}", conn.identity());
        Ok(())
    }

    async fn acquire_lock<C>(&self, conn: &mut C) -> Result<(), MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        let started = Instant::now();
        let mut announced = false;

        loop {
            if conn.try_lock().await? {
                return Ok(());
            }

            let waited = started.elapsed();
            if waited >= self.options.lock_timeout {
                return Err(MigrateError::LockTimeout {
                    database: conn.identity(),
                    waited,
                });
            }

            if !announced {
                info!("Another migration holds the lock on {}, waiting", conn.identity());
                self.reporter.waiting_for_lock(&conn.identity());
                announced = true;
            }

            let remaining = self.options.lock_timeout - waited;
            tokio::time::sleep(self.options.lock_poll_interval.min(remaining)).await;
        }
    }

    async fn finish<C, T>(
        &mut self,
        conn: &mut C,
        result: Result<T, MigrateError>,
    ) -> Result<T, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        self.state = match &result {
            Ok(_) => EngineState::Succeeded,
            Err(_) => EngineState::Failed,
        };
        debug!("Migration run ended in state {:?}", self.state);

        let unlocked = conn.unlock().await;
        self.last_outcome = Some(match (&result, &unlocked) {
            (Ok(_), Ok(())) => EngineState::Succeeded,
            _ => EngineState::Failed,
        });
        self.state = EngineState::Idle;

        match (result, unlocked) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(unlock_error)) => Err(unlock_error.into()),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(unlock_error)) => {
                warn!("Failed to release the migration lock: {}", unlock_error);
                Err(error)
            }
        }
    }

    /// Move the database to `target` one step at a time. Caller holds the lock.
    async fn walk<C>(&mut self, conn: &mut C, target: Target) -> Result<MigrationResult, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        let record = current_version(conn).await?;
        if record.dirty {
            let version = record.version.ok_or_else(|| {
                ConnectivityError::message("version table holds a dirty record without a version")
            })?;
            return Err(MigrateError::DirtyState { version });
        }

        let catalog = self.catalog;
        let applied = self.applied_count(record.version)?;
        let wanted = match target {
            Target::Latest => catalog.len(),
            Target::Empty => 0,
            Target::Version(v) => self.applied_count(Some(v))?,
        };

        if applied == wanted {
            info!(
                "Database is already at version {}",
                display_version(record.version)
            );
            return Ok(MigrationResult::unchanged(record.version));
        }

        let (direction, plan): (Direction, Vec<&MigrationStep>) = if wanted > applied {
            (Direction::Up, catalog.steps()[applied..wanted].iter().collect())
        } else {
            (
                Direction::Down,
                catalog.steps()[wanted..applied].iter().rev().collect(),
            )
        };

        info!(
            "Migrating {} from version {} to {} ({} step{})",
            direction,
            display_version(record.version),
            target,
            plan.len(),
            if plan.len() == 1 { "" } else { "s" }
        );

        self.state = EngineState::Running;
        let executor = StepExecutor::new(catalog, &self.reporter);
        let mut current = record.version;
        let mut applied_versions = Vec::with_capacity(plan.len());

        for step in plan {
            if self.shutdown.is_shutdown() {
                warn!(
                    "Stopping before migration {}, database left at version {}",
                    step.version,
                    display_version(current)
                );
                return Err(MigrateError::Cancelled { version: current });
            }

            current = executor.apply(conn, step, direction).await?;
            applied_versions.push(step.version);
        }

        Ok(MigrationResult {
            applied_versions,
            final_version: current,
            changed: true,
        })
    }

    fn applied_count(&self, version: Option<u64>) -> Result<usize, MigrateError> {
        match version {
            None => Ok(0),
            Some(v) => self
                .catalog
                .applied_count(Some(v))
                .ok_or(MigrateError::UnknownVersion { version: v }),
        }
    }

    async fn read_status<C>(&mut self, conn: &mut C) -> Result<Status, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        let record = current_version(conn).await?;
        let pending = self
            .catalog
            .steps()
            .iter()
            .map(|s| s.version)
            .filter(|v| Some(*v) > record.version)
            .collect();

        Ok(Status {
            record,
            latest: self.catalog.latest(),
            pending,
        })
    }

    async fn write_forced<C>(
        &mut self,
        conn: &mut C,
        version: Option<u64>,
    ) -> Result<VersionRecord, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        self.state = EngineState::Running;
        let previous = current_version(conn).await?;
        let record = VersionRecord::clean(version);
        set_version(conn, record).await?;
        warn!("Forced version record from {} to {}", previous, record);
        Ok(record)
    }
}
