use crate::db::DatabaseConnection;
use crate::error::{MigrateError, StepError};
use crate::migration::{Catalog, Direction, MigrationStep};
use crate::progress::MigrationReporter;
use crate::version_store::{VersionRecord, set_version};
use std::time::Instant;
use tracing::{debug, error, info};

/// Applies a single migration step and keeps the version record honest.
pub struct StepExecutor<'a> {
    catalog: &'a Catalog,
    reporter: &'a MigrationReporter,
}

impl<'a> StepExecutor<'a> {
    pub fn new(catalog: &'a Catalog, reporter: &'a MigrationReporter) -> Self {
        Self { catalog, reporter }
    }

    /// Run one script of `step` and return the version the database ends at.
    ///
    /// The record is marked dirty at `step.version` first. A successful script
    /// clears it together with the new version; a failed one leaves it dirty
    /// for an operator to inspect.
    pub async fn apply<C>(
        &self,
        conn: &mut C,
        step: &MigrationStep,
        direction: Direction,
    ) -> Result<Option<u64>, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        let after = match direction {
            Direction::Up => Some(step.version),
            Direction::Down => self.catalog.previous(step.version),
        };
        let script = step.script(direction);

        self.reporter.step_started(step, direction);
        let started = Instant::now();

        set_version(conn, VersionRecord::dirty_at(step.version)).await?;
        debug!("Running {} ({:?})", script.asset, script.mode);

        match conn.execute_script(script, VersionRecord::clean(after)).await {
            Ok(()) => {
                let elapsed = started.elapsed();
                info!(
                    "Migrated {} {} {} in {:?}",
                    direction, step.version, step.description, elapsed
                );
                self.reporter.step_completed(step, direction, elapsed);
                Ok(after)
            }
            Err(cause) => {
                error!("Migration {} {} failed: {}", step.version, direction, cause);
                self.reporter.step_failed(step, direction, &cause);
                Err(StepError {
                    version: step.version,
                    direction,
                    cause,
                }
                .into())
            }
        }
    }
}
