use crate::db::DatabaseConnection;
use crate::engine::{MigrationResult, Migrator, Target};
use crate::error::MigrateError;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

/// Results of both phases of a resync
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResyncOutcome {
    pub down: MigrationResult,
    pub up: MigrationResult,
}

impl Migrator<'_> {
    /// Roll every migration back and then apply all of them again.
    ///
    /// Destructive: whatever the down scripts drop is gone. Used to put a
    /// database into a known state. Either phase finding nothing to do counts
    /// as success, and a failure in the first phase skips the second. The
    /// lock is held across both phases.
    pub async fn resync<C>(&mut self, conn: &mut C) -> Result<ResyncOutcome, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        self.begin(conn).await?;
        let result = self.resync_locked(conn).await;
        self.finish(conn, result).await
    }

    async fn resync_locked<C>(&mut self, conn: &mut C) -> Result<ResyncOutcome, MigrateError>
    where
        C: DatabaseConnection + ?Sized,
    {
        let started = Instant::now();
        self.reporter.phase("Rolling back all migrations");
        let down = self.walk(conn, Target::Empty).await?;
        self.reporter.finished(&down, started.elapsed());

        let started = Instant::now();
        self.reporter.phase("Applying all migrations");
        let up = self.walk(conn, Target::Latest).await?;
        self.reporter.finished(&up, started.elapsed());

        info!(
            "Resync complete: {} rolled back, {} applied",
            down.applied_versions.len(),
            up.applied_versions.len()
        );

        Ok(ResyncOutcome { down, up })
    }
}
