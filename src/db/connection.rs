use crate::error::{ConnectivityError, ScriptError};
use crate::migration::Script;
use crate::version_store::VersionRecord;
use async_trait::async_trait;

/// What the migration engine needs from a database.
///
/// The engine drives migrations exclusively through this trait, so it does not
/// care which driver sits underneath. A connection is used by one operation at
/// a time; exclusion across processes comes from [`try_lock`](Self::try_lock).
#[async_trait]
pub trait DatabaseConnection: Send {
    /// Name of the target database and version table, used in messages and
    /// to scope the migration lock.
    fn identity(&self) -> String;

    async fn ping(&mut self) -> Result<(), ConnectivityError>;

    /// Try once to take the exclusive migration lock.
    ///
    /// Returns `Ok(false)` when another session holds it. Taking a lock this
    /// session already holds succeeds.
    async fn try_lock(&mut self) -> Result<bool, ConnectivityError>;

    async fn unlock(&mut self) -> Result<(), ConnectivityError>;

    /// Create the version table if it does not exist yet
    async fn ensure_version_table(&mut self) -> Result<(), ConnectivityError>;

    async fn read_version(&mut self) -> Result<VersionRecord, ConnectivityError>;

    /// Replace the stored record
    async fn write_version(&mut self, record: VersionRecord) -> Result<(), ConnectivityError>;

    /// Run a migration script and then store `record`.
    ///
    /// For transactional scripts both happen in one transaction and nothing is
    /// kept when either fails. Non-transactional scripts run first and the
    /// record is written afterwards.
    async fn execute_script(
        &mut self,
        script: &Script,
        record: VersionRecord,
    ) -> Result<(), ScriptError>;
}
