//! An in-process [`DatabaseConnection`] that keeps the version record in memory.
//!
//! Handles created with [`MemoryDatabase::session`] share one "database", so
//! several engines can contend for the same lock the way separate processes
//! do against a real server. Scripts are recorded rather than executed.

use crate::db::DatabaseConnection;
use crate::error::{ConnectivityError, ScriptError};
use crate::migration::{Direction, Script};
use crate::version_store::VersionRecord;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

type ScriptHook = Arc<dyn Fn(&Script) + Send + Sync>;

#[derive(Debug, Default)]
struct SharedState {
    /// `None` until the version table is created
    record: Option<VersionRecord>,
    lock_holder: Option<u64>,
    executed: Vec<(u64, Direction)>,
    failures: HashSet<(u64, Direction)>,
    offline: bool,
    running: usize,
    max_running: usize,
}

#[derive(Clone)]
pub struct MemoryDatabase {
    session: u64,
    name: String,
    state: Arc<Mutex<SharedState>>,
    script_delay: Duration,
    hook: Option<ScriptHook>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            session: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            state: Arc::default(),
            script_delay: Duration::ZERO,
            hook: None,
        }
    }

    /// Another connection to the same database
    pub fn session(&self) -> Self {
        Self {
            session: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            ..self.clone()
        }
    }

    /// Make every script take `delay` to run
    pub fn with_script_delay(mut self, delay: Duration) -> Self {
        self.script_delay = delay;
        self
    }

    /// Call `hook` whenever a script starts running
    pub fn with_hook(mut self, hook: impl Fn(&Script) + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    /// Make the given script fail when it runs
    pub fn fail_on(&self, version: u64, direction: Direction) {
        self.state().failures.insert((version, direction));
    }

    /// Simulate an unreachable server
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Overwrite the stored record, creating the version table if needed
    pub fn set_record(&self, record: VersionRecord) {
        self.state().record = Some(record);
    }

    pub fn record(&self) -> Option<VersionRecord> {
        self.state().record
    }

    pub fn has_version_table(&self) -> bool {
        self.state().record.is_some()
    }

    /// Every script started so far, in order
    pub fn executed(&self) -> Vec<(u64, Direction)> {
        self.state().executed.clone()
    }

    pub fn is_locked(&self) -> bool {
        self.state().lock_holder.is_some()
    }

    /// Highest number of scripts that were ever running at the same time
    pub fn max_concurrent_scripts(&self) -> usize {
        self.state().max_running
    }

    fn state(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_online(&self) -> Result<(), ConnectivityError> {
        if self.state().offline {
            return Err(ConnectivityError::message(format!(
                "database {} is unreachable",
                self.name
            )));
        }
        Ok(())
    }
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDatabase")
            .field("session", &self.session)
            .field("name", &self.name)
            .field("script_delay", &self.script_delay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DatabaseConnection for MemoryDatabase {
    fn identity(&self) -> String {
        self.name.clone()
    }

    async fn ping(&mut self) -> Result<(), ConnectivityError> {
        self.check_online()
    }

    async fn try_lock(&mut self) -> Result<bool, ConnectivityError> {
        self.check_online()?;
        let mut state = self.state();
        match state.lock_holder {
            None => {
                state.lock_holder = Some(self.session);
                Ok(true)
            }
            Some(holder) => Ok(holder == self.session),
        }
    }

    async fn unlock(&mut self) -> Result<(), ConnectivityError> {
        let mut state = self.state();
        if state.lock_holder == Some(self.session) {
            state.lock_holder = None;
        }
        Ok(())
    }

    async fn ensure_version_table(&mut self) -> Result<(), ConnectivityError> {
        self.check_online()?;
        self.state().record.get_or_insert_with(VersionRecord::empty);
        Ok(())
    }

    async fn read_version(&mut self) -> Result<VersionRecord, ConnectivityError> {
        self.check_online()?;
        self.state()
            .record
            .ok_or_else(|| ConnectivityError::message("version table does not exist"))
    }

    async fn write_version(&mut self, record: VersionRecord) -> Result<(), ConnectivityError> {
        self.check_online()?;
        self.state().record = Some(record);
        Ok(())
    }

    async fn execute_script(
        &mut self,
        script: &Script,
        record: VersionRecord,
    ) -> Result<(), ScriptError> {
        {
            let mut state = self.state();
            state.running += 1;
            state.max_running = state.max_running.max(state.running);
            state.executed.push((script.version, script.direction));
        }

        if let Some(hook) = &self.hook {
            hook(script);
        }

        if !self.script_delay.is_zero() {
            tokio::time::sleep(self.script_delay).await;
        }

        let mut state = self.state();
        state.running -= 1;

        if state.failures.contains(&(script.version, script.direction)) {
            return Err(ScriptError::new(format!(
                "script {} failed: injected failure",
                script.asset
            )));
        }

        state.record = Some(record);
        Ok(())
    }
}
