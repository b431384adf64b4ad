use crate::config::types::{DatabaseConfig, VersionTable};
use crate::constants::VERSION_TABLE_SCHEMA;
use crate::db::DatabaseConnection;
use crate::db::error_context::script_error;
use crate::error::{ConnectivityError, ScriptError};
use crate::migration::{Script, TransactionMode};
use crate::version_store::{VersionRecord, format_version_table_name, version_from_db, version_to_db};
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, Executor, PgConnection, Row};
use std::time::Duration;
use tracing::{debug, warn};

/// A single PostgreSQL session.
///
/// Advisory locks belong to the session that took them, so the engine works
/// on one dedicated connection instead of a pool.
pub struct PgDatabase {
    conn: PgConnection,
    database: String,
    table: VersionTable,
    table_name: String,
    lock_key: i64,
}

impl PgDatabase {
    /// Connect using the resolved configuration
    pub async fn open(config: &DatabaseConfig, table: &VersionTable) -> Result<Self, ConnectivityError> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user);
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        debug!("Connecting to {}", config.display_target());
        Self::connect_with(options, table, config.connect_timeout)
            .await
            .map_err(|e| match e.source {
                Some(source) => ConnectivityError::new(
                    format!("failed to connect to {}", config.display_target()),
                    source,
                ),
                None => ConnectivityError::message(format!(
                    "{} ({})",
                    e.context,
                    config.display_target()
                )),
            })
    }

    pub async fn connect_with(
        options: PgConnectOptions,
        table: &VersionTable,
        timeout: Duration,
    ) -> Result<Self, ConnectivityError> {
        let table_name = format_version_table_name(table)
            .map_err(|e| ConnectivityError::message(e.to_string()))?;
        let database = options.get_database().unwrap_or("postgres").to_string();

        let conn = match tokio::time::timeout(timeout, PgConnection::connect_with(&options)).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                return Err(ConnectivityError::new(
                    format!("failed to connect to database {}", database),
                    e,
                ));
            }
            Err(_) => {
                return Err(ConnectivityError::message(format!(
                    "timed out after {:?} connecting to database {}",
                    timeout, database
                )));
            }
        };

        Ok(Self {
            conn,
            lock_key: lock_key(&database, table),
            database,
            table: table.clone(),
            table_name,
        })
    }

    pub async fn close(self) -> Result<(), ConnectivityError> {
        self.conn
            .close()
            .await
            .map_err(|e| ConnectivityError::new("failed to close the database connection", e))
    }

    async fn run_transactional(
        &mut self,
        script: &Script,
        record: VersionRecord,
    ) -> Result<(), ScriptError> {
        let mut tx = self
            .conn
            .begin()
            .await
            .map_err(|e| ConnectivityError::new("failed to begin transaction", e))?;

        if let Some(timeout) = script.timeout {
            sqlx::query(&format!(
                "SET LOCAL statement_timeout = '{}'",
                timeout.as_millis()
            ))
            .execute(&mut *tx)
            .await
            .map_err(|e| ConnectivityError::new("failed to set statement timeout", e))?;
        }

        if let Err(e) = tx.execute(script.sql.as_str()).await {
            if let Err(rollback) = tx.rollback().await {
                warn!("Rollback after failed {} also failed: {}", script.asset, rollback);
            }
            return Err(script_error(&e, script));
        }

        replace_record(&mut *tx, &self.table_name, record).await?;

        tx.commit()
            .await
            .map_err(|e| script_error(&e, script))
    }

    async fn run_non_transactional(
        &mut self,
        script: &Script,
        record: VersionRecord,
    ) -> Result<(), ScriptError> {
        if let Some(timeout) = script.timeout {
            sqlx::query(&format!("SET statement_timeout = '{}'", timeout.as_millis()))
                .execute(&mut self.conn)
                .await
                .map_err(|e| ConnectivityError::new("failed to set statement timeout", e))?;
        }

        let result = self.conn.execute(script.sql.as_str()).await;

        if script.timeout.is_some()
            && let Err(e) = sqlx::query("RESET statement_timeout")
                .execute(&mut self.conn)
                .await
        {
            warn!("Failed to reset statement_timeout: {}", e);
        }

        result.map_err(|e| script_error(&e, script))?;
        self.write_version(record).await?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseConnection for PgDatabase {
    fn identity(&self) -> String {
        format!(
            "{}:{}.{}",
            self.database, self.table.schema, self.table.name
        )
    }

    async fn ping(&mut self) -> Result<(), ConnectivityError> {
        Connection::ping(&mut self.conn)
            .await
            .map_err(|e| ConnectivityError::new(format!("database {} is unreachable", self.database), e))
    }

    async fn try_lock(&mut self) -> Result<bool, ConnectivityError> {
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
            .bind(self.lock_key)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| ConnectivityError::new("failed to request the migration lock", e))?;
        Ok(acquired)
    }

    async fn unlock(&mut self) -> Result<(), ConnectivityError> {
        let released: bool = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
            .bind(self.lock_key)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| ConnectivityError::new("failed to release the migration lock", e))?;
        if !released {
            warn!("Migration lock on {} was not held by this session", self.identity());
        }
        Ok(())
    }

    async fn ensure_version_table(&mut self) -> Result<(), ConnectivityError> {
        if self.table.schema != VERSION_TABLE_SCHEMA {
            sqlx::query(&format!(
                r#"CREATE SCHEMA IF NOT EXISTS "{}""#,
                self.table.schema
            ))
            .execute(&mut self.conn)
            .await
            .map_err(|e| {
                ConnectivityError::new(format!("failed to create schema {}", self.table.schema), e)
            })?;
        }

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (version BIGINT NOT NULL PRIMARY KEY, dirty BOOLEAN NOT NULL)",
            self.table_name
        ))
        .execute(&mut self.conn)
        .await
        .map_err(|e| {
            ConnectivityError::new(format!("failed to create version table {}", self.table_name), e)
        })?;

        Ok(())
    }

    async fn read_version(&mut self) -> Result<VersionRecord, ConnectivityError> {
        let rows = sqlx::query(&format!("SELECT version, dirty FROM {}", self.table_name))
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| ConnectivityError::new(format!("failed to read {}", self.table_name), e))?;

        let row = match rows.as_slice() {
            [] => return Ok(VersionRecord::empty()),
            [row] => row,
            _ => {
                return Err(ConnectivityError::message(format!(
                    "{} holds {} rows, expected at most one",
                    self.table_name,
                    rows.len()
                )));
            }
        };

        let version: i64 = row
            .try_get("version")
            .map_err(|e| ConnectivityError::new("malformed version row", e))?;
        let dirty: bool = row
            .try_get("dirty")
            .map_err(|e| ConnectivityError::new("malformed version row", e))?;

        Ok(VersionRecord {
            version: Some(version_from_db(version)?),
            dirty,
        })
    }

    async fn write_version(&mut self, record: VersionRecord) -> Result<(), ConnectivityError> {
        let mut tx = self
            .conn
            .begin()
            .await
            .map_err(|e| ConnectivityError::new("failed to begin transaction", e))?;
        replace_record(&mut *tx, &self.table_name, record).await?;
        tx.commit()
            .await
            .map_err(|e| ConnectivityError::new(format!("failed to update {}", self.table_name), e))
    }

    async fn execute_script(
        &mut self,
        script: &Script,
        record: VersionRecord,
    ) -> Result<(), ScriptError> {
        match script.mode {
            TransactionMode::Transactional => self.run_transactional(script, record).await,
            TransactionMode::NonTransactional => self.run_non_transactional(script, record).await,
        }
    }
}

/// Replace the single row of the version table. Must run inside a transaction.
async fn replace_record(
    conn: &mut PgConnection,
    table_name: &str,
    record: VersionRecord,
) -> Result<(), ConnectivityError> {
    sqlx::query(&format!("DELETE FROM {}", table_name))
        .execute(&mut *conn)
        .await
        .map_err(|e| ConnectivityError::new(format!("failed to update {}", table_name), e))?;

    if let Some(version) = record.version {
        sqlx::query(&format!(
            "INSERT INTO {} (version, dirty) VALUES ($1, $2)",
            table_name
        ))
        .bind(version_to_db(version)?)
        .bind(record.dirty)
        .execute(&mut *conn)
        .await
        .map_err(|e| ConnectivityError::new(format!("failed to update {}", table_name), e))?;
    }

    Ok(())
}

/// Advisory lock key shared by every process migrating the same version table
fn lock_key(database: &str, table: &VersionTable) -> i64 {
    let digest = md5::compute(format!("{}:{}.{}", database, table.schema, table.name));
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.0[..8]);
    i64::from_be_bytes(bytes)
}
