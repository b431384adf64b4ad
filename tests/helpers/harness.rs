use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgConnectOptions;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;
use vpc::config::VersionTable;
use vpc::db::PgDatabase;

/// Connects to an external PostgreSQL server named by `DATABASE_URL`
pub struct PgTestInstance {
    pub base_url: String,
}

/// A throwaway database created for one test
pub struct TestDatabase {
    pool: PgPool,
    db_name: String,
    url: String,
    base_url: String,
}

impl PgTestInstance {
    /// `None` when `DATABASE_URL` is not set, so PostgreSQL tests can be skipped
    pub fn from_env() -> Option<Self> {
        dotenv::dotenv().ok();
        std::env::var("DATABASE_URL")
            .ok()
            .map(|base_url| Self { base_url })
    }

    pub async fn create_test_database(&self) -> Result<TestDatabase> {
        let db_name = format!("vpc_test_{}", Uuid::new_v4().simple());

        let base_pool = PgPool::connect(&self.base_url)
            .await
            .context("Failed to connect to PostgreSQL for database creation")?;
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name))
            .execute(&base_pool)
            .await
            .context("Failed to create test database")?;
        base_pool.close().await;

        let url = match self.base_url.rfind('/') {
            Some(last_slash) => format!("{}/{}", &self.base_url[..last_slash], db_name),
            None => format!("{}/{}", self.base_url, db_name),
        };

        let pool = PgPool::connect(&url)
            .await
            .context("Failed to connect to newly created test database")?;

        Ok(TestDatabase {
            pool,
            db_name,
            url,
            base_url: self.base_url.clone(),
        })
    }
}

impl TestDatabase {
    /// Open a migration session on this database
    pub async fn open(&self, table: &VersionTable) -> Result<PgDatabase> {
        let options = PgConnectOptions::from_str(&self.url)?;
        Ok(PgDatabase::connect_with(options, table, Duration::from_secs(5)).await?)
    }

    pub async fn table_exists(&self, schema: &str, name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(schema)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Raw `(version, dirty)` rows of a version table
    pub async fn version_rows(&self, table: &VersionTable) -> Result<Vec<(i64, bool)>> {
        let rows: Vec<(i64, bool)> = sqlx::query_as(&format!(
            r#"SELECT version, dirty FROM "{}"."{}""#,
            table.schema, table.name
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Run a statement outside of any migration session
    pub async fn execute(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Drop the database - best effort, bounded so a stuck server cannot hang the suite
    pub async fn cleanup(self) {
        self.pool.close().await;

        let db_name = self.db_name.clone();
        let base_url = self.base_url.clone();

        let cleanup_future = async move {
            if let Ok(pool) = PgPool::connect(&base_url).await {
                let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", db_name);
                let _ = sqlx::query(&drop_sql).execute(&pool).await;
                pool.close().await;
            }
        };

        let _ = tokio::time::timeout(Duration::from_secs(5), cleanup_future).await;
    }
}

/// Run a test against a fresh database, dropping it afterwards.
///
/// Without `DATABASE_URL` the test is skipped and reported as passing.
pub async fn with_test_db<F>(test_fn: F) -> Result<()>
where
    F: AsyncFnOnce(&TestDatabase) -> Result<()>,
{
    let Some(pg) = PgTestInstance::from_env() else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL test");
        return Ok(());
    };

    let db = pg.create_test_database().await?;
    let result = test_fn(&db).await;
    db.cleanup().await;

    result
}
