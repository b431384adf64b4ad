use crate::helpers::harness::with_test_db;
use anyhow::Result;
use std::time::Duration;
use vpc::assets::{EmbeddedAssets, MemoryAssets};
use vpc::config::VersionTable;
use vpc::db::DatabaseConnection;
use vpc::engine::{MigrationResult, Migrator, MigratorOptions};
use vpc::error::MigrateError;
use vpc::migration::{Catalog, Direction};

fn widgets() -> Result<Catalog> {
    let store = MemoryAssets::new()
        .with(
            "1_create_widgets.up.sql",
            "CREATE TABLE widgets (id INT PRIMARY KEY);",
        )
        .with("1_create_widgets.down.sql", "DROP TABLE widgets;")
        .with(
            "2_add_color.up.sql",
            "ALTER TABLE widgets ADD COLUMN color TEXT;\nCREATE INDEX widgets_color_idx ON widgets (color);",
        )
        .with("2_add_color.down.sql", "ALTER TABLE widgets DROP COLUMN color;");
    Ok(Catalog::load(&store)?)
}

#[tokio::test]
async fn test_widgets_up_and_down() -> Result<()> {
    with_test_db(async |db| {
        let catalog = widgets()?;
        let table = VersionTable::default();
        let mut conn = db.open(&table).await?;
        let mut migrator = Migrator::new(&catalog, MigratorOptions::default());

        let up = migrator.up(&mut conn).await?;
        assert_eq!(
            up,
            MigrationResult {
                applied_versions: vec![1, 2],
                final_version: Some(2),
                changed: true,
            }
        );
        assert!(db.table_exists("public", "widgets").await?);
        assert_eq!(db.version_rows(&table).await?, vec![(2, false)]);

        assert!(!migrator.up(&mut conn).await?.changed);

        let down = migrator.down(&mut conn).await?;
        assert_eq!(down.applied_versions, vec![2, 1]);
        assert_eq!(down.final_version, None);
        assert!(!db.table_exists("public", "widgets").await?);
        assert!(db.version_rows(&table).await?.is_empty());

        conn.close().await?;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn test_failed_script_rolls_back_and_leaves_dirty_record() -> Result<()> {
    with_test_db(async |db| {
        let store = MemoryAssets::new()
            .with("1_create_widgets.up.sql", "CREATE TABLE widgets (id INT);")
            .with("1_create_widgets.down.sql", "DROP TABLE widgets;")
            .with(
                "2_broken.up.sql",
                "CREATE TABLE gadgets (id INT);\nINSERT INTO missing_table VALUES (1);",
            )
            .with("2_broken.down.sql", "DROP TABLE gadgets;");
        let catalog = Catalog::load(&store)?;
        let table = VersionTable {
            schema: "control".to_string(),
            name: "schema_version".to_string(),
        };
        let mut conn = db.open(&table).await?;
        let mut migrator = Migrator::new(&catalog, MigratorOptions::default());

        let err = migrator.up(&mut conn).await.unwrap_err();
        match &err {
            MigrateError::Step(step) => {
                assert_eq!(step.version, 2);
                assert_eq!(step.direction, Direction::Up);
                assert!(step.cause.message.contains("2_broken.up.sql failed at line 2"));
                assert!(step.cause.message.contains("missing_table"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The script's own changes were rolled back; the dirty marker was not
        assert!(db.table_exists("public", "widgets").await?);
        assert!(!db.table_exists("public", "gadgets").await?);
        assert_eq!(db.version_rows(&table).await?, vec![(2, true)]);

        assert!(matches!(
            migrator.up(&mut conn).await.unwrap_err(),
            MigrateError::DirtyState { version: 2 }
        ));

        migrator.force(&mut conn, Some(1)).await?;
        assert_eq!(db.version_rows(&table).await?, vec![(1, false)]);

        conn.close().await?;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn test_embedded_resync_including_concurrent_index() -> Result<()> {
    with_test_db(async |db| {
        let catalog = Catalog::load(&EmbeddedAssets)?;
        let table = VersionTable::default();
        let mut conn = db.open(&table).await?;
        let mut migrator = Migrator::new(&catalog, MigratorOptions::default());

        let first = migrator.resync(&mut conn).await?;
        assert!(!first.down.changed);
        assert_eq!(first.up.final_version, catalog.latest());

        let second = migrator.resync(&mut conn).await?;
        assert_eq!(second.down.applied_versions.len(), catalog.len());
        assert_eq!(second.up.applied_versions.len(), catalog.len());
        assert!(db.table_exists("public", "mux_fte").await?);

        conn.close().await?;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn test_advisory_lock_excludes_other_sessions() -> Result<()> {
    with_test_db(async |db| {
        let catalog = widgets()?;
        let table = VersionTable::default();
        let mut holder = db.open(&table).await?;
        let mut waiter = db.open(&table).await?;

        assert!(holder.try_lock().await?);

        let mut migrator = Migrator::new(
            &catalog,
            MigratorOptions {
                lock_timeout: Duration::from_millis(200),
                lock_poll_interval: Duration::from_millis(20),
            },
        );
        assert!(matches!(
            migrator.up(&mut waiter).await.unwrap_err(),
            MigrateError::LockTimeout { .. }
        ));

        holder.unlock().await?;
        assert_eq!(migrator.up(&mut waiter).await?.final_version, Some(2));

        holder.close().await?;
        waiter.close().await?;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn test_version_table_with_several_rows_is_rejected() -> Result<()> {
    with_test_db(async |db| {
        let catalog = widgets()?;
        let table = VersionTable::default();
        let mut conn = db.open(&table).await?;
        conn.ensure_version_table().await?;
        db.execute(r#"INSERT INTO "public"."vpc_schema_migrations" (version, dirty) VALUES (1, false), (2, false)"#)
            .await?;

        let err = conn.read_version().await.unwrap_err();
        assert!(err.to_string().contains("holds 2 rows"));

        let mut migrator = Migrator::new(&catalog, MigratorOptions::default());
        assert_eq!(migrator.up(&mut conn).await.unwrap_err().kind(), "ConnectivityError");

        conn.close().await?;
        Ok(())
    })
    .await
}
