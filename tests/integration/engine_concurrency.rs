use anyhow::Result;
use std::time::Duration;
use vpc::assets::MemoryAssets;
use vpc::db::MemoryDatabase;
use vpc::engine::{Migrator, MigratorOptions};
use vpc::error::MigrateError;
use vpc::migration::Catalog;
use vpc::version_store::VersionRecord;

fn control_plane_catalog() -> Result<Catalog> {
    let store = MemoryAssets::new()
        .with("1_create_vpcs.up.sql", "CREATE TABLE vpcs (id UUID PRIMARY KEY);")
        .with("1_create_vpcs.down.sql", "DROP TABLE vpcs;")
        .with("2_create_muxes.up.sql", "CREATE TABLE muxes (id UUID PRIMARY KEY);")
        .with("2_create_muxes.down.sql", "DROP TABLE muxes;")
        .with("3_create_mux_fte.up.sql", "CREATE TABLE mux_fte (vpc_id UUID);")
        .with("3_create_mux_fte.down.sql", "DROP TABLE mux_fte;");
    Ok(Catalog::load(&store)?)
}

#[tokio::test]
async fn test_concurrent_resyncs_take_turns() -> Result<()> {
    let catalog = control_plane_catalog()?;
    let options = MigratorOptions {
        lock_timeout: Duration::from_secs(5),
        lock_poll_interval: Duration::from_millis(5),
    };

    let mut first_db = MemoryDatabase::new().with_script_delay(Duration::from_millis(20));
    let mut second_db = first_db.session();
    let mut first = Migrator::new(&catalog, options);
    let mut second = Migrator::new(&catalog, options);

    let (a, b) = tokio::join!(first.resync(&mut first_db), second.resync(&mut second_db));
    let (a, b) = (a?, b?);

    // Never two scripts at once
    assert_eq!(first_db.max_concurrent_scripts(), 1);

    // Whoever ran second found a fully migrated database and rebuilt it
    let mut rollbacks = vec![a.down.applied_versions, b.down.applied_versions];
    rollbacks.sort();
    assert_eq!(rollbacks, vec![vec![], vec![3, 2, 1]]);
    assert_eq!(a.up.applied_versions, vec![1, 2, 3]);
    assert_eq!(b.up.applied_versions, vec![1, 2, 3]);

    assert_eq!(first_db.record(), Some(VersionRecord::clean(Some(3))));
    assert!(!first_db.is_locked());

    Ok(())
}

#[tokio::test]
async fn test_waiting_resync_times_out() -> Result<()> {
    let catalog = control_plane_catalog()?;
    let options = MigratorOptions {
        lock_timeout: Duration::from_millis(10),
        lock_poll_interval: Duration::from_millis(2),
    };

    let mut first_db = MemoryDatabase::new().with_script_delay(Duration::from_millis(30));
    let mut second_db = first_db.session();
    let mut first = Migrator::new(&catalog, options);
    let mut second = Migrator::new(&catalog, options);

    let (a, b) = tokio::join!(first.resync(&mut first_db), second.resync(&mut second_db));

    let results = [a, b];
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let timed_out = results
        .iter()
        .filter(|r| matches!(r, Err(MigrateError::LockTimeout { .. })))
        .count();
    assert_eq!((succeeded, timed_out), (1, 1));

    assert_eq!(first_db.executed().len(), 3);
    assert_eq!(first_db.max_concurrent_scripts(), 1);
    assert!(!first_db.is_locked());

    Ok(())
}
