use rstest::rstest;
use vpc::assets::{EmbeddedAssets, MemoryAssets};
use vpc::error::LoadError;
use vpc::migration::{Catalog, Direction, TransactionMode, parse_asset_name};

#[rstest]
#[case::sequence("1_create_vpcs.up.sql", 1, "create_vpcs", Direction::Up)]
#[case::timestamp("20180412093000_add_mux.down.sql", 20180412093000, "add_mux", Direction::Down)]
#[case::leading_zeros("0007_fte.up.sql", 7, "fte", Direction::Up)]
#[case::nested_path("crdb/3_mux_fte.up.sql", 3, "mux_fte", Direction::Up)]
fn test_valid_asset_names(
    #[case] name: &str,
    #[case] version: u64,
    #[case] description: &str,
    #[case] direction: Direction,
) {
    let parsed = parse_asset_name(name).unwrap().unwrap();
    assert_eq!(parsed.version, version);
    assert_eq!(parsed.description, description);
    assert_eq!(parsed.direction, direction);
}

#[rstest]
#[case::no_direction("1_create_vpcs.sql")]
#[case::bad_direction("1_create_vpcs.sideways.sql")]
#[case::no_version("create_vpcs.up.sql")]
#[case::non_numeric_version("v1_create_vpcs.up.sql")]
#[case::negative_version("-1_create_vpcs.up.sql")]
#[case::too_large("99999999999999999999_big.up.sql")]
fn test_malformed_asset_names(#[case] name: &str) {
    assert!(matches!(
        parse_asset_name(name),
        Err(LoadError::MalformedAsset { .. })
    ));
}

#[rstest]
#[case::readme("README.md")]
#[case::bindata("bindata.go")]
fn test_non_script_assets_are_ignored(#[case] name: &str) {
    assert!(parse_asset_name(name).unwrap().is_none());
}

#[test]
fn test_catalog_rejects_unknown_directive() {
    let store = MemoryAssets::new()
        .with(
            "1_a.up.sql",
            "-- vpc:isolation=\"serializable\"\nCREATE TABLE a (id INT);",
        )
        .with("1_a.down.sql", "DROP TABLE a;");

    match Catalog::load(&store).unwrap_err() {
        LoadError::InvalidDirective { asset, line, .. } => {
            assert_eq!(asset, "1_a.up.sql");
            assert_eq!(line, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_embedded_migrations() {
    let catalog = Catalog::load(&EmbeddedAssets).unwrap();

    let versions: Vec<u64> = catalog.steps().iter().map(|s| s.version).collect();
    assert_eq!(versions, vec![1, 2, 3, 4]);
    assert_eq!(catalog.latest(), Some(4));

    let index = catalog.get(4).unwrap();
    assert_eq!(index.up.mode, TransactionMode::NonTransactional);
    assert_eq!(index.down.mode, TransactionMode::NonTransactional);
    assert!(index.up.timeout.is_some());

    for step in &catalog.steps()[..3] {
        assert_eq!(step.up.mode, TransactionMode::Transactional);
    }
}
