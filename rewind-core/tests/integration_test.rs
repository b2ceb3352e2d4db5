//! Integration tests for rewind-core.
//!
//! Each test lays out a throwaway repository in a temp directory, builds a
//! catalog from it and drives the public commands end to end.
//!
//! Run with: cargo test --test integration_test

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use rewind_core::commands::inspect::InspectReport;
use rewind_core::commands::reverse::{BatchSource, ReverseOutput};
use rewind_core::config::{CliOverrides, RewindConfig};
use rewind_core::reverse::UNSUPPORTED_MARKER;
use rewind_core::{Catalog, Rewind, RewindError};

const SCHEMA_SQL: &str = r#"
SET search_path = sales;

-- orders placed by customers
CREATE TABLE orders (
    id BIGINT NOT NULL,
    status VARCHAR(20) DEFAULT 'new',
    amount NUMERIC(12, 2),
    PRIMARY KEY (id)
) WITH (ORIENTATION = COLUMN)
DISTRIBUTE BY HASH(id);

COMMENT ON TABLE orders IS 'customer orders';
COMMENT ON COLUMN orders.status IS 'order status';

CREATE VIEW sales.open_orders AS SELECT id FROM sales.orders WHERE status = 'open';
"#;

const RELEASE_A: &str = r#"
SET search_path = sales;
ALTER TABLE orders DROP COLUMN status;
COMMENT ON TABLE orders IS 'orders v2';
"#;

const RELEASE_B: &str = r#"
CREATE TABLE sales.refunds (id BIGINT, order_id BIGINT);
DROP VIEW sales.open_orders;
GRANT SELECT ON sales.refunds TO reporting;
"#;

/// Create a temporary repository with the given files.
fn create_repo(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir failed");
    for (name, content) in files {
        write(dir.path(), name, content);
    }
    dir
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn test_config(root: &Path) -> RewindConfig {
    let mut config = RewindConfig::default();
    config.catalog.path = root.join(".rewind/catalog.json");
    config.reverse.annotate = false;
    config
}

// ─── Tests ───

#[tokio::test]
async fn test_scan_save_and_reload_catalog() {
    let repo = create_repo(&[("schema/01_orders.sql", SCHEMA_SQL)]);
    let rewind = Rewind::new(test_config(repo.path()));

    let report = rewind.scan(repo.path(), true, |_| {}).await.expect("scan failed");
    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.tables, 1);
    assert_eq!(report.views, 1);
    assert_eq!(report.columns, 3);
    assert_eq!(report.parse_errors, 0);
    assert_eq!(report.catalog_path.as_deref(), Some(rewind.config.catalog.path.as_path()));

    let catalog = rewind.load_catalog().expect("load failed");
    assert_eq!(catalog, report.catalog);

    let orders = &catalog.tables["sales.orders"];
    let columns: Vec<(&str, &str)> = orders
        .columns_in_order()
        .iter()
        .map(|c| (c.name.as_str(), c.data_type.as_str()))
        .collect();
    assert_eq!(
        columns,
        vec![("id", "BIGINT"), ("status", "VARCHAR(20)"), ("amount", "NUMERIC(12, 2)")]
    );
    assert_eq!(orders.comment.as_deref(), Some("customer orders"));
    assert_eq!(
        orders.column("status").and_then(|c| c.comment.as_deref()),
        Some("order status")
    );
    assert!(catalog.views["sales.open_orders"]
        .definition
        .starts_with("CREATE VIEW sales.open_orders AS"));
    assert!(catalog.metadata.checksums.contains_key("schema/01_orders.sql"));
}

#[tokio::test]
async fn test_reverse_release_against_scanned_catalog() {
    let repo = create_repo(&[
        ("schema/01_orders.sql", SCHEMA_SQL),
        ("release/a/01_drop_status.sql", RELEASE_A),
        ("release/b/01_refunds.sql", RELEASE_B),
    ]);
    let rewind = Rewind::new(test_config(repo.path()));

    // Catalog reflects the schema before the release
    let mut scan_config = rewind.config.clone();
    scan_config.scan.skip_dirs.push("release".to_string());
    let scan = Rewind::new(scan_config)
        .scan(repo.path(), false, |_| {})
        .await
        .expect("scan failed");

    let out_dir = repo.path().join("out");
    let output = ReverseOutput {
        combined: Some(out_dir.join("rollback.sql")),
        per_file_dir: Some(out_dir.join("files")),
    };
    let report = rewind
        .reverse(
            BatchSource::UnitDirs(vec![
                repo.path().join("release/a"),
                repo.path().join("release/b"),
            ]),
            Some(&scan.catalog),
            &output,
        )
        .expect("reverse failed");

    let script = &report.script;
    let unsupported = script.find(UNSUPPORTED_MARKER).expect("grant marker");
    let view = script
        .find("CREATE VIEW sales.open_orders AS SELECT id")
        .expect("view restored");
    let refunds = script
        .find("DROP TABLE IF EXISTS sales.refunds;")
        .expect("refunds dropped");
    let comment = script
        .find("COMMENT ON TABLE orders IS 'customer orders';")
        .expect("comment restored");
    let column = script
        .find("ALTER TABLE orders ADD COLUMN status VARCHAR(20);")
        .expect("column restored");
    assert!(unsupported < view && view < refunds && refunds < comment && comment < column);
    assert!(script.contains("COMMENT ON COLUMN orders.status IS 'order status';"));

    assert_eq!(report.stats.units, 2);
    assert_eq!(report.stats.files, 2);
    assert_eq!(report.stats.unsupported, 1);
    assert_eq!(report.stats.manual, 0);
    assert!(matches!(
        report.require_complete(),
        Err(RewindError::ManualActionRequired { count: 1 })
    ));

    assert_eq!(report.files[0].reverse_file_name, "rollback_01_refunds.sql");
    assert_eq!(report.files[0].unit_name, "b");
    assert_eq!(report.written.len(), 3);
    assert_eq!(
        std::fs::read_to_string(out_dir.join("rollback.sql")).unwrap(),
        report.script
    );
    assert!(out_dir.join("files/a/rollback_01_drop_status.sql").exists());
}

#[test]
fn test_reverse_without_catalog_uses_markers() {
    let repo = create_repo(&[("release/01.sql", RELEASE_A)]);
    let rewind = Rewind::new(test_config(repo.path()));

    let report = rewind
        .reverse(
            BatchSource::Files(vec![repo.path().join("release/01.sql")]),
            None,
            &ReverseOutput::default(),
        )
        .expect("reverse failed");
    assert!(!report.catalog_used);
    assert_eq!(report.stats.manual, 2);
    assert!(report.script.contains("/* MANUAL: "));
    assert!(report.written.is_empty());
}

#[test]
fn test_config_reconstruct_defaults_apply_to_dropped_tables() {
    let repo = create_repo(&[
        (
            "rewind.toml",
            r#"
[reverse]
annotate = false
rollback_prefix = "undo_"

[reconstruct]
default_storage_options = "WITH(ORIENTATION = COLUMN)"
default_distribution = "roundrobin"
default_placement_group = "GROUP1"
"#,
        ),
        ("drop.sql", "DROP TABLE app.events;"),
    ]);
    let config_path = repo.path().join("rewind.toml");
    let config = RewindConfig::load(config_path.to_str(), &CliOverrides::default())
        .expect("config load failed");
    assert_eq!(config.reverse.rollback_prefix, "undo_");

    let catalog = Catalog::from_json(
        r#"{ "tables": { "app.events": { "name": "events", "fullName": "app.events",
            "schema": "app", "columns": { "id": { "name": "id", "type": "BIGINT", "ordinal": 0 } } } } }"#,
    )
    .expect("catalog parse failed");

    let report = Rewind::new(config)
        .reverse(
            BatchSource::Files(vec![repo.path().join("drop.sql")]),
            Some(&catalog),
            &ReverseOutput::default(),
        )
        .expect("reverse failed");
    assert_eq!(
        report.script,
        "CREATE TABLE app.events (\n  id BIGINT\n) WITH(ORIENTATION = COLUMN)\nDISTRIBUTE BY ROUNDROBIN\nTO GROUP \"GROUP1\";\n\n"
    );
    assert_eq!(report.files[0].reverse_file_name, "undo_drop.sql");
}

#[tokio::test]
async fn test_verify_detects_changes() {
    let repo = create_repo(&[
        ("a.sql", "CREATE TABLE a (id INT);"),
        ("b.sql", "CREATE TABLE b (id INT);"),
    ]);
    let rewind = Rewind::new(test_config(repo.path()));
    let scan = rewind.scan(repo.path(), false, |_| {}).await.expect("scan failed");

    let fresh = rewind.verify(&scan.catalog, repo.path()).expect("verify failed");
    assert!(!fresh.stale);
    assert_eq!(fresh.unchanged, 2);
    assert!(fresh.require_fresh().is_ok());

    write(repo.path(), "a.sql", "CREATE TABLE a (id BIGINT);");
    std::fs::remove_file(repo.path().join("b.sql")).unwrap();
    write(repo.path(), "nested/c.sql", "CREATE TABLE c (id INT);");

    let stale = rewind.verify(&scan.catalog, repo.path()).expect("verify failed");
    assert!(stale.stale);
    assert_eq!(stale.added, vec!["nested/c.sql"]);
    assert_eq!(stale.removed, vec!["b.sql"]);
    assert_eq!(stale.modified.len(), 1);
    assert_eq!(stale.modified[0].path, "a.sql");
    assert!(matches!(
        stale.require_fresh(),
        Err(RewindError::StaleCatalog { added: 1, removed: 1, modified: 1 })
    ));
}

#[test]
fn test_classify_reports_kinds_and_search_path() {
    let repo = create_repo(&[("r.sql", RELEASE_A), ("g.sql", "GRANT ALL ON t TO u;")]);
    let report = Rewind::classify(&[repo.path().join("r.sql"), repo.path().join("g.sql")])
        .expect("classify failed");

    assert_eq!(report.total_statements, 4);
    assert_eq!(report.unrecognized, 1);
    let kinds: Vec<&str> = report.files[0]
        .statements
        .iter()
        .map(|s| s.kind.as_str())
        .collect();
    assert_eq!(kinds, vec!["set search_path", "drop column", "comment on table"]);
    assert_eq!(report.files[0].statements[1].search_path.as_deref(), Some("sales"));
}

#[test]
fn test_classify_missing_file_is_read_error() {
    let err = Rewind::classify(&[PathBuf::from("/no/such/file.sql")]).unwrap_err();
    assert!(matches!(err, RewindError::FileRead { .. }));
}

#[tokio::test]
async fn test_inspect_catalog() {
    let repo = create_repo(&[("01.sql", SCHEMA_SQL)]);
    let rewind = Rewind::new(test_config(repo.path()));
    let scan = rewind.scan(repo.path(), false, |_| {}).await.expect("scan failed");

    match Rewind::inspect(&scan.catalog, None).expect("inspect failed") {
        InspectReport::Summary { metadata, tables, views } => {
            assert_eq!(metadata.total_tables, 1);
            assert_eq!(tables[0].key, "sales.orders");
            assert_eq!(tables[0].columns, 3);
            assert_eq!(views.len(), 1);
        }
        other => panic!("expected summary, got {:?}", other),
    }

    match Rewind::inspect(&scan.catalog, Some("Sales.Orders")).expect("inspect failed") {
        InspectReport::Table { table, .. } => assert_eq!(table.name, "orders"),
        other => panic!("expected table, got {:?}", other),
    }

    assert!(matches!(
        Rewind::inspect(&scan.catalog, Some("sales.nothing")),
        Err(RewindError::CatalogError(_))
    ));
}

#[tokio::test]
async fn test_reverse_catalog_drops_every_table() {
    let repo = create_repo(&[
        ("01_orders.sql", SCHEMA_SQL),
        ("02_refunds.sql", "CREATE TABLE sales.refunds (id BIGINT);"),
    ]);
    let rewind = Rewind::new(test_config(repo.path()));
    let scan = rewind.scan(repo.path(), false, |_| {}).await.expect("scan failed");

    let combined = repo.path().join("out/drop_all.sql");
    let output = ReverseOutput {
        combined: Some(combined.clone()),
        per_file_dir: None,
    };
    let report = rewind
        .reverse_catalog(&scan.catalog, &output)
        .expect("reverse failed");

    assert_eq!(
        report.script,
        "DROP TABLE IF EXISTS sales.refunds;\n\nDROP TABLE IF EXISTS sales.orders;\n\n"
    );
    assert_eq!(report.stats.reversed, 2);
    assert!(report.files.is_empty());
    assert!(report.require_complete().is_ok());
    assert_eq!(std::fs::read_to_string(combined).unwrap(), report.script);
}

#[tokio::test]
async fn test_chained_alter_is_reversed_in_full() {
    let repo = create_repo(&[
        ("schema/01_orders.sql", SCHEMA_SQL),
        (
            "release/01_trim.sql",
            "ALTER TABLE sales.orders DROP COLUMN status, DROP COLUMN amount;",
        ),
    ]);
    let rewind = Rewind::new(test_config(repo.path()));
    let mut scan_config = rewind.config.clone();
    scan_config.scan.skip_dirs.push("release".to_string());
    let scan = Rewind::new(scan_config)
        .scan(repo.path(), false, |_| {})
        .await
        .expect("scan failed");

    let report = rewind
        .reverse(
            BatchSource::Files(vec![repo.path().join("release/01_trim.sql")]),
            Some(&scan.catalog),
            &ReverseOutput::default(),
        )
        .expect("reverse failed");

    let amount = report
        .script
        .find("ALTER TABLE sales.orders ADD COLUMN amount NUMERIC(12, 2);")
        .expect("amount restored");
    let status = report
        .script
        .find("ALTER TABLE sales.orders ADD COLUMN status VARCHAR(20);")
        .expect("status restored");
    assert!(amount < status);
    assert_eq!(report.stats.reversed, 2);
    assert!(report.require_complete().is_ok());
}
