//! Export orchestration against scripted connections.

mod common;

use common::{fk, row, MemoryConnection, SqlLog, FK_QUERY};
use dbsnap::config::DumpConfig;
use dbsnap::connection::{Connections, Value};
use dbsnap::dumper::DatabaseDumper;
use dbsnap::filesystem::LocalFilesystem;
use dbsnap::schema::TableKey;
use dbsnap::writer::DumpLayout;
use dbsnap::Error;
use std::fs;
use tempfile::TempDir;

const CONFIG: &str = r#"
full_export:
  public: [countries]
partial_export:
  public:
    users: { limit: 2, order_by: id }
    orders:
      limit: 10
      cascade_from: [{ parent: public.users, fk_column: user_id, parent_column: id }]
faker:
  public:
    users: { fio: full_name }
"#;

fn config() -> DumpConfig {
    serde_yaml::from_str(CONFIG).unwrap()
}

fn shop_connection() -> MemoryConnection {
    MemoryConnection::new("pgsql")
        .respond(
            FK_QUERY,
            vec![
                fk("public.orders", "user_id", "public.users", "id"),
                fk("public.users", "country_id", "public.countries", "id"),
            ],
        )
        .respond(
            "c.relname = 'users'",
            vec![row(&[
                ("column_name", Value::from("id")),
                ("sequence_name", Value::from("public.users_id_seq")),
            ])],
        )
        .respond(
            "SELECT * FROM \"public\".\"countries\"",
            vec![row(&[("id", Value::Int(1)), ("name", Value::from("Россия"))])],
        )
        .respond(
            "SELECT * FROM \"public\".\"users\"",
            vec![
                row(&[
                    ("id", Value::Int(1)),
                    ("country_id", Value::Int(1)),
                    ("fio", Value::from("Петров Пётр Петрович")),
                ]),
                row(&[
                    ("id", Value::Int(2)),
                    ("country_id", Value::Int(1)),
                    ("fio", Value::Null),
                ]),
            ],
        )
        .respond(
            "SELECT * FROM \"public\".\"orders\"",
            vec![row(&[
                ("id", Value::Int(10)),
                ("user_id", Value::Int(1)),
                ("note", Value::from("it's; fine")),
            ])],
        )
}

fn export_all(conn: MemoryConnection, config: &DumpConfig, dir: &TempDir, stop: bool) -> (dbsnap::Result<dbsnap::dumper::ExportReport>, SqlLog) {
    let log = conn.log();
    let mut connections = Connections::new("default", Box::new(conn));
    let fs = LocalFilesystem;
    let mut dumper = DatabaseDumper::new(&mut connections, config, &fs, DumpLayout::new(dir.path()));
    let tables = dumper.tables_to_export(None, None);
    (dumper.export_all(tables, stop), log)
}

#[test]
fn test_exports_parents_before_children() {
    let dir = TempDir::new().unwrap();
    let config = config();
    let (report, log) = export_all(shop_connection(), &config, &dir, false);
    let report = report.unwrap();

    assert!(report.is_success());
    let order: Vec<&str> = report.tables.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(order, vec!["public.countries", "public.users", "public.orders"]);
    assert_eq!(report.total_rows(), 4);

    let countries = log.position("SELECT * FROM \"public\".\"countries\"").unwrap();
    let users = log.position("SELECT * FROM \"public\".\"users\"").unwrap();
    let orders = log.position("SELECT * FROM \"public\".\"orders\"").unwrap();
    assert!(countries < users && users < orders);
    assert_eq!(log.count(FK_QUERY), 1, "graph is built once per connection");
}

#[test]
fn test_partial_export_query_and_dump_file() {
    let dir = TempDir::new().unwrap();
    let config = config();
    let (report, log) = export_all(shop_connection(), &config, &dir, false);
    report.unwrap();

    assert!(log.contains(
        "SELECT * FROM \"public\".\"orders\" WHERE (\"user_id\" IN \
         (SELECT \"id\" FROM \"public\".\"users\" ORDER BY id LIMIT 2) OR \"user_id\" IS NULL) LIMIT 10"
    ));
    assert!(log.contains("SELECT * FROM \"public\".\"users\" ORDER BY id LIMIT 2"));

    let users = fs::read_to_string(dir.path().join("database/dumps/public/users.sql")).unwrap();
    assert!(users.starts_with("-- Table: public.users\n"));
    assert!(users.contains("-- Rows: 2\n-- Mode: partial"));
    assert!(users.contains("TRUNCATE TABLE \"public\".\"users\" CASCADE;"));
    assert!(users.contains("INSERT INTO \"public\".\"users\" (\"id\", \"country_id\", \"fio\") VALUES"));
    assert!(users.contains("(2, 1, NULL)"));
    assert!(!users.contains("Петров Пётр Петрович"));
    assert!(users.contains("SELECT setval('public.users_id_seq', COALESCE((SELECT MAX(\"id\") FROM \"public\".\"users\"), 0) + 1, false);"));

    let countries = fs::read_to_string(dir.path().join("database/dumps/public/countries.sql")).unwrap();
    assert!(countries.contains("-- Mode: full"));
    assert!(countries.contains("(1, 'Россия')"));

    let orders = fs::read_to_string(dir.path().join("database/dumps/public/orders.sql")).unwrap();
    assert!(orders.contains("'it''s; fine'"));
}

#[test]
fn test_failed_table_does_not_stop_siblings() {
    let dir = TempDir::new().unwrap();
    let config = config();
    let conn = shop_connection().fail_on("SELECT * FROM \"public\".\"users\"");
    let (report, _) = export_all(conn, &config, &dir, false);
    let report = report.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].table, "public.users");
    assert!(report.failures[0].error.contains("public.users"));
    assert_eq!(report.tables.len(), 2);
    assert!(dir.path().join("database/dumps/public/orders.sql").exists());
    assert!(!dir.path().join("database/dumps/public/users.sql").exists());
}

#[test]
fn test_stop_on_error_returns_export_failed() {
    let dir = TempDir::new().unwrap();
    let config = config();
    let conn = shop_connection().fail_on("SELECT * FROM \"public\".\"users\"");
    let (report, log) = export_all(conn, &config, &dir, true);

    match report {
        Err(Error::ExportFailed { table, .. }) => assert_eq!(table, "public.users"),
        other => panic!("expected ExportFailed, got {other:?}"),
    }
    assert!(!log.contains("SELECT * FROM \"public\".\"orders\""));
}

#[test]
fn test_cyclic_graph_keeps_requested_order() {
    let dir = TempDir::new().unwrap();
    let config: DumpConfig = serde_yaml::from_str("full_export: { public: [a, b] }").unwrap();
    let conn = MemoryConnection::new("pgsql").respond(
        FK_QUERY,
        vec![
            fk("public.a", "b_id", "public.b", "id"),
            fk("public.b", "a_id", "public.a", "id"),
        ],
    );
    let (report, _) = export_all(conn, &config, &dir, false);
    let report = report.unwrap();

    let order: Vec<&str> = report.tables.iter().map(|t| t.table.as_str()).collect();
    assert_eq!(order, vec!["public.a", "public.b"]);
    let a = fs::read_to_string(dir.path().join("database/dumps/public/a.sql")).unwrap();
    assert!(a.contains("-- Rows: 0"));
}

#[test]
fn test_named_connection_gets_own_subtree() {
    let dir = TempDir::new().unwrap();
    let config: DumpConfig = serde_yaml::from_str(
        r#"
full_export: { public: [users] }
connections:
  analytics:
    full_export: { events: [types] }
"#,
    )
    .unwrap();

    let analytics = MemoryConnection::new("mysql").respond(
        "SELECT * FROM `events`.`types`",
        vec![row(&[("id", Value::Int(7)), ("active", Value::Bool(true))])],
    );
    let mut connections = Connections::new("default", Box::new(MemoryConnection::new("pgsql")));
    connections.add("analytics", Box::new(analytics));

    let fs_impl = LocalFilesystem;
    let mut dumper = DatabaseDumper::new(&mut connections, &config, &fs_impl, DumpLayout::new(dir.path()));

    let only_analytics = dumper.tables_to_export(None, Some("analytics"));
    assert_eq!(only_analytics.len(), 1);
    assert_eq!(only_analytics[0].connection_name.as_deref(), Some("analytics"));

    let tables = dumper.tables_to_export(None, None);
    assert_eq!(tables.len(), 2);
    let report = dumper.export_all(tables, true).unwrap();
    assert_eq!(report.tables.len(), 2);

    let types = fs::read_to_string(dir.path().join("database/dumps/analytics/events/types.sql")).unwrap();
    assert!(types.contains("DELETE FROM `events`.`types`;"));
    assert!(types.contains("(7, 1)"));
    assert!(types.contains("ALTER TABLE `events`.`types` AUTO_INCREMENT=1;"));
    assert!(dir.path().join("database/dumps/public/users.sql").exists());
}

#[test]
fn test_find_table_rejects_unconfigured() {
    let config = config();
    let mut connections = Connections::new("default", Box::new(MemoryConnection::new("pgsql")));
    let fs_impl = LocalFilesystem;
    let dumper = DatabaseDumper::new(&mut connections, &config, &fs_impl, DumpLayout::new(std::path::Path::new(".")));

    let users = dumper.find_table(&TableKey::new("public", "users"), None).unwrap();
    assert_eq!(users.limit, Some(2));
    assert!(matches!(
        dumper.find_table(&TableKey::new("public", "payments"), None),
        Err(Error::InvalidConfig(_))
    ));
}
