use super::*;
use crate::client::GenericClient;
use crate::test_support::DummyClient;

fn db(client: &DummyClient) -> Db<DummyClient> {
    Db::new(client.clone())
        .with_scanner(Arc::new(SafetyScanner::default()))
        .with_registry(Arc::new(SchemaRegistry::new()))
}

fn user_columns() -> Vec<Column> {
    vec![Column::text("username"), Column::text("password")]
}

#[test]
fn config_defaults() {
    let config = DbConfig::default();
    assert_eq!(config.scan_mode, ScanMode::Enforce);
    assert!(config.log_sql);
    assert_eq!(config.max_sql_length, Some(200));
    assert_eq!(config.query_timeout, None);
}

#[test]
fn config_builder() {
    let config = DbConfig::new()
        .log_sql(false)
        .max_sql_length(16)
        .timeout(Duration::from_secs(5));
    assert!(!config.log_sql);
    assert_eq!(config.max_sql_length, Some(16));
    assert_eq!(config.query_timeout, Some(Duration::from_secs(5)));
    assert_eq!(config.no_truncate().max_sql_length, None);
}

#[test]
fn unchecked_requires_exact_phrase() {
    let config = DbConfig::new().unchecked(UNCHECKED_CONFIRMATION).unwrap();
    assert_eq!(config.scan_mode, ScanMode::Disabled);
    assert_eq!(config.enforce().scan_mode, ScanMode::Enforce);

    for phrase in ["", "i know what im doing!", "I Know What I'm Doing!"] {
        let err = DbConfig::new().unchecked(phrase).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)), "{phrase}");
    }
}

#[test]
fn display_sql_truncates_on_char_boundary() {
    let client = DummyClient::new();
    let db = Db::with_config(client, DbConfig::new().max_sql_length(5));
    assert_eq!(db.display_sql("SELECT 1"), "SELEC...");
    assert_eq!(db.display_sql("abc"), "abc");
    assert_eq!(db.display_sql("abcdéf"), "abcd...");
}

#[tokio::test]
async fn raw_sql_is_vetted() {
    let client = DummyClient::new();
    let db = db(&client);

    for sql in [
        "",
        "SELECT * FROM users; DELETE FROM users",
        "DROP TABLE users",
        "SELECT * FROM users WHERE username = 'admin' OR 1=1",
        "SELECT * FROM users WHERE password = '*'",
    ] {
        let err = db.query(sql, &[]).await.unwrap_err();
        assert!(err.is_unsafe_query(), "{sql}");
    }
    assert!(client.calls().is_empty());

    db.query("SELECT * FROM users WHERE username = $1", &[&"admin"])
        .await
        .unwrap();
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn veto_message_names_the_rule() {
    let client = DummyClient::new();
    let db = db(&client);

    let err = db
        .execute("UPDATE t SET a = $1 WHERE id=id", &[&1_i32])
        .await
        .unwrap_err();
    match err {
        DbError::UnsafeQuery(message) => assert!(message.starts_with("S004"), "{message}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn bound_credential_wildcard_is_vetted() {
    let client = DummyClient::new();
    let db = db(&client);

    let err = db
        .query("SELECT * FROM users WHERE username = $1", &[&"*"])
        .await
        .unwrap_err();
    assert!(err.is_unsafe_query());

    let err = db
        .prepare_statement("SELECT * FROM t WHERE 1=1")
        .await
        .unwrap_err();
    assert!(err.is_unsafe_query());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn custom_scanner_rules_apply() {
    let client = DummyClient::new();
    let scanner = SafetyScanner::new(
        pgquill_check::ScannerConfig::new().with_check(|sql| !sql.contains("pg_sleep")),
    );
    let db = db(&client).with_scanner(Arc::new(scanner));

    let err = db.query("SELECT pg_sleep(10)", &[]).await.unwrap_err();
    assert!(err.is_unsafe_query());
    db.query("SELECT 1", &[]).await.unwrap();
}

#[tokio::test]
async fn process_wide_rules_reach_existing_clients() {
    let client = DummyClient::new();
    let guarded = Db::new(client.clone()).with_registry(Arc::new(SchemaRegistry::new()));
    assert!(guarded.scanner().is_none());

    let sql = "SELECT late_rule_marker FROM t";
    guarded.execute(sql, &[]).await.unwrap();

    pgquill_check::add_check(|sql| !sql.contains("late_rule_marker"));

    match guarded.execute(sql, &[]).await.unwrap_err() {
        DbError::UnsafeQuery(message) => assert!(message.starts_with("S007"), "{message}"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.calls().len(), 1);

    // A client with its own scanner does not see process-wide rules.
    let isolated = db(&client);
    assert!(isolated.scanner().is_some());
    isolated.execute(sql, &[]).await.unwrap();
    assert_eq!(client.calls().len(), 2);
}

#[tokio::test]
async fn unchecked_mode_skips_the_scanner() {
    let client = DummyClient::new();
    let config = DbConfig::new().unchecked(UNCHECKED_CONFIRMATION).unwrap();
    let db = Db::with_config(client.clone(), config)
        .with_registry(Arc::new(SchemaRegistry::new()));

    db.query("SELECT * FROM users WHERE 1=1", &[]).await.unwrap();
    assert_eq!(client.sql(), ["SELECT * FROM users WHERE 1=1"]);
}

#[tokio::test]
async fn table_is_created_once() {
    let client = DummyClient::new();
    let db = db(&client);

    let users = db.table("users", &user_columns()).await;
    assert_eq!(users.table(), "users");
    assert!(db.registry().contains("users"));

    let again = db.table("users", &user_columns()).await;
    assert_eq!(again.table(), "users");

    assert_eq!(
        client.sql(),
        ["CREATE TABLE IF NOT EXISTS users (username TEXT, password TEXT)"]
    );
}

#[tokio::test]
async fn table_without_columns_issues_nothing() {
    let client = DummyClient::new();
    let db = db(&client);

    let q = db.table("users;", &[]).await;
    assert_eq!(q.table(), "users");
    assert!(client.calls().is_empty());
    assert!(!db.registry().contains("users"));
}

#[tokio::test]
async fn table_creation_failure_still_returns_query() {
    let client = DummyClient::new().fail_writes();
    let db = db(&client);

    let q = db.table("users", &user_columns()).await;
    assert_eq!(q.table(), "users");
    assert!(!db.registry().contains("users"));

    // Not registered, so the next call retries.
    db.table("users", &user_columns()).await;
    assert_eq!(client.calls().len(), 2);
}

#[tokio::test]
async fn table_creation_is_scanned() {
    let client = DummyClient::new();
    let db = db(&client);

    let q = db
        .table("notes", &[Column::text("body").default("a; b")])
        .await;
    assert_eq!(q.table(), "notes");
    assert!(client.calls().is_empty());
    assert!(!db.registry().contains("notes"));
}

#[tokio::test]
async fn registry_is_shared_between_clients() {
    let registry = Arc::new(SchemaRegistry::new());
    let first = DummyClient::new();
    let second = DummyClient::new();

    let a = Db::new(first.clone()).with_registry(registry.clone());
    let b = Db::new(second.clone()).with_registry(registry.clone());

    a.table("shared", &user_columns()).await;
    b.table("shared", &user_columns()).await;

    assert_eq!(first.calls().len(), 1);
    assert!(second.calls().is_empty());
}

#[tokio::test]
async fn statements_time_out() {
    let client = DummyClient::new().delay(Duration::from_secs(10));
    let db = Db::with_config(
        client,
        DbConfig::new().timeout(Duration::from_millis(20)),
    )
    .with_scanner(Arc::new(SafetyScanner::default()));

    let err = db.execute("SELECT 1", &[]).await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn inner_client_is_unguarded() {
    let client = DummyClient::new();
    let db = db(&client);

    db.inner().execute("DROP TABLE t", &[]).await.unwrap();
    assert_eq!(client.sql(), ["DROP TABLE t"]);

    let raw = db.into_inner();
    raw.execute("DROP TABLE u", &[]).await.unwrap();
    assert_eq!(client.calls().len(), 2);
}
