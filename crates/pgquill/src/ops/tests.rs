use super::*;
use crate::registry::SchemaRegistry;
use crate::test_support::{DummyClient, text};
use pgquill_check::SafetyScanner;
use std::sync::Arc;

fn db(client: &DummyClient) -> Db<DummyClient> {
    Db::new(client.clone())
        .with_scanner(Arc::new(SafetyScanner::default()))
        .with_registry(Arc::new(SchemaRegistry::new()))
}

fn users() -> Query {
    Query::new("users")
}

fn admin() -> Values {
    Values::new()
        .with("username", "admin")
        .with("password", "12345")
}

#[tokio::test]
async fn get_streams_selected_columns() {
    let client = DummyClient::new();
    let db = db(&client);

    let mut seen = 0;
    users()
        .where_("username")
        .equal("admin")
        .order_by("id")
        .get(&db, &["id", "username"], |_| {
            seen += 1;
            true
        })
        .await
        .unwrap();

    assert_eq!(seen, 0);
    let calls = client.calls();
    assert_eq!(
        calls[0].sql,
        "SELECT id, username FROM users WHERE username = $1 ORDER BY id ASC"
    );
    assert_eq!(calls[0].params, text(&["admin"]));
    assert_eq!(client.open_streams(), 0);
}

#[tokio::test]
async fn get_propagates_stream_errors() {
    let client = DummyClient::new().fail_stream();
    let db = db(&client);

    let mut seen = 0;
    let err = users()
        .get(&db, &["username"], |_| {
            seen += 1;
            true
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::Other(_)), "{err}");
    assert_eq!(seen, 0);
    assert_eq!(client.sql(), ["SELECT username FROM users"]);
    assert_eq!(client.open_streams(), 0);
}

#[tokio::test]
async fn get_as_collects_nothing_from_empty_result() {
    let client = DummyClient::new();
    let db = db(&client);

    let rows: Vec<(String, String)> = users()
        .get_as(&db, &["username", "password"])
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(client.sql(), ["SELECT username, password FROM users"]);
}

#[tokio::test]
async fn get_is_vetted_by_the_scanner() {
    let client = DummyClient::new();
    let db = db(&client);

    let err = users()
        .where_("username")
        .equal("*")
        .get(&db, &[], |_| true)
        .await
        .unwrap_err();
    assert!(err.is_unsafe_query());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn has_with_empty_values_issues_nothing() {
    let client = DummyClient::new().select_rows(Some(1));
    let db = db(&client);

    assert!(!users().has(&db, &Values::new()).await);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn has_reports_existence() {
    let found = DummyClient::new().select_rows(Some(1));
    assert!(
        users()
            .has(&db(&found), &Values::new().with("username", "admin"))
            .await
    );
    assert_eq!(
        found.sql(),
        ["SELECT * FROM users WHERE username = $1 LIMIT 1"]
    );

    let missing = DummyClient::new().select_rows(Some(0));
    assert!(
        !users()
            .has(&db(&missing), &Values::new().with("username", "admin"))
            .await
    );
}

#[tokio::test]
async fn has_merges_existing_where() {
    let client = DummyClient::new().select_rows(Some(1));
    let db = db(&client);

    let q = users().where_("active").equal(true).or("role").equal("owner");
    assert!(q.has(&db, &Values::new().with("username", "admin")).await);

    let calls = client.calls();
    assert_eq!(
        calls[0].sql,
        "SELECT * FROM users WHERE username = $1 AND (active = $2 OR role = $3) LIMIT 1"
    );
    assert_eq!(
        calls[0].params,
        [Some("admin".to_string()), None, Some("owner".to_string())]
    );
}

#[tokio::test]
async fn has_swallows_errors() {
    let client = DummyClient::new().select_rows(None);
    let db = db(&client);
    assert!(!users().has(&db, &Values::new().with("username", "admin")).await);
    assert_eq!(client.calls().len(), 1);

    // A scanner veto is also reported as "not found".
    let client = DummyClient::new().select_rows(Some(1));
    let db = self::db(&client);
    assert!(!users().has(&db, &Values::new().with("password", "*")).await);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn set_with_empty_values_is_a_no_op() {
    let client = DummyClient::new();
    let db = db(&client);

    assert_eq!(users().set(&db, &Values::new(), &["username"]).await.unwrap(), 0);
    assert_eq!(
        users()
            .where_("id")
            .equal(1_i64)
            .set(&db, &Values::new(), &[])
            .await
            .unwrap(),
        0
    );
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn set_without_unique_inserts() {
    let client = DummyClient::new();
    let db = db(&client);

    users().set(&db, &admin(), &[]).await.unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].sql,
        "INSERT INTO users (username, password) VALUES ($1, $2)"
    );
    assert_eq!(calls[0].params, text(&["admin", "12345"]));
}

#[tokio::test]
async fn set_with_where_always_updates() {
    let client = DummyClient::new().select_rows(Some(0));
    let db = db(&client);

    users()
        .where_("username")
        .equal("admin")
        .set(&db, &Values::new().with("password", "x"), &["username"])
        .await
        .unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].sql,
        "UPDATE users SET password = $1 WHERE username = $2"
    );
    assert_eq!(calls[0].params, text(&["x", "admin"]));
}

#[tokio::test]
async fn set_updates_when_unique_row_exists() {
    let client = DummyClient::new().select_rows(Some(1));
    let db = db(&client);

    let values = Values::new()
        .with("username", "admin")
        .with("password", "x");
    users().set(&db, &values, &["username"]).await.unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0].sql,
        "SELECT * FROM users WHERE username = $1 LIMIT 1"
    );
    assert_eq!(calls[0].params, text(&["admin"]));
    assert_eq!(
        calls[1].sql,
        "UPDATE users SET username = $1, password = $2 WHERE username = $3"
    );
    assert_eq!(calls[1].params, text(&["admin", "x", "admin"]));
}

#[tokio::test]
async fn set_inserts_when_unique_row_is_missing() {
    let client = DummyClient::new().select_rows(Some(0));
    let db = db(&client);

    users().set(&db, &admin(), &["username", "email"]).await.unwrap();

    assert_eq!(
        client.sql(),
        [
            "SELECT * FROM users WHERE username = $1 LIMIT 1",
            "INSERT INTO users (username, password) VALUES ($1, $2)",
        ]
    );
}

#[tokio::test]
async fn set_skips_lookup_when_no_unique_column_is_present() {
    let client = DummyClient::new().select_rows(Some(1));
    let db = db(&client);

    users().set(&db, &admin(), &["email"]).await.unwrap();

    assert_eq!(
        client.sql(),
        ["INSERT INTO users (username, password) VALUES ($1, $2)"]
    );
}

#[tokio::test]
async fn set_lookup_failure_falls_back_to_insert() {
    let client = DummyClient::new().select_rows(None);
    let db = db(&client);

    users().set(&db, &admin(), &["username"]).await.unwrap();

    let sql = client.sql();
    assert_eq!(sql.len(), 2);
    assert!(sql[1].starts_with("INSERT INTO users"));
}

#[tokio::test]
async fn set_propagates_write_errors() {
    let client = DummyClient::new().fail_writes();
    let db = db(&client);

    let err = users().set(&db, &admin(), &[]).await.unwrap_err();
    assert!(matches!(err, DbError::Other(_)));
}

#[tokio::test]
async fn set_parameter_order_is_stable() {
    let values = Values::new()
        .with("c", "3")
        .with("a", "1")
        .with("b", "2");

    let mut seen = Vec::new();
    for _ in 0..5 {
        let client = DummyClient::new();
        let db = db(&client);
        users().set(&db, &values, &[]).await.unwrap();
        seen.push(client.calls().remove(0));
    }
    assert!(seen.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(seen[0].params, text(&["3", "1", "2"]));
}

#[tokio::test]
async fn delete_requires_where_or_force() {
    let client = DummyClient::new();
    let db = db(&client);

    let err = users().delete(&db, false).await.unwrap_err();
    assert!(err.is_unsafe_query());
    assert!(client.calls().is_empty());

    users().delete(&db, true).await.unwrap();
    assert_eq!(client.sql(), ["DELETE FROM users"]);
}

#[tokio::test]
async fn delete_with_where() {
    let client = DummyClient::new();
    let db = db(&client);

    let affected = users()
        .where_("password")
        .equal("p@ssw0rd!")
        .delete(&db, false)
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let calls = client.calls();
    assert_eq!(calls[0].sql, "DELETE FROM users WHERE password = $1");
    assert_eq!(calls[0].params, text(&["p@ssw0rd!"]));
}

#[tokio::test]
async fn delete_with_credential_wildcard_is_vetoed() {
    let client = DummyClient::new();
    let db = db(&client);

    let err = users()
        .where_("password")
        .equal("*")
        .delete(&db, true)
        .await
        .unwrap_err();
    assert!(err.is_unsafe_query());
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn drop_requires_force_and_bypasses_scanner() {
    let client = DummyClient::new();
    let db = db(&client);

    let err = users().drop_table(&db, false).await.unwrap_err();
    assert!(err.is_unsafe_query());
    assert!(client.calls().is_empty());

    users()
        .where_("id")
        .equal(1_i64)
        .drop_table(&db, true)
        .await
        .unwrap();
    assert_eq!(client.sql(), ["DROP TABLE users"]);
}

#[tokio::test]
async fn operations_accept_a_borrowed_client() {
    let client = DummyClient::new();
    let db = Db::new(&client)
        .with_scanner(Arc::new(SafetyScanner::default()))
        .with_registry(Arc::new(SchemaRegistry::new()));

    users().set(&db, &admin(), &[]).await.unwrap();
    assert_eq!(client.calls().len(), 1);
}
