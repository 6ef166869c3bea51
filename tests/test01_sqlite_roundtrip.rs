#![cfg(feature = "sqlite")]

use std::sync::Arc;

use sql_adapter::prelude::*;

async fn users_db() -> Result<Adapter, Box<dyn std::error::Error>> {
    let db = Adapter::new();
    db.init(ConnectionConfig::sqlite(":memory:")).await?;
    db.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE, score REAL, active BOOLEAN);",
    )
    .await?;
    Ok(db)
}

#[tokio::test]
async fn test01_create_insert_fetch_one() -> Result<(), Box<dyn std::error::Error>> {
    let db = users_db().await?;

    let inserted = db
        .execute("INSERT INTO users (name) VALUES (?)", &[RowValues::from("a")])
        .await?;
    assert_eq!(inserted, 1);

    let row = db
        .fetch_one("SELECT id, name FROM users WHERE name = ?", &params!["a"])
        .await?
        .expect("row was inserted");
    assert_eq!(row.get("name").and_then(RowValues::as_text), Some("a"));
    assert_eq!(row.get_by_index(0).and_then(RowValues::as_int), Some(&1));
    assert_eq!(row.columns(), ["id", "name"]);

    let missing = db
        .fetch_one("SELECT name FROM users WHERE name = ?", &params!["zz"])
        .await?;
    assert!(missing.is_none());
    Ok(())
}

#[tokio::test]
async fn test01_fetch_all_preserves_order_and_types() -> Result<(), Box<dyn std::error::Error>> {
    let db = users_db().await?;
    for (name, score, active) in [("c", 1.5, true), ("a", 2.0, false), ("b", 0.25, true)] {
        db.execute(
            "INSERT INTO users (name, score, active) VALUES (?, ?, ?)",
            &params![name, score, active],
        )
        .await?;
    }
    db.execute(
        "INSERT INTO users (name, score) VALUES (?, ?)",
        &params!["d", None::<f64>],
    )
    .await?;

    let rows = db
        .fetch_all("SELECT name, score, active FROM users ORDER BY name", &[])
        .await?;
    assert_eq!(rows.len(), 4);
    assert_eq!(rows.column_names(), ["name", "score", "active"]);

    let names: Vec<&str> = rows
        .iter()
        .filter_map(|r| r.get("name").and_then(RowValues::as_text))
        .collect();
    assert_eq!(names, ["a", "b", "c", "d"]);

    let first = rows.first().expect("four rows");
    assert_eq!(first.get("score").and_then(RowValues::as_float), Some(2.0));
    assert_eq!(first.get("active").and_then(RowValues::as_bool), Some(false));
    assert!(rows.iter().last().and_then(|r| r.get("score")).is_some_and(RowValues::is_null));

    let count = rows.into_iter().count();
    assert_eq!(count, 4);
    Ok(())
}

#[tokio::test]
async fn test01_placeholders_in_literals_are_not_parameters() -> Result<(), Box<dyn std::error::Error>> {
    let db = users_db().await?;
    db.execute("INSERT INTO users (name) VALUES ('what?')", &[]).await?;
    let row = db
        .fetch_one("SELECT name FROM users WHERE name = 'what?' AND id = ?", &params![1])
        .await?;
    assert!(row.is_some());
    Ok(())
}

#[tokio::test]
async fn test01_constraint_violation_is_classified() -> Result<(), Box<dyn std::error::Error>> {
    let db = users_db().await?;
    db.execute("INSERT INTO users (name) VALUES (?)", &params!["dup"]).await?;
    let err = db
        .execute("INSERT INTO users (name) VALUES (?)", &params!["dup"])
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::ConstraintViolation(_)), "{err:?}");

    let err = db.execute("SELEC nonsense", &[]).await.unwrap_err();
    assert!(matches!(err, QueryError::Unknown(_)), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn test01_arity_mismatch_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let db = users_db().await?;
    let err = db
        .execute("INSERT INTO users (name, score) VALUES (?, ?)", &params!["x"])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::ParameterArityMismatch {
            expected: 2,
            provided: 1
        }
    ));
    let rows = db.fetch_all("SELECT * FROM users", &[]).await?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test01_concurrent_callers_share_one_connection() -> Result<(), Box<dyn std::error::Error>> {
    let db = Arc::new(users_db().await?);

    let mut handles = Vec::new();
    for i in 0..16 {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            db.execute("INSERT INTO users (name) VALUES (?)", &params![format!("user{i}")])
                .await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await??, 1);
    }

    let row = db
        .fetch_one("SELECT COUNT(*) AS n FROM users", &[])
        .await?
        .expect("count row");
    assert_eq!(row.get("n").and_then(RowValues::as_int), Some(&16));
    Ok(())
}

#[tokio::test]
async fn test01_documented_end_to_end_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConnectionConfig::from_json(r#"{"backend": "sqlite", "path": ":memory:"}"#)?;
    let db = Adapter::new();
    db.init(config).await?;

    db.execute("CREATE TABLE t(id INTEGER, name TEXT)", &[]).await?;
    db.execute("INSERT INTO t VALUES (?, ?)", &params![1, "a"]).await?;
    let row = db
        .fetch_one("SELECT name FROM t WHERE id=?", &params![1])
        .await?
        .expect("inserted row");
    assert_eq!(row.get("name").and_then(RowValues::as_text), Some("a"));
    assert_eq!(row.len(), 1);
    db.close().await?;
    Ok(())
}
