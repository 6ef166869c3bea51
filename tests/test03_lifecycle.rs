#![cfg(feature = "sqlite")]

use sql_adapter::prelude::*;

#[tokio::test]
async fn test03_queries_before_init_fail() {
    let db = Adapter::new();
    assert!(!db.is_initialized());
    assert!(matches!(db.fetch_all("SELECT 1", &[]).await, Err(QueryError::NotInitialized)));
    assert!(matches!(db.close().await, Err(CloseError::AlreadyClosed)));
}

#[tokio::test]
async fn test03_init_twice_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let db = Adapter::new();
    db.init(ConnectionConfig::sqlite(":memory:")).await?;
    let err = db.init(ConnectionConfig::Disabled).await.unwrap_err();
    assert!(matches!(err, InitError::AlreadyInitialized));
    // the live binding is untouched
    assert_eq!(db.backend(), Some(BackendKind::Sqlite));
    db.fetch_one("SELECT 1 AS one", &[]).await?;
    Ok(())
}

#[tokio::test]
async fn test03_close_then_query_and_close_again() -> Result<(), Box<dyn std::error::Error>> {
    let db = Adapter::new();
    db.init(ConnectionConfig::sqlite(":memory:")).await?;
    db.close().await?;

    assert!(matches!(db.execute("SELECT 1", &[]).await, Err(QueryError::AdapterClosed)));
    assert!(matches!(db.fetch_one("SELECT 1", &[]).await, Err(QueryError::AdapterClosed)));
    assert!(matches!(db.transaction().await, Err(QueryError::AdapterClosed)));
    assert!(matches!(db.close().await, Err(CloseError::AlreadyClosed)));
    assert!(db.stats().is_none());
    Ok(())
}

#[tokio::test]
async fn test03_reinit_after_close_starts_a_new_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let db = Adapter::new();
    db.init(ConnectionConfig::sqlite(":memory:")).await?;
    db.execute_batch("CREATE TABLE t (x INTEGER)").await?;
    db.close().await?;

    db.init(ConnectionConfig::sqlite(":memory:")).await?;
    // a fresh in-memory database: the old table is gone
    let err = db.fetch_all("SELECT x FROM t", &[]).await.unwrap_err();
    assert!(matches!(err, QueryError::Unknown(_)));
    assert_eq!(db.stats().map(|s| s.open_scopes), Some(0));
    db.close().await?;
    Ok(())
}

#[tokio::test]
async fn test03_invalid_config_is_rejected_before_connecting() {
    let db = Adapter::new();
    let bad = ConnectionConfig::Postgres(PostgresOptions {
        pool_min: 5,
        pool_max: 2,
        ..PostgresOptions::from_url("postgres://localhost/app")
    });
    assert!(matches!(db.init(bad).await, Err(InitError::InvalidConfig(_))));
    assert!(!db.is_initialized());
}

#[cfg(not(feature = "mssql"))]
#[tokio::test]
async fn test03_backend_without_its_feature_is_unavailable() {
    let db = Adapter::new();
    let err = db
        .init(ConnectionConfig::Mssql(MssqlOptions::new(
            "Server=tcp:localhost,1433;User Id=sa;Password=pw",
        )))
        .await
        .unwrap_err();
    assert!(matches!(err, InitError::DriverUnavailable(_)), "{err:?}");
}

#[tokio::test]
async fn test03_close_with_open_scope_lets_scope_finish() -> Result<(), Box<dyn std::error::Error>> {
    let db = Adapter::new();
    db.init(ConnectionConfig::sqlite(":memory:")).await?;
    db.execute_batch("CREATE TABLE t (x INTEGER)").await?;

    let mut tx = db.transaction().await?;
    assert!(matches!(db.audit_scopes(), Err(TransactionError::ScopeLeaked { open: 1 })));
    db.close().await?;

    tx.execute("INSERT INTO t (x) VALUES (?)", &params![1]).await?;
    tx.commit().await?;
    assert!(matches!(db.execute("SELECT 1", &[]).await, Err(QueryError::AdapterClosed)));
    Ok(())
}

#[tokio::test]
async fn test03_global_adapter_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let db = Adapter::global();
    db.init(ConnectionConfig::sqlite(":memory:")).await?;
    assert!(Adapter::global().is_initialized());
    let row = db.fetch_one("SELECT ? AS v", &params![7]).await?;
    assert_eq!(row.and_then(|r| r.get("v").and_then(RowValues::as_int).copied()), Some(7));
    db.close().await?;
    Ok(())
}
