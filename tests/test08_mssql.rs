#![cfg(feature = "mssql")]

//! The server tests are ignored by default. Run them with `cargo test --features mssql --
//! --ignored` and `SQL_ADAPTER_TEST_MSSQL_DSN` holding an ADO.NET connection string for a
//! scratch database, e.g. `Server=tcp:localhost,1433;User Id=sa;Password=...;TrustServerCertificate=true`.

use sql_adapter::prelude::*;

fn mssql_config(driver: MssqlDriver) -> Result<ConnectionConfig, std::env::VarError> {
    let dsn = std::env::var("SQL_ADAPTER_TEST_MSSQL_DSN")?;
    Ok(ConnectionConfig::Mssql(MssqlOptions {
        pool_min: 1,
        pool_max: 3,
        query_timeout_secs: 10,
        driver,
        ..MssqlOptions::new(dsn)
    }))
}

async fn exercise(driver: MssqlDriver, table: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = mssql_config(driver)?;
    let db = Adapter::new();
    db.init(config).await?;
    assert_eq!(db.backend(), Some(BackendKind::Mssql));

    db.execute_batch(&format!(
        "IF OBJECT_ID('{table}', 'U') IS NOT NULL DROP TABLE {table};
         CREATE TABLE {table} (id INT IDENTITY(1,1) PRIMARY KEY, name NVARCHAR(50) NOT NULL UNIQUE, score FLOAT NULL);"
    ))
    .await?;

    let inserted = db
        .execute(
            &format!("INSERT INTO {table} (name, score) VALUES (?, ?)"),
            &params!["a", 1.25],
        )
        .await?;
    assert_eq!(inserted, 1);

    let row = db
        .fetch_one(&format!("SELECT name, score FROM {table} WHERE name = ?"), &params!["a"])
        .await?
        .expect("row exists");
    assert_eq!(row.get("name").and_then(RowValues::as_text), Some("a"));
    assert_eq!(row.get("score").and_then(RowValues::as_float), Some(1.25));

    let err = db
        .execute(&format!("INSERT INTO {table} (name) VALUES (?)"), &params!["a"])
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::ConstraintViolation(_)), "{err:?}");

    let mut tx = db.transaction().await?;
    tx.execute(&format!("INSERT INTO {table} (name) VALUES (?)"), &params!["gone"])
        .await?;
    tx.rollback().await?;
    {
        let mut tx = db.transaction().await?;
        tx.execute(&format!("INSERT INTO {table} (name) VALUES (?)"), &params!["dropped"])
            .await?;
    }
    // give the detached rollback a moment on the pooled connection
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let rows = db.fetch_all(&format!("SELECT name FROM {table}"), &[]).await?;
    assert_eq!(rows.len(), 1);

    db.execute_batch(&format!("DROP TABLE {table}")).await?;
    db.close().await?;
    Ok(())
}

#[tokio::test]
#[ignore = "needs a SQL Server in SQL_ADAPTER_TEST_MSSQL_DSN"]
async fn test08_mssql_native_pool() -> Result<(), Box<dyn std::error::Error>> {
    exercise(MssqlDriver::Native, "adapter_native").await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "needs a SQL Server in SQL_ADAPTER_TEST_MSSQL_DSN"]
async fn test08_mssql_blocking_workers() -> Result<(), Box<dyn std::error::Error>> {
    exercise(MssqlDriver::Blocking, "adapter_blocking").await
}

#[tokio::test]
async fn test08_unreachable_server_is_refused() {
    let db = Adapter::new();
    let config = ConnectionConfig::Mssql(MssqlOptions {
        query_timeout_secs: 2,
        ..MssqlOptions::new("Server=tcp:127.0.0.1,1;User Id=sa;Password=x;TrustServerCertificate=true")
    });
    let err = db.init(config).await.unwrap_err();
    assert!(matches!(err, InitError::ConnectionRefused { .. }), "{err:?}");
}
