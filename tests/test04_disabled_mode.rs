use sql_adapter::prelude::*;

#[tokio::test]
async fn test04_every_query_is_disabled() -> Result<(), Box<dyn std::error::Error>> {
    let db = Adapter::new();
    db.init(ConnectionConfig::Disabled).await?;
    assert_eq!(db.backend(), Some(BackendKind::Disabled));

    assert!(matches!(
        db.execute("INSERT INTO t VALUES (?)", &params![1]).await,
        Err(QueryError::DatabaseDisabled)
    ));
    assert!(matches!(db.fetch_one("SELECT 1", &[]).await, Err(QueryError::DatabaseDisabled)));
    assert!(matches!(db.fetch_all("SELECT 1", &[]).await, Err(QueryError::DatabaseDisabled)));
    assert!(matches!(db.execute_batch("SELECT 1").await, Err(QueryError::DatabaseDisabled)));
    assert!(matches!(db.transaction().await, Err(QueryError::DatabaseDisabled)));
    assert!(matches!(list_tables(&db).await, Err(QueryError::DatabaseDisabled)));

    db.close().await?;
    Ok(())
}

#[tokio::test]
async fn test04_arity_is_still_checked() -> Result<(), Box<dyn std::error::Error>> {
    let db = Adapter::new();
    db.init(ConnectionConfig::Disabled).await?;
    assert!(matches!(
        db.execute("SELECT ?", &[]).await,
        Err(QueryError::ParameterArityMismatch { expected: 1, provided: 0 })
    ));
    Ok(())
}

#[tokio::test]
async fn test04_resolved_from_environment_lookup() -> Result<(), Box<dyn std::error::Error>> {
    let config = ConnectionConfig::from_lookup(|key| (key == "DB_TYPE").then(|| "none".to_owned()))?;
    assert_eq!(config, ConnectionConfig::Disabled);

    let db = Adapter::new();
    db.init(config).await?;
    assert!(db.is_initialized());
    db.close().await?;
    Ok(())
}
