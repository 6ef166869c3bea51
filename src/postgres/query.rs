use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use deadpool_postgres::ClientWrapper;
use serde_json::Value;
use tokio_postgres::Statement;
use tokio_postgres::types::Type;

use super::errors::map_error;
use super::params::as_refs;
use crate::error::QueryError;
use crate::results::Rows;
use crate::types::RowValues;

/// Extracts a `RowValues` from a `tokio_postgres` Row at the given index.
fn extract_value(row: &tokio_postgres::Row, idx: usize) -> Result<RowValues, tokio_postgres::Error> {
    let type_info = row.columns()[idx].type_();

    let value = match *type_info {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|v| RowValues::Int(i64::from(v))),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(RowValues::Int),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|v| RowValues::Float(f64::from(v))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(RowValues::Float),
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(RowValues::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(RowValues::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|v| RowValues::Timestamp(v.naive_utc())),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|v| RowValues::Timestamp(v.and_time(chrono::NaiveTime::MIN))),
        Type::JSON | Type::JSONB => row.try_get::<_, Option<Value>>(idx)?.map(RowValues::JSON),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(RowValues::Blob),
        // text-like and anything else the driver can render as a string
        _ => row.try_get::<_, Option<String>>(idx)?.map(RowValues::Text),
    };
    Ok(value.unwrap_or(RowValues::Null))
}

/// Build `Rows` using statement metadata for column names, so empty results keep them.
fn build_rows(stmt: &Statement, rows: &[tokio_postgres::Row]) -> Result<Rows, QueryError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result = Rows::with_columns(column_names, rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(extract_value(row, idx).map_err(map_error)?);
        }
        result.push(values);
    }
    Ok(result)
}

pub(super) async fn execute(
    client: &ClientWrapper,
    sql: &str,
    params: &[RowValues],
) -> Result<u64, QueryError> {
    let stmt = client.prepare_cached(sql).await.map_err(map_error)?;
    client
        .execute(&stmt, &as_refs(params))
        .await
        .map_err(map_error)
}

pub(super) async fn fetch_all(
    client: &ClientWrapper,
    sql: &str,
    params: &[RowValues],
) -> Result<Rows, QueryError> {
    let stmt = client.prepare_cached(sql).await.map_err(map_error)?;
    let rows = client
        .query(&stmt, &as_refs(params))
        .await
        .map_err(map_error)?;
    build_rows(&stmt, &rows)
}

pub(super) async fn execute_batch(client: &ClientWrapper, sql: &str) -> Result<(), QueryError> {
    client.batch_execute(sql).await.map_err(map_error)
}
