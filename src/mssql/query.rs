use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tiberius::{ColumnData, FromSql, Query};

use super::client::MssqlClient;
use super::errors::map_error;
use super::params::bind_all;
use crate::error::QueryError;
use crate::results::{Row, Rows};
use crate::translation::{PlaceholderStyle, rewrite_placeholders};
use crate::types::RowValues;

/// One unit of work for a SQL Server connection.
///
/// Owned so it can be shipped to a worker thread unchanged.
#[derive(Debug)]
pub(super) enum Request {
    Execute { sql: String, params: Vec<RowValues> },
    FetchAll { sql: String, params: Vec<RowValues> },
    FetchOne { sql: String, params: Vec<RowValues> },
    Batch { sql: String },
}

#[derive(Debug)]
pub(super) enum Reply {
    Affected(u64),
    Rows(Rows),
    Row(Option<Row>),
    Done,
}

impl Request {
    pub(super) fn sql(&self) -> &str {
        match self {
            Request::Execute { sql, .. }
            | Request::FetchAll { sql, .. }
            | Request::FetchOne { sql, .. }
            | Request::Batch { sql } => sql,
        }
    }
}

fn unexpected(reply: &Reply) -> QueryError {
    QueryError::unknown(format!("mssql connection sent an unexpected reply: {reply:?}"))
}

impl Reply {
    pub(super) fn into_affected(self) -> Result<u64, QueryError> {
        match self {
            Reply::Affected(n) => Ok(n),
            other => Err(unexpected(&other)),
        }
    }

    pub(super) fn into_rows(self) -> Result<Rows, QueryError> {
        match self {
            Reply::Rows(rows) => Ok(rows),
            other => Err(unexpected(&other)),
        }
    }

    pub(super) fn into_row(self) -> Result<Option<Row>, QueryError> {
        match self {
            Reply::Row(row) => Ok(row),
            other => Err(unexpected(&other)),
        }
    }

    pub(super) fn into_done(self) -> Result<(), QueryError> {
        match self {
            Reply::Done => Ok(()),
            other => Err(unexpected(&other)),
        }
    }
}

/// Run `request` on `client`. Neutral `?` markers become `@P1..@Pn` here.
pub(super) async fn perform(client: &mut MssqlClient, request: &Request) -> Result<Reply, QueryError> {
    match request {
        Request::Execute { sql, params } => {
            let mut query = Query::new(rewrite_placeholders(sql, PlaceholderStyle::AtP));
            bind_all(&mut query, params);
            let result = query.execute(client).await.map_err(map_error)?;
            Ok(Reply::Affected(result.total()))
        }
        Request::FetchAll { sql, params } => {
            let mut query = Query::new(rewrite_placeholders(sql, PlaceholderStyle::AtP));
            bind_all(&mut query, params);
            let mut stream = query.query(client).await.map_err(map_error)?;
            let column_names = column_names(stream.columns().await.map_err(map_error)?);
            let raw = stream.into_first_result().await.map_err(map_error)?;
            let mut rows = Rows::with_columns(column_names, raw.len());
            for row in raw {
                rows.push(row_values(row)?);
            }
            Ok(Reply::Rows(rows))
        }
        Request::FetchOne { sql, params } => {
            let mut query = Query::new(rewrite_placeholders(sql, PlaceholderStyle::AtP));
            bind_all(&mut query, params);
            let mut stream = query.query(client).await.map_err(map_error)?;
            let column_names = column_names(stream.columns().await.map_err(map_error)?);
            let Some(row) = stream.into_row().await.map_err(map_error)? else {
                return Ok(Reply::Row(None));
            };
            let mut rows = Rows::with_columns(column_names, 1);
            rows.push(row_values(row)?);
            Ok(Reply::Row(rows.into_first()))
        }
        Request::Batch { sql } => {
            client
                .simple_query(sql.as_str())
                .await
                .map_err(map_error)?
                .into_results()
                .await
                .map_err(map_error)?;
            Ok(Reply::Done)
        }
    }
}

fn column_names(columns: Option<&[tiberius::Column]>) -> Vec<String> {
    columns
        .unwrap_or_default()
        .iter()
        .map(|col| col.name().to_owned())
        .collect()
}

fn row_values(row: tiberius::Row) -> Result<Vec<RowValues>, QueryError> {
    row.into_iter().map(column_value).collect()
}

/// Convert one TDS column value into `RowValues`.
fn column_value(data: ColumnData<'static>) -> Result<RowValues, QueryError> {
    let value = match &data {
        ColumnData::U8(v) => v.map(|x| RowValues::Int(i64::from(x))),
        ColumnData::I16(v) => v.map(|x| RowValues::Int(i64::from(x))),
        ColumnData::I32(v) => v.map(|x| RowValues::Int(i64::from(x))),
        ColumnData::I64(v) => v.map(RowValues::Int),
        ColumnData::F32(v) => v.map(|x| RowValues::Float(f64::from(x))),
        ColumnData::F64(v) => v.map(RowValues::Float),
        ColumnData::Bit(v) => v.map(RowValues::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| RowValues::Text(s.to_string())),
        ColumnData::Guid(v) => v.as_ref().map(|g| RowValues::Text(g.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|b| RowValues::Blob(b.to_vec())),
        ColumnData::Numeric(v) => v.as_ref().map(|n| {
            #[allow(clippy::cast_precision_loss)]
            let scaled = n.value() as f64 / 10f64.powi(i32::from(n.scale()));
            RowValues::Float(scaled)
        }),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|x| RowValues::Text(x.clone().into_owned().into_string())),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(&data)
                .map_err(map_error)?
                .map(RowValues::Timestamp)
        }
        ColumnData::DateTimeOffset(_) => DateTime::<Utc>::from_sql(&data)
            .map_err(map_error)?
            .map(|dt| RowValues::Timestamp(dt.naive_utc())),
        ColumnData::Date(_) => NaiveDate::from_sql(&data)
            .map_err(map_error)?
            .map(|d| RowValues::Timestamp(d.and_time(NaiveTime::MIN))),
        ColumnData::Time(_) => NaiveTime::from_sql(&data)
            .map_err(map_error)?
            .map(|t| RowValues::Text(t.to_string())),
    };
    Ok(value.unwrap_or(RowValues::Null))
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[test]
    fn converts_scalar_columns() {
        assert_eq!(
            column_value(ColumnData::I32(Some(7))).unwrap(),
            RowValues::Int(7)
        );
        assert_eq!(
            column_value(ColumnData::String(Some(Cow::Borrowed("a")))).unwrap(),
            RowValues::Text("a".into())
        );
        assert_eq!(
            column_value(ColumnData::Bit(Some(true))).unwrap(),
            RowValues::Bool(true)
        );
        assert!(column_value(ColumnData::I64(None)).unwrap().is_null());
    }

    #[test]
    fn request_exposes_its_sql() {
        let req = Request::Batch {
            sql: "SELECT 1".into(),
        };
        assert_eq!(req.sql(), "SELECT 1");
    }
}
