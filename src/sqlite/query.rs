use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use crate::results::Rows;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
fn extract_value(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<RowValues> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Run a row-returning statement, stopping after `limit` rows when given.
pub(super) fn fetch_rows(
    conn: &Connection,
    sql: &str,
    params: &[Value],
    limit: Option<usize>,
) -> rusqlite::Result<Rows> {
    let mut stmt = conn.prepare_cached(sql)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut rows = Rows::with_columns(column_names, limit.unwrap_or(16));
    let mut cursor = stmt.query(params_from_iter(params.iter()))?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(col_count);
        for idx in 0..col_count {
            values.push(extract_value(row, idx)?);
        }
        rows.push(values);
        if limit.is_some_and(|max| rows.len() >= max) {
            break;
        }
    }
    Ok(rows)
}

/// Run a statement for its side effects and report affected rows.
///
/// Statements that return rows (`INSERT ... RETURNING`, a stray `SELECT`) are stepped to
/// completion so the write actually happens.
pub(super) fn execute(conn: &Connection, sql: &str, params: &[Value]) -> rusqlite::Result<u64> {
    let mut stmt = conn.prepare_cached(sql)?;
    if stmt.column_count() == 0 {
        let affected = stmt.execute(params_from_iter(params.iter()))?;
        return Ok(affected as u64);
    }

    let readonly = stmt.readonly();
    let mut cursor = stmt.query(params_from_iter(params.iter()))?;
    while cursor.next()?.is_some() {}
    drop(cursor);
    Ok(if readonly { 0 } else { conn.changes() })
}
