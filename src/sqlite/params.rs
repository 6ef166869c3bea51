use rusqlite::types::Value;

use crate::types::RowValues;

/// Convert a single `RowValues` to a rusqlite `Value`.
///
/// Timestamps are stored as `YYYY-MM-DD HH:MM:SS[.fff]` text, booleans as 0/1, JSON as text.
#[must_use]
pub(super) fn to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Owned parameters that can cross into the blocking pool.
pub(super) fn convert(params: &[RowValues]) -> Vec<Value> {
    params.iter().map(to_sqlite_value).collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn converts_every_variant() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let values = convert(&[
            RowValues::Bool(true),
            RowValues::Timestamp(ts),
            RowValues::JSON(serde_json::json!({"a": 1})),
            RowValues::Null,
        ]);
        assert_eq!(values[0], Value::Integer(1));
        assert_eq!(values[1], Value::Text("2024-01-02 03:04:05".into()));
        assert_eq!(values[2], Value::Text(r#"{"a":1}"#.into()));
        assert_eq!(values[3], Value::Null);
    }
}
