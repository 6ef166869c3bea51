use tiberius::Query;

use crate::types::RowValues;

/// Bind every value onto `query` in order (`@P1`, `@P2`, ...).
///
/// JSON travels as `NVARCHAR` text; NULL is bound as a typed NULL string.
pub(super) fn bind_all<'a>(query: &mut Query<'a>, params: &'a [RowValues]) {
    for value in params {
        match value {
            RowValues::Int(i) => query.bind(*i),
            RowValues::Float(f) => query.bind(*f),
            RowValues::Text(s) => query.bind(s.as_str()),
            RowValues::Bool(b) => query.bind(*b),
            RowValues::Timestamp(dt) => query.bind(*dt),
            RowValues::Null => query.bind(Option::<&str>::None),
            RowValues::JSON(v) => query.bind(v.to_string()),
            RowValues::Blob(bytes) => query.bind(bytes.as_slice()),
        }
    }
}
