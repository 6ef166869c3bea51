use std::collections::HashMap;
use std::sync::Arc;

use super::row::{Row, index_columns};
use crate::types::RowValues;

/// Rows returned by `fetch_all`, in the order the backend produced them.
///
/// Iterating consumes the set.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    rows: Vec<Row>,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl Rows {
    /// Start an empty result with the statement's column names.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>, capacity: usize) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            rows: Vec::with_capacity(capacity),
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    /// Append one row of values, sharing this set's column metadata.
    pub fn push(&mut self, values: Vec<RowValues>) {
        self.rows.push(Row::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            values,
        ));
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Borrowing iterator; the owning iterator comes from `IntoIterator`.
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Take the first row, dropping the rest.
    #[must_use]
    pub fn into_first(self) -> Option<Row> {
        self.rows.into_iter().next()
    }
}

impl IntoIterator for Rows {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Rows {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_metadata() {
        let mut rows = Rows::with_columns(vec!["id".into(), "name".into()], 2);
        rows.push(vec![RowValues::Int(1), RowValues::Text("a".into())]);
        rows.push(vec![RowValues::Int(2), RowValues::Text("b".into())]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows.column_names(), ["id", "name"]);
        let names: Vec<String> = rows
            .into_iter()
            .filter_map(|row| row.get("name").and_then(RowValues::as_text).map(str::to_owned))
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn into_first_on_empty() {
        let rows = Rows::with_columns(vec!["id".into()], 0);
        assert!(rows.is_empty());
        assert!(rows.into_first().is_none());
    }
}
