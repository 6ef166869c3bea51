use std::borrow::Cow;

mod parsers;
mod scanner;

use parsers::ident_len;
use scanner::{Quoting, Scanner};

use crate::error::QueryError;
use crate::types::{BackendKind, RowValues};

/// Native placeholder syntax of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Anonymous `?` (SQLite, ODBC-style SQL Server).
    Question,
    /// PostgreSQL-style `$1`, `$2`, ...
    Dollar,
    /// Tiberius-style `@P1`, `@P2`, ...
    AtP,
}

impl PlaceholderStyle {
    /// Style the adapter translates to for a backend.
    #[must_use]
    pub fn for_backend(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Postgres => PlaceholderStyle::Dollar,
            BackendKind::Sqlite | BackendKind::Mssql | BackendKind::Disabled => {
                PlaceholderStyle::Question
            }
        }
    }
}

/// Translate a neutral `?` query into the placeholder syntax of `kind`.
///
/// `?` inside quoted literals, quoted identifiers, comments, and dollar-quoted bodies is left
/// alone. `[...]` counts as a quoted identifier on SQLite and SQL Server, and `` `...` `` on
/// SQLite:
/// ```rust
/// use sql_adapter::prelude::*;
///
/// let sql = translate("SELECT '?' FROM t WHERE a=?", BackendKind::Postgres);
/// assert_eq!(sql, "SELECT '?' FROM t WHERE a=$1");
/// ```
/// Input that already uses `$n` markers is not supported. Returns a borrowed `Cow` when no
/// changes are needed.
#[must_use]
pub fn translate(sql: &str, kind: BackendKind) -> Cow<'_, str> {
    rewrite_placeholders(sql, PlaceholderStyle::for_backend(kind))
}

/// Rewrite every live `?` in `sql` into `style`, numbering left to right from 1.
#[must_use]
pub fn rewrite_placeholders(sql: &str, style: PlaceholderStyle) -> Cow<'_, str> {
    let (prefix, quoting) = match style {
        PlaceholderStyle::Question => return Cow::Borrowed(sql),
        PlaceholderStyle::Dollar => ("$", Quoting::for_backend(BackendKind::Postgres)),
        PlaceholderStyle::AtP => ("@P", Quoting::for_backend(BackendKind::Mssql)),
    };

    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut ordinal = 0usize;

    for (idx, b) in Scanner::new(sql, quoting) {
        if b != b'?' {
            continue;
        }
        ordinal += 1;
        let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
        buf.push_str(&sql[copied..idx]);
        buf.push_str(prefix);
        buf.push_str(&ordinal.to_string());
        copied = idx + 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

/// Number of live `?` placeholders in a neutral query, as `kind` quotes it.
#[must_use]
pub fn count_placeholders(sql: &str, kind: BackendKind) -> usize {
    Scanner::new(sql, Quoting::for_backend(kind))
        .filter(|(_, b)| *b == b'?')
        .count()
}

/// Fail with `ParameterArityMismatch` unless `sql` has exactly `provided` placeholders.
///
/// # Errors
/// Returns [`QueryError::ParameterArityMismatch`] on a count mismatch.
pub fn check_arity(sql: &str, kind: BackendKind, provided: usize) -> Result<(), QueryError> {
    let expected = count_placeholders(sql, kind);
    if expected == provided {
        Ok(())
    } else {
        Err(QueryError::ParameterArityMismatch { expected, provided })
    }
}

/// Rewrite `:name` markers into neutral `?` and order the values by occurrence.
///
/// A name used twice binds its value twice. Postgres `::type` casts and anything inside
/// literals, `"..."` identifiers, or comments are left untouched. Mixing `:name` with bare `?`
/// is not supported. Use [`bind_named_for`] to also honour a backend's bracket or backtick
/// identifiers.
///
/// # Errors
/// Returns [`QueryError::MissingParameter`] when `sql` references a name absent from `named`.
pub fn bind_named(
    sql: &str,
    named: &[(&str, RowValues)],
) -> Result<(String, Vec<RowValues>), QueryError> {
    bind_named_with(sql, Quoting::ANSI, named)
}

/// [`bind_named`] with the identifier quoting of `kind`.
///
/// # Errors
/// Same as [`bind_named`].
pub fn bind_named_for(
    sql: &str,
    kind: BackendKind,
    named: &[(&str, RowValues)],
) -> Result<(String, Vec<RowValues>), QueryError> {
    bind_named_with(sql, Quoting::for_backend(kind), named)
}

fn bind_named_with(
    sql: &str,
    quoting: Quoting,
    named: &[(&str, RowValues)],
) -> Result<(String, Vec<RowValues>), QueryError> {
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut copied = 0;
    let mut scanner = Scanner::new(sql, quoting);
    let bytes = scanner.bytes();

    while let Some((idx, b)) = scanner.next() {
        if b != b':' {
            continue;
        }
        if bytes.get(idx + 1) == Some(&b':') {
            scanner.skip_to(idx + 2);
            continue;
        }
        let len = ident_len(bytes, idx + 1);
        if len == 0 {
            continue;
        }
        let name = &sql[idx + 1..idx + 1 + len];
        let value = named
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| QueryError::MissingParameter(name.to_owned()))?;
        out.push_str(&sql[copied..idx]);
        out.push('?');
        values.push(value);
        copied = idx + 1 + len;
        scanner.skip_to(copied);
    }

    out.push_str(&sql[copied..]);
    Ok((out, values))
}
