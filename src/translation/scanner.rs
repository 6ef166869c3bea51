use super::parsers::{
    is_block_comment_end, is_block_comment_start, is_escape_string_start, is_line_comment_start,
    matches_tag, try_start_dollar_quote,
};
use crate::types::BackendKind;

/// Identifier quotes beyond `"..."` that a dialect accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct Quoting {
    /// `[name]`, with `]]` as the escape (SQLite, SQL Server).
    brackets: bool,
    /// `` `name` ``, with a doubled backtick as the escape (SQLite).
    backticks: bool,
}

impl Quoting {
    /// Plain ANSI quoting. `[` stays live so Postgres array subscripts keep their markers.
    pub(super) const ANSI: Quoting = Quoting {
        brackets: false,
        backticks: false,
    };

    pub(super) fn for_backend(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Sqlite => Quoting {
                brackets: true,
                backticks: true,
            },
            BackendKind::Mssql => Quoting {
                brackets: true,
                backticks: false,
            },
            BackendKind::Postgres | BackendKind::Disabled => Quoting::ANSI,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuoted,
    EscapeQuoted,
    DoubleQuoted,
    BracketQuoted,
    BacktickQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Walks a SQL string and yields only the bytes that are live SQL: anything inside string
/// literals, quoted identifiers, comments, or dollar-quoted bodies is skipped.
pub(super) struct Scanner<'a> {
    bytes: &'a [u8],
    idx: usize,
    state: State,
    quoting: Quoting,
}

impl<'a> Scanner<'a> {
    pub(super) fn new(sql: &'a str, quoting: Quoting) -> Self {
        Self {
            bytes: sql.as_bytes(),
            idx: 0,
            state: State::Normal,
            quoting,
        }
    }

    pub(super) fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Resume scanning at `idx`, which must lie in live SQL.
    pub(super) fn skip_to(&mut self, idx: usize) {
        self.idx = idx;
    }
}

impl Iterator for Scanner<'_> {
    type Item = (usize, u8);

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.bytes;
        while self.idx < bytes.len() {
            let at = self.idx;
            let b = bytes[at];
            match self.state {
                State::Normal => {
                    if b == b'\'' {
                        self.state = if is_escape_string_start(bytes, at) {
                            State::EscapeQuoted
                        } else {
                            State::SingleQuoted
                        };
                        self.idx += 1;
                    } else if b == b'"' {
                        self.state = State::DoubleQuoted;
                        self.idx += 1;
                    } else if b == b'[' && self.quoting.brackets {
                        self.state = State::BracketQuoted;
                        self.idx += 1;
                    } else if b == b'`' && self.quoting.backticks {
                        self.state = State::BacktickQuoted;
                        self.idx += 1;
                    } else if is_line_comment_start(bytes, at) {
                        self.state = State::LineComment;
                        self.idx += 2;
                    } else if is_block_comment_start(bytes, at) {
                        self.state = State::BlockComment(1);
                        self.idx += 2;
                    } else if let Some((tag, close)) = (b == b'$')
                        .then(|| try_start_dollar_quote(bytes, at))
                        .flatten()
                    {
                        self.state = State::DollarQuoted(tag);
                        self.idx = close + 1;
                    } else {
                        self.idx += 1;
                        return Some((at, b));
                    }
                }
                State::SingleQuoted => {
                    if b == b'\'' {
                        if bytes.get(at + 1) == Some(&b'\'') {
                            self.idx += 1; // doubled quote
                        } else {
                            self.state = State::Normal;
                        }
                    }
                    self.idx += 1;
                }
                State::EscapeQuoted => {
                    if b == b'\\' {
                        self.idx += 1;
                    } else if b == b'\'' {
                        if bytes.get(at + 1) == Some(&b'\'') {
                            self.idx += 1;
                        } else {
                            self.state = State::Normal;
                        }
                    }
                    self.idx += 1;
                }
                State::DoubleQuoted => {
                    if b == b'"' {
                        if bytes.get(at + 1) == Some(&b'"') {
                            self.idx += 1;
                        } else {
                            self.state = State::Normal;
                        }
                    }
                    self.idx += 1;
                }
                State::BracketQuoted => {
                    if b == b']' {
                        if bytes.get(at + 1) == Some(&b']') {
                            self.idx += 1;
                        } else {
                            self.state = State::Normal;
                        }
                    }
                    self.idx += 1;
                }
                State::BacktickQuoted => {
                    if b == b'`' {
                        if bytes.get(at + 1) == Some(&b'`') {
                            self.idx += 1;
                        } else {
                            self.state = State::Normal;
                        }
                    }
                    self.idx += 1;
                }
                State::LineComment => {
                    if b == b'\n' {
                        self.state = State::Normal;
                    }
                    self.idx += 1;
                }
                State::BlockComment(depth) => {
                    if is_block_comment_start(bytes, at) {
                        self.state = State::BlockComment(depth + 1);
                        self.idx += 2;
                    } else if is_block_comment_end(bytes, at) {
                        self.state = if depth == 1 {
                            State::Normal
                        } else {
                            State::BlockComment(depth - 1)
                        };
                        self.idx += 2;
                    } else {
                        self.idx += 1;
                    }
                }
                State::DollarQuoted(ref tag) => {
                    if matches_tag(bytes, at, tag) {
                        self.idx += tag.len() + 2;
                        self.state = State::Normal;
                    } else {
                        self.idx += 1;
                    }
                }
            }
        }
        None
    }
}
