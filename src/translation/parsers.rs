pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

pub(super) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// `E'...'` / `e'...'` string with backslash escapes (Postgres). The prefix must not be the
/// tail of a longer identifier.
pub(super) fn is_escape_string_start(bytes: &[u8], quote_idx: usize) -> bool {
    if quote_idx == 0 || !matches!(bytes[quote_idx - 1], b'E' | b'e') {
        return false;
    }
    quote_idx < 2 || !is_ident_byte(bytes[quote_idx - 2])
}

/// Recognise `$tag$` at `start`; returns the tag and the index of its closing `$`. A `$` that
/// continues an identifier (`foo$bar$`) never opens a quote.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    if start > 0 && (is_ident_byte(bytes[start - 1]) || bytes[start - 1] == b'$') {
        return None;
    }
    let mut idx = start + 1;
    if bytes.get(idx).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    while idx < bytes.len() && bytes[idx] != b'$' {
        if !is_ident_byte(bytes[idx]) {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx) == Some(&b'$')
        && bytes.get(idx + 1..end) == Some(tag.as_bytes())
        && bytes.get(end) == Some(&b'$')
}

/// Length of the identifier starting at `start` (0 when none).
pub(super) fn ident_len(bytes: &[u8], start: usize) -> usize {
    match bytes.get(start) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => bytes[start..]
            .iter()
            .take_while(|b| is_ident_byte(**b))
            .count(),
        _ => 0,
    }
}
