//! Byte-level helpers for the timestamp rewriter.
//!
//! Only enough lexical structure to walk from a field name to its value:
//! whitespace, the key's closing quote, the colon and string delimiters.

#[inline]
pub(crate) fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    let len = bytes.len();
    while i < len {
        match bytes[i] {
            b' ' | b'\n' | b'\r' | b'\t' => i += 1,
            _ => break,
        }
    }
    i
}

/// Advance from the end of a key token to where its value should start.
///
/// Accepts `"creation_time": `, `creation_time:` and `creation_time `. The
/// colon is optional. A `"` right after the key is the key's closing quote
/// only when `quoted_key` is set; for a bare key it opens the value.
#[inline]
pub(crate) fn skip_key_separator(bytes: &[u8], mut i: usize, quoted_key: bool) -> usize {
    if quoted_key && bytes.get(i) == Some(&b'"') {
        i += 1;
    }
    i = skip_ws(bytes, i);
    if bytes.get(i) == Some(&b':') {
        i += 1;
    }
    skip_ws(bytes, i)
}

/// Position of the next `"` at or after `start`.
#[inline]
pub(crate) fn find_quote(bytes: &[u8], start: usize) -> Option<usize> {
    let rest = bytes.get(start..)?;
    memchr::memchr(b'"', rest).map(|offset| start + offset)
}

/// Whether `bytes` holds nothing but JSON whitespace.
#[inline]
pub(crate) fn is_blank(bytes: &[u8]) -> bool {
    skip_ws(bytes, 0) == bytes.len()
}
