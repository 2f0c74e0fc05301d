//! RFC3339 timestamp rewriting over raw JSON text.
//!
//! Typed messages carry timestamps as `{"seconds": N, "nanos": M}` objects,
//! while clients send human-friendly RFC3339 strings. Before decoding, the
//! request body is scanned once, left to right, for a named field; every
//! quoted RFC3339 value of that field is replaced by the structured form.
//!
//! This is not a JSON parser. It knows about key tokens, quotes, colons and
//! whitespace, nothing more:
//!
//! - a key occurrence whose value is not quote-delimited is left alone;
//! - a quote that is never closed ends the scan, leaving the rest alone;
//! - a quoted value that is not RFC3339 (including `""`) fails the whole
//!   call, and the caller keeps the original body untouched. Rewrites made
//!   earlier in the same call are discarded with it.

use std::borrow::Cow;

use memchr::memmem;

use crate::json_scan::{find_quote, skip_key_separator};
use crate::message::Timestamp;
use crate::util::{push_i64_decimal, push_u64_decimal};

/// Field that carries key creation times in key-bearing request bodies.
pub const CREATION_TIME_FIELD: &str = "creation_time";

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("invalid RFC3339 timestamp {value:?} for field '{field}' at byte {offset}: {source}")]
    InvalidTimestamp {
        field: String,
        value: String,
        offset: usize,
        #[source]
        source: time::error::Parse,
    },
    #[error("timestamp for field '{field}' at byte {offset} is not valid UTF-8")]
    NotUtf8 { field: String, offset: usize },
}

/// Rewrite every quoted RFC3339 value of `key` in `body`.
///
/// Returns the body borrowed as-is when nothing was rewritten, which covers
/// empty input, input without `key`, and occurrences that were skipped as
/// unquoted or unterminated.
///
/// # Errors
///
/// Returns [`RewriteError`] when a quoted value of `key` is not a valid
/// RFC3339 timestamp. `body` itself is never modified, so the caller still
/// holds the original text.
pub fn rewrite_timestamps<'a>(body: &'a [u8], key: &str) -> Result<Cow<'a, [u8]>, RewriteError> {
    if body.is_empty() || key.is_empty() {
        return Ok(Cow::Borrowed(body));
    }

    let finder = memmem::Finder::new(key.as_bytes());
    let mut out: Option<Vec<u8>> = None;
    let mut copied = 0;
    let mut cursor = 0;

    while let Some(offset) = finder.find(&body[cursor..]) {
        let key_start = cursor + offset;
        let key_end = key_start + key.len();
        let quoted_key = key_start > 0 && body[key_start - 1] == b'"';
        let open = skip_key_separator(body, key_end, quoted_key);
        if body.get(open) != Some(&b'"') {
            cursor = key_end;
            continue;
        }
        let Some(close) = find_quote(body, open + 1) else {
            // Unterminated value: nothing after it can be trusted.
            break;
        };

        let timestamp = parse_value(&body[open + 1..close], key, open)?;
        let buf = out.get_or_insert_with(|| Vec::with_capacity(body.len() + 32));
        buf.extend_from_slice(&body[copied..open]);
        push_timestamp_object(buf, timestamp);
        copied = close + 1;
        cursor = close + 1;
    }

    match out {
        Some(mut buf) => {
            buf.extend_from_slice(&body[copied..]);
            Ok(Cow::Owned(buf))
        }
        None => Ok(Cow::Borrowed(body)),
    }
}

/// Apply [`rewrite_timestamps`] for each field name in turn.
///
/// # Errors
///
/// Stops at the first field whose rewrite fails; no partial result escapes.
pub fn rewrite_timestamp_fields<'a>(
    body: &'a [u8],
    keys: &[&str],
) -> Result<Cow<'a, [u8]>, RewriteError> {
    let mut current = Cow::Borrowed(body);
    for key in keys {
        current = match current {
            Cow::Borrowed(bytes) => rewrite_timestamps(bytes, key)?,
            Cow::Owned(bytes) => {
                let rewritten = match rewrite_timestamps(&bytes, key)? {
                    Cow::Borrowed(_) => None,
                    Cow::Owned(rewritten) => Some(rewritten),
                };
                Cow::Owned(rewritten.unwrap_or(bytes))
            }
        };
    }
    Ok(current)
}

fn parse_value(raw: &[u8], key: &str, offset: usize) -> Result<Timestamp, RewriteError> {
    let text = std::str::from_utf8(raw).map_err(|_| RewriteError::NotUtf8 {
        field: key.to_string(),
        offset,
    })?;
    Timestamp::from_rfc3339(text).map_err(|source| RewriteError::InvalidTimestamp {
        field: key.to_string(),
        value: text.to_string(),
        offset,
        source,
    })
}

fn push_timestamp_object(out: &mut Vec<u8>, timestamp: Timestamp) {
    out.extend_from_slice(b"{\"seconds\": ");
    push_i64_decimal(out, timestamp.seconds);
    out.extend_from_slice(b", \"nanos\": ");
    push_u64_decimal(out, u64::try_from(timestamp.nanos).unwrap_or_default());
    out.push(b'}');
}
