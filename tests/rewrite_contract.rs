use std::borrow::Cow;

use keyfront_rs::message::{Key, Timestamp};
use keyfront_rs::rewrite::{rewrite_timestamps, RewriteError, CREATION_TIME_FIELD};

const VALID_TS: &str = "2015-05-18T23:58:36.000Z";
const INVALID_TS: &str = "Mon May 18 23:58:36 UTC 2015";

fn structured() -> String {
    r#"{"seconds": 1431993516, "nanos": 0}"#.to_string()
}

/// Runs the rewriter the way the dispatch pipeline does: on error the caller
/// keeps the original body.
fn rewrite(input: &str) -> (String, Result<(), RewriteError>) {
    match rewrite_timestamps(input.as_bytes(), CREATION_TIME_FIELD) {
        Ok(out) => (String::from_utf8(out.into_owned()).expect("utf8"), Ok(())),
        Err(err) => (input.to_string(), Err(err)),
    }
}

#[test]
fn test_rewrite_contract_table() {
    let ts = structured();
    let cases: Vec<(String, String, bool)> = vec![
        // empty input
        (String::new(), String::new(), true),
        // basic
        (
            format!(r#""creation_time": "{VALID_TS}""#),
            format!(r#""creation_time": {ts}"#),
            true,
        ),
        (
            format!(r#"{{"creation_time": "{VALID_TS}"}}"#),
            format!(r#"{{"creation_time": {ts}}}"#),
            true,
        ),
        // nested
        (
            format!(r#"{{"signed_key":{{"key": {{"creation_time": "{VALID_TS}"}}}}}}"#),
            format!(r#"{{"signed_key":{{"key": {{"creation_time": {ts}}}}}}}"#),
            true,
        ),
        // nothing to change
        (
            "nothing to be changed here".to_string(),
            "nothing to be changed here".to_string(),
            true,
        ),
        // two occurrences
        (
            format!(r#""creation_time": "{VALID_TS}", "creation_time": "{VALID_TS}""#),
            format!(r#""creation_time": {ts}, "creation_time": {ts}"#),
            true,
        ),
        // invalid and empty timestamps
        (
            r#""creation_time": "invalid""#.to_string(),
            r#""creation_time": "invalid""#.to_string(),
            false,
        ),
        (
            format!(r#""creation_time": "{INVALID_TS}""#),
            format!(r#""creation_time": "{INVALID_TS}""#),
            false,
        ),
        (
            r#""creation_time": """#.to_string(),
            r#""creation_time": """#.to_string(),
            false,
        ),
        (
            r#""creation_time": "", "creation_time": """#.to_string(),
            r#""creation_time": "", "creation_time": """#.to_string(),
            false,
        ),
        // value missing its opening quote
        (
            r#""creation_time": invalid""#.to_string(),
            r#""creation_time": invalid""#.to_string(),
            true,
        ),
        // value missing its closing quote
        (
            r#""creation_time": "invalid"#.to_string(),
            r#""creation_time": "invalid"#.to_string(),
            true,
        ),
        // value missing both quotes
        (
            r#""creation_time": invalid"#.to_string(),
            r#""creation_time": invalid"#.to_string(),
            true,
        ),
        (
            format!(r#""creation_time": "{VALID_TS}"#),
            format!(r#""creation_time": "{VALID_TS}"#),
            true,
        ),
        // bare keys
        (
            r#"creation_time: "invalid""#.to_string(),
            r#"creation_time: "invalid""#.to_string(),
            false,
        ),
        (
            format!(r#"{{creation_time: "{VALID_TS}"}}"#),
            format!("{{creation_time: {ts}}}"),
            true,
        ),
        (
            format!(r#"{{"signed_key":{{"key": {{creation_time: "{VALID_TS}"}}}}}}"#),
            format!(r#"{{"signed_key":{{"key": {{creation_time: {ts}}}}}}}"#),
            true,
        ),
        (
            format!(r#"creation_time: "{VALID_TS}", "creation_time": "{VALID_TS}""#),
            format!(r#"creation_time: {ts}, "creation_time": {ts}"#),
            true,
        ),
        // bare key with the value quote right after it
        (
            format!(r#"creation_time"{VALID_TS}""#),
            format!("creation_time{ts}"),
            true,
        ),
        (
            r#"{creation_time"soon"}"#.to_string(),
            r#"{creation_time"soon"}"#.to_string(),
            false,
        ),
        // unquoted timestamp followed by more fields
        (
            format!(r#"{{"signed_key":{{"key": {{"creation_time": {VALID_TS}, app_id: "gmail"}}}}}}"#),
            format!(r#"{{"signed_key":{{"key": {{"creation_time": {VALID_TS}, app_id: "gmail"}}}}}}"#),
            true,
        ),
    ];

    for (i, (input, want, want_ok)) in cases.iter().enumerate() {
        let (got, result) = rewrite(input);
        assert_eq!(result.is_ok(), *want_ok, "case {i}: {input:?} -> {result:?}");
        assert_eq!(&got, want, "case {i}: {input:?}");
    }
}

#[test]
fn test_failure_after_success_keeps_original_buffer() {
    let input = format!(r#"{{"a": {{"creation_time": "{VALID_TS}"}}, "b": {{"creation_time": "soon"}}}}"#);
    let (got, result) = rewrite(&input);
    assert!(matches!(
        result,
        Err(RewriteError::InvalidTimestamp { ref value, .. }) if value == "soon"
    ));
    assert_eq!(got, input);
}

#[test]
fn test_unchanged_input_is_borrowed() {
    let input = format!(r#"{{"creation_time": {VALID_TS}}}"#);
    let out = rewrite_timestamps(input.as_bytes(), CREATION_TIME_FIELD).expect("no error");
    assert!(matches!(out, Cow::Borrowed(_)));
}

#[test]
fn test_bytes_outside_values_are_preserved() {
    let input = format!(
        "  {{ \"x\" :\t[1,2],\n  \"creation_time\"\t:\n\"{VALID_TS}\" , \"y\": \"creation\" }}  "
    );
    let (got, result) = rewrite(&input);
    assert!(result.is_ok());
    let want = format!(
        "  {{ \"x\" :\t[1,2],\n  \"creation_time\"\t:\n{} , \"y\": \"creation\" }}  ",
        structured()
    );
    assert_eq!(got, want);
}

#[test]
fn test_non_utc_offset_and_fraction() {
    let (got, result) = rewrite(r#""creation_time": "2015-05-19T01:58:36.5+02:00""#);
    assert!(result.is_ok());
    assert_eq!(
        got,
        r#""creation_time": {"seconds": 1431993516, "nanos": 500000000}"#
    );
}

#[test]
fn test_rewritten_value_decodes_to_same_instant() {
    for input in [
        "2015-05-18T23:58:36.000Z",
        "2015-05-19T01:58:36.5+02:00",
        "1969-12-31T23:59:59.25Z",
        "2016-02-29T12:00:00.000000001-08:00",
    ] {
        let body = format!(r#"{{"app_id": "gmail", "creation_time": "{input}"}}"#);
        let out = rewrite_timestamps(body.as_bytes(), CREATION_TIME_FIELD).expect(input);
        let key: Key = serde_json::from_slice(&out).expect(input);
        let decoded = key.creation_time.expect("creation_time present");

        let rendered = decoded.to_rfc3339().expect("representable");
        assert_eq!(Timestamp::from_rfc3339(&rendered).expect(&rendered), decoded, "{input}");
        assert_eq!(Timestamp::from_rfc3339(input).expect(input), decoded, "{input}");
    }
}
