//! Merge-decoding of JSON request bodies into parameter-populated messages.
//!
//! Body fields overwrite what parameter binding set; nested objects merge
//! field by field; fields the body does not mention keep their value.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::json_scan::is_blank;
use crate::message::RequestMessage;

/// Merge the JSON object in `body` into `target`.
///
/// A blank body or a top-level `null` leaves `target` untouched.
///
/// # Errors
///
/// Returns the `serde_json` error when `body` is not JSON or does not fit
/// the shape of `T`. `target` is only replaced on success.
pub fn merge_json_body<T>(target: &mut T, body: &[u8]) -> Result<(), serde_json::Error>
where
    T: Serialize + DeserializeOwned,
{
    if is_blank(body) {
        return Ok(());
    }
    let patch: Value = serde_json::from_slice(body)?;
    if patch.is_null() {
        return Ok(());
    }

    let mut merged = serde_json::to_value(&*target)?;
    merge_value(&mut merged, patch);
    *target = serde_json::from_value(merged)?;
    Ok(())
}

fn merge_value(base: &mut Value, patch: Value) {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, patch) => *base = patch,
    }
}

impl RequestMessage {
    /// Merge a (rewritten) JSON body into whichever message this is.
    ///
    /// # Errors
    ///
    /// See [`merge_json_body`].
    pub fn merge_body(&mut self, body: &[u8]) -> Result<(), serde_json::Error> {
        match self {
            RequestMessage::GetEntry(msg) => merge_json_body(msg, body),
            RequestMessage::HkpLookup(msg) => merge_json_body(msg, body),
            RequestMessage::ListEntryHistory(msg) => merge_json_body(msg, body),
            RequestMessage::UpdateEntry(msg) => merge_json_body(msg, body),
            RequestMessage::ListSeh(msg) => merge_json_body(msg, body),
            RequestMessage::ListUpdate(msg) => merge_json_body(msg, body),
            RequestMessage::ListSteps(msg) => merge_json_body(msg, body),
            RequestMessage::CreateKey(msg) => merge_json_body(msg, body),
            RequestMessage::UpdateKey(msg) => merge_json_body(msg, body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Key, SignedKey, Timestamp, UpdateEntryRequest};

    fn populated() -> UpdateEntryRequest {
        UpdateEntryRequest {
            user_id: "alice".to_string(),
            signed_key: None,
        }
    }

    #[test]
    fn test_blank_and_null_bodies_are_no_ops() {
        for body in [&b""[..], &b"  \n"[..], &b"null"[..]] {
            let mut msg = populated();
            merge_json_body(&mut msg, body).unwrap();
            assert_eq!(msg, populated());
        }
    }

    #[test]
    fn test_body_fields_merge_over_params() {
        let mut msg = populated();
        let body = br#"{"signed_key": {"key": {"app_id": "gmail", "creation_time": {"seconds": 1431993516, "nanos": 0}}, "signature": "c2ln"}}"#;
        merge_json_body(&mut msg, body).unwrap();
        assert_eq!(msg.user_id, "alice");
        assert_eq!(
            msg.signed_key,
            Some(SignedKey {
                key: Some(Key {
                    app_id: "gmail".to_string(),
                    creation_time: Some(Timestamp {
                        seconds: 1_431_993_516,
                        nanos: 0,
                    }),
                    ..Key::default()
                }),
                signature: "c2ln".to_string(),
            })
        );
    }

    #[test]
    fn test_body_may_override_param_field() {
        let mut msg = populated();
        merge_json_body(&mut msg, br#"{"user_id": "bob"}"#).unwrap();
        assert_eq!(msg.user_id, "bob");
    }

    #[test]
    fn test_unconverted_timestamp_string_fails_decode() {
        let mut msg = populated();
        let body = br#"{"signed_key": {"key": {"creation_time": "2015-05-18T23:58:36.000Z"}}}"#;
        assert!(merge_json_body(&mut msg, body).is_err());
        assert_eq!(msg, populated());
    }

    #[test]
    fn test_malformed_json_is_error() {
        let mut msg = populated();
        assert!(merge_json_body(&mut msg, b"{\"user_id\": ").is_err());
        assert!(merge_json_body(&mut msg, b"[1, 2]").is_err());
    }

    #[test]
    fn test_request_message_merge_body() {
        let mut msg = RequestMessage::UpdateEntry(populated());
        msg.merge_body(br#"{"signed_key": {"signature": "x"}}"#).unwrap();
        let RequestMessage::UpdateEntry(inner) = msg else {
            panic!("variant changed");
        };
        assert_eq!(inner.signed_key.unwrap().signature, "x");
    }
}
