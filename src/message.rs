//! Typed request and response messages served by the REST front end.
//!
//! Every request message is decoded in two passes: path/query parameters
//! first, then the JSON body (see [`crate::decode`]). All fields default to
//! their zero value so that either pass may leave them unset.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A point in time as whole seconds since the Unix epoch plus a
/// non-negative nanosecond remainder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(default)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    /// Parse an RFC3339 string such as `2015-05-18T23:58:36.000Z`.
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error when `text` is not RFC3339,
    /// including when it is empty.
    pub fn from_rfc3339(text: &str) -> Result<Self, time::error::Parse> {
        let parsed = OffsetDateTime::parse(text, &Rfc3339)?;
        Ok(Self {
            seconds: parsed.unix_timestamp(),
            // nanosecond() is always below 1e9
            nanos: i32::try_from(parsed.nanosecond()).unwrap_or_default(),
        })
    }

    /// Render as an RFC3339 string in UTC, if the instant is representable.
    #[must_use]
    pub fn to_rfc3339(&self) -> Option<String> {
        let nanos = i128::from(self.seconds) * 1_000_000_000 + i128::from(self.nanos);
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .ok()?
            .format(&Rfc3339)
            .ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Key {
    pub app_id: String,
    pub format: String,
    pub key: String,
    pub creation_time: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignedKey {
    pub key: Option<Key>,
    pub signature: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    pub user_id: String,
    pub keys: Vec<Key>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetEntryRequest {
    pub user_id: String,
    pub app_id: String,
    pub epoch: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HkpLookupRequest {
    pub op: String,
    pub search: String,
    pub options: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListEntryHistoryRequest {
    pub user_id: String,
    pub start_epoch: u64,
    pub page_size: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateEntryRequest {
    pub user_id: String,
    pub signed_key: Option<SignedKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListSehRequest {
    pub start_epoch: u64,
    pub page_size: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListUpdateRequest {
    pub start_commitment_timestamp: u64,
    pub page_size: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListStepsRequest {
    pub start_commitment_timestamp: u64,
    pub page_size: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateKeyRequest {
    pub user_id: String,
    pub signed_key: Option<SignedKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateKeyRequest {
    pub user_id: String,
    pub key_id: String,
    pub signed_key: Option<SignedKey>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetEntryResponse {
    pub epoch: u64,
    pub entry: Option<Entry>,
}

/// A non-JSON payload served verbatim with its own content type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBody {
    pub content_type: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListEntryHistoryResponse {
    pub values: Vec<GetEntryResponse>,
    pub next_epoch: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateEntryResponse {
    pub proof: Option<GetEntryResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignedEpochHead {
    pub epoch: u64,
    pub issue_time: Option<Timestamp>,
    pub root: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListSehResponse {
    pub heads: Vec<SignedEpochHead>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryUpdate {
    pub user_id: String,
    pub commitment_timestamp: u64,
    pub signed_key: Option<SignedKey>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListUpdateResponse {
    pub updates: Vec<EntryUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Step {
    pub epoch: u64,
    pub commitment_timestamp: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListStepsResponse {
    pub steps: Vec<Step>,
}

// ---------------------------------------------------------------------------
// Closed variant sets
// ---------------------------------------------------------------------------

/// Every request message a route binding can decode into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMessage {
    GetEntry(GetEntryRequest),
    HkpLookup(HkpLookupRequest),
    ListEntryHistory(ListEntryHistoryRequest),
    UpdateEntry(UpdateEntryRequest),
    ListSeh(ListSehRequest),
    ListUpdate(ListUpdateRequest),
    ListSteps(ListStepsRequest),
    CreateKey(CreateKeyRequest),
    UpdateKey(UpdateKeyRequest),
}

impl RequestMessage {
    /// Stable RPC-style name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RequestMessage::GetEntry(_) => "GetEntry",
            RequestMessage::HkpLookup(_) => "HkpLookup",
            RequestMessage::ListEntryHistory(_) => "ListEntryHistory",
            RequestMessage::UpdateEntry(_) => "UpdateEntry",
            RequestMessage::ListSeh(_) => "ListSEH",
            RequestMessage::ListUpdate(_) => "ListUpdate",
            RequestMessage::ListSteps(_) => "ListSteps",
            RequestMessage::CreateKey(_) => "CreateKey",
            RequestMessage::UpdateKey(_) => "UpdateKey",
        }
    }
}

/// Every reply a backend handler can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseMessage {
    GetEntry(GetEntryResponse),
    HkpLookup(HttpBody),
    ListEntryHistory(ListEntryHistoryResponse),
    UpdateEntry(UpdateEntryResponse),
    ListSeh(ListSehResponse),
    ListUpdate(ListUpdateResponse),
    ListSteps(ListStepsResponse),
    SignedKey(SignedKey),
}
