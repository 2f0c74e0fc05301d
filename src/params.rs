//! Path and query parameter binding.
//!
//! Query parameters are optional: an absent parameter leaves the field at
//! its zero value. Present values must parse, including an empty one, or
//! the request is rejected before any handler runs.

use crate::error::ApiError;
use crate::message::{
    CreateKeyRequest, GetEntryRequest, HkpLookupRequest, ListEntryHistoryRequest, ListSehRequest,
    ListStepsRequest, ListUpdateRequest, RequestMessage, UpdateEntryRequest, UpdateKeyRequest,
};
use crate::routing::template::RouteMatch;

/// Required path variable `name`.
///
/// # Errors
///
/// Returns [`ApiError::MissingPathVar`] when the matched template does not
/// declare `name`.
pub fn path_var(m: &RouteMatch<'_>, name: &str) -> Result<String, ApiError> {
    m.var(name)
        .map(str::to_string)
        .ok_or_else(|| ApiError::MissingPathVar(name.to_string()))
}

/// Optional string query parameter; `""` when absent.
#[must_use]
pub fn query_string(m: &RouteMatch<'_>, name: &str) -> String {
    m.query(name).map(|value| value.into_owned()).unwrap_or_default()
}

/// Optional unsigned query parameter; `0` when absent.
///
/// # Errors
///
/// Returns [`ApiError::InvalidParam`] unless the value is all ASCII digits
/// and fits in a `u64`. Signs are rejected.
pub fn query_u64(m: &RouteMatch<'_>, name: &str) -> Result<u64, ApiError> {
    match m.query(name) {
        Some(value) => parse_u64(name, &value),
        None => Ok(0),
    }
}

/// Optional page size; `0` when absent.
///
/// # Errors
///
/// Returns [`ApiError::InvalidParam`] when the value is not a non-negative
/// integer no larger than `i32::MAX`.
pub fn query_page_size(m: &RouteMatch<'_>, name: &str) -> Result<i32, ApiError> {
    let Some(value) = m.query(name) else {
        return Ok(0);
    };
    let n = parse_u64(name, &value)?;
    i32::try_from(n).map_err(|_| invalid(name, &value, "page size out of range"))
}

fn parse_u64(name: &str, value: &str) -> Result<u64, ApiError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(name, value, "expected an unsigned integer"));
    }
    value
        .parse()
        .map_err(|_| invalid(name, value, "integer out of range"))
}

fn invalid(name: &str, value: &str, reason: &'static str) -> ApiError {
    ApiError::InvalidParam {
        name: name.to_string(),
        value: value.to_string(),
        reason,
    }
}

/// Populate a request message from a route match.
pub trait BindParams {
    /// # Errors
    ///
    /// Returns [`ApiError`] when a required path variable is missing or a
    /// present query parameter is malformed.
    fn bind_params(&mut self, m: &RouteMatch<'_>) -> Result<(), ApiError>;
}

impl BindParams for GetEntryRequest {
    fn bind_params(&mut self, m: &RouteMatch<'_>) -> Result<(), ApiError> {
        self.user_id = path_var(m, "user_id")?;
        self.app_id = query_string(m, "app_id");
        self.epoch = query_u64(m, "epoch")?;
        Ok(())
    }
}

impl BindParams for HkpLookupRequest {
    fn bind_params(&mut self, m: &RouteMatch<'_>) -> Result<(), ApiError> {
        self.op = query_string(m, "op");
        self.search = query_string(m, "search");
        self.options = query_string(m, "options");
        Ok(())
    }
}

impl BindParams for ListEntryHistoryRequest {
    fn bind_params(&mut self, m: &RouteMatch<'_>) -> Result<(), ApiError> {
        self.user_id = path_var(m, "user_id")?;
        self.start_epoch = query_u64(m, "start_epoch")?;
        self.page_size = query_page_size(m, "page_size")?;
        Ok(())
    }
}

impl BindParams for UpdateEntryRequest {
    fn bind_params(&mut self, m: &RouteMatch<'_>) -> Result<(), ApiError> {
        self.user_id = path_var(m, "user_id")?;
        Ok(())
    }
}

impl BindParams for ListSehRequest {
    fn bind_params(&mut self, m: &RouteMatch<'_>) -> Result<(), ApiError> {
        self.start_epoch = query_u64(m, "start_epoch")?;
        self.page_size = query_page_size(m, "page_size")?;
        Ok(())
    }
}

impl BindParams for ListUpdateRequest {
    fn bind_params(&mut self, m: &RouteMatch<'_>) -> Result<(), ApiError> {
        self.start_commitment_timestamp = query_u64(m, "start_commitment_timestamp")?;
        self.page_size = query_page_size(m, "page_size")?;
        Ok(())
    }
}

impl BindParams for ListStepsRequest {
    fn bind_params(&mut self, m: &RouteMatch<'_>) -> Result<(), ApiError> {
        self.start_commitment_timestamp = query_u64(m, "start_commitment_timestamp")?;
        self.page_size = query_page_size(m, "page_size")?;
        Ok(())
    }
}

impl BindParams for CreateKeyRequest {
    fn bind_params(&mut self, m: &RouteMatch<'_>) -> Result<(), ApiError> {
        self.user_id = path_var(m, "user_id")?;
        Ok(())
    }
}

impl BindParams for UpdateKeyRequest {
    fn bind_params(&mut self, m: &RouteMatch<'_>) -> Result<(), ApiError> {
        self.user_id = path_var(m, "user_id")?;
        self.key_id = path_var(m, "key_id")?;
        Ok(())
    }
}

impl RequestMessage {
    /// Path variables this message's binder reads from its template.
    #[must_use]
    pub fn required_path_vars(&self) -> &'static [&'static str] {
        match self {
            RequestMessage::GetEntry(_)
            | RequestMessage::ListEntryHistory(_)
            | RequestMessage::UpdateEntry(_)
            | RequestMessage::CreateKey(_) => &["user_id"],
            RequestMessage::UpdateKey(_) => &["user_id", "key_id"],
            RequestMessage::HkpLookup(_)
            | RequestMessage::ListSeh(_)
            | RequestMessage::ListUpdate(_)
            | RequestMessage::ListSteps(_) => &[],
        }
    }
}

impl BindParams for RequestMessage {
    fn bind_params(&mut self, m: &RouteMatch<'_>) -> Result<(), ApiError> {
        match self {
            RequestMessage::GetEntry(msg) => msg.bind_params(m),
            RequestMessage::HkpLookup(msg) => msg.bind_params(m),
            RequestMessage::ListEntryHistory(msg) => msg.bind_params(m),
            RequestMessage::UpdateEntry(msg) => msg.bind_params(m),
            RequestMessage::ListSeh(msg) => msg.bind_params(m),
            RequestMessage::ListUpdate(msg) => msg.bind_params(m),
            RequestMessage::ListSteps(msg) => msg.bind_params(m),
            RequestMessage::CreateKey(msg) => msg.bind_params(m),
            RequestMessage::UpdateKey(msg) => msg.bind_params(m),
        }
    }
}
