use axum::response::{IntoResponse, Response};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;

use crate::backend::{Code, ServiceError};
use crate::message::ResponseMessage;
use crate::rewrite::RewriteError;

/// Error type for everything that can end a request before or during
/// handler dispatch.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid value {value:?} for parameter '{name}': {reason}")]
    InvalidParam {
        name: String,
        value: String,
        reason: &'static str,
    },
    #[error("missing path variable '{0}'")]
    MissingPathVar(String),
    #[error("{0}")]
    Timestamp(#[from] RewriteError),
    #[error("invalid request body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request body too large (max {limit} bytes)")]
    BodyTooLarge { limit: usize },
    #[error("failed to read request body: {0}")]
    BodyRead(String),
    #[error("no route for {path}")]
    NotFound { path: String },
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },
    #[error("{}", .0.message)]
    Service(#[from] ServiceError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Broad error category for status code selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidArgument,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    MethodNotAllowed,
    Conflict,
    PayloadTooLarge,
    Unimplemented,
    Unavailable,
    ServerError,
}

/// Map a backend status code to an error category.
#[must_use]
pub fn category_from_service_code(code: Code) -> ErrorCategory {
    match code {
        Code::InvalidArgument | Code::FailedPrecondition => ErrorCategory::InvalidArgument,
        Code::Unauthenticated => ErrorCategory::Unauthenticated,
        Code::PermissionDenied => ErrorCategory::PermissionDenied,
        Code::NotFound => ErrorCategory::NotFound,
        Code::AlreadyExists => ErrorCategory::Conflict,
        Code::Unimplemented => ErrorCategory::Unimplemented,
        Code::Unavailable => ErrorCategory::Unavailable,
        Code::Internal => ErrorCategory::ServerError,
    }
}

impl ApiError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::InvalidParam { .. }
            | ApiError::MissingPathVar(_)
            | ApiError::Timestamp(_)
            | ApiError::Decode(_)
            | ApiError::BodyRead(_) => ErrorCategory::InvalidArgument,
            ApiError::BodyTooLarge { .. } => ErrorCategory::PayloadTooLarge,
            ApiError::NotFound { .. } => ErrorCategory::NotFound,
            ApiError::MethodNotAllowed { .. } => ErrorCategory::MethodNotAllowed,
            ApiError::Service(err) => category_from_service_code(err.code),
            ApiError::Internal(_) => ErrorCategory::ServerError,
        }
    }

    /// Status text for the error payload. Backend errors keep their own code.
    #[must_use]
    pub fn status_name(&self) -> &'static str {
        match self {
            ApiError::Service(err) => err.code.as_str(),
            other => status_name_for_category(other.category()),
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        http_status_for_category(self.category())
    }
}

// ---------------------------------------------------------------------------
// Category -> HTTP status code
// ---------------------------------------------------------------------------

fn http_status_for_category(cat: ErrorCategory) -> StatusCode {
    match cat {
        ErrorCategory::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCategory::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorCategory::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        ErrorCategory::Conflict => StatusCode::CONFLICT,
        ErrorCategory::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCategory::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        ErrorCategory::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCategory::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn status_name_for_category(cat: ErrorCategory) -> &'static str {
    match cat {
        ErrorCategory::InvalidArgument => "INVALID_ARGUMENT",
        ErrorCategory::Unauthenticated => "UNAUTHENTICATED",
        ErrorCategory::PermissionDenied => "PERMISSION_DENIED",
        ErrorCategory::NotFound => "NOT_FOUND",
        ErrorCategory::MethodNotAllowed => "METHOD_NOT_ALLOWED",
        ErrorCategory::Conflict => "ALREADY_EXISTS",
        ErrorCategory::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
        ErrorCategory::Unimplemented => "UNIMPLEMENTED",
        ErrorCategory::Unavailable => "UNAVAILABLE",
        ErrorCategory::ServerError => "INTERNAL",
    }
}

/// Format an error, returning (`status_code`, JSON body).
#[must_use]
pub fn format_error(err: &ApiError) -> (StatusCode, serde_json::Value) {
    let status = err.status_code();
    let body = serde_json::json!({
        "error": {
            "code": status.as_u16(),
            "message": err.to_string(),
            "status": err.status_name(),
        }
    });
    (status, body)
}

// ---------------------------------------------------------------------------
// Axum integration
// ---------------------------------------------------------------------------

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = format_error(&self);
        (status, axum::Json(body)).into_response()
    }
}

/// Serialize a handler reply into a success response.
///
/// JSON replies are `application/json`; [`crate::message::HttpBody`] replies
/// are served verbatim with their own content type.
///
/// # Errors
///
/// Returns [`ApiError::Internal`] when serialization fails or the reply
/// carries an unusable content type.
pub fn success_response(reply: ResponseMessage) -> Result<Response, ApiError> {
    let json = match reply {
        ResponseMessage::HkpLookup(http_body) => {
            let content_type = HeaderValue::from_str(&http_body.content_type).map_err(|_| {
                ApiError::Internal(format!(
                    "invalid content type {:?}",
                    http_body.content_type
                ))
            })?;
            let mut response = http_body.body.into_response();
            response.headers_mut().insert(CONTENT_TYPE, content_type);
            return Ok(response);
        }
        ResponseMessage::GetEntry(resp) => serde_json::to_vec(&resp),
        ResponseMessage::ListEntryHistory(resp) => serde_json::to_vec(&resp),
        ResponseMessage::UpdateEntry(resp) => serde_json::to_vec(&resp),
        ResponseMessage::ListSeh(resp) => serde_json::to_vec(&resp),
        ResponseMessage::ListUpdate(resp) => serde_json::to_vec(&resp),
        ResponseMessage::ListSteps(resp) => serde_json::to_vec(&resp),
        ResponseMessage::SignedKey(resp) => serde_json::to_vec(&resp),
    }
    .map_err(|err| ApiError::Internal(format!("failed to encode response: {err}")))?;

    let mut response = json.into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}
