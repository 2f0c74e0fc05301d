use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::response::{IntoResponse, Response};

use crate::backend::RequestContext;
use crate::error::{success_response, ApiError};
use crate::observability::log_request_complete;
use crate::routing::RouteLookup;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Serve one raw HTTP request through the route table.
///
/// Pipeline: base-path strip, route lookup, body read, parameter binding,
/// timestamp rewrite, body decode, handler. The first failing stage ends
/// the request with its error response; the handler only runs when every
/// earlier stage succeeded.
///
/// # Errors
///
/// This function never returns `Err` and uses `Infallible`.
pub async fn dispatch_request(
    state: Arc<AppState>,
    base_path: Arc<str>,
    request: Request<Body>,
) -> Result<Response, Infallible> {
    let start = Instant::now();
    let ctx = state.request_context();
    let (parts, body) = request.into_parts();

    let mut rpc = None;
    let mut response = match serve(&state, &base_path, &parts, body, &ctx, &mut rpc).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(
                request_seq = ctx.request_seq,
                rpc = rpc.unwrap_or("-"),
                error = %err,
                "request rejected"
            );
            err.into_response()
        }
    };

    if let Ok(value) = HeaderValue::try_from(ctx.request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    log_request_complete(
        &parts.method,
        parts.uri.path(),
        response.status(),
        rpc,
        &ctx,
        start,
    );
    Ok(response)
}

async fn serve(
    state: &AppState,
    base_path: &str,
    parts: &Parts,
    body: Body,
    ctx: &RequestContext,
    rpc: &mut Option<&'static str>,
) -> Result<Response, ApiError> {
    let path = parts.uri.path();
    let not_found = || ApiError::NotFound {
        path: path.to_string(),
    };
    let route_path = strip_base_path(path, base_path).ok_or_else(not_found)?;

    let (binding, params) = match state.routes.lookup(&parts.method, route_path, parts.uri.query())
    {
        RouteLookup::Matched { binding, params } => (binding, params),
        RouteLookup::MethodNotAllowed => {
            return Err(ApiError::MethodNotAllowed {
                method: parts.method.to_string(),
                path: path.to_string(),
            });
        }
        RouteLookup::NotFound => return Err(not_found()),
    };
    *rpc = Some(binding.name());

    let body = read_request_body(body, state.config.server.max_body_bytes).await?;
    let message = binding.decode(&params, &body)?;
    let reply = binding.handle(state.backend.as_ref(), ctx, message).await?;
    success_response(reply)
}

#[must_use]
pub fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.trim_end_matches('/').to_string()
    } else {
        format!("/{}", trimmed.trim_end_matches('/'))
    }
}

async fn read_request_body(body: Body, limit: usize) -> Result<bytes::Bytes, ApiError> {
    use http_body_util::BodyExt as _;

    http_body_util::Limited::new(body, limit)
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|err| {
            if err.is::<http_body_util::LengthLimitError>() {
                ApiError::BodyTooLarge { limit }
            } else {
                ApiError::BodyRead(err.to_string())
            }
        })
}

/// Strip `base_path` from `path`, or `None` when `path` lies outside it.
#[must_use]
pub fn strip_base_path<'a>(path: &'a str, base_path: &str) -> Option<&'a str> {
    if base_path.is_empty() {
        return Some(path);
    }

    let remainder = path.strip_prefix(base_path)?;
    if remainder.is_empty() {
        Some("/")
    } else if remainder.starts_with('/') {
        Some(remainder)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path(""), "");
        assert_eq!(normalize_base_path(" / "), "");
        assert_eq!(normalize_base_path("api"), "/api");
        assert_eq!(normalize_base_path("/api/"), "/api");
    }

    #[test]
    fn test_strip_base_path() {
        assert_eq!(strip_base_path("/v2/seh", ""), Some("/v2/seh"));
        assert_eq!(strip_base_path("/kt/v2/seh", "/kt"), Some("/v2/seh"));
        assert_eq!(strip_base_path("/kt", "/kt"), Some("/"));
        assert_eq!(strip_base_path("/ktx/v2/seh", "/kt"), None);
        assert_eq!(strip_base_path("/v2/seh", "/kt"), None);
    }
}
