use std::time::Instant;

use http::{Method, StatusCode};
use tracing_subscriber::EnvFilter;

use crate::backend::RequestContext;
use crate::config::LogFormat;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (TRACE, DEBUG, INFO, WARN, ERROR)
pub fn init_tracing(log_level: &str, format: LogFormat) {
    let level = log_level.to_uppercase();

    if level == "DISABLED" {
        return;
    }

    let filter = EnvFilter::try_new(tracing_level(&level)).unwrap_or_else(|_| EnvFilter::new("INFO"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn tracing_level(level: &str) -> &str {
    match level {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    }
}

/// Log the outcome of a dispatched request.
pub fn log_request_complete(
    method: &Method,
    path: &str,
    status: StatusCode,
    rpc: Option<&str>,
    ctx: &RequestContext,
    start_time: Instant,
) {
    let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;
    let rpc = rpc.unwrap_or("-");
    if status.is_server_error() {
        tracing::warn!(
            request_id = %ctx.request_id,
            %method,
            path,
            rpc,
            status = status.as_u16(),
            elapsed_ms,
            "request failed"
        );
    } else {
        tracing::info!(
            request_id = %ctx.request_id,
            %method,
            path,
            rpc,
            status = status.as_u16(),
            elapsed_ms,
            "request complete"
        );
    }
}
