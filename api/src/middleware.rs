//! Request/response logging and metrics middleware.
//!
//! Wraps every route: buffers the request body for logging before handing
//! it on, buffers the handler's response body and re-emits it unchanged,
//! then records latency and the success/failure counters. A panicking
//! handler is caught here and treated as an interceptor fault.

use crate::state::AppState;
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use std::any::Any;
use std::borrow::Cow;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use thiserror::Error;

/// Appended to a logged body cut at the logging limit.
pub const TRUNCATED_MARKER: &str = "…(truncated)";

/// Label under which interceptor faults are counted.
pub const FAULT_STATUS_LABEL: &str = "500";

#[derive(Debug, Error)]
enum InterceptError {
    #[error("Failed to buffer request body: {0}")]
    RequestBody(#[source] axum::Error),

    #[error("Failed to buffer response body: {0}")]
    ResponseBody(#[source] axum::Error),

    #[error("Request handler panicked: {0}")]
    HandlerPanicked(String),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Cuts `text` to at most `max_bytes` bytes on a character boundary,
/// appending [`TRUNCATED_MARKER`] when anything was removed.
#[must_use]
pub fn preview(text: &str, max_bytes: usize) -> Cow<'_, str> {
    if text.len() <= max_bytes {
        return Cow::Borrowed(text);
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}{TRUNCATED_MARKER}", &text[..end]))
}

/// Formats a response body for the log: compact JSON when it parses,
/// otherwise the lossily decoded text.
fn response_log_text(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => value.to_string(),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

async fn exchange(state: &AppState, request: Request, next: Next) -> Result<Response, InterceptError> {
    let limits = state.body_limits();
    let logger = state.logger();

    let (parts, body) = request.into_parts();
    let body_bytes = to_bytes(body, limits.max_body_bytes)
        .await
        .map_err(InterceptError::RequestBody)?;
    // Undecodable bodies are logged as empty; the handler still gets the bytes.
    let body_text = std::str::from_utf8(&body_bytes).unwrap_or("");
    logger.info(format!(
        "REQUEST: {} {} BODY: {}",
        parts.method,
        parts.uri,
        preview(body_text, limits.max_logged_body_bytes)
    ));

    let response = AssertUnwindSafe(next.run(Request::from_parts(parts, Body::from(body_bytes))))
        .catch_unwind()
        .await
        .map_err(|payload| InterceptError::HandlerPanicked(panic_message(&*payload)))?;

    let (parts, body) = response.into_parts();
    let response_bytes = to_bytes(body, limits.max_body_bytes)
        .await
        .map_err(InterceptError::ResponseBody)?;
    let response_text = response_log_text(&response_bytes);
    logger.info(format!(
        "RESPONSE: status_code={} body={}",
        parts.status.as_u16(),
        preview(&response_text, limits.max_logged_body_bytes)
    ));

    Ok(Response::from_parts(parts, Body::from(response_bytes)))
}

/// Logs each request and response and updates the request metrics.
///
/// Every request increments `total_requests` once and exactly one of the
/// success or failure counters. A fault while buffering, or a panic in the
/// handler, is logged, counted under [`FAULT_STATUS_LABEL`] and answered
/// with a bare 500.
pub async fn log_requests_and_metrics(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let metrics = state.metrics();
    metrics.record_request();
    let start = Instant::now();

    match exchange(&state, request, next).await {
        Ok(response) => {
            metrics.observe_latency(start.elapsed());
            let status = response.status();
            if status.as_u16() >= 400 {
                metrics.record_failure(status.as_str());
            } else {
                metrics.record_success();
            }
            response
        }
        Err(e) => {
            state
                .logger()
                .error(format!("Unhandled middleware error:\n{e:?}"));
            metrics.record_failure(FAULT_STATUS_LABEL);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_keeps_short_text() {
        assert_eq!(preview("hello", 5), "hello");
        assert!(matches!(preview("hello", 10), Cow::Borrowed(_)));
    }

    #[test]
    fn test_preview_truncates_long_text() {
        assert_eq!(preview("hello world", 5), format!("hello{TRUNCATED_MARKER}"));
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        // 'é' is two bytes; a 2-byte cut would split it.
        assert_eq!(preview("aé", 2), format!("a{TRUNCATED_MARKER}"));
    }

    #[test]
    fn test_panic_message() {
        let from_str: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*from_str), "boom");

        let from_string: Box<dyn Any + Send> = Box::new(String::from("index out of bounds"));
        assert_eq!(panic_message(&*from_string), "index out of bounds");

        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*other), "non-string panic payload");
    }

    #[test]
    fn test_response_log_text() {
        assert_eq!(
            response_log_text(br#"{ "prediction" : 1.5 }"#),
            r#"{"prediction":1.5}"#
        );
        assert_eq!(response_log_text(b"plain text"), "plain text");
        assert_eq!(response_log_text(&[0x66, 0xff]), "f\u{fffd}");
    }
}
