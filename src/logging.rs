//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// The number of bytes of a body that are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

const REDACTED: &str = "********";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// The `Authorization` header is never logged.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(error) => {
            tracing::error!("Could not read request body: {error}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    log_request(&parts, &body);

    let response = next.run(Request::from_parts(parts, Body::from(body))).await;

    let (parts, body) = response.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    log_response(&parts, &body);

    Response::from_parts(parts, Body::from(body))
}

fn redact_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();

    if let Some(value) = headers.get_mut(AUTHORIZATION) {
        *value = HeaderValue::from_static(REDACTED);
    }

    headers
}

/// Split `body` into the text to log at `info` level and whether it was cut
/// short.
fn truncate_body(body: &Bytes) -> (String, bool) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        (
            String::from_utf8_lossy(&body[..LOG_BODY_LENGTH_LIMIT]).to_string(),
            true,
        )
    } else {
        (String::from_utf8_lossy(body).to_string(), false)
    }
}

fn log_request(parts: &axum::http::request::Parts, body: &Bytes) {
    let headers = redact_headers(&parts.headers);
    let method = &parts.method;
    let uri = &parts.uri;

    match truncate_body(body) {
        (text, true) => {
            tracing::info!("Received request: {method} {uri} {headers:#?}\nbody: {text}...");
            tracing::debug!("Full request body: {:?}", String::from_utf8_lossy(body));
        }
        (text, false) => {
            tracing::info!("Received request: {method} {uri} {headers:#?}\nbody: {text:?}");
        }
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &Bytes) {
    let headers = &parts.headers;
    let status = parts.status;

    match truncate_body(body) {
        (text, true) => {
            tracing::info!("Sending response: {status} {headers:#?}\nbody: {text}...");
            tracing::debug!("Full response body: {:?}", String::from_utf8_lossy(body));
        }
        (text, false) => {
            tracing::info!("Sending response: {status} {headers:#?}\nbody: {text:?}");
        }
    }
}
