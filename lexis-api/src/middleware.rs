//! Request correlation middleware.
//!
//! Every request runs inside a span carrying its flow context id, URL and
//! client address. The id comes from the caller's `flow_context` header when
//! present, otherwise a fresh UUID v4, and is echoed back in the
//! `flowContextId` response header.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{info_span, Instrument};
use uuid::Uuid;

/// Request header a caller uses to propagate its flow context.
pub const FLOW_CONTEXT: HeaderName = HeaderName::from_static("flow_context");

/// Response header carrying the flow context id.
pub const FLOW_CONTEXT_ID: HeaderName = HeaderName::from_static("flowcontextid");

/// The caller's flow context id, or a new one.
fn flow_context_id(request: &Request) -> String {
    request
        .headers()
        .get(&FLOW_CONTEXT)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// `x-forwarded-for` as sent, else the peer address if the server recorded it.
fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        return forwarded.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn flow_context(request: Request, next: Next) -> Response {
    let flow_id = flow_context_id(&request);
    let span = info_span!(
        "request",
        flow_context_id = %flow_id,
        method = %request.method(),
        url = %request.uri(),
        client_ip = %client_ip(&request),
    );

    let mut response = next.run(request).instrument(span).await;
    // Caller-supplied ids that are not valid header values are not echoed.
    if let Ok(value) = HeaderValue::from_str(&flow_id) {
        response.headers_mut().insert(FLOW_CONTEXT_ID, value);
    }
    response
}
