use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tower_governor::{governor::GovernorConfigBuilder, GovernorError, GovernorLayer};

/// Per-IP governor layer
pub type IpGovernorLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    Body,
>;

/// Whole API: 1000 requests per minute per IP (one token every 60ms)
pub fn create_global_governor() -> IpGovernorLayer {
    ip_governor(60, 1000)
}

/// Seat-changing booking calls: 60 requests per minute per IP
pub fn create_booking_governor() -> IpGovernorLayer {
    ip_governor(1000, 60)
}

fn ip_governor(per_ms: u64, burst: u32) -> IpGovernorLayer {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .finish()
            .expect("governor period and burst must be non-zero"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

/// Renders governor rejections in the same `{type, message}` shape as `AppError`
pub fn rate_limit_error_handler(err: GovernorError) -> Response<Body> {
    let (status, message) = match err {
        GovernorError::TooManyRequests { wait_time, .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            format!("Too many requests, retry in {} seconds", wait_time),
        ),
        GovernorError::UnableToExtractKey => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unable to identify client".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Rate limiter failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Request rejected".to_string())
        }
    };

    let body = json!({ "type": "rate_limited", "message": message });
    (status, Json(body)).into_response()
}

/// Logs each request with client IP, and rejected ones at warn
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(client_ip = %addr.ip(), %method, %uri, "Rate limited");
    } else if status.is_server_error() {
        tracing::error!(client_ip = %addr.ip(), %method, %uri, %status, "Request failed");
    } else if status.is_client_error() {
        tracing::warn!(client_ip = %addr.ip(), %method, %uri, %status, "Request rejected");
    } else {
        tracing::debug!(client_ip = %addr.ip(), %method, %uri, %status, "Request completed");
    }

    response
}
