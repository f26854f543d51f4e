//! Middleware for request tracing, request ids and CORS.

use std::time::Duration;

use axum::http::{header, HeaderName, Method, Request};
use tower_http::cors::{Any, CorsLayer};
use tracing::Span;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Configures CORS (Cross-Origin Resource Sharing).
/// Needed when the store front is served from another origin.
pub fn cors_policy(allow_any_origin: bool) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::LOCATION, REQUEST_ID_HEADER])
        .max_age(Duration::from_secs(3600));
    if allow_any_origin {
        cors.allow_origin(Any)
    } else {
        cors
    }
}

/// Span for one HTTP request, tagged with the id set by `SetRequestIdLayer`.
pub fn request_span<B>(request: &Request<B>) -> Span {
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http",
        method = %request.method(),
        uri = %request.uri(),
        request_id,
    )
}
