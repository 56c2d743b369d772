use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};

/// Allows the configured frontend origin, or any origin when it cannot be parsed.
pub fn frontend_cors(frontend_url: &str) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let origin = url::Url::parse(frontend_url)
        .ok()
        .map(|u| u.origin().ascii_serialization())
        .and_then(|o| HeaderValue::from_str(&o).ok());
    match origin {
        Some(origin) => base.allow_origin(origin),
        None => {
            tracing::warn!(frontend_url, "FRONTEND_URL has no usable origin, allowing any");
            base.allow_origin(Any)
        }
    }
}
