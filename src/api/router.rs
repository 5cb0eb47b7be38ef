//! HTTP router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//!
//! Layer stack (outermost → innermost):
//! 1. Access log → 2. CORS → 3. HTTP tracing → 4. Body limit → Handler

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::pipeline::upload::UploadPolicy;

/// Full-size files that fit in one request body.
const FILES_PER_REQUEST_BUDGET: u64 = 10;
/// Room for multipart framing and text fields.
const BODY_LIMIT_SLACK: u64 = 1024 * 1024;

pub fn api_router(ctx: ApiContext) -> Router {
    let body_limit = request_body_limit(&ctx.upload_policy);

    Router::new()
        .route(
            "/api/extract-aadhar",
            upload_route(post(endpoints::extract::extract)),
        )
        .route(
            "/api/extract-aadhar/batch",
            upload_route(post(endpoints::batch::extract_batch)),
        )
        .route(
            "/api/aadhar-pdf-verify",
            upload_route(post(endpoints::verify::verify_pdf)),
        )
        .route("/health", get(endpoints::health::check))
        .route("/check-extractor", get(endpoints::health::check_extractor))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(axum::middleware::from_fn(middleware::access_log::log_access))
}

fn upload_route(route: MethodRouter<ApiContext>) -> MethodRouter<ApiContext> {
    route
        .options(endpoints::preflight)
        .fallback(endpoints::method_not_allowed)
}

/// Any origin; uploads only need `Content-Type`.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn request_body_limit(policy: &UploadPolicy) -> usize {
    let limit = policy
        .max_file_bytes
        .saturating_mul(FILES_PER_REQUEST_BUDGET)
        .saturating_add(BODY_LIMIT_SLACK);
    usize::try_from(limit).unwrap_or(usize::MAX)
}
