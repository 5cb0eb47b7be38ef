//! Liveness and extractor availability checks.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::api::types::{ApiContext, ExtractorCheckResponse, HealthResponse};

/// `GET /health`
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
    })
}

/// `GET /check-extractor`: runs the interpreter's `--version` under the
/// extraction timeout.
pub async fn check_extractor(
    State(ctx): State<ApiContext>,
) -> (StatusCode, Json<ExtractorCheckResponse>) {
    let Some(probe) = ctx.probe.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ExtractorCheckResponse {
                success: false,
                version: None,
                error: Some("Extractor cannot be probed".into()),
            }),
        );
    };

    match probe.probe(ctx.processor.timeout()).await {
        Ok(version) => (
            StatusCode::OK,
            Json(ExtractorCheckResponse {
                success: true,
                version: Some(version),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Extractor probe failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExtractorCheckResponse {
                    success: false,
                    version: None,
                    error: Some(e.public_message()),
                }),
            )
        }
    }
}
