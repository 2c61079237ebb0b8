use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db;
use crate::error::{AppError, DomainError};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

/// Envelope plus the top-level `status` older clients read.
#[derive(Serialize)]
struct LegacyHealth {
    status: &'static str,
    #[serde(flatten)]
    envelope: ApiResponse<HealthStatus>,
}

impl IntoResponse for LegacyHealth {
    fn into_response(self) -> Response {
        (self.envelope.status(), Json(self)).into_response()
    }
}

/// `GET /api/v1/health` - process liveness only, always 200.
pub async fn health_v1() -> ApiResponse<HealthStatus> {
    ApiResponse::ok(HealthStatus { status: "ok" })
}

/// `GET /health` - legacy shape: a top-level `status` next to the envelope
/// keys. Probes the database; 503 when it is unreachable.
pub async fn health_legacy(State(state): State<AppState>) -> Response {
    match db::ping(&state.db).await {
        Ok(()) => LegacyHealth { status: "ok", envelope: ApiResponse::ok(HealthStatus { status: "ok" }) }
            .into_response(),
        Err(e) => {
            let err = AppError::from(DomainError::custom(
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                format!("Database unavailable: {:#}", e),
            ));
            let (envelope, report) = err.into_envelope();
            let mut response = LegacyHealth { status: "error", envelope }.into_response();
            response.extensions_mut().insert(report);
            response
        }
    }
}
