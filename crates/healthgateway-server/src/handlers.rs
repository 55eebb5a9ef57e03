use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use healthgateway_core::CommunicationType;
use serde::Serialize;
use serde_json::json;

use crate::communication::CommunicationError;
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::render_metrics(),
    )
}

/// `GET /v1/api/Communication/{type}`: the active communication of a type.
///
/// Storage failures are reported inside the result body, not by status.
pub async fn get_communication(
    State(state): State<AppState>,
    Path(communication_type): Path<String>,
) -> Result<Response, CommunicationError> {
    let communication_type: CommunicationType = communication_type.parse()?;
    let result = state
        .communications
        .get_active_banner(communication_type)
        .await?;
    Ok((StatusCode::OK, Json(result)).into_response())
}

/// `DELETE /v1/api/Communication/cache`: drop every cached communication.
pub async fn clear_communication_cache(State(state): State<AppState>) -> StatusCode {
    state.communications.clear_cache().await;
    StatusCode::NO_CONTENT
}

/// Every service error is a bad request; storage failures arrive as a
/// failed result body instead.
impl IntoResponse for CommunicationError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}
