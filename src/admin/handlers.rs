use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::{GatewaySettings, SettingsUpdate};
use crate::http::server::AppState;
use crate::observability::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct SaveStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

pub async fn get_settings(State(state): State<AppState>) -> Json<GatewaySettings> {
    let settings = state.pipeline.settings().snapshot();
    Json(GatewaySettings::clone(&settings))
}

/// Partial update; omitted fields keep their value.
pub async fn post_settings(State(state): State<AppState>, body: Bytes) -> Response {
    let applied = SettingsUpdate::from_json(&body).and_then(|u| state.pipeline.settings().apply(u));

    match applied {
        Ok(_) => Json(SaveStatus {
            status: "saved",
            detail: None,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Settings update rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(SaveStatus {
                    status: "rejected",
                    detail: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.pipeline.metrics().snapshot())
}
