use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub mod alerts_controller;
pub mod bot_controller;
pub mod history_controller;
pub mod home_controller;
pub mod realtime_controller;
pub mod subscriptions_controller;

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Store failures never leak details to the client.
fn unavailable() -> Response {
    json_error(
        StatusCode::SERVICE_UNAVAILABLE,
        crate::services::conversation::DATA_UNAVAILABLE,
    )
}
