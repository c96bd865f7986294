use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    AppState,
    models::{Alert, UserId},
    services::store::parse_alert_id,
};

use super::{json_error, unavailable};

fn alert_json(a: &Alert) -> serde_json::Value {
    json!({
        "id": a.id.to_hex(),
        "symbol": a.symbol,
        "target_price": a.target_price,
        "direction": a.direction,
        "active": a.active,
        "created_at": a.created_at,
    })
}

// GET /users/:user_id/alerts
pub async fn get_alerts(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Response {
    let alerts = match state.store.list_active_alerts_for_user(user_id).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(user_id, error = %e, "listing alerts failed");
            return unavailable();
        }
    };

    let items: Vec<_> = alerts.iter().map(alert_json).collect();
    (StatusCode::OK, Json(json!({ "alerts": items }))).into_response()
}

// POST /users/:user_id/alerts/:id/delete
pub async fn post_delete_alert(
    State(state): State<AppState>,
    Path((user_id, id)): Path<(UserId, String)>,
) -> Response {
    let oid = match parse_alert_id(&id) {
        Ok(x) => x,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.store.delete_alert(oid, user_id).await {
        Ok(true) => {
            tracing::info!(user_id, alert_id = %oid, "alert deleted");
            (StatusCode::OK, Json(json!({ "deleted": true }))).into_response()
        }
        // missing and foreign alerts look the same
        Ok(false) => json_error(StatusCode::NOT_FOUND, "alert not found"),
        Err(e) => {
            tracing::error!(user_id, alert_id = %oid, error = %e, "deleting alert failed");
            unavailable()
        }
    }
}
