use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, models::UserId};

use super::unavailable;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

// GET /users/:user_id/history?limit=10
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(q): Query<HistoryQuery>,
) -> Response {
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let items = match state.store.list_interactions(user_id, limit).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(user_id, error = %e, "listing history failed");
            return unavailable();
        }
    };

    let items: Vec<_> = items
        .into_iter()
        .map(|i| {
            json!({
                "username": i.username,
                "request": i.request_text,
                "response": i.response_text,
                "created_at": i.created_at,
            })
        })
        .collect();

    (StatusCode::OK, Json(json!({ "history": items }))).into_response()
}
