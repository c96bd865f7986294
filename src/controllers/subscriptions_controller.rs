use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    AppState,
    error::NotifyError,
    models::{Topic, UserId},
    services::notifier::Notifier,
};

use super::{json_error, unavailable};

// GET /users/:user_id/subscriptions
pub async fn get_subscriptions(State(state): State<AppState>, Path(user_id): Path<UserId>) -> Response {
    let subs = match state.store.list_user_subscriptions(user_id).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(user_id, error = %e, "listing subscriptions failed");
            return unavailable();
        }
    };

    // every topic is listed; never-toggled ones are off
    let items: Vec<_> = Topic::ALL
        .iter()
        .map(|&topic| {
            let active = subs.iter().any(|s| s.topic == topic && s.active);
            json!({ "topic": topic, "title": topic.title(), "active": active })
        })
        .collect();

    (StatusCode::OK, Json(json!({ "subscriptions": items }))).into_response()
}

// POST /users/:user_id/subscriptions/:topic
pub async fn post_toggle_subscription(
    State(state): State<AppState>,
    Path((user_id, topic)): Path<(UserId, String)>,
) -> Response {
    let topic: Topic = match topic.parse() {
        Ok(t) => t,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("{e}")),
    };

    let sub = match state.store.toggle_subscription(user_id, topic).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(user_id, topic = %topic, error = %e, "toggling subscription failed");
            return unavailable();
        }
    };

    tracing::info!(user_id, topic = %topic, active = sub.active, "subscription toggled");

    if sub.active {
        send_welcome(&state, user_id, topic).await;
    }

    (
        StatusCode::OK,
        Json(json!({ "topic": sub.topic, "active": sub.active })),
    )
        .into_response()
}

async fn send_welcome(state: &AppState, user_id: UserId, topic: Topic) {
    let text = match state.messages.welcome(topic) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, "could not render welcome message");
            return;
        }
    };

    match state.hub.send(user_id, text).await {
        Ok(()) => {}
        // nobody is listening yet; the first digest will reach them later
        Err(NotifyError::NoRecipient(_)) => {}
        Err(e) => tracing::warn!(user_id, error = %e, "welcome message failed"),
    }
}
