use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{
    AppState,
    models::{NewInteraction, UserId},
    services::conversation::{Action, Input, Reply},
};

use super::json_error;

#[derive(Deserialize)]
pub struct MessageBody {
    pub text: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Deserialize)]
pub struct ActionBody {
    pub action: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// Runs one turn of the user's dialog while holding their session.
async fn run_turn(state: &AppState, user_id: UserId, input: Input) -> Reply {
    let mut session = state.sessions.begin(user_id).await;
    let current = std::mem::take(&mut session.state);

    let step = state.conversation.handle(user_id, current, input).await;
    session.state = step.state;
    step.reply
}

async fn record(state: &AppState, user_id: UserId, username: Option<String>, request: String, reply: &Reply) {
    let interaction = NewInteraction {
        user_id,
        username,
        request_text: request,
        response_text: reply.text.clone(),
    };

    // history is best effort
    if let Err(e) = state.store.save_interaction(interaction).await {
        tracing::warn!(user_id, error = %e, "could not record interaction");
    }
}

// POST /bot/:user_id/message
pub async fn post_message(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(body): Json<MessageBody>,
) -> Response {
    let reply = run_turn(&state, user_id, Input::Text(body.text.clone())).await;
    record(&state, user_id, body.username, body.text, &reply).await;

    (StatusCode::OK, Json(reply)).into_response()
}

// POST /bot/:user_id/action
pub async fn post_action(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(body): Json<ActionBody>,
) -> Response {
    let action: Action = match body.action.parse() {
        Ok(a) => a,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, format!("{e}")),
    };

    let request = format!("[{}]", action.payload());
    let reply = run_turn(&state, user_id, Input::Action(action)).await;
    record(&state, user_id, body.username, request, &reply).await;

    (StatusCode::OK, Json(reply)).into_response()
}
