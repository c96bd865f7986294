use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::{AppState, models::UserId};

// GET /users/:user_id/notifications  (SSE)
pub async fn sse_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.hub.subscribe(user_id);
    tracing::debug!(user_id, "notification stream opened");

    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        let evt = match rx.recv().await {
            Ok(note) => Event::default()
                .event("notification")
                .json_data(&note)
                .unwrap_or_else(|_| Event::default().event("notification").data(note.text)),
            Err(RecvError::Lagged(n)) => Event::default().event("lagged").data(n.to_string()),
            Err(RecvError::Closed) => return None,
        };

        Some((Ok(evt), rx))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(20))
            .text("keep-alive"),
    )
}
