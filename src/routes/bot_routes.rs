use axum::{Router, routing::post};
use crate::{AppState, controllers::bot_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/bot/:user_id/message", post(bot_controller::post_message))
        .route("/bot/:user_id/action", post(bot_controller::post_action))
}
