use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::{alerts_controller, history_controller}};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/users/:user_id/alerts", get(alerts_controller::get_alerts))
        .route("/users/:user_id/alerts/:id/delete", post(alerts_controller::post_delete_alert))
        .route("/users/:user_id/history", get(history_controller::get_history))
}
