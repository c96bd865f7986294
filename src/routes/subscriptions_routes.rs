use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::subscriptions_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/users/:user_id/subscriptions", get(subscriptions_controller::get_subscriptions))
        .route(
            "/users/:user_id/subscriptions/:topic",
            post(subscriptions_controller::post_toggle_subscription),
        )
}
