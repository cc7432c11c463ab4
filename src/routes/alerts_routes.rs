use axum::{Router, routing::{get, put}};
use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/owners/:owner/alerts",
            get(alerts_controller::get_alerts)
                .post(alerts_controller::post_alerts)
                .delete(alerts_controller::delete_alerts),
        )
        .route(
            "/api/owners/:owner/alerts/:symbol",
            put(alerts_controller::put_alert).delete(alerts_controller::delete_alert),
        )
        .route("/api/quotes", get(alerts_controller::get_quotes))
        .route("/api/quotes/:symbol", get(alerts_controller::get_quote))
}
