pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

use crate::api::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports", post(handlers::generate_report))
        .route("/reports/latest", get(handlers::latest_report))
        .route("/metrics", get(handlers::get_metrics))
        .route("/session", get(handlers::get_session))
}
