pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

use crate::api::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/chat",
            get(handlers::get_transcript).delete(handlers::clear_transcript),
        )
        .route("/chat/ask", post(handlers::ask))
        .route("/chat/suggested", get(handlers::list_suggested))
        .route("/chat/suggested/{prompt}", post(handlers::ask_suggested))
}
