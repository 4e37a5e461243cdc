pub mod chat;
pub mod middleware;
pub mod reports;
mod routes;


use axum::Json;
use axum::Router;
use hyper::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::chat::client::ChatClient;
use crate::config::Config;
use crate::report::webhook::WebhookClient;
use crate::session::Session;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub webhook_client: Arc<dyn WebhookClient>,
    pub chat_client: Arc<dyn ChatClient>,
    /// The one interactive session this process serves. Every handler takes
    /// it with `try_lock` and keeps it for its whole round trip, so actions
    /// never overlap.
    pub session: Arc<Mutex<Session>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        webhook_client: Arc<dyn WebhookClient>,
        chat_client: Arc<dyn ChatClient>,
    ) -> Self {
        Self {
            config,
            webhook_client,
            chat_client,
            session: Arc::new(Mutex::new(Session::new())),
        }
    }

    /// Take the session, or answer 409 if another action holds it.
    pub(crate) fn claim_session(&self) -> Result<MutexGuard<'_, Session>, (StatusCode, Json<Value>)> {
        self.session.try_lock().map_err(|_| {
            tracing::warn!("rejecting request: another action is in progress");
            (
                StatusCode::CONFLICT,
                Json(json!({ "error": "another action is in progress" })),
            )
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    routes::build_router(state)
}
