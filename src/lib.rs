pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/chat", post(handlers::chat::send_message))
        .route("/api/chat/:id", get(handlers::chat::get_conversation))
        .route("/api/chat/:id/reset", post(handlers::chat::reset_conversation))
        .route("/api/admin/events", get(handlers::admin::list_events))
        .route(
            "/api/admin/events/:id/cancel",
            post(handlers::admin::cancel_event),
        )
        .route("/calendar/:event_id", get(handlers::calendar::download_ics))
        .with_state(state)
}
