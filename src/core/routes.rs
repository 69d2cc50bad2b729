// HTTP routes configuration

use crate::core::state::AppState;
use crate::handlers::{feedback, health, fallback, home, users};
use crate::stores::session_store::SessionTable;
use crate::utils::html::encode_path_segment;
use axum::{routing::get, Router};
use std::sync::Arc;
use time::Duration;
use tower_sessions::{cookie::SameSite, Expiry, SessionManagerLayer};

/// Session cookie settings; the id is rotated by the login handlers
fn session_layer(state: &AppState) -> SessionManagerLayer<SessionTable> {
    let config = &state.config.session;

    SessionManagerLayer::new(state.sessions.clone())
        .with_name(config.cookie_name.clone())
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(config.secure_cookie)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(config.ttl)))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let sessions = session_layer(&state);

    Router::new()
        .route("/", get(home::home_handler))
        .route(
            "/register",
            get(users::register_form_handler).post(users::register_submit_handler),
        )
        .route(
            "/login",
            get(users::login_form_handler).post(users::login_submit_handler),
        )
        .route("/logout", get(users::logout_handler))

        // Owner-only account pages
        .route("/users/{username}", get(users::profile_handler))
        .route("/users/{username}/delete", get(users::delete_user_handler))
        .route(
            "/users/{username}/feedback/add",
            get(feedback::add_form_handler).post(feedback::add_submit_handler),
        )

        // Feedback, authorized against the stored owner
        .route(
            "/feedback/{feedback_id}/update",
            get(feedback::update_form_handler).post(feedback::update_submit_handler),
        )
        .route("/feedback/{feedback_id}/delete", get(feedback::delete_handler))

        .route("/health", get(health::health_handler))

        // 404 fallback for all unmatched routes
        .fallback(fallback::fallback_handler)

        .layer(sessions)
        .with_state(state)
}

pub fn profile_path(username: &str) -> String {
    format!("/users/{}", encode_path_segment(username))
}

pub fn delete_user_path(username: &str) -> String {
    format!("/users/{}/delete", encode_path_segment(username))
}

pub fn add_feedback_path(username: &str) -> String {
    format!("/users/{}/feedback/add", encode_path_segment(username))
}

pub fn update_feedback_path(id: u64) -> String {
    format!("/feedback/{}/update", id)
}

pub fn delete_feedback_path(id: u64) -> String {
    format!("/feedback/{}/delete", id)
}
