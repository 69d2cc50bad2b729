use axum::response::Redirect;

/// GET /
pub async fn home_handler() -> Redirect {
    Redirect::to("/register")
}
