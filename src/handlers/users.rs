// Account handlers: registration, login, logout, profile, self-delete

use crate::core::error::{AppError, StoreError};
use crate::core::routes::profile_path;
use crate::core::state::AppState;
use crate::models::forms::{LoginForm, RegisterForm};
use crate::security::session::CurrentSession;
use crate::services::accounts;
use crate::validation::forms::{validate, FieldErrors, LOGIN_FORM, REGISTER_FORM};
use crate::views::pages;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use std::sync::Arc;
use tracing::{info, instrument};

pub const DUPLICATE_USERNAME_MESSAGE: &str = "Username already taken.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username/password.";
pub const USER_ADDED_FLASH: &str = "User Added";

/// GET /register
pub async fn register_form_handler(session: CurrentSession) -> Result<Response, AppError> {
    if let Some(username) = session.username() {
        return Ok(Redirect::to(&profile_path(username)).into_response());
    }

    let flashes = session.take_flashes().await?;
    Ok(pages::register_page(&RegisterForm::default(), &FieldErrors::new(), &flashes).into_response())
}

/// POST /register
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn register_submit_handler(
    State(state): State<Arc<AppState>>,
    mut session: CurrentSession,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if let Some(username) = session.username() {
        return Ok(Redirect::to(&profile_path(username)).into_response());
    }

    if let Err(errors) = validate(&REGISTER_FORM, &form) {
        let flashes = session.take_flashes().await?;
        return Ok(pages::register_page(&form, &errors, &flashes).into_response());
    }

    let user = match accounts::register(&state, form.clone()).await {
        Ok(user) => user,
        Err(AppError::Store(StoreError::DuplicateUsername(_))) => {
            let errors = FieldErrors::single("username", DUPLICATE_USERNAME_MESSAGE);
            let flashes = session.take_flashes().await?;
            return Ok(pages::register_page(&form, &errors, &flashes).into_response());
        }
        Err(e) => return Err(e),
    };

    session.log_in(&user.username).await?;
    session.push_flash(USER_ADDED_FLASH).await?;

    Ok(Redirect::to("/login").into_response())
}

/// GET /login
pub async fn login_form_handler(session: CurrentSession) -> Result<Response, AppError> {
    if let Some(username) = session.username() {
        return Ok(Redirect::to(&profile_path(username)).into_response());
    }

    let flashes = session.take_flashes().await?;
    Ok(pages::login_page(&LoginForm::default(), &FieldErrors::new(), &flashes).into_response())
}

/// POST /login
///
/// Unknown usernames and wrong passwords produce the same error on the
/// same field.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login_submit_handler(
    State(state): State<Arc<AppState>>,
    mut session: CurrentSession,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Some(username) = session.username() {
        return Ok(Redirect::to(&profile_path(username)).into_response());
    }

    if let Err(errors) = validate(&LOGIN_FORM, &form) {
        let flashes = session.take_flashes().await?;
        return Ok(pages::login_page(&form, &errors, &flashes).into_response());
    }

    let Some(user) = accounts::authenticate(&state, &form.username, &form.password).await? else {
        info!("Login rejected");
        let errors = FieldErrors::single("username", INVALID_CREDENTIALS_MESSAGE);
        let flashes = session.take_flashes().await?;
        return Ok(pages::login_page(&form, &errors, &flashes).into_response());
    };

    session.log_in(&user.username).await?;

    info!("User logged in");
    Ok(Redirect::to(&profile_path(&user.username)).into_response())
}

/// GET /logout
pub async fn logout_handler(mut session: CurrentSession) -> Result<Redirect, AppError> {
    if let Some(username) = session.log_out().await? {
        info!(username = %username, "User logged out");
    }

    Ok(Redirect::to("/"))
}

/// GET /users/{username}
#[instrument(skip(state, session))]
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    session.require_owner(&username)?;

    let user = state
        .db
        .get_user(&username)
        .ok_or_else(|| AppError::NotFound(format!("user {}", username)))?;
    let feedback = state.db.feedback_for_user(&user.username);
    let flashes = session.take_flashes().await?;

    Ok(pages::profile_page(&user, &feedback, &flashes).into_response())
}

/// GET /users/{username}/delete
///
/// Removes the account and its feedback, then logs the user out of every
/// session they hold.
#[instrument(skip(state, session))]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    mut session: CurrentSession,
    Path(username): Path<String>,
) -> Result<Redirect, AppError> {
    session.require_owner(&username)?;

    let feedback_removed = state.db.delete_user(&username)?;
    session.log_out().await?;
    let sessions_revoked = state.sessions.revoke_identity(&username);

    info!(
        feedback_removed = feedback_removed,
        sessions_revoked = sessions_revoked,
        "User deleted"
    );

    Ok(Redirect::to("/login"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::routes::build_router;
    use crate::core::test_support::{
        body_string, get_request, location, post_form, register_user, session_cookie_from,
        test_state,
    };
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[cfg(target_os = "linux")]
    use crate::core::test_support::failing_wal_state;

    fn registration(username: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            password: "secret123".to_string(),
            email: format!("{}@example.com", username),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_creates_user_and_session() {
        let state = test_state();
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(post_form("/register", &registration("alice"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/login"));
        let cookie = session_cookie_from(&response).unwrap();
        assert_eq!(state.db.user_count(), 1);

        // Already logged in: /login skips straight to the profile
        let response = app
            .clone()
            .oneshot(get_request("/login", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(location(&response), Some("/users/alice"));

        let response = app
            .oneshot(get_request("/users/alice", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("User Added"));
        assert!(body.contains("alice@example.com"));
    }

    #[tokio::test]
    async fn test_register_duplicate_username_is_field_error() {
        let state = test_state();
        let app = build_router(state.clone());
        register_user(&app, "alice").await;

        let response = app
            .oneshot(post_form("/register", &registration("alice"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie_from(&response).is_none());
        let body = body_string(response).await;
        assert!(body.contains(DUPLICATE_USERNAME_MESSAGE));
        assert_eq!(state.db.user_count(), 1);
    }

    #[tokio::test]
    async fn test_register_invalid_form_rerenders() {
        let state = test_state();
        let app = build_router(state.clone());

        let mut form = registration("alice");
        form.email = "not-an-email".to_string();
        form.password = "short".to_string();

        let response = app
            .oneshot(post_form("/register", &form, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("Invalid email address."));
        assert!(body.contains("Field must be between 6 and 15 characters long."));
        assert_eq!(state.db.user_count(), 0);
    }

    #[tokio::test]
    async fn test_login_success_and_failure() {
        let state = test_state();
        let app = build_router(state.clone());
        register_user(&app, "alice").await;

        let wrong = LoginForm {
            username: "alice".to_string(),
            password: "wrongpass".to_string(),
        };
        let response = app
            .clone()
            .oneshot(post_form("/login", &wrong, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(session_cookie_from(&response).is_none());
        assert!(body_string(response).await.contains(INVALID_CREDENTIALS_MESSAGE));

        let unknown = LoginForm {
            username: "nobody".to_string(),
            password: "secret123".to_string(),
        };
        let response = app
            .clone()
            .oneshot(post_form("/login", &unknown, None))
            .await
            .unwrap();
        assert!(body_string(response).await.contains(INVALID_CREDENTIALS_MESSAGE));

        let right = LoginForm {
            username: "alice".to_string(),
            password: "secret123".to_string(),
        };
        let response = app.clone().oneshot(post_form("/login", &right, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/users/alice"));

        let cookie = session_cookie_from(&response).unwrap();
        let response = app
            .oneshot(get_request("/users/alice", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_rotates_session_id() {
        let state = test_state();
        let app = build_router(state.clone());
        let first = register_user(&app, "alice").await;

        app.clone()
            .oneshot(get_request("/logout", Some(&first)))
            .await
            .unwrap();

        let form = LoginForm {
            username: "alice".to_string(),
            password: "secret123".to_string(),
        };
        let response = app
            .clone()
            .oneshot(post_form("/login", &form, Some(&first)))
            .await
            .unwrap();
        let second = session_cookie_from(&response).unwrap();
        assert_ne!(first, second);

        let response = app
            .clone()
            .oneshot(get_request("/users/alice", Some(&first)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(get_request("/users/alice", Some(&second)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_clears_identity() {
        let state = test_state();
        let app = build_router(state.clone());
        let cookie = register_user(&app, "alice").await;

        let response = app
            .clone()
            .oneshot(get_request("/logout", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(location(&response), Some("/"));

        let response = app
            .clone()
            .oneshot(get_request("/users/alice", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Logging out twice is harmless
        let response = app.oneshot(get_request("/logout", None)).await.unwrap();
        assert_eq!(location(&response), Some("/"));
    }

    #[tokio::test]
    async fn test_profile_requires_owner() {
        let state = test_state();
        let app = build_router(state.clone());
        register_user(&app, "alice").await;
        let bob = register_user(&app, "bob").await;

        let response = app
            .clone()
            .oneshot(get_request("/users/alice", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(get_request("/users/alice", Some(&bob)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!body_string(response).await.contains("alice@example.com"));
    }

    #[tokio::test]
    async fn test_delete_user_cascades_and_logs_out() {
        let state = test_state();
        let app = build_router(state.clone());
        let alice = register_user(&app, "alice").await;
        register_user(&app, "bob").await;

        state
            .db
            .create_feedback("alice", "One".to_string(), "first".to_string())
            .unwrap();
        state
            .db
            .create_feedback("alice", "Two".to_string(), "second".to_string())
            .unwrap();
        state
            .db
            .create_feedback("bob", "Three".to_string(), "third".to_string())
            .unwrap();

        let response = app
            .clone()
            .oneshot(get_request("/users/alice/delete", Some(&alice)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/login"));

        assert!(!state.db.user_exists("alice"));
        assert!(state.db.feedback_for_user("alice").is_empty());
        assert_eq!(state.db.feedback_count(), 1);

        let response = app
            .oneshot(get_request("/users/alice", Some(&alice)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_delete_other_user_is_unauthorized() {
        let state = test_state();
        let app = build_router(state.clone());
        register_user(&app, "alice").await;
        let bob = register_user(&app, "bob").await;

        let response = app
            .oneshot(get_request("/users/alice/delete", Some(&bob)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.db.user_exists("alice"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_register_with_failing_wal_is_server_error() {
        let state = failing_wal_state();
        let app = build_router(state.clone());

        let response = app
            .oneshot(post_form("/register", &registration("alice"), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(session_cookie_from(&response).is_none());
        assert_eq!(state.db.user_count(), 0);
    }
}
