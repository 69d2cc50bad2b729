// Shared fixtures for unit tests

use crate::core::config::{
    AuthConfig, Config, LoggingConfig, ServerConfig, SessionConfig, StorageConfig,
};
use crate::core::state::AppState;
use crate::models::forms::RegisterForm;
use crate::stores::database::Database;
#[cfg(target_os = "linux")]
use crate::wal::wal::Wal;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use http_body_util::BodyExt;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

pub fn create_test_config() -> Config {
    Config {
        server: ServerConfig {
            port: Some(5000),
            unix_socket: None,
            num_threads: 2,
        },
        storage: StorageConfig {
            wal_path: PathBuf::from("test.wal"),
        },
        session: SessionConfig {
            cookie_name: "session".to_string(),
            ttl: 3600,
            cleanup_interval: 60,
            secure_cookie: false,
        },
        auth: AuthConfig {
            // bcrypt's minimum, keeps tests fast
            bcrypt_cost: 4,
            owner_check_on_feedback_delete: false,
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            format: "json".to_string(),
            console: false,
        },
    }
}

pub fn test_state_with(config: Config) -> Arc<AppState> {
    Arc::new(AppState::new(config, Database::in_memory()).unwrap())
}

pub fn test_state() -> Arc<AppState> {
    test_state_with(create_test_config())
}

/// State whose WAL rejects every write (writes to /dev/full fail with ENOSPC)
#[cfg(target_os = "linux")]
pub fn failing_wal_state() -> Arc<AppState> {
    let wal = Wal::new("/dev/full".into()).unwrap();
    Arc::new(AppState::new(create_test_config(), Database::new(wal)).unwrap())
}

// Request helpers for driving the full router with `tower::ServiceExt::oneshot`

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form<T: Serialize>(uri: &str, form: &T, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let body = serde_urlencoded::to_string(form).unwrap();
    builder.body(Body::from(body)).unwrap()
}

/// `name=value` pair from the response's `Set-Cookie`, ready to send back
pub fn session_cookie_from(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|pair| pair.trim().to_string())
}

pub fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Register `username` with password `secret123` and return its session cookie
pub async fn register_user(app: &Router, username: &str) -> String {
    let form = RegisterForm {
        username: username.to_string(),
        password: "secret123".to_string(),
        email: format!("{}@example.com", username),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
    };

    let response = app
        .clone()
        .oneshot(post_form("/register", &form, None))
        .await
        .unwrap();
    session_cookie_from(&response).unwrap()
}
