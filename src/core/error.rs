// Centralized error handling

use crate::views::pages;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Constraint and durability failures raised by the store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Username already taken: {0}")]
    DuplicateUsername(String),

    #[error("User not found: {0}")]
    UnknownUser(String),

    #[error("Feedback not found: {0}")]
    FeedbackNotFound(u64),

    #[error("Feedback id already in use: {0}")]
    DuplicateFeedbackId(u64),

    #[error("Feedback id out of range: {0}")]
    FeedbackIdOutOfRange(u64),

    #[error("Failed to write to WAL: {0}")]
    Wal(anyhow::Error),
}

/// Terminal request failures. Form validation problems are not errors; the
/// handlers re-render the form instead.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),

    #[error("Session store failed: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::DuplicateUsername(_)) => StatusCode::CONFLICT,
            AppError::Store(StoreError::UnknownUser(_)) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::FeedbackNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::DuplicateFeedbackId(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(StoreError::FeedbackIdOutOfRange(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(StoreError::Wal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Password(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client
    fn public_message(&self) -> &'static str {
        match self.status() {
            StatusCode::UNAUTHORIZED => {
                "You are not authorized to view this page. Please log in as the right user."
            }
            StatusCode::NOT_FOUND => "The requested page could not be found.",
            StatusCode::CONFLICT => "That resource already exists.",
            _ => "Something went wrong on our side. Please try again later.",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        (status, pages::error_page(status, self.public_message())).into_response()
    }
}
