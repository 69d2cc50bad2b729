// Feedback handlers
//
// Create is scoped to the path username. Update and delete resolve the
// owner from the stored row, never from the request.

use crate::core::error::AppError;
use crate::core::routes::profile_path;
use crate::core::state::AppState;
use crate::models::{feedback::Feedback, forms::FeedbackForm};
use crate::security::session::CurrentSession;
use crate::validation::forms::{validate, FieldErrors, FEEDBACK_FORM};
use crate::views::pages;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Ids that do not parse are treated like ids that do not exist
/// Ids are plain decimal digits; anything else (signs included) is 404
fn parse_feedback_id(raw: &str) -> Result<u64, AppError> {
    let not_found = || AppError::NotFound(format!("feedback {}", raw));

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(not_found());
    }
    raw.parse().map_err(|_| not_found())
}

fn load_feedback(state: &AppState, raw_id: &str) -> Result<Feedback, AppError> {
    let id = parse_feedback_id(raw_id)?;
    state
        .db
        .get_feedback(id)
        .ok_or_else(|| AppError::NotFound(format!("feedback {}", id)))
}

/// GET /users/{username}/feedback/add
pub async fn add_form_handler(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Path(username): Path<String>,
) -> Result<Response, AppError> {
    session.require_owner(&username)?;

    let flashes = session.take_flashes().await?;
    Ok(
        pages::add_feedback_page(&username, &FeedbackForm::default(), &FieldErrors::new(), &flashes)
            .into_response(),
    )
}

/// POST /users/{username}/feedback/add
#[instrument(skip(state, session, form))]
pub async fn add_submit_handler(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Path(username): Path<String>,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, AppError> {
    session.require_owner(&username)?;

    if let Err(errors) = validate(&FEEDBACK_FORM, &form) {
        let flashes = session.take_flashes().await?;
        return Ok(pages::add_feedback_page(&username, &form, &errors, &flashes).into_response());
    }

    let feedback = state
        .db
        .create_feedback(&username, form.title, form.content)?;

    info!(feedback_id = feedback.id, "Feedback created");
    Ok(Redirect::to(&profile_path(&username)).into_response())
}

/// GET /feedback/{feedback_id}/update
pub async fn update_form_handler(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Path(feedback_id): Path<String>,
) -> Result<Response, AppError> {
    let feedback = load_feedback(&state, &feedback_id)?;
    session.require_owner(&feedback.username)?;

    let prefill = FeedbackForm {
        title: feedback.title.clone(),
        content: feedback.content.clone(),
    };
    let flashes = session.take_flashes().await?;

    Ok(pages::edit_feedback_page(&feedback, &prefill, &FieldErrors::new(), &flashes).into_response())
}

/// POST /feedback/{feedback_id}/update
#[instrument(skip(state, session, form))]
pub async fn update_submit_handler(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Path(feedback_id): Path<String>,
    Form(form): Form<FeedbackForm>,
) -> Result<Response, AppError> {
    let feedback = load_feedback(&state, &feedback_id)?;
    let owner = session.require_owner(&feedback.username)?;

    if let Err(errors) = validate(&FEEDBACK_FORM, &form) {
        let flashes = session.take_flashes().await?;
        return Ok(pages::edit_feedback_page(&feedback, &form, &errors, &flashes).into_response());
    }

    state
        .db
        .update_feedback(feedback.id, form.title, form.content)?;

    info!(feedback_id = feedback.id, "Feedback updated");
    Ok(Redirect::to(&profile_path(owner)).into_response())
}

/// GET /feedback/{feedback_id}/delete
///
/// Open to anyone unless `auth.owner_check_on_feedback_delete` is set.
/// Deletes by someone other than the owner are logged either way.
#[instrument(skip(state, session))]
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    session: CurrentSession,
    Path(feedback_id): Path<String>,
) -> Result<Redirect, AppError> {
    let feedback = load_feedback(&state, &feedback_id)?;

    if !session.is_owner(&feedback.username) {
        if state.config.auth.owner_check_on_feedback_delete {
            session.require_owner(&feedback.username)?;
        }

        warn!(
            feedback_id = feedback.id,
            owner = %feedback.username,
            actor = session.username().unwrap_or("<anonymous>"),
            "Feedback deleted by someone other than its owner"
        );
    }

    let removed = state.db.delete_feedback(feedback.id)?;

    info!(feedback_id = removed.id, "Feedback deleted");
    Ok(Redirect::to(&profile_path(&removed.username)))
}
