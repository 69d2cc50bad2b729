use crate::core::error::{AppError, StoreError};
use crate::core::state::AppState;
use crate::models::{forms::RegisterForm, user::User};
use tracing::{debug, info};

/// Hash the password, persist the account and return it.
/// A taken username fails with `StoreError::DuplicateUsername`.
pub async fn register(state: &AppState, form: RegisterForm) -> Result<User, AppError> {
    // Skip the hashing work for the obvious case; the insert still enforces uniqueness
    if state.db.user_exists(&form.username) {
        return Err(StoreError::DuplicateUsername(form.username).into());
    }

    let password_hash = state.passwords.hash(form.password).await?;
    let user = User::new(
        form.username,
        password_hash,
        form.email,
        form.first_name,
        form.last_name,
    );

    state.db.create_user(user.clone())?;

    info!(username = %user.username, "User registered");
    Ok(user)
}

/// Look up `username` and check `password` against the stored hash.
/// Unknown users and wrong passwords are indistinguishable to the caller.
pub async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let user = state.db.get_user(username);
    let stored_hash = user.as_ref().map(|user| user.password_hash.clone());

    if state.passwords.verify(password.to_string(), stored_hash).await? {
        Ok(user)
    } else {
        debug!("Authentication failed");
        Ok(None)
    }
}
