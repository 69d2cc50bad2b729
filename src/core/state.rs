// Application state (AppState)

use crate::core::config::Config;
use crate::security::password::PasswordHasher;
use crate::stores::{database::Database, session_store::SessionTable};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Shared application state
///
/// Contains all shared components that are accessed by request handlers.
/// Every field is cheap to clone; the session table shares its map internally.
#[derive(Clone)]
pub struct AppState {
    /// Users and feedback tables
    pub db: Arc<Database>,

    /// Backing store for the `tower-sessions` layer
    pub sessions: SessionTable,

    pub passwords: Arc<PasswordHasher>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let passwords = PasswordHasher::new(config.auth.bcrypt_cost)
            .context("Failed to initialize password hasher")?;

        Ok(Self {
            db: Arc::new(db),
            sessions: SessionTable::new(),
            passwords: Arc::new(passwords),
            config: Arc::new(config),
        })
    }
}
