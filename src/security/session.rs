use crate::core::error::AppError;
use crate::core::state::AppState;
use crate::stores::session_store::{FLASHES_KEY, USERNAME_KEY};
use anyhow::anyhow;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use tower_sessions::Session;

/// Per-request session context: the browser's `tower-sessions` session and
/// who, if anyone, it is logged in as.
///
/// Handlers receive this as an extractor and make every authorization
/// decision from it. Nothing reads session state from anywhere else.
#[derive(Clone, Debug)]
pub struct CurrentSession {
    session: Session,
    username: Option<String>,
}

impl CurrentSession {
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The logged-in username if it equals `owner`, or 401
    pub fn require_owner(&self, owner: &str) -> Result<&str, AppError> {
        match self.username() {
            Some(username) if username == owner => Ok(username),
            _ => Err(AppError::Unauthorized),
        }
    }

    pub fn is_owner(&self, owner: &str) -> bool {
        self.username() == Some(owner)
    }

    /// Authenticate as `username` under a fresh session id.
    /// Pending flashes carry over.
    pub async fn log_in(&mut self, username: &str) -> Result<(), AppError> {
        self.session.cycle_id().await?;
        self.session.insert(USERNAME_KEY, username).await?;
        self.username = Some(username.to_string());
        Ok(())
    }

    /// Forget the identity but keep the session, so flashes still work
    pub async fn log_out(&mut self) -> Result<Option<String>, AppError> {
        self.username = None;
        Ok(self.session.remove::<String>(USERNAME_KEY).await?)
    }

    pub async fn push_flash(&self, message: &str) -> Result<(), AppError> {
        let mut flashes: Vec<String> = self.session.get(FLASHES_KEY).await?.unwrap_or_default();
        flashes.push(message.to_string());
        self.session.insert(FLASHES_KEY, flashes).await?;
        Ok(())
    }

    /// Pending flash messages, removed from the session
    pub async fn take_flashes(&self) -> Result<Vec<String>, AppError> {
        Ok(self
            .session
            .remove::<Vec<String>>(FLASHES_KEY)
            .await?
            .unwrap_or_default())
    }
}

impl FromRequestParts<Arc<AppState>> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| AppError::Internal(anyhow!(message)))?;
        let username = session.get::<String>(USERNAME_KEY).await?;

        Ok(Self { session, username })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::session_store::SessionTable;
    use axum::http::StatusCode;

    fn session_for(username: Option<&str>) -> CurrentSession {
        let session = Session::new(None, Arc::new(SessionTable::new()), None);
        CurrentSession {
            session,
            username: username.map(str::to_string),
        }
    }

    #[test]
    fn test_anonymous_fails_owner_check() {
        let session = session_for(None);

        assert_eq!(
            session.require_owner("alice").unwrap_err().status(),
            StatusCode::UNAUTHORIZED
        );
        assert!(!session.is_owner("alice"));
    }

    #[test]
    fn test_owner_check() {
        let session = session_for(Some("alice"));

        assert_eq!(session.require_owner("alice").unwrap(), "alice");
        assert!(session.require_owner("bob").is_err());
        assert!(session.is_owner("alice"));
    }

    #[tokio::test]
    async fn test_flashes_are_taken_once() {
        let session = session_for(None);
        session.push_flash("User Added").await.unwrap();
        session.push_flash("Second").await.unwrap();

        assert_eq!(session.take_flashes().await.unwrap(), vec!["User Added", "Second"]);
        assert!(session.take_flashes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_log_in_and_out_keep_flashes() {
        let mut session = session_for(None);
        session.push_flash("User Added").await.unwrap();

        session.log_in("alice").await.unwrap();
        assert_eq!(session.username(), Some("alice"));

        assert_eq!(session.log_out().await.unwrap(), Some("alice".to_string()));
        assert!(session.username().is_none());
        assert_eq!(session.take_flashes().await.unwrap(), vec!["User Added"]);
    }
}
