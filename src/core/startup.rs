use anyhow::{Context, Result};
use std::time::Duration;
use tower_sessions::session_store::ExpiredDeletion;
use tracing::{debug, error, info};

use crate::core::config::StorageConfig;
use crate::stores::{database::Database, session_store::SessionTable};
use crate::wal::wal::Wal;

// this runs at boot time
pub fn open_database(storage: &StorageConfig) -> Result<Database> {
    let wal = Wal::new(storage.wal_path.clone()).context("Failed to initialize WAL")?;
    info!(wal_path = %wal.path().display(), "WAL initialized");

    let operations = wal.replay().context("Failed to replay WAL")?;

    let db = Database::new(wal);
    let applied = db.restore(&operations);

    info!(
        operations_replayed = operations.len(),
        operations_applied = applied,
        users_loaded = db.user_count(),
        feedback_loaded = db.feedback_count(),
        "WAL replay completed"
    );

    // Drop superseded records so the log stays proportional to live data
    db.compact().context("Failed to compact WAL")?;
    debug!("WAL compacted");

    Ok(db)
}

/// Spawn a background task that periodically removes idle sessions
pub fn spawn_session_cleanup(sessions: SessionTable, cleanup_interval: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cleanup_interval));

        loop {
            interval.tick().await;

            debug!("Running session cleanup");
            let before = sessions.len();

            if let Err(e) = sessions.delete_expired().await {
                error!(error = %e, "Session cleanup failed");
                continue;
            }

            let removed = before.saturating_sub(sessions.len());
            if removed > 0 {
                info!(
                    removed_sessions = removed,
                    active_sessions = sessions.len(),
                    "Session cleanup completed"
                );
            } else {
                debug!("Session cleanup completed, no expired sessions found");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::User;
    use crate::stores::session_store::USERNAME_KEY;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use time::OffsetDateTime;
    use tower_sessions::{
        session::{Id, Record},
        SessionStore,
    };

    fn user(username: &str) -> User {
        User::new(
            username.to_string(),
            "$2b$04$hash".to_string(),
            format!("{}@example.com", username),
            "Test".to_string(),
            "User".to_string(),
        )
    }

    #[test]
    fn test_open_database_restores_previous_run() {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            wal_path: temp_dir.path().join("feedback.wal"),
        };

        {
            let db = open_database(&storage).unwrap();
            db.create_user(user("alice")).unwrap();
            db.create_user(user("bob")).unwrap();
            let feedback = db
                .create_feedback("alice", "Title".to_string(), "text".to_string())
                .unwrap();
            db.update_feedback(feedback.id, "Edited".to_string(), "more".to_string())
                .unwrap();
            db.delete_user("bob").unwrap();
        }

        let db = open_database(&storage).unwrap();
        assert_eq!(db.user_count(), 1);
        assert!(db.user_exists("alice"));

        let feedback = db.feedback_for_user("alice");
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].title, "Edited");

        // Compaction leaves one record per live row
        let operations = db.wal().unwrap().replay().unwrap();
        assert_eq!(operations.len(), 2);
    }

    #[tokio::test]
    async fn test_session_cleanup_task_removes_expired() {
        let sessions = SessionTable::new();
        let stale = Record {
            id: Id::default(),
            data: HashMap::from([(USERNAME_KEY.to_string(), serde_json::json!("alice"))]),
            expiry_date: OffsetDateTime::now_utc() - time::Duration::hours(1),
        };
        sessions.save(&stale).await.unwrap();
        assert_eq!(sessions.len(), 1);

        spawn_session_cleanup(sessions.clone(), 1);
        // The first tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(sessions.is_empty());
    }
}
