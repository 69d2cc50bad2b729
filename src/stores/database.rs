use crate::core::error::StoreError;
use crate::models::{feedback::Feedback, user::User};
use crate::wal::wal::{Wal, WalOperation};
use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    /// Ordered by id so listings come out in creation order
    feedback: BTreeMap<u64, Feedback>,
    next_feedback_id: u64,
}

/// Users and feedback tables with foreign-key and cascade semantics.
///
/// Every mutation is a single commit: constraints are checked and the
/// operation is appended to the WAL while the write lock is held, and memory
/// is only touched after the WAL accepted the record. A failed commit leaves
/// no partial state behind.
pub struct Database {
    tables: RwLock<Tables>,
    wal: Option<Wal>,
}

impl Database {
    pub fn new(wal: Wal) -> Self {
        Self {
            tables: RwLock::new(Tables::new()),
            wal: Some(wal),
        }
    }

    /// Store without durability, for tests and throwaway instances
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::new()),
            wal: None,
        }
    }

    pub fn wal(&self) -> Option<&Wal> {
        self.wal.as_ref()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, tables: &mut Tables, op: WalOperation) -> Result<(), StoreError> {
        tables.check(&op)?;

        if let Some(wal) = &self.wal {
            wal.log_operation(&op).map_err(StoreError::Wal)?;
        }

        tables.apply(op);
        Ok(())
    }

    /// Re-apply logged operations without writing them again.
    /// Returns the number of operations applied.
    pub fn restore(&self, operations: &[WalOperation]) -> usize {
        let mut tables = self.write();
        let mut applied = 0;

        for op in operations {
            match tables.check(op) {
                Ok(()) => {
                    tables.apply(op.clone());
                    applied += 1;
                }
                Err(e) => {
                    warn!(error = %e, "WAL operation violates a constraint, skipping");
                }
            }
        }

        applied
    }

    /// Rewrite the WAL so it holds only the live rows
    pub fn compact(&self) -> Result<(), StoreError> {
        let Some(wal) = &self.wal else {
            return Ok(());
        };

        // Held for writing so no commit can slip in between snapshot and rewrite
        let tables = self.write();
        wal.rewrite(&tables.snapshot()).map_err(StoreError::Wal)
    }

    pub fn create_user(&self, user: User) -> Result<(), StoreError> {
        let mut tables = self.write();
        self.commit(
            &mut tables,
            WalOperation::AddUser {
                username: user.username,
                password_hash: user.password_hash,
                email: user.email,
                first_name: user.first_name,
                last_name: user.last_name,
            },
        )
    }

    /// Delete a user and all of their feedback in one commit.
    /// Returns how many feedback rows went with them.
    pub fn delete_user(&self, username: &str) -> Result<usize, StoreError> {
        let mut tables = self.write();
        let owned = tables.feedback_ids_for(username).len();

        self.commit(
            &mut tables,
            WalOperation::RemoveUser {
                username: username.to_string(),
            },
        )?;

        Ok(owned)
    }

    pub fn get_user(&self, username: &str) -> Option<User> {
        self.read().users.get(username).cloned()
    }

    pub fn user_exists(&self, username: &str) -> bool {
        self.read().users.contains_key(username)
    }

    pub fn create_feedback(
        &self,
        username: &str,
        title: String,
        content: String,
    ) -> Result<Feedback, StoreError> {
        let mut tables = self.write();
        let id = tables.next_feedback_id;

        self.commit(
            &mut tables,
            WalOperation::AddFeedback {
                id,
                username: username.to_string(),
                title,
                content,
            },
        )?;

        tables
            .feedback
            .get(&id)
            .cloned()
            .ok_or(StoreError::FeedbackNotFound(id))
    }

    /// Replace title and content; the owner is never changed
    pub fn update_feedback(
        &self,
        id: u64,
        title: String,
        content: String,
    ) -> Result<Feedback, StoreError> {
        let mut tables = self.write();

        self.commit(&mut tables, WalOperation::UpdateFeedback { id, title, content })?;

        tables
            .feedback
            .get(&id)
            .cloned()
            .ok_or(StoreError::FeedbackNotFound(id))
    }

    /// Remove a feedback row, returning it
    pub fn delete_feedback(&self, id: u64) -> Result<Feedback, StoreError> {
        let mut tables = self.write();
        let existing = tables
            .feedback
            .get(&id)
            .cloned()
            .ok_or(StoreError::FeedbackNotFound(id))?;

        self.commit(&mut tables, WalOperation::RemoveFeedback { id })?;

        Ok(existing)
    }

    pub fn get_feedback(&self, id: u64) -> Option<Feedback> {
        self.read().feedback.get(&id).cloned()
    }

    /// Explicit join: all feedback whose `username` is `username`, oldest first
    pub fn feedback_for_user(&self, username: &str) -> Vec<Feedback> {
        self.read()
            .feedback
            .values()
            .filter(|feedback| feedback.username == username)
            .cloned()
            .collect()
    }

    pub fn user_count(&self) -> usize {
        self.read().users.len()
    }

    pub fn feedback_count(&self) -> usize {
        self.read().feedback.len()
    }
}

impl Tables {
    fn new() -> Self {
        Self {
            next_feedback_id: 1,
            ..Default::default()
        }
    }

    fn feedback_ids_for(&self, username: &str) -> Vec<u64> {
        self.feedback
            .values()
            .filter(|feedback| feedback.username == username)
            .map(|feedback| feedback.id)
            .collect()
    }

    fn check(&self, op: &WalOperation) -> Result<(), StoreError> {
        match op {
            WalOperation::AddUser { username, .. } => {
                if self.users.contains_key(username) {
                    return Err(StoreError::DuplicateUsername(username.clone()));
                }
            }
            WalOperation::RemoveUser { username } => {
                if !self.users.contains_key(username) {
                    return Err(StoreError::UnknownUser(username.clone()));
                }
            }
            WalOperation::AddFeedback { id, username, .. } => {
                if !self.users.contains_key(username) {
                    return Err(StoreError::UnknownUser(username.clone()));
                }
                if self.feedback.contains_key(id) {
                    return Err(StoreError::DuplicateFeedbackId(*id));
                }
                // The counter must still be able to move past this id
                if *id == u64::MAX {
                    return Err(StoreError::FeedbackIdOutOfRange(*id));
                }
            }
            WalOperation::UpdateFeedback { id, .. } | WalOperation::RemoveFeedback { id } => {
                if !self.feedback.contains_key(id) {
                    return Err(StoreError::FeedbackNotFound(*id));
                }
            }
        }

        Ok(())
    }

    /// Apply an operation that already passed `check`
    fn apply(&mut self, op: WalOperation) {
        match op {
            WalOperation::AddUser {
                username,
                password_hash,
                email,
                first_name,
                last_name,
            } => {
                let user = User::new(username.clone(), password_hash, email, first_name, last_name);
                self.users.insert(username, user);
            }
            WalOperation::RemoveUser { username } => {
                self.users.remove(&username);
                self.feedback.retain(|_, feedback| feedback.username != username);
            }
            WalOperation::AddFeedback {
                id,
                username,
                title,
                content,
            } => {
                self.feedback
                    .insert(id, Feedback::new(id, title, content, username));
                self.next_feedback_id = self.next_feedback_id.max(id + 1);
            }
            WalOperation::UpdateFeedback { id, title, content } => {
                if let Some(feedback) = self.feedback.get_mut(&id) {
                    feedback.title = title;
                    feedback.content = content;
                }
            }
            WalOperation::RemoveFeedback { id } => {
                self.feedback.remove(&id);
            }
        }
    }

    /// Minimal operation list that rebuilds the current tables
    fn snapshot(&self) -> Vec<WalOperation> {
        let mut users: Vec<&User> = self.users.values().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));

        let users = users.into_iter().map(|user| WalOperation::AddUser {
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        });

        let feedback = self.feedback.values().map(|feedback| WalOperation::AddFeedback {
            id: feedback.id,
            username: feedback.username.clone(),
            title: feedback.title.clone(),
            content: feedback.content.clone(),
        });

        users.chain(feedback).collect()
    }
}
