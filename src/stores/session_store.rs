use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tower_sessions::{
    session::{Id, Record},
    session_store::{self, ExpiredDeletion},
    SessionStore,
};

/// Session key holding the authenticated username
pub const USERNAME_KEY: &str = "username";
/// Session key holding pending flash messages
pub const FLASHES_KEY: &str = "_flashes";

/// In-process backend for `tower-sessions`.
///
/// Unlike the crate's `MemoryStore` it can sweep expired records and revoke
/// an identity across every session that carries it.
#[derive(Clone, Debug, Default)]
pub struct SessionTable {
    records: Arc<DashMap<Id, Record>>,
}

fn is_live(record: &Record, now: OffsetDateTime) -> bool {
    record.expiry_date > now
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop `username` from every session logged in as it.
    /// The sessions themselves (and their flashes) survive.
    pub fn revoke_identity(&self, username: &str) -> usize {
        let mut revoked = 0;
        for mut entry in self.records.iter_mut() {
            let matches = entry
                .data
                .get(USERNAME_KEY)
                .and_then(|value| value.as_str())
                == Some(username);

            if matches {
                entry.data.remove(USERNAME_KEY);
                revoked += 1;
            }
        }
        revoked
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SessionStore for SessionTable {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.records.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .records
            .get(session_id)
            .filter(|record| is_live(record, now))
            .map(|record| record.value().clone()))
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        self.records.remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for SessionTable {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let now = OffsetDateTime::now_utc();
        self.records.retain(|_, record| is_live(record, now));
        Ok(())
    }
}
