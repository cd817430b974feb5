use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::Message;

/// In-memory session store, one history per session key. Histories are
/// created lazily and append-only. They live only as long as the process.
pub struct SessionStore {
    sessions: HashMap<String, Session>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    pub messages: Vec<Message>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub message_count: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Return the session for `key`, inserting a new empty one if absent.
    /// No eviction, no expiry.
    pub fn get_or_create(&mut self, key: &str) -> &mut Session {
        self.sessions.entry(key.into()).or_insert_with(|| {
            info!(session = %key, "created session");
            Session {
                key: key.into(),
                messages: Vec::new(),
                created_at: chrono::Utc::now(),
                message_count: 0,
            }
        })
    }

    /// Append a message to an existing session's history.
    pub fn append_message(&mut self, key: &str, message: Message) {
        if let Some(session) = self.sessions.get_mut(key) {
            session.messages.push(message);
            session.message_count += 1;
        }
    }

    pub fn get(&self, key: &str) -> Option<&Session> {
        self.sessions.get(key)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
