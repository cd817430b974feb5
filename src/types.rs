use serde::{Deserialize, Serialize};

/// A message in a conversation. Immutable once appended to a session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Message {
    /// Create a message with the given role and current timestamp.
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text("assistant", content)
    }

    /// Convert to a provider-facing message object.
    pub fn as_provider_message(&self) -> serde_json::Value {
        serde_json::json!({
            "role": self.role,
            "content": self.content,
        })
    }
}
