pub mod window;

pub use window::windowed;

use crate::types::Message;

/// How much of a session history is sent to the model.
///
/// The policy bounds what a prompt contains, never what the store holds:
/// histories stay append-only and complete, the window is applied at
/// prompt-build time as a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPolicy {
    /// Keep the last N turns. A turn is a user+assistant pair (2 messages).
    Turns(usize),
    /// Send the full history.
    Unlimited,
}

impl WindowPolicy {
    /// Build a policy from config values. `unlimited` wins over the turn count.
    pub fn from_config(window_turns: u32, unlimited: bool) -> Self {
        if unlimited {
            WindowPolicy::Unlimited
        } else {
            WindowPolicy::Turns(window_turns as usize)
        }
    }

    /// Maximum number of messages the policy lets through, if bounded.
    pub fn max_messages(&self) -> Option<usize> {
        match self {
            WindowPolicy::Turns(turns) => Some(turns * 2),
            WindowPolicy::Unlimited => None,
        }
    }

    /// Apply the policy to a history, returning the trailing view.
    pub fn apply<'a>(&self, messages: &'a [Message]) -> &'a [Message] {
        match self.max_messages() {
            Some(keep) => windowed(messages, keep),
            None => messages,
        }
    }
}
