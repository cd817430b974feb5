pub mod providers;

use std::sync::Arc;

use anyhow::bail;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::memory::WindowPolicy;
use crate::store::SessionStore;
use crate::types::Message;
use providers::LlmProvider;

/// A streaming chunk from the model.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    Text(String),
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },
    Done,
    Error(String),
}

/// Drives conversation turns against a provider.
///
/// This is the core loop: append user message -> window the history ->
/// call the provider -> append the response.
pub struct ChatEngine {
    provider: Arc<dyn LlmProvider>,
    store: SessionStore,
    policy: WindowPolicy,
    system_prompt: Option<String>,
}

impl ChatEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        policy: WindowPolicy,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            provider,
            store: SessionStore::new(),
            policy,
            system_prompt,
        }
    }

    /// Build an engine from resolved configuration.
    pub fn from_config(config: &crate::config::WindlassConfig) -> anyhow::Result<Self> {
        let provider: Arc<dyn LlmProvider> = providers::from_config(&config.model)?.into();
        let policy = WindowPolicy::from_config(config.memory.window_turns, config.memory.unlimited);
        Ok(Self::new(
            provider,
            policy,
            config.model.system_prompt.clone(),
        ))
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Send a message on a session and return the full response text.
    pub async fn send(&mut self, session_id: &str, text: &str) -> anyhow::Result<String> {
        self.send_with_tap(session_id, text, None).await
    }

    /// Send a message, forwarding every stream event to `tap` as it arrives.
    ///
    /// The user message is appended before the provider call, the assistant
    /// message after it completes, so a successful turn grows the history by
    /// exactly two messages.
    pub async fn send_with_tap(
        &mut self,
        session_id: &str,
        text: &str,
        tap: Option<mpsc::Sender<ChatEvent>>,
    ) -> anyhow::Result<String> {
        // Append the user message, then build the provider input from the
        // windowed view of the full history.
        let messages: Vec<serde_json::Value> = {
            let session = self.store.get_or_create(session_id);
            session.messages.push(Message::user(text));
            session.message_count += 1;
            self.policy
                .apply(&session.messages)
                .iter()
                .map(|m| m.as_provider_message())
                .collect()
        };

        info!(
            session = %session_id,
            window_messages = messages.len(),
            "dispatching chat turn"
        );

        let (tx, mut rx) = mpsc::channel::<ChatEvent>(32);
        let provider = Arc::clone(&self.provider);
        let system_prompt = self.system_prompt.clone();

        tokio::spawn(async move {
            let result = provider
                .call_streaming(&messages, system_prompt.as_deref(), tx.clone())
                .await;

            if let Err(e) = result {
                let _ = tx.send(ChatEvent::Error(format!("provider error: {e}"))).await;
                let _ = tx.send(ChatEvent::Done).await;
            }
        });

        let mut response_text = String::new();
        let mut failure: Option<String> = None;

        while let Some(event) = rx.recv().await {
            match &event {
                ChatEvent::Text(chunk) => response_text.push_str(chunk),
                ChatEvent::Usage {
                    input_tokens,
                    output_tokens,
                } => {
                    debug!(input_tokens, output_tokens, "provider reported usage");
                }
                ChatEvent::Error(e) => failure = Some(e.clone()),
                ChatEvent::Done => {}
            }

            let done = matches!(event, ChatEvent::Done);
            if let Some(ref tap) = tap {
                let _ = tap.send(event).await;
            }
            if done {
                break;
            }
        }

        if let Some(e) = failure {
            bail!(e);
        }

        self.store
            .append_message(session_id, Message::assistant(response_text.clone()));

        Ok(response_text)
    }
}
