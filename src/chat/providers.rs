use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tracing::debug;

use super::ChatEvent;

/// Trait for LLM provider implementations.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn call_streaming(
        &self,
        messages: &[serde_json::Value],
        system_prompt: Option<&str>,
        tx: mpsc::Sender<ChatEvent>,
    ) -> anyhow::Result<()>;
}

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    deterministic: bool,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, max_tokens: u32, deterministic: bool) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            max_tokens,
            deterministic,
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn call_streaming(
        &self,
        messages: &[serde_json::Value],
        system_prompt: Option<&str>,
        tx: mpsc::Sender<ChatEvent>,
    ) -> anyhow::Result<()> {
        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
            "stream": true,
        });

        if let Some(system) = system_prompt {
            body["system"] = serde_json::json!(system);
        }

        if self.deterministic {
            body["temperature"] = serde_json::json!(0.0);
        }

        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let _ = tx.send(ChatEvent::Error(format!("{status}: {text}"))).await;
            let _ = tx.send(ChatEvent::Done).await;
            return Ok(());
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut input_tokens: u32 = 0;
        let mut output_tokens: u32 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find("\n\n") {
                let event_text = buffer[..pos].to_string();
                buffer = buffer[pos + 2..].to_string();

                // Parse SSE event type and data
                let mut event_type = String::new();
                let mut data = String::new();
                for line in event_text.lines() {
                    if let Some(et) = line.strip_prefix("event: ") {
                        event_type = et.to_string();
                    } else if let Some(d) = line.strip_prefix("data: ") {
                        data = d.to_string();
                    }
                }

                if data.is_empty() || data == "[DONE]" {
                    continue;
                }

                let parsed: serde_json::Value = match serde_json::from_str(&data) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("skipping unparseable SSE data: {e}");
                        continue;
                    }
                };

                match event_type.as_str() {
                    "message_start" => {
                        if let Some(usage) = parsed.get("message").and_then(|m| m.get("usage")) {
                            if let Some(it) = usage.get("input_tokens").and_then(|v| v.as_u64()) {
                                input_tokens = it as u32;
                            }
                        }
                    }

                    "content_block_delta" => {
                        if let Some(delta) = parsed.get("delta") {
                            if delta.get("type").and_then(|t| t.as_str()) == Some("text_delta") {
                                if let Some(text) = delta.get("text").and_then(|t| t.as_str()) {
                                    let _ = tx.send(ChatEvent::Text(text.into())).await;
                                }
                            }
                        }
                    }

                    "message_delta" => {
                        if let Some(usage) = parsed.get("usage") {
                            if let Some(ot) = usage.get("output_tokens").and_then(|v| v.as_u64()) {
                                output_tokens = ot as u32;
                            }
                        }
                    }

                    "message_stop" => {
                        let _ = tx
                            .send(ChatEvent::Usage {
                                input_tokens,
                                output_tokens,
                            })
                            .await;
                        let _ = tx.send(ChatEvent::Done).await;
                        return Ok(());
                    }

                    _ => {}
                }
            }
        }

        let _ = tx
            .send(ChatEvent::Usage {
                input_tokens,
                output_tokens,
            })
            .await;
        let _ = tx.send(ChatEvent::Done).await;
        Ok(())
    }
}

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    deterministic: bool,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, max_tokens: u32, deterministic: bool) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            max_tokens,
            deterministic,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn call_streaming(
        &self,
        messages: &[serde_json::Value],
        system_prompt: Option<&str>,
        tx: mpsc::Sender<ChatEvent>,
    ) -> anyhow::Result<()> {
        // Prepend system message if provided
        let mut all_messages = Vec::new();
        if let Some(system) = system_prompt {
            all_messages.push(serde_json::json!({
                "role": "system",
                "content": system,
            }));
        }
        all_messages.extend_from_slice(messages);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": all_messages,
            "max_tokens": self.max_tokens,
            "stream": true,
            "stream_options": { "include_usage": true },
        });

        if self.deterministic {
            body["temperature"] = serde_json::json!(0.0);
        }

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let _ = tx.send(ChatEvent::Error(format!("{status}: {text}"))).await;
            let _ = tx.send(ChatEvent::Done).await;
            return Ok(());
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut input_tokens: u32 = 0;
        let mut output_tokens: u32 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(pos) = buffer.find("\n\n") {
                let event = buffer[..pos].to_string();
                buffer = buffer[pos + 2..].to_string();

                if let Some(data) = event.strip_prefix("data: ") {
                    if data == "[DONE]" {
                        let _ = tx
                            .send(ChatEvent::Usage {
                                input_tokens,
                                output_tokens,
                            })
                            .await;
                        let _ = tx.send(ChatEvent::Done).await;
                        return Ok(());
                    }

                    let parsed: serde_json::Value = match serde_json::from_str(data) {
                        Ok(v) => v,
                        Err(_) => continue,
                    };

                    // Usage arrives in the final chunk
                    if let Some(usage) = parsed.get("usage") {
                        if let Some(it) = usage.get("prompt_tokens").and_then(|v| v.as_u64()) {
                            input_tokens = it as u32;
                        }
                        if let Some(ot) = usage.get("completion_tokens").and_then(|v| v.as_u64()) {
                            output_tokens = ot as u32;
                        }
                    }

                    if let Some(choices) = parsed.get("choices").and_then(|c| c.as_array()) {
                        if let Some(text) = choices
                            .first()
                            .and_then(|c| c.get("delta"))
                            .and_then(|d| d.get("content"))
                            .and_then(|c| c.as_str())
                        {
                            let _ = tx.send(ChatEvent::Text(text.into())).await;
                        }
                    }
                }
            }
        }

        let _ = tx
            .send(ChatEvent::Usage {
                input_tokens,
                output_tokens,
            })
            .await;
        let _ = tx.send(ChatEvent::Done).await;
        Ok(())
    }
}

/// Create a provider from config.
pub fn from_config(config: &crate::config::ModelConfig) -> anyhow::Result<Box<dyn LlmProvider>> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "no API key for provider '{}'. Set {} env var.",
            config.provider,
            match config.provider.as_str() {
                "anthropic" => "ANTHROPIC_API_KEY",
                "openai" => "OPENAI_API_KEY",
                _ => "the appropriate API key",
            }
        )
    })?;

    match config.provider.as_str() {
        "anthropic" => Ok(Box::new(AnthropicProvider::new(
            api_key,
            config.model.clone(),
            config.max_tokens,
            config.deterministic,
        ))),
        "openai" => Ok(Box::new(OpenAiProvider::new(
            api_key,
            config.model.clone(),
            config.max_tokens,
            config.deterministic,
        ))),
        other => anyhow::bail!("unknown provider: {other}"),
    }
}
