//! Chat engine backed by a local OpenAI-compatible server.
//!
//! The on-device model is expected to be served by something like llama.cpp
//! or Ollama exposing `/v1/chat/completions`. Tokens arrive as SSE lines in
//! the OpenAI delta format.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::debug;

use lectern_core::{Error, Result};

use crate::engine::ChatEngine;
use crate::types::{BoxedTokenStream, ChatMessage, StreamChunk};

pub struct LocalHttpEngine {
    client: Client,
    base_url: String,
    model: String,
    temperature: f64,
    max_tokens: usize,
}

impl LocalHttpEngine {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 2_048,
        }
    }

    pub fn with_sampling(mut self, temperature: f64, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn request_body(&self, messages: &[ChatMessage], stream: bool) -> serde_json::Value {
        let msgs: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();
        json!({
            "model": self.model,
            "messages": msgs,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": stream,
        })
    }
}

#[async_trait]
impl ChatEngine for LocalHttpEngine {
    fn stream_chat(&self, messages: Vec<ChatMessage>) -> BoxedTokenStream {
        let client = self.client.clone();
        let url = self.completions_url();
        let body = self.request_body(&messages, true);

        Box::pin(async_stream::stream! {
            debug!("Streaming chat completion from {}", url);

            let response = match client.post(&url).json(&body).send().await {
                Ok(r) => r,
                Err(e) => {
                    yield StreamChunk::Error(format!("Request failed: {}", e));
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                yield StreamChunk::Error(format!("API error {}: {}", status, body));
                return;
            }

            let mut stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut token_count = 0usize;

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        yield StreamChunk::Error(format!("Stream read error: {}", e));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete SSE lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    if let Some(data) = line.strip_prefix("data: ") {
                        if data.trim() == "[DONE]" {
                            yield StreamChunk::Done { tokens_used: token_count };
                            return;
                        }

                        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(data) {
                            if let Some(content) =
                                parsed["choices"][0]["delta"]["content"].as_str()
                            {
                                if !content.is_empty() {
                                    token_count += 1;
                                    yield StreamChunk::Token(content.to_string());
                                }
                            }
                        }
                    }
                }
            }

            yield StreamChunk::Done { tokens_used: token_count };
        })
    }

    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let response = self
            .client
            .post(self.completions_url())
            .json(&self.request_body(&messages, false))
            .send()
            .await
            .map_err(|e| Error::Generation(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Generation(format!(
                "API error {}",
                response.status()
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        Ok(value["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    fn is_ready(&self) -> bool {
        true
    }
}
