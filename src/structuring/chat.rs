// src/structuring/chat.rs

use super::{INSTRUCTION, ReceiptStructurer};
use crate::config::ChatConfig;
use crate::error::{Result, SplitError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI-compatible `/chat/completions` endpoint (Ollama, hosted APIs).
pub struct ChatStructurer {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl ChatStructurer {
    pub fn from_config(cfg: &ChatConfig, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SplitError::Config(format!("http client: {e}")))?;

        let api_key = cfg
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key,
        })
    }

    fn request_for(&self, raw_text: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: INSTRUCTION.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Parse the following raw OCR receipt text:\n\n{raw_text}"),
                },
            ],
            temperature: 0.0,
        }
    }
}

#[async_trait]
impl ReceiptStructurer for ChatStructurer {
    fn name(&self) -> &str {
        "chat"
    }

    async fn complete(&self, raw_text: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut request = self.client.post(&url).json(&self.request_for(raw_text));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SplitError::Structuring(format!(
                "LLM API error {status}: {body}"
            )));
        }

        let chat_response: ChatResponse = response.json().await?;
        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| SplitError::Structuring("empty response from LLM".into()))
    }
}
