// src/structuring/gemini.rs

use super::{INSTRUCTION, ReceiptStructurer};
use crate::config::GeminiConfig;
use crate::error::{Result, SplitError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        (!text.is_empty()).then_some(text)
    }
}

/// Google Gemini `generateContent` endpoint.
pub struct GeminiStructurer {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl GeminiStructurer {
    pub fn from_config(cfg: &GeminiConfig, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SplitError::Config(format!("http client: {e}")))?;

        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!(var = %cfg.api_key_env, "Gemini API key not set, structuring calls will fail");
        }

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            api_key,
            api_key_env: cfg.api_key_env.clone(),
        })
    }

    fn request_for(raw_text: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: format!("{INSTRUCTION}\n\nRaw OCR text:\n{raw_text}"),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        }
    }
}

#[async_trait]
impl ReceiptStructurer for GeminiStructurer {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, raw_text: &str) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            return Err(SplitError::Structuring(format!(
                "{} env var required for the gemini backend",
                self.api_key_env
            )));
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Self::request_for(raw_text))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SplitError::Structuring(format!(
                "Gemini API error {status}: {body}"
            )));
        }

        let generated: GenerateResponse = response.json().await?;
        generated
            .text()
            .ok_or_else(|| SplitError::Structuring("empty response from Gemini".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_key() -> GeminiStructurer {
        let cfg = GeminiConfig {
            api_key_env: "RECEIPT_SPLIT_TEST_UNSET_KEY".to_string(),
            ..GeminiConfig::default()
        };
        GeminiStructurer::from_config(&cfg, None).unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_fails_every_call() {
        let structurer = without_key();
        for _ in 0..2 {
            let err = structurer.complete("anything").await.unwrap_err();
            assert!(
                matches!(err, SplitError::Structuring(ref m) if m.contains("RECEIPT_SPLIT_TEST_UNSET_KEY"))
            );
        }
    }

    #[test]
    fn test_request_embeds_instruction_and_text() {
        let json = serde_json::to_value(GeminiStructurer::request_for("TOTAL 5000")).unwrap();
        let text = json["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.starts_with(INSTRUCTION));
        assert!(text.ends_with("TOTAL 5000"));
        assert_eq!(json["generationConfig"]["temperature"], 0.0);
    }

    #[test]
    fn test_response_text_joined() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"```json\n{\"items\""},{"text":":[]}\n```"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.text().unwrap(), "```json\n{\"items\":[]}\n```");

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(empty.text().is_none());
    }
}
