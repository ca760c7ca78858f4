// src/structuring/mod.rs

mod chat;
mod gemini;
mod heuristic;

pub use chat::ChatStructurer;
pub use gemini::GeminiStructurer;
pub use heuristic::HeuristicStructurer;

use crate::config::{StructuringBackend, StructuringSection};
use crate::error::{Result, SplitError};
use crate::normalize::RawItem;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

/// The instruction sent alongside the OCR text.
pub const INSTRUCTION: &str = r#"You are a receipt parsing assistant.
Given raw OCR text from a photographed shop or restaurant receipt, return ONLY a JSON object, no markdown wrappers or additional text.

The JSON must match this schema exactly:
{
  "items": [
    {
      "name": "string",
      "price": number,
      "quantity": integer
    }
  ]
}

Notes:
- "price" is the amount printed on the receipt line for that item.
- The OCR text is noisy. Ignore totals, taxes, service charges, payment and change lines.
- Use an empty "items" array if no items can be found."#;

/// A capability that turns receipt text into a (hopefully) JSON response.
#[async_trait]
pub trait ReceiptStructurer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Send `INSTRUCTION` plus the OCR text and return the raw response body.
    async fn complete(&self, raw_text: &str) -> Result<String>;
}

/// Build the structuring backend selected in the config.
///
/// API keys are read here; a missing key is not an error until a request
/// is actually made.
pub fn backend_from_config(section: &StructuringSection) -> Result<Box<dyn ReceiptStructurer>> {
    let backend: Box<dyn ReceiptStructurer> = match section.backend {
        StructuringBackend::Gemini => {
            info!(model = %section.gemini.model, "Using Gemini backend");
            Box::new(GeminiStructurer::from_config(
                &section.gemini,
                section.timeout(),
            )?)
        }
        StructuringBackend::Chat => {
            info!(
                url = %section.chat.base_url,
                model = %section.chat.model,
                "Using chat-completions backend"
            );
            Box::new(ChatStructurer::from_config(&section.chat, section.timeout())?)
        }
        StructuringBackend::Heuristic => {
            info!("Using offline heuristic backend");
            Box::new(HeuristicStructurer)
        }
    };
    Ok(backend)
}

/// Run one structuring pass: truncate, call the backend, validate the reply.
pub async fn structure_receipt(
    structurer: &dyn ReceiptStructurer,
    raw_text: &str,
    max_chars: usize,
) -> Result<Vec<RawItem>> {
    let text = truncate_chars(raw_text, max_chars);
    if text.len() < raw_text.len() {
        warn!(
            original = raw_text.len(),
            kept = text.len(),
            "OCR text truncated before structuring"
        );
    }

    let response = structurer.complete(text).await?;
    info!(
        backend = structurer.name(),
        response_len = response.len(),
        "Structuring response received"
    );

    parse_structuring_response(&response)
}

/// Remove a leading "```json" or "```" marker and a trailing "```".
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Decode a structuring response into raw item records.
///
/// The whole response is rejected if it is not JSON, not an object, has no
/// `items` array, or any entry lacks `name`, `price` or `quantity`.
pub fn parse_structuring_response(response: &str) -> Result<Vec<RawItem>> {
    let json_str = strip_code_fence(response);

    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| SplitError::Structuring(format!("response is not valid JSON: {e}")))?;

    let Value::Object(mut object) = value else {
        return Err(SplitError::Structuring(
            "response is not a JSON object".into(),
        ));
    };

    let items = match object.remove("items") {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(SplitError::Structuring(
                "`items` field is not an array".into(),
            ));
        }
        None => return Err(SplitError::Structuring("missing `items` field".into())),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| {
            serde_json::from_value::<RawItem>(entry)
                .map_err(|e| SplitError::Structuring(format!("item {idx}: {e}")))
        })
        .collect()
}

/// Cut `text` to at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_strip_json_tagged_fence() {
        let items = parse_structuring_response("```json\n{\"items\":[]}\n```").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_strip_plain_fence() {
        let items = parse_structuring_response(
            "```\n{\"items\":[{\"name\":\"X\",\"price\":1,\"quantity\":1}]}\n```",
        )
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "X");
        assert_eq!(items[0].price, json!(1));
    }

    #[test]
    fn test_unfenced_and_padded() {
        assert_eq!(strip_code_fence("  {\"items\":[]}  "), "{\"items\":[]}");
        assert_eq!(strip_code_fence("\n```json {\"a\":1} ```\n"), "{\"a\":1}");
    }

    #[test]
    fn test_missing_items_rejected() {
        let err = parse_structuring_response("{\"lines\":[]}").unwrap_err();
        assert!(matches!(err, SplitError::Structuring(ref m) if m.contains("missing")));
    }

    #[test]
    fn test_non_object_and_bad_json_rejected() {
        for response in [
            "[]",
            "\"items\"",
            "null",
            "not json at all",
            "```json\n{\"items\": [\n```",
            "{\"items\": {\"name\": \"X\"}}",
        ] {
            let result = parse_structuring_response(response);
            assert!(
                matches!(result, Err(SplitError::Structuring(_))),
                "{response}"
            );
        }
    }

    #[test]
    fn test_incomplete_record_voids_whole_response() {
        let response = r#"{"items":[
            {"name":"Teh","price":5000,"quantity":1},
            {"name":"Kopi","price":8000}
        ]}"#;
        let err = parse_structuring_response(response).unwrap_err();
        assert!(matches!(err, SplitError::Structuring(ref m) if m.starts_with("item 1")));
    }

    #[test]
    fn test_loose_field_types_kept_for_normalizer() {
        let items = parse_structuring_response(
            r#"{"items":[{"name":"Es Jeruk","price":"7000","quantity":null,"note":"x"}]}"#,
        )
        .unwrap();
        assert_eq!(items[0].price, json!("7000"));
        assert_eq!(items[0].quantity, Value::Null);
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    struct Recorder {
        seen: Mutex<Vec<String>>,
        reply: String,
    }

    #[async_trait]
    impl ReceiptStructurer for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        async fn complete(&self, raw_text: &str) -> Result<String> {
            self.seen.lock().unwrap().push(raw_text.to_string());
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_structure_receipt_truncates_and_parses() {
        let recorder = Recorder {
            seen: Mutex::new(Vec::new()),
            reply: "```json\n{\"items\":[{\"name\":\"A\",\"price\":2,\"quantity\":2}]}\n```"
                .to_string(),
        };

        let items = structure_receipt(&recorder, "0123456789", 4).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(recorder.seen.lock().unwrap().as_slice(), ["0123"]);
    }
}
