use crate::error::{Result, SplitError};
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ocr: OcrSection,
    #[serde(default)]
    pub structuring: StructuringSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrSection {
    #[serde(default = "default_tesseract_binary")]
    pub binary: String,
    #[serde(default = "default_ocr_language")]
    pub language: String,
    /// Upper bound for a single recognition. `None` waits indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_tesseract_binary() -> String {
    "tesseract".to_string()
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            binary: default_tesseract_binary(),
            language: default_ocr_language(),
            timeout_secs: None,
        }
    }
}

impl OcrSection {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuringBackend {
    Gemini,
    Chat,
    Heuristic,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StructuringSection {
    #[serde(default = "default_backend")]
    pub backend: StructuringBackend,
    /// OCR text longer than this is cut before it is sent.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

fn default_backend() -> StructuringBackend {
    StructuringBackend::Gemini
}

fn default_max_chars() -> usize {
    12_000
}

impl Default for StructuringSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            max_chars: default_max_chars(),
            timeout_secs: None,
            gemini: GeminiConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl StructuringSection {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_gemini_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_url(),
            model: default_gemini_model(),
            api_key_env: default_gemini_key_env(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Environment variable holding a bearer token. When the variable is
    /// unset the request goes out without credentials (local Ollama).
    #[serde(default = "default_chat_key_env")]
    pub api_key_env: Option<String>,
}

fn default_chat_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_chat_model() -> String {
    "qwen2.5:7b".to_string()
}

fn default_chat_key_env() -> Option<String> {
    Some("LLM_API_KEY".to_string())
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_url(),
            model: default_chat_model(),
            api_key_env: default_chat_key_env(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| SplitError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SplitError::Config(e.to_string()))
    }
}
