// src/ocr.rs

use crate::config::OcrSection;
use crate::error::{Result, SplitError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::{info, warn};

/// A live recognition resource. Used for one image, then terminated.
#[async_trait]
pub trait OcrWorker: Send {
    async fn recognize(&mut self, image: &[u8]) -> Result<String>;

    /// Release the worker. Must be safe to call after a failed `recognize`.
    async fn terminate(self: Box<Self>);
}

/// Factory for OCR workers.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn create_worker(&self) -> Result<Box<dyn OcrWorker>>;
}

/// Extract text from one receipt image.
///
/// Acquires a worker, runs exactly one recognition and terminates the worker
/// on every exit path, including recognition errors and timeouts.
pub async fn read_receipt(
    engine: &dyn OcrEngine,
    image: &[u8],
    timeout: Option<Duration>,
) -> Result<String> {
    let mut worker = engine.create_worker().await?;

    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, worker.recognize(image)).await {
            Ok(result) => result,
            Err(_) => Err(SplitError::Extraction(format!(
                "recognition timed out after {limit:?}"
            ))),
        },
        None => worker.recognize(image).await,
    };

    worker.terminate().await;

    match &result {
        Ok(text) => info!(chars = text.len(), "Text extracted from receipt"),
        Err(e) => warn!(error = %e, "Receipt text extraction failed"),
    }
    result
}

/// Runs the `tesseract` command line tool, one child process per worker.
pub struct TesseractEngine {
    binary: String,
    language: String,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    pub fn from_config(cfg: &OcrSection) -> Self {
        Self::new(cfg.binary.clone(), cfg.language.clone())
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn create_worker(&self) -> Result<Box<dyn OcrWorker>> {
        // Image on stdin, text on stdout.
        let child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SplitError::Extraction(format!("cannot start {}: {e}", self.binary)))?;

        info!(binary = %self.binary, language = %self.language, "OCR worker started");
        Ok(Box::new(TesseractWorker { child }))
    }
}

struct TesseractWorker {
    child: Child,
}

#[async_trait]
impl OcrWorker for TesseractWorker {
    async fn recognize(&mut self, image: &[u8]) -> Result<String> {
        if image.is_empty() {
            return Err(SplitError::Extraction("image is empty".into()));
        }

        let mut stdin = self
            .child
            .stdin
            .take()
            .ok_or_else(|| SplitError::Extraction("worker already used".into()))?;
        let mut stdout = self
            .child
            .stdout
            .take()
            .ok_or_else(|| SplitError::Extraction("worker already used".into()))?;
        let mut stderr = self.child.stderr.take();

        let write = async {
            stdin.write_all(image).await?;
            // Closing stdin signals end of image.
            drop(stdin);
            Ok::<_, std::io::Error>(())
        };
        let read = async {
            let mut text = String::new();
            stdout.read_to_string(&mut text).await?;
            Ok::<_, std::io::Error>(text)
        };
        // An early exit surfaces here as a broken pipe; the exit status and
        // stderr below say why, so they take precedence.
        let piped = tokio::try_join!(write, read);

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| SplitError::Extraction(e.to_string()))?;

        if !status.success() {
            let mut detail = String::new();
            if let Some(stderr) = stderr.as_mut() {
                let _ = stderr.read_to_string(&mut detail).await;
            }
            return Err(SplitError::Extraction(format!(
                "tesseract exited with {status}: {}",
                detail.trim()
            )));
        }

        let (_, text) =
            piped.map_err(|e| SplitError::Extraction(format!("OCR pipe error: {e}")))?;
        Ok(text)
    }

    async fn terminate(self: Box<Self>) {
        let mut child = self.child;
        // Already exited after a successful recognition; this only matters
        // on the error and timeout paths.
        if let Err(e) = child.start_kill() {
            if e.kind() != std::io::ErrorKind::InvalidInput {
                warn!(error = %e, "Failed to kill OCR worker");
            }
        }
        let _ = child.wait().await;
    }
}
