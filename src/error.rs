use thiserror::Error;

pub type Result<T> = std::result::Result<T, SplitError>;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("no receipt image supplied")]
    InputMissing,

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("receipt structuring failed: {0}")]
    Structuring(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("another receipt is still being processed")]
    Busy,

    #[error("configuration error: {0}")]
    Config(String),
}

impl SplitError {
    /// Single message shown to the user when an ingestion attempt fails.
    pub fn user_message(&self) -> String {
        match self {
            SplitError::InputMissing => "Choose a receipt image first.".to_string(),
            SplitError::Busy => "Still processing the previous receipt, please wait.".to_string(),
            other => format!(
                "Could not process the receipt. Error: {other}. Please try again or enter the items manually."
            ),
        }
    }
}

impl From<reqwest::Error> for SplitError {
    fn from(e: reqwest::Error) -> Self {
        SplitError::Structuring(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_wraps_pipeline_errors() {
        let msg = SplitError::Structuring("missing `items`".into()).user_message();
        assert!(msg.starts_with("Could not process the receipt."));
        assert!(msg.contains("missing `items`"));
    }

    #[test]
    fn test_input_missing_message() {
        assert_eq!(
            SplitError::InputMissing.user_message(),
            "Choose a receipt image first."
        );
    }
}
