use serde::{Deserialize, Serialize};
use std::fmt;

/// Code used when the text-generation adapter errors or returns an unusable shape.
pub const LOG_GENERATION_FAILED: &str = "LOG_GENERATION_FAILED";
/// Code used when the text-generation adapter does not answer before the deadline.
pub const LOG_GENERATION_TIMEOUT: &str = "LOG_GENERATION_TIMEOUT";

/// Single structured error shape shared by the store, the aggregation pipeline and the
/// generation adapters.
///
/// Data-quality problems inside incident documents are NOT errors; they travel as
/// [`crate::domain::ValidationWarning`] values next to the computed result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    /// Generation failures are always recoverable: the caller may offer a retry while the
    /// monthly statistics stay valid.
    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::new(LOG_GENERATION_FAILED, message).with_retryable(true)
    }

    pub fn generation_timeout(timeout_ms: u128) -> Self {
        Self::new(
            LOG_GENERATION_TIMEOUT,
            "Activity log generation did not finish before the deadline",
        )
        .with_details(format!("timeout_ms={timeout_ms}"))
        .with_retryable(true)
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_generation_failure(&self) -> bool {
        self.code == LOG_GENERATION_FAILED || self.code == LOG_GENERATION_TIMEOUT
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(d) => write!(f, "[{}] {} ({})", self.code, self.message, d),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

impl std::error::Error for AppError {}
