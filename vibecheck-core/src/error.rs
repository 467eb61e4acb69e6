//! Error types for vibecheck-core.

use thiserror::Error;

/// Result type alias using vibecheck-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while verifying or merging text.
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any claim was extracted
    #[error("Extraction error: {reason}")]
    Extraction { reason: String },

    /// A single evidence channel failed for a single claim.
    ///
    /// Recovered locally by the resolver; only surfaces from direct
    /// provider calls.
    #[error("Evidence provider error: {channel} - {message}")]
    EvidenceProvider { channel: String, message: String },

    /// Every evidence channel failed for every fact claim in the request
    #[error("Verification unavailable: evidence providers failed for all {claims} fact claims")]
    VerificationUnavailable { claims: usize },

    /// Batch request exceeds the configured size
    #[error("Batch too large: {got} texts submitted, at most {max} allowed")]
    BatchTooLarge { max: usize, got: usize },

    /// Timeout during operation
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an extraction error.
    pub fn extraction(reason: impl Into<String>) -> Self {
        Self::Extraction {
            reason: reason.into(),
        }
    }

    /// Create an evidence provider error.
    pub fn provider(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EvidenceProvider {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Whether this error means no report can be produced at all.
    pub fn is_hard_failure(&self) -> bool {
        matches!(
            self,
            Self::Extraction { .. }
                | Self::VerificationUnavailable { .. }
                | Self::BatchTooLarge { .. }
        )
    }
}
