//! Vision provider trait and error types
//!
//! Everything the provider returns is untrusted free-form text; recovery of
//! structured data happens downstream in the scan pipeline.

use std::fmt;

use async_trait::async_trait;

/// Error types for vision model calls
#[derive(Debug, Clone)]
pub enum VisionError {
    /// Transport failure or timeout (retryable)
    Unavailable(String),
    /// Non-2xx response from the provider (hard failure, never retried)
    Rejected { status: u16, body: String },
    /// 2xx response whose envelope is missing the completion content
    BadPayload(String),
}

impl fmt::Display for VisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisionError::Unavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            VisionError::Rejected { status, body } => {
                write!(f, "Provider rejected request: {} - {}", status, body)
            }
            VisionError::BadPayload(msg) => write!(f, "Invalid provider payload: {}", msg),
        }
    }
}

impl std::error::Error for VisionError {}

impl VisionError {
    /// Transient transport failures are the only retryable class
    pub fn is_retryable(&self) -> bool {
        matches!(self, VisionError::Unavailable(_))
    }
}

/// Resilient transport to an external multimodal completion endpoint
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Submit one image for extraction and return the raw model text
    /// (the content of the first completion choice).
    async fn analyze_image(
        &self,
        image: &[u8],
        correlation_id: &str,
    ) -> Result<String, VisionError>;
}
