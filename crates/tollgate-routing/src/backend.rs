use async_trait::async_trait;
use thiserror::Error;
use tollgate_core::ModelTier;

/// Text and token counts produced by one model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Failure of a model invocation
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport or connection error
    #[error("model request failed: {0}")]
    Request(String),

    /// Backend answered with a non-success status
    #[error("model backend returned {status}: {message}")]
    Status {
        /// HTTP status from the backend
        status: u16,
        /// Response body, truncated
        message: String,
    },

    /// Backend answered with something that is not a completion
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

/// Remote generative model, addressed by tier
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn invoke(&self, tier: ModelTier, prompt: &str, max_output_tokens: u32) -> Result<Generation, BackendError>;

    /// Model name serving `tier`, for usage records
    fn model(&self, tier: ModelTier) -> &str;
}
