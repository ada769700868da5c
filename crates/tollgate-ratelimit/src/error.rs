use thiserror::Error;

/// Rate limiting errors
#[derive(Debug, Error)]
pub enum RateLimitError {
    /// Configuration error
    #[error("rate limit configuration error: {0}")]
    Config(String),

    /// Redis connection or command error
    #[error("redis error: {0}")]
    Redis(String),

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    Exceeded {
        /// Seconds until another request is allowed
        retry_after: u64,
    },
}
