use thiserror::Error;

/// Coarse error classification used by the retry layer.
///
/// Retry decisions switch on this, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network resets, timeouts, 5xx responses. Worth retrying.
    Transient,
    /// Rate or quota limits. Worth retrying after a longer backoff.
    RateLimit,
    /// Schema mismatches, malformed payloads, oversized requests. Never retried.
    Validation,
    /// Provider-side content safety block. Never retried.
    Safety,
    /// Required input (transcript, video id) is unavailable.
    MissingData,
    Cancelled,
    Fatal,
}

#[derive(Error, Debug)]
pub enum KursError {
    #[error("API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Rate limit exceeded for {operation}")]
    RateLimited { operation: String },

    #[error("Estimated {estimated} tokens exceeds the per-request ceiling of {limit}")]
    TokenBudget { estimated: u32, limit: u32 },

    #[error("Content generation was blocked: {reason}")]
    ContentBlocked { reason: String },

    #[error("Invalid model response: {reason}")]
    InvalidResponse { reason: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("No transcript available for video {video_id}")]
    NoTranscript { video_id: String },

    #[error("Could not extract a video or playlist id from {input:?}")]
    InvalidVideoId { input: String },

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Course generation failed: {reason}")]
    GenerationFailed { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl KursError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KursError::Http(e) => {
                if e.is_decode() {
                    ErrorKind::Validation
                } else {
                    ErrorKind::Transient
                }
            }
            KursError::UpstreamStatus { status, .. } => match status {
                429 => ErrorKind::RateLimit,
                500..=599 => ErrorKind::Transient,
                _ => ErrorKind::Fatal,
            },
            KursError::RateLimited { .. } => ErrorKind::RateLimit,
            KursError::TokenBudget { .. } => ErrorKind::Validation,
            KursError::ContentBlocked { .. } => ErrorKind::Safety,
            KursError::InvalidResponse { .. } | KursError::Json(_) => ErrorKind::Validation,
            KursError::MissingApiKey { .. } => ErrorKind::Fatal,
            KursError::NoTranscript { .. } | KursError::InvalidVideoId { .. } => {
                ErrorKind::MissingData
            }
            KursError::Cancelled => ErrorKind::Cancelled,
            KursError::GenerationFailed { .. } => ErrorKind::Fatal,
            KursError::IoError(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient | ErrorKind::RateLimit)
    }
}

pub type Result<T> = std::result::Result<T, KursError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_5xx_is_transient() {
        let err = KursError::UpstreamStatus {
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.is_retryable());
    }

    #[test]
    fn upstream_429_is_rate_limit() {
        let err = KursError::UpstreamStatus {
            status: 429,
            body: "too many requests".into(),
        };
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert!(err.is_retryable());
    }

    #[test]
    fn validation_errors_are_not_retryable() {
        let err = KursError::InvalidResponse {
            reason: "missing title".into(),
        };
        assert!(!err.is_retryable());

        let err = KursError::TokenBudget {
            estimated: 50_000,
            limit: 16_000,
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn safety_block_is_not_retryable() {
        let err = KursError::ContentBlocked {
            reason: "safety".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Safety);
        assert!(!err.is_retryable());
    }
}
