//! Error types for the generation backend layer

use thiserror::Error;

/// Failure classification for a backend call.
///
/// Callers branch on this enum, never on error message text. The kind decides
/// both the retry policy and the user-facing reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Backend asked us to slow down (HTTP 429). Retryable.
    RateLimited,
    /// Account quota or billing exhausted. Retrying cannot help.
    QuotaExhausted,
    /// Network hiccup, timeout or server-side error. Retryable.
    Transient,
    /// Client-side or protocol error. Retrying cannot help.
    Fatal,
}

/// Generation backend error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("{provider} HTTP {status}: {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
        kind: ErrorKind,
        retry_after_secs: Option<u64>,
    },

    #[error("request to {provider} failed: {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} request timed out after {timeout_secs}s")]
    Timeout { provider: String, timeout_secs: u64 },

    #[error("invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AiError {
    /// Classify this error for retry and reporting decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http { kind, .. } => *kind,
            // Connection resets, DNS blips and body read failures are worth
            // another attempt; so are timeouts.
            Self::Network { .. } | Self::Timeout { .. } => ErrorKind::Transient,
            Self::InvalidResponse { .. } | Self::Json(_) => ErrorKind::Fatal,
        }
    }

    /// Whether the retry loop should attempt this call again.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimited | ErrorKind::Transient)
    }

    /// Server-provided retry hint, if any.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::Http {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Result type alias for backend operations
pub type Result<T> = std::result::Result<T, AiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http_error(status: u16, kind: ErrorKind) -> AiError {
        AiError::Http {
            provider: "test".to_string(),
            status,
            message: String::new(),
            kind,
            retry_after_secs: None,
        }
    }

    #[test]
    fn test_rate_limited_is_retryable() {
        assert!(http_error(429, ErrorKind::RateLimited).is_retryable());
    }

    #[test]
    fn test_quota_is_terminal() {
        assert!(!http_error(429, ErrorKind::QuotaExhausted).is_retryable());
    }

    #[test]
    fn test_fatal_is_terminal() {
        assert!(!http_error(401, ErrorKind::Fatal).is_retryable());
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = AiError::Timeout {
            provider: "test".to_string(),
            timeout_secs: 30,
        };
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_invalid_response_is_fatal() {
        let err = AiError::InvalidResponse {
            provider: "test".to_string(),
            message: "no choices".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }
}
