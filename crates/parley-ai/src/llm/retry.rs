//! Retry policy and HTTP failure classification

use std::time::Duration;

use reqwest::Response;
use serde::Deserialize;

use crate::error::{AiError, ErrorKind};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff delay before `attempt` (1-based). Strictly increasing until it
    /// hits `max_delay_ms`; a server-provided Retry-After hint wins outright.
    pub fn delay_for(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        if let Some(seconds) = retry_after_secs {
            return Duration::from_secs(seconds);
        }

        let multiplier = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let delay = (self.initial_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

pub fn parse_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
}

/// Error envelope OpenAI-compatible backends return for non-2xx responses.
#[derive(Debug, Deserialize, Default)]
struct ApiErrorBody {
    #[serde(default)]
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize, Default)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    error_type: String,
    #[serde(default)]
    code: String,
}

/// Map an HTTP status plus the decoded error body to a failure kind.
///
/// Quota exhaustion arrives as 429 with an `insufficient_quota` marker, so it
/// has to be told apart from a plain rate limit here, at decode time. This is
/// the one place wire-level detail is inspected; callers only ever see the
/// resulting `ErrorKind`.
fn classify_status(status: u16, detail: &ApiErrorDetail) -> ErrorKind {
    match status {
        429 => {
            if detail.error_type == "insufficient_quota" || detail.code == "insufficient_quota" {
                ErrorKind::QuotaExhausted
            } else {
                ErrorKind::RateLimited
            }
        }
        402 => ErrorKind::QuotaExhausted,
        500..=599 | 408 => ErrorKind::Transient,
        _ => ErrorKind::Fatal,
    }
}

/// Convert a non-2xx response into a classified `AiError`.
pub async fn response_to_error(response: Response, provider: &str) -> AiError {
    let status = response.status().as_u16();
    let retry_after = parse_retry_after(&response);
    let body = response.text().await.unwrap_or_default();

    let detail = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|envelope| envelope.error)
        .unwrap_or_default();
    let kind = classify_status(status, &detail);

    // Truncate the raw body so huge error pages don't end up in logs.
    const MAX_ERROR_BODY: usize = 512;
    let message = if !detail.message.is_empty() {
        detail.message
    } else if body.len() > MAX_ERROR_BODY {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i < MAX_ERROR_BODY)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}... [truncated]", &body[..cut])
    } else {
        body
    };

    AiError::Http {
        provider: provider.to_string(),
        status,
        message,
        kind,
        retry_after_secs: retry_after,
    }
}
