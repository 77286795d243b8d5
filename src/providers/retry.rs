//! Retry with exponential backoff and jitter
//!
//! Shared by the Flipside and Supabase clients. Only transient failures
//! (timeouts, connection errors, HTTP 429 and 5xx) are retried.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{AppError, AppResult, ErrorCode};

/// Base retry delay in milliseconds
pub const BASE_RETRY_MS: u64 = 500;

/// Maximum retry delay in milliseconds
pub const MAX_RETRY_MS: u64 = 8_000;

/// Attempts including the first one
pub const MAX_ATTEMPTS: u32 = 4;

/// Jitter as a percentage of the delay
pub const RETRY_JITTER_PERCENT: u64 = 20;

/// Backoff policy
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_ms: u64,
    pub max_ms: u64,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_ms: BASE_RETRY_MS,
            max_ms: MAX_RETRY_MS,
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            base_ms: 0,
            max_ms: 0,
            max_attempts,
        }
    }

    /// Delay before `attempt` (1-based retry number), jitter applied
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self
            .base_ms
            .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)));
        let capped = base.min(self.max_ms);
        if capped == 0 {
            return Duration::ZERO;
        }

        let jitter_range = (capped * RETRY_JITTER_PERCENT / 100) as i64;
        let jitter: i64 = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
        Duration::from_millis((capped as i64 + jitter).max(0) as u64)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut last_error: Option<AppError> = None;

        for attempt in 0..self.max_attempts.max(1) {
            if attempt > 0 {
                let delay = self.delay_for(attempt);
                debug!(
                    "⏳ {}: retry {}/{} after {}ms",
                    what,
                    attempt + 1,
                    self.max_attempts,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.code.is_retryable() => {
                    warn!("⚠️ {} failed (attempt {}): {}", what, attempt + 1, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::new(ErrorCode::Unknown, format!("{} failed without an error", what))
        }))
    }
}

/// Map an HTTP status into the calling provider's error code
pub fn classify_status(
    status: reqwest::StatusCode,
    rate_limited: ErrorCode,
    retryable: ErrorCode,
    fatal: ErrorCode,
) -> ErrorCode {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        rate_limited
    } else if status.is_server_error() {
        retryable
    } else {
        fatal
    }
}

/// A request that never produced a response. Timeouts stay `EXTERNAL_TIMEOUT`,
/// everything else is reported under the provider's `connection` code.
pub fn transport_error(err: reqwest::Error, connection: ErrorCode, what: &str) -> AppError {
    if err.is_timeout() {
        AppError::with_source(ErrorCode::ExternalTimeout, format!("{} timed out", what), err)
    } else {
        AppError::with_source(connection, format!("{} request failed", what), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        let delay = policy.delay_for(10);
        let max_with_jitter = MAX_RETRY_MS + MAX_RETRY_MS * RETRY_JITTER_PERCENT / 100;
        assert!(delay.as_millis() as u64 <= max_with_jitter);
    }

    #[test]
    fn test_immediate_policy_has_no_delay() {
        assert_eq!(RetryPolicy::immediate(3).delay_for(2), Duration::ZERO);
    }

    #[test]
    fn test_classify_status_uses_provider_codes() {
        let limited = ErrorCode::SupabaseRateLimited;
        let retry = ErrorCode::SupabaseError;
        let fatal = ErrorCode::SupabaseInvalidResponse;
        assert_eq!(
            classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS, limited, retry, fatal),
            ErrorCode::SupabaseRateLimited
        );
        assert_eq!(
            classify_status(reqwest::StatusCode::BAD_GATEWAY, limited, retry, fatal),
            retry
        );
        assert_eq!(
            classify_status(reqwest::StatusCode::NOT_FOUND, limited, retry, fatal),
            fatal
        );

        assert_eq!(
            classify_status(
                reqwest::StatusCode::TOO_MANY_REQUESTS,
                ErrorCode::FlipsideRateLimited,
                ErrorCode::FlipsideConnectionFailed,
                ErrorCode::FlipsideQueryFailed,
            ),
            ErrorCode::FlipsideRateLimited
        );
    }

    #[tokio::test]
    async fn test_transport_error_uses_provider_code() {
        // Nothing listens on a freshly released port
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new()
            .get(format!("http://{}/rest/v1/safe_tokens", addr))
            .send()
            .await
            .unwrap_err();
        let mapped = transport_error(err, ErrorCode::SupabaseError, "safe_tokens");
        assert_eq!(mapped.code, ErrorCode::SupabaseError);
        assert!(mapped.code.is_retryable());
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::immediate(3)
            .run("flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(AppError::new(ErrorCode::FlipsideTimeout, "slow"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_stop_immediately() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = RetryPolicy::immediate(5)
            .run("broken", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::query_failed("syntax error")) }
            })
            .await;
        assert_eq!(result.unwrap_err().code, ErrorCode::FlipsideQueryFailed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
