//! Exponential backoff around calls to the hosted model.
//!
//! Rate limits, gateway errors and dropped connections are retried. Other
//! 4xx answers (bad key, unknown model) fail on the first attempt. The
//! router's per-call timeout still bounds the whole sequence.

use anyhow::Result;
use reqwest::{Response, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(4),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    /// Base delay after the given failed attempt (1-based), before jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.backoff_factor.powi(attempt.saturating_sub(1) as i32);
        let secs = self.initial_delay.as_secs_f64() * exp;
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// What one attempt tells us about the next.
enum Outcome {
    Done(Response),
    Retry(String),
    Fatal(String),
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

async fn judge(result: Result<Response>) -> Outcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => return Outcome::Retry(format!("network error: {}", e)),
    };
    let status = response.status();
    if status.is_success() {
        return Outcome::Done(response);
    }
    let body: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(200)
        .collect();
    if is_transient(status) {
        Outcome::Retry(format!("{}: {}", status, body))
    } else {
        Outcome::Fatal(format!("{}: {}", status, body))
    }
}

/// Send a request built by `send` until it succeeds, fails permanently, or
/// runs out of attempts.
pub async fn with_retry<F, Fut>(config: &RetryConfig, backend: &str, send: F) -> Result<Response>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Response>>,
{
    let attempts = config.max_attempts.max(1);
    let mut last = String::from("no attempt made");

    for attempt in 1..=attempts {
        match judge(send().await).await {
            Outcome::Done(response) => {
                if attempt > 1 {
                    tracing::info!(backend, attempt, "Model call recovered");
                }
                return Ok(response);
            }
            Outcome::Fatal(reason) => anyhow::bail!("{} rejected the request ({})", backend, reason),
            Outcome::Retry(reason) => {
                tracing::warn!(backend, attempt, attempts, %reason, "Transient model failure");
                last = reason;
            }
        }

        if attempt < attempts {
            let base = config.delay_for(attempt);
            tokio::time::sleep(base + jitter(base / 2)).await;
        }
    }

    anyhow::bail!("{} failed after {} attempts (last: {})", backend, attempts, last)
}

/// Cheap jitter in `[0, max)` taken from the clock's sub-second nanos.
fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    Duration::from_millis(nanos % max_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient(StatusCode::REQUEST_TIMEOUT));
        assert!(!is_transient(StatusCode::UNAUTHORIZED));
        assert!(!is_transient(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let cfg = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(300),
            backoff_factor: 2.0,
        };
        assert_eq!(cfg.delay_for(1), Duration::from_millis(100));
        assert_eq!(cfg.delay_for(2), Duration::from_millis(200));
        assert_eq!(cfg.delay_for(3), Duration::from_millis(300));
        assert_eq!(cfg.delay_for(9), Duration::from_millis(300));
    }

    #[test]
    fn test_jitter_is_bounded() {
        assert_eq!(jitter(Duration::ZERO), Duration::ZERO);
        for _ in 0..20 {
            assert!(jitter(Duration::from_millis(5)) < Duration::from_millis(5));
        }
    }
}
