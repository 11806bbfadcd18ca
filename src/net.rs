//! Shared HTTP retry/backoff for the collaborator clients.
//!
//! Transport-level resilience only: 429/408/5xx and connect/timeout errors
//! are retried with exponential backoff and jitter, honoring Retry-After.
//! Application-level retries (the creation fix loop) live in the executor.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryDecision {
    Retryable,
    NonRetryable,
}

fn retry_decision_for_status(status: reqwest::StatusCode) -> RetryDecision {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        RetryDecision::Retryable
    } else {
        RetryDecision::NonRetryable
    }
}

fn retry_delay(
    attempt: u32,
    policy: &RetryPolicy,
    retry_after: Option<&reqwest::header::HeaderValue>,
) -> Duration {
    if let Some(value) = retry_after.and_then(|v| v.to_str().ok()) {
        if let Ok(secs) = value.parse::<u64>() {
            return Duration::from_secs(secs.min(30));
        }
    }

    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    let jitter = (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0))
        % 150;
    Duration::from_millis(base.saturating_add(jitter))
}

/// Send a request, retrying transient failures per the policy. The final
/// response (or transport error) is returned untouched for the caller to
/// classify.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, reqwest::Error> {
    let attempts = policy.max_attempts.max(1);
    let mut last_err: Option<reqwest::Error> = None;

    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return request.send().await;
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                if retry_decision_for_status(status) == RetryDecision::Retryable
                    && attempt < attempts
                {
                    let delay = retry_delay(
                        attempt,
                        policy,
                        response.headers().get(reqwest::header::RETRY_AFTER),
                    );
                    log::warn!(
                        "http retry {}/{} after status {} (sleep {:?})",
                        attempt,
                        attempts,
                        status,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                let retryable_transport = err.is_timeout() || err.is_connect();
                if retryable_transport && attempt < attempts {
                    let delay = retry_delay(attempt, policy, None);
                    log::warn!(
                        "http retry {}/{} after transport error: {} (sleep {:?})",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    last_err = Some(err);
                    continue;
                }
                return Err(err);
            }
        }
    }

    // Unreachable in practice: the loop always returns on its last attempt.
    match last_err {
        Some(err) => Err(err),
        None => request.send().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_decision() {
        assert_eq!(
            retry_decision_for_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
            RetryDecision::Retryable
        );
        assert_eq!(
            retry_decision_for_status(reqwest::StatusCode::BAD_GATEWAY),
            RetryDecision::Retryable
        );
        assert_eq!(
            retry_decision_for_status(reqwest::StatusCode::UNAUTHORIZED),
            RetryDecision::NonRetryable
        );
        assert_eq!(
            retry_decision_for_status(reqwest::StatusCode::NOT_FOUND),
            RetryDecision::NonRetryable
        );
    }

    #[test]
    fn test_retry_delay_exponential() {
        let policy = RetryPolicy::default();
        let d1 = retry_delay(1, &policy, None).as_millis() as u64;
        let d2 = retry_delay(2, &policy, None).as_millis() as u64;
        assert!(d1 >= policy.initial_backoff_ms);
        assert!(d2 >= policy.initial_backoff_ms * 2);
        assert!(d2 <= policy.max_backoff_ms + 150);
    }

    #[test]
    fn test_retry_delay_honors_retry_after() {
        let policy = RetryPolicy::default();
        let header = reqwest::header::HeaderValue::from_static("3");
        let d = retry_delay(1, &policy, Some(&header));
        assert_eq!(d, Duration::from_secs(3));
    }
}
