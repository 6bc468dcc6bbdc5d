use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::Result;

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Re-executions after the first attempt.
    pub retries: u32,
    pub delay: Duration,
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or
/// the retries are used up. Attempts are numbered from 1.
pub async fn run_with_retries<T, F, Fut>(policy: &RetryPolicy, mut attempt: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut number = 1;
    loop {
        match attempt(number).await {
            Ok(value) => {
                if number > 1 {
                    info!(attempt = number, "run succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && number <= policy.retries => {
                warn!(
                    attempt = number,
                    retries = policy.retries,
                    error = %err,
                    "run failed; retrying in {:?}",
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
                number += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::{AppError, ConfigError};
    use pipeline::PipelineError;

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            delay: Duration::ZERO,
        }
    }

    fn timeout_error() -> AppError {
        AppError::Pipeline(PipelineError::Timeout {
            budget: Duration::from_secs(1),
        })
    }

    #[tokio::test]
    async fn retries_pipeline_failures_until_success() {
        let calls = AtomicU32::new(0);
        let result = run_with_retries(&policy(3), |number| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if number < 3 {
                    Err(timeout_error())
                } else {
                    Ok(number)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_configured_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = run_with_retries(&policy(2), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(timeout_error()) }
        })
        .await;
        assert!(matches!(result, Err(AppError::Pipeline(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn setup_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = run_with_retries(&policy(3), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ConfigError::Missing("ASTRO_ORGANIZATION_ID".to_string()).into()) }
        })
        .await;
        assert!(matches!(result, Err(AppError::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
