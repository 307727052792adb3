use std::future::Future;
use std::time::Duration;

use crate::domain::ResearchError;

/// One retry policy shared by every network-calling component, instead of
/// ad hoc sleep loops per call site. A 429 waits out the long cooldown;
/// plain network faults take the short backoff; terminal errors return
/// immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub rate_limit_cooldown: Duration,
    pub network_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            rate_limit_cooldown: Duration::from_secs(60),
            network_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ResearchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ResearchError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let backoff = match e {
                        ResearchError::RateLimited => self.rate_limit_cooldown,
                        _ => self.network_backoff,
                    };
                    log::warn!(
                        "attempt {}/{} failed ({}), retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            rate_limit_cooldown: Duration::from_millis(10),
            network_backoff: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = fast_policy()
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(7) }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_network_errors_up_to_cap() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = fast_policy()
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ResearchError::Network("connect refused".to_string())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = fast_policy()
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ResearchError::NoResults) }
            })
            .await;

        assert!(matches!(result, Err(ResearchError::NoResults)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_when_a_later_attempt_succeeds() {
        let calls = AtomicU32::new(0);
        let result = fast_policy()
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 1 {
                        Err(ResearchError::RateLimited)
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
