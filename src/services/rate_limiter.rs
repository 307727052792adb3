use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window rate limiter: at most `max_requests` grants in any
/// trailing `window`. One instance per logical remote endpoint, shared
/// across workers via `Arc`. The timestamp queue is the only state that
/// needs mutual exclusion; the lock is never held across a sleep, so a
/// blocked caller never blocks the others.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    stamps: Arc<Mutex<VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn new(max_requests: usize, window: Duration) -> Self {
        RateLimiter {
            max_requests,
            window,
            stamps: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Wait until issuing one more request stays inside the window, then
    /// record the grant. Returns immediately while capacity exists.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut stamps = self.stamps.lock().await;
                let now = Instant::now();
                while let Some(oldest) = stamps.front() {
                    if now.duration_since(*oldest) >= self.window {
                        stamps.pop_front();
                    } else {
                        break;
                    }
                }

                if stamps.len() < self.max_requests {
                    stamps.push_back(now);
                    return;
                }

                // Oldest stamp ages out after window - its current age.
                match stamps.front() {
                    Some(oldest) => self.window - now.duration_since(*oldest),
                    None => self.window,
                }
            };

            log::debug!("rate limiter full, sleeping {:?}", wait);
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_n_acquires_do_not_sleep() {
        let limiter = RateLimiter::new(3, Duration::from_millis(500));

        let started = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn acquire_past_capacity_waits_for_window() {
        let limiter = RateLimiter::new(2, Duration::from_millis(300));

        let started = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        // The third grant has to wait for the first stamp to age out.
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn capacity_recovers_after_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(100));

        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
