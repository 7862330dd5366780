//! Token bucket rate limiter for outbound API calls.
//!
//! Generalizes the fixed 501ms inter-request spacing the client used to
//! enforce by hand (see api_client::ApiClient::wait_rate_limit in earlier
//! revisions) into a real bucket: `capacity` tokens refill every `window`.
//! Burst up to `capacity` requests, then block until the next refill.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

struct State {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    capacity: f64,
    window: Duration,
    state: Arc<Mutex<State>>,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        RateLimiter {
            capacity: capacity.max(1) as f64,
            window,
            state: Arc::new(Mutex::new(State {
                tokens: capacity.max(1) as f64,
                last_refill: Instant::now(),
            })),
        }
    }

    pub fn from_config() -> Self {
        let cfg = &crate::config::CONFIG;
        RateLimiter::new(
            cfg.rate_limit_capacity,
            Duration::from_millis(cfg.rate_limit_window_ms),
        )
    }

    fn refill_rate_per_sec(&self) -> f64 {
        self.capacity / self.window.as_secs_f64()
    }

    /// Blocks until a token is available, then consumes it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.refill_rate_per_sec()).min(self.capacity);
                state.last_refill = now;
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    None
                } else {
                    let deficit = 1.0 - state.tokens;
                    Some(Duration::from_secs_f64(deficit / self.refill_rate_per_sec()))
                }
            };
            match wait {
                None => return,
                Some(d) => tokio::time::sleep(d).await,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn burst_up_to_capacity_does_not_block() {
        let limiter = RateLimiter::new(3, Duration::from_millis(1000));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn exceeding_capacity_blocks_until_refill() {
        let limiter = RateLimiter::new(1, Duration::from_millis(200));
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(150));
    }
}
