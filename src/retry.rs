//! Generic bounded retry with exponential backoff and jitter.
//!
//! One policy object serves every outbound wait in the crate: lock
//! acquisition, CAS retry pacing, and any collaborator call that reports
//! a transient failure.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff policy. All waits are bounded; there is no
/// unbounded retry anywhere in the engine.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Extra random delay as a fraction of the computed backoff, in
    /// `0.0..=1.0`. Zero disables jitter.
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(2),
            jitter_ratio: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (zero-based; the delay
    /// after the first failed attempt is `delay_for(0)`).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = backoff.min(self.max_delay.as_secs_f64());
        let jitter = if self.jitter_ratio > 0.0 {
            capped * rand::rng().random_range(0.0..=self.jitter_ratio)
        } else {
            0.0
        };
        Duration::from_secs_f64(capped + jitter)
    }

    /// Run `op` until it succeeds, the error stops being retryable, or
    /// the attempt budget is exhausted. `op` receives the zero-based
    /// attempt number.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, mut is_retryable: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: FnMut(&E) -> bool,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_err = None;
        for attempt in 0..attempts {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !is_retryable(&err) || attempt + 1 == attempts {
                        return Err(err);
                    }
                    last_err = Some(err);
                    tokio::time::sleep(self.delay_for(attempt)).await;
                }
            }
        }
        // Unreachable: the loop always returns on the last attempt.
        Err(last_err.expect("retry loop ran at least once"))
    }
}
