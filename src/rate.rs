//! Shared-cadence rate limiter for producer tasks.
//!
//! All producers gate their emissions through one [`RateLimiter`], so the
//! aggregate throughput tracks the target rate regardless of how many
//! producers are running.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between any two admitted emissions,
/// system-wide.
///
/// One mutex guards the last-admission instant. A producer entering
/// [`admit`](RateLimiter::admit) computes the time since the previous
/// admission and sleeps for the remainder of the interval while still holding
/// the lock; releasing before sleeping would let waiting producers stack up
/// admissions inside a single interval.
pub struct RateLimiter {
    interval: Duration,
    last_admission: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter targeting `rate` admissions per second.
    ///
    /// # Panics
    ///
    /// Panics if `rate` is not strictly positive and finite. Configuration
    /// validation rejects such rates before a limiter is ever built.
    pub fn new(rate: f64) -> Self {
        assert!(
            rate.is_finite() && rate > 0.0,
            "rate must be strictly positive"
        );

        Self {
            interval: Duration::from_secs_f64(1.0 / rate),
            last_admission: Mutex::new(None),
        }
    }

    /// Block the calling task until the shared cadence allows one more
    /// emission. The first admission is free. Never fails.
    pub async fn admit(&self) {
        let mut last = self.last_admission.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// The enforced minimum interval between admissions.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}
