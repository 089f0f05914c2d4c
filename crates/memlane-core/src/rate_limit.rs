//! Minimum-interval throttle for outbound generation calls.

use log::{debug, info};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces calls at least `60s / requests_per_minute` apart.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Build a limiter; a zero rate is treated as one request per minute.
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = requests_per_minute.max(1);
        let interval = Duration::from_secs_f64(60.0 / f64::from(rpm));
        info!(
            "rate limiter initialized (rpm={}, interval_ms={})",
            rpm,
            interval.as_millis()
        );
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the interval since the previous call has elapsed.
    ///
    /// Concurrent callers queue on the internal lock and are released one
    /// interval apart.
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.interval;
            let now = Instant::now();
            if now < ready_at {
                debug!(
                    "rate limiting (sleep_ms={})",
                    (ready_at - now).as_millis()
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::RateLimiter;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Interval is derived from the per-minute rate.
    #[test]
    fn interval_follows_rate() {
        assert_eq!(RateLimiter::new(60).interval(), Duration::from_secs(1));
        assert_eq!(RateLimiter::new(0).interval(), Duration::from_secs(60));
    }

    /// The first call passes through and the second waits out the interval.
    #[tokio::test]
    async fn second_call_waits_for_interval() {
        let limiter = RateLimiter::new(1200);
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < limiter.interval());
        limiter.wait().await;
        assert!(start.elapsed() >= limiter.interval());
    }
}
