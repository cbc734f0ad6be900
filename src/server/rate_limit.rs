//! Minimum-interval gate shared by every operation of one agent.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Admits a call only if `interval` has passed since the last admitted call.
///
/// Rejected calls leave the timestamp untouched. A zero interval admits everything.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Try to admit a call at the current instant.
    pub fn check(&self) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let now = Instant::now();
        let mut last_call = self.last_call.lock();
        match *last_call {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                *last_call = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rejects_within_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        assert!(limiter.check());
        tokio::time::advance(Duration::from_millis(50)).await;
        assert!(!limiter.check());
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_after_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        assert!(limiter.check());
        tokio::time::advance(Duration::from_millis(200)).await;
        assert!(limiter.check());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_keeps_timestamp() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        assert!(limiter.check());
        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(!limiter.check());
        // 120ms after the admitted call, 60ms after the rejected one
        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(limiter.check());
    }

    #[test]
    fn test_zero_interval_disables() {
        let limiter = RateLimiter::new(Duration::ZERO);
        assert!(!limiter.is_enabled());
        assert!((0..10).all(|_| limiter.check()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_maximum_interval_admits_once() {
        let limiter = RateLimiter::new(Duration::MAX);
        assert!(limiter.check());
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(!limiter.check());
    }
}
