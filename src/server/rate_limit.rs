//! Per-client sliding-window rate limiting
//!
//! In-process only; suitable for a single-instance deployment. Each client
//! IP gets a window of recent request instants, pruned on every check.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    hits: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request from `client` if it fits in the window.
    ///
    /// Returns `Err(retry_after_secs)` when the client is over the limit;
    /// the hint is the time until the oldest counted request leaves the
    /// window, never less than one second.
    pub fn check(&self, client: IpAddr) -> Result<(), u64> {
        let now = Instant::now();
        let mut hits = self.hits.lock();
        let times = hits.entry(client).or_default();
        times.retain(|t| now.duration_since(*t) < self.window);

        if times.len() >= self.max_requests {
            let oldest = times[0];
            let retry_after = self
                .window
                .saturating_sub(now.duration_since(oldest))
                .as_secs()
                .max(1);
            return Err(retry_after);
        }

        times.push(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, last))
    }

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 10);
        for _ in 0..10 {
            assert!(limiter.check(ip(1)).is_ok());
        }
    }

    #[test]
    fn test_eleventh_request_is_limited_with_positive_hint() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 10);
        for _ in 0..10 {
            limiter.check(ip(1)).unwrap();
        }
        let retry_after = limiter.check(ip(1)).unwrap_err();
        assert!(retry_after >= 1);
    }

    #[test]
    fn test_clients_are_tracked_separately() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(2)).is_ok());
        assert!(limiter.check(ip(1)).is_err());
    }

    #[test]
    fn test_window_expiry_frees_budget() {
        let limiter = RateLimiter::new(Duration::from_millis(40), 1);
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_err());
        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.check(ip(1)).is_ok());
    }
}
