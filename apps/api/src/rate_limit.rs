//! Per-client limits on the endpoints that launch model-backed runs.
//!
//! A sliding window of recent hits per (action, client address). The state is
//! in-process only; a restart forgets the counters, which is enough to damp
//! abuse of the expensive endpoints on a single instance.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Registry of recent hits per action and client.
#[derive(Clone, Default)]
pub struct RateLimiter {
    hits: Arc<Mutex<HashMap<(&'static str, IpAddr), Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one hit and reports whether the client is still within `limit`
    /// hits of `action` per `window`. A denied call is not recorded, so being
    /// turned away does not extend the wait.
    pub async fn check(
        &self,
        action: &'static str,
        client: IpAddr,
        limit: usize,
        window: Duration,
    ) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let recent = hits.entry((action, client)).or_default();
        recent.retain(|at| now.duration_since(*at) < window);
        if recent.len() >= limit {
            return false;
        }
        recent.push(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const WINDOW: Duration = Duration::from_secs(3600);

    fn client(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, last))
    }

    #[tokio::test]
    async fn test_denies_past_the_limit() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.check("create_job", client(1), 3, WINDOW).await);
        }
        assert!(!limiter.check("create_job", client(1), 3, WINDOW).await);
    }

    #[tokio::test]
    async fn test_actions_and_clients_are_independent() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("create_job", client(1), 1, WINDOW).await);
        assert!(!limiter.check("create_job", client(1), 1, WINDOW).await);

        // a different action and a different client each have their own window
        assert!(limiter.check("source_more", client(1), 1, WINDOW).await);
        assert!(limiter.check("create_job", client(2), 1, WINDOW).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("create_job", client(1), 1, WINDOW).await);
        assert!(!limiter.check("create_job", client(1), 1, WINDOW).await);

        tokio::time::advance(WINDOW).await;
        assert!(limiter.check("create_job", client(1), 1, WINDOW).await);
    }
}
