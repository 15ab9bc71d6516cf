/// Fixed-window rate limiter
///
/// Each (route, client) pair owns one counter. The first request opens a
/// window; requests beyond the quota inside the window are rejected until
/// the window has fully elapsed, at which point the counter starts over.
///
/// Counters live in a [`DashMap`]; a check holds the shard lock for the
/// whole read-modify-write, so two concurrent requests can never both take
/// the last slot.
///
/// Windows that have run out are swept from the map at most once per
/// [`SWEEP_INTERVAL`], so the map only holds clients seen within their
/// quota's window.
///
/// Time is read from `tokio::time::Instant`, which tests can pause and
/// advance.
///
/// # Example
///
/// ```
/// use mechanic_shop_shared::policy::{Quota, RateLimiter};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let limiter = RateLimiter::new();
/// let quota = Quota::per_hour(2);
///
/// assert!(limiter.check("DELETE /service-tickets/:id", "10.0.0.1", quota).ok);
/// assert!(limiter.check("DELETE /service-tickets/:id", "10.0.0.1", quota).ok);
/// assert!(!limiter.check("DELETE /service-tickets/:id", "10.0.0.1", quota).ok);
///
/// // other clients are counted separately
/// assert!(limiter.check("DELETE /service-tickets/:id", "10.0.0.2", quota).ok);
/// # }
/// ```

use dashmap::DashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Minimum spacing between two sweeps of expired windows
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Requests allowed per window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub window: Duration,
}

impl Quota {
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }

    pub const fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    pub const fn per_hour(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(3600))
    }
}

/// Quotas of the guarded routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteQuotas {
    pub create_ticket: Quota,
    pub update_ticket: Quota,
    pub delete_ticket: Quota,
    pub assign_mechanic: Quota,
    pub remove_mechanic: Quota,
    pub login: Quota,
}

impl Default for RouteQuotas {
    fn default() -> Self {
        Self {
            create_ticket: Quota::per_hour(30),
            update_ticket: Quota::per_hour(30),
            delete_ticket: Quota::per_hour(2),
            assign_mechanic: Quota::per_hour(150),
            remove_mechanic: Quota::per_hour(75),
            login: Quota::per_minute(10),
        }
    }
}

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request may proceed
    pub ok: bool,

    pub limit: u32,

    /// Requests left in the current window
    pub remaining: u32,

    /// Whole seconds until the window closes
    pub reset_after: u64,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    length: Duration,
    count: u32,
}

impl Window {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.opened) >= self.length
    }
}

/// Counter store shared by all guarded routes
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<(String, String), Window>,
    last_sweep: Mutex<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            windows: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of (route, client) windows currently held
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Drops every window that has run out
    pub fn sweep(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| !window.expired(now));

        let removed = before.saturating_sub(self.windows.len());
        if removed > 0 {
            tracing::debug!(removed, "Swept expired rate limit windows");
        }
    }

    fn sweep_if_due(&self, now: Instant) {
        // Another caller holding the lock is already sweeping
        let Ok(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if now.duration_since(*last_sweep) < SWEEP_INTERVAL {
            return;
        }
        *last_sweep = now;
        drop(last_sweep);

        self.sweep();
    }

    /// Counts one request from `client` against `route` and reports whether
    /// it is within `quota`
    pub fn check(&self, route: &str, client: &str, quota: Quota) -> RateLimitResult {
        let now = Instant::now();

        // Must run before the entry guard below is taken
        self.sweep_if_due(now);

        let mut window = self
            .windows
            .entry((route.to_string(), client.to_string()))
            .or_insert(Window {
                opened: now,
                length: quota.window,
                count: 0,
            });

        if now.duration_since(window.opened) >= quota.window {
            window.opened = now;
            window.count = 0;
        }
        window.length = quota.window;

        let reset_after = ceil_secs(quota.window.saturating_sub(now.duration_since(window.opened)));

        if window.count >= quota.limit {
            return RateLimitResult {
                ok: false,
                limit: quota.limit,
                remaining: 0,
                reset_after,
            };
        }

        window.count += 1;

        RateLimitResult {
            ok: true,
            limit: quota.limit,
            remaining: quota.limit - window.count,
            reset_after,
        }
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    if duration.subsec_nanos() > 0 {
        duration.as_secs() + 1
    } else {
        duration.as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTE: &str = "DELETE /service-tickets/:id";

    #[test]
    fn test_default_quotas() {
        let quotas = RouteQuotas::default();
        assert_eq!(quotas.delete_ticket, Quota::per_hour(2));
        assert_eq!(quotas.assign_mechanic.limit, 150);
        assert_eq!(quotas.remove_mechanic.limit, 75);
        assert_eq!(quotas.login, Quota::per_minute(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_request_rejected() {
        let limiter = RateLimiter::new();
        let quota = Quota::per_hour(2);

        let first = limiter.check(ROUTE, "client", quota);
        assert!(first.ok);
        assert_eq!(first.remaining, 1);
        assert_eq!(first.reset_after, 3600);

        assert!(limiter.check(ROUTE, "client", quota).ok);

        let third = limiter.check(ROUTE, "client", quota);
        assert!(!third.ok);
        assert_eq!(third.remaining, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reopens_after_elapsed() {
        let limiter = RateLimiter::new();
        let quota = Quota::per_hour(2);

        limiter.check(ROUTE, "client", quota);
        limiter.check(ROUTE, "client", quota);

        tokio::time::advance(Duration::from_secs(1800)).await;
        let blocked = limiter.check(ROUTE, "client", quota);
        assert!(!blocked.ok);
        assert_eq!(blocked.reset_after, 1800);

        tokio::time::advance(Duration::from_secs(1800)).await;
        let fresh = limiter.check(ROUTE, "client", quota);
        assert!(fresh.ok);
        assert_eq!(fresh.remaining, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_routes_and_clients_are_independent() {
        let limiter = RateLimiter::new();
        let quota = Quota::per_hour(1);

        assert!(limiter.check(ROUTE, "a", quota).ok);
        assert!(!limiter.check(ROUTE, "a", quota).ok);
        assert!(limiter.check(ROUTE, "b", quota).ok);
        assert!(limiter.check("POST /service-tickets/", "a", quota).ok);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_windows_are_swept() {
        let limiter = RateLimiter::new();
        let quota = Quota::per_minute(5);

        for i in 0..1000 {
            let client = format!("10.0.{}.{}", i / 256, i % 256);
            assert!(limiter.check(ROUTE, &client, quota).ok);
        }
        assert_eq!(limiter.tracked(), 1000);

        tokio::time::advance(Duration::from_secs(2 * 3600)).await;
        assert!(limiter.check(ROUTE, "10.9.9.9", quota).ok);

        assert_eq!(limiter.tracked(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_keeps_open_windows() {
        let limiter = RateLimiter::new();

        limiter.check(ROUTE, "short", Quota::per_minute(1));
        let hourly = Quota::per_hour(1);
        limiter.check(ROUTE, "long", hourly);

        tokio::time::advance(Duration::from_secs(120)).await;
        limiter.sweep();

        assert_eq!(limiter.tracked(), 1);
        assert!(!limiter.check(ROUTE, "long", hourly).ok);
    }
}
