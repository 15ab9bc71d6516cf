/// Request policies applied in front of the services
///
/// - [`rate_limit`]: fixed-window request quotas per (route, client)
/// - [`cache`]: read-through cache of serialized responses
///
/// Both are plain values owned by the application state; nothing here is
/// global.

pub mod cache;
pub mod rate_limit;

pub use cache::ResponseCache;
pub use rate_limit::{Quota, RateLimitResult, RateLimiter, RouteQuotas};
