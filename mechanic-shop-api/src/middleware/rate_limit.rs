/// Per-route rate limiting middleware
///
/// Each guarded route carries its own [`RouteLimit`]; requests are counted
/// per (route, client address) in fixed windows by the shared
/// [`RateLimiter`]. A request over quota is answered with 429 before the
/// handler runs.
///
/// # Headers
///
/// Responses that pass the limiter include:
/// - `X-RateLimit-Limit`: Requests allowed per window
/// - `X-RateLimit-Remaining`: Requests left in the current window
/// - `X-RateLimit-Reset`: Seconds until the window resets
///
/// Rejected responses carry `Retry-After` instead.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware::from_fn_with_state, routing::delete, Router};
/// use mechanic_shop_api::middleware::rate_limit::{rate_limit_layer, RouteLimit};
/// use mechanic_shop_shared::policy::{Quota, RateLimiter};
/// use std::sync::Arc;
///
/// # async fn handler() {}
/// let limiter = Arc::new(RateLimiter::new());
/// let guard = RouteLimit::new(limiter, "delete_ticket", Quota::per_hour(2));
///
/// let app: Router = Router::new().route(
///     "/service-tickets/:id",
///     delete(handler).layer(from_fn_with_state(guard, rate_limit_layer)),
/// );
/// ```

use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use mechanic_shop_shared::policy::{Quota, RateLimitResult, RateLimiter};
use std::net::SocketAddr;
use std::sync::Arc;

/// Client key used when the connection address is unavailable
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Quota bound to one named route
#[derive(Clone)]
pub struct RouteLimit {
    limiter: Arc<RateLimiter>,
    route: &'static str,
    quota: Quota,
}

impl RouteLimit {
    pub fn new(limiter: Arc<RateLimiter>, route: &'static str, quota: Quota) -> Self {
        Self {
            limiter,
            route,
            quota,
        }
    }
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| ANONYMOUS_CLIENT.to_string())
}

fn insert_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    headers.insert("X-RateLimit-Limit", HeaderValue::from(result.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(result.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(result.reset_after));
}

/// Rate limiting middleware
///
/// # Errors
///
/// - 429 Too Many Requests: quota for this route and client exhausted
pub async fn rate_limit_layer(
    State(guard): State<RouteLimit>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&request);
    let result = guard.limiter.check(guard.route, &client, guard.quota);

    if !result.ok {
        tracing::warn!(
            route = guard.route,
            client = %client,
            retry_after = result.reset_after,
            "Rate limit exceeded"
        );
        return Err(create_rate_limit_error(&result));
    }

    let mut response = next.run(request).await;
    insert_limit_headers(response.headers_mut(), &result);
    Ok(response)
}

/// Creates a rate limit exceeded error response
fn create_rate_limit_error(result: &RateLimitResult) -> ApiError {
    ApiError::RateLimitExceeded {
        retry_after: result.reset_after,
        message: format!(
            "Rate limit exceeded ({} requests per window). Try again in {} seconds",
            result.limit, result.reset_after
        ),
    }
}
