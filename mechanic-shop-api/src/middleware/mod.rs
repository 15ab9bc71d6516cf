/// Middleware modules for the API server
///
/// - `security`: security headers on every response
/// - `rate_limit`: per-route fixed-window request quotas

pub mod rate_limit;
pub mod security;
