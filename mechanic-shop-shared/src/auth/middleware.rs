/// Bearer-token authentication helpers
///
/// The HTTP layer calls [`authenticate`] on the request headers and inserts
/// the resulting [`CustomerIdentity`] into the request extensions. Handlers
/// read the caller's id from there and never from the request body or path.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use mechanic_shop_shared::auth::{jwt::issue_token, middleware::authenticate};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let token = issue_token(3, 3600, secret)?;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token))?);
///
/// let identity = authenticate(&headers, secret)?;
/// assert_eq!(identity.customer_id, 3);
/// # Ok(())
/// # }
/// ```

use super::jwt::{validate_token, JwtError};
use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerIdentity {
    pub customer_id: i64,
}

/// Why a request could not be authenticated
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Expected Bearer token")]
    InvalidFormat,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    InvalidToken,
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::Expired,
            _ => AuthError::InvalidToken,
        }
    }
}

/// Extracts the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

/// Validates the bearer token and returns the caller
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<CustomerIdentity, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_token(token, secret)?;

    Ok(CustomerIdentity {
        customer_id: claims.customer_id(),
    })
}
