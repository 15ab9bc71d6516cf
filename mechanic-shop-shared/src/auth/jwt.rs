/// Customer bearer tokens
///
/// Tokens are HS256-signed JWTs whose subject is the customer id. They are
/// stateless: there is no revocation list, a token is good until `exp`.
///
/// # Example
///
/// ```
/// use mechanic_shop_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let claims = Claims::new(7, Duration::hours(1));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret)?;
/// assert_eq!(validated.customer_id(), 7);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Value of the `iss` claim
pub const ISSUER: &str = "mechanic-shop";

/// Token lifetime used when none is configured
pub const DEFAULT_TTL_SECONDS: i64 = 3600;

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Token claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Customer id
    pub sub: i64,

    pub iss: String,

    pub iat: i64,

    pub exp: i64,

    pub nbf: i64,
}

impl Claims {
    /// Claims for `customer_id`, valid from now for `expires_in`
    ///
    /// A negative `expires_in` produces an already-expired token.
    pub fn new(customer_id: i64, expires_in: Duration) -> Self {
        let now = Utc::now();
        let issued = now.timestamp();

        Self {
            sub: customer_id,
            iss: ISSUER.to_string(),
            iat: issued,
            exp: (now + expires_in).timestamp(),
            // an expired token must still pass nbf, so clamp to exp
            nbf: issued.min((now + expires_in).timestamp()),
        }
    }

    pub fn customer_id(&self) -> i64 {
        self.sub
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs `claims` with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Issues a token for a customer with the given lifetime in seconds
pub fn issue_token(customer_id: i64, ttl_seconds: i64, secret: &str) -> Result<String, JwtError> {
    create_token(&Claims::new(customer_id, Duration::seconds(ttl_seconds)), secret)
}

/// Verifies signature, issuer, `exp` and `nbf`, and returns the claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            _ => JwtError::Invalid(e.to_string()),
        })
}
