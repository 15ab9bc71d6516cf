/// Customer authentication
///
/// - [`password`]: Argon2id hashing for stored customer passwords
/// - [`jwt`]: HS256 bearer tokens carrying the customer id
/// - [`middleware`]: header extraction and the `CustomerIdentity` extension

pub mod jwt;
pub mod middleware;
pub mod password;
