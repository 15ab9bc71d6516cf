/// Customer model
///
/// # Schema
///
/// ```sql
/// CREATE TABLE customers (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(254) NOT NULL UNIQUE,
///     phone VARCHAR(25) NOT NULL,
///     password_hash TEXT NOT NULL
/// );
/// ```
///
/// Customers own service tickets (one-to-many). The password hash never
/// leaves the process: it is skipped during serialization.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Customer account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    /// Unique customer ID
    pub id: i64,

    /// Display name
    pub name: String,

    /// Email address (unique)
    pub email: String,

    /// Contact phone number
    pub phone: String,

    /// Argon2id hash of the password
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

/// Input for inserting a customer; the id is assigned by the store
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
}

/// Create payload
///
/// Fields are optional at the type level so that a missing field is
/// reported as a field-level validation error rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CustomerPayload {
    #[validate(
        required(message = "Missing data for required field."),
        length(min = 1, max = 255, message = "Name must be 1-255 characters")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "Missing data for required field."),
        email(message = "Not a valid email address.")
    )]
    pub email: Option<String>,

    #[validate(
        required(message = "Missing data for required field."),
        length(min = 1, max = 25, message = "Phone must be 1-25 characters")
    )]
    pub phone: Option<String>,

    #[validate(
        required(message = "Missing data for required field."),
        length(min = 1, message = "Password must not be empty")
    )]
    pub password: Option<String>,
}

/// Partial update payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CustomerPatch {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Not a valid email address."))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 25, message = "Phone must be 1-25 characters"))]
    pub phone: Option<String>,

    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: Option<String>,
}

/// Login payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(
        required(message = "Missing data for required field."),
        email(message = "Not a valid email address.")
    )]
    pub email: Option<String>,

    #[validate(required(message = "Missing data for required field."))]
    pub password: Option<String>,
}

/// Validated change set for [`Customer::apply`]
#[derive(Debug, Clone, Default)]
pub struct CustomerChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
}

impl Customer {
    /// Merges whitelisted fields; `id` is never touched
    pub fn apply(&mut self, changes: CustomerChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(phone) = changes.phone {
            self.phone = phone;
        }
        if let Some(password_hash) = changes.password_hash {
            self.password_hash = password_hash;
        }
    }
}
