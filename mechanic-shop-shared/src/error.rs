/// Domain error taxonomy
///
/// Every service in this crate returns [`ShopResult`]. The API layer maps
/// each variant onto a status category; nothing here knows about HTTP.
///
/// # Kinds
///
/// - `Validation`: malformed or missing fields, reported per field
/// - `NotFound`: a referenced id does not resolve
/// - `Conflict`: a membership precondition was violated
///   (already assigned / not assigned)
/// - `ConstraintViolation`: duplicate unique value or a restricted delete
/// - `Unauthorized`: bad credentials or token
/// - `Store`: unexpected storage failure, fatal to the request
/// - `Internal`: any other unexpected failure

use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// Result alias for domain operations
pub type ShopResult<T> = Result<T, ShopError>;

/// A single field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Human-readable message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Domain error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ShopError {
    /// Request payload failed validation
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Membership precondition violated
    #[error("{0}")]
    Conflict(String),

    /// Unique value already taken, or delete blocked by dependants
    #[error("{0}")]
    ConstraintViolation(String),

    /// Credentials rejected
    #[error("{0}")]
    Unauthorized(String),

    /// Unexpected storage failure
    #[error(transparent)]
    Store(StoreError),

    /// Unexpected failure outside storage (hashing, token signing)
    #[error("{0}")]
    Internal(String),
}

impl ShopError {
    /// Builds a single-field validation error
    pub fn invalid(field: &str, message: &str) -> Self {
        ShopError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<StoreError> for ShopError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { ref constraint } if constraint.contains("email") => {
                ShopError::ConstraintViolation("Email already exists".to_string())
            }
            StoreError::Duplicate { constraint } => {
                ShopError::ConstraintViolation(format!("Constraint violation: {}", constraint))
            }
            StoreError::ForeignKey { constraint } => ShopError::ConstraintViolation(format!(
                "Referenced by other records: {}",
                constraint
            )),
            other => ShopError::Store(other),
        }
    }
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    FieldError::new(
                        field.to_string(),
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid value ({})", error.code)),
                    )
                })
            })
            .collect();

        // field_errors() is a HashMap; keep responses stable
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ShopError::Validation(details)
    }
}
