/// Mechanic model
///
/// # Schema
///
/// ```sql
/// CREATE TABLE mechanics (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(254) NOT NULL UNIQUE,
///     address VARCHAR(360) NOT NULL,
///     phone VARCHAR(25) NOT NULL,
///     salary DOUBLE PRECISION NOT NULL
/// );
/// ```
///
/// Mechanics join service tickets through the `ticket_mechanics` link table.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Shop mechanic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mechanic {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
    pub salary: f64,
}

/// Input for inserting a mechanic
#[derive(Debug, Clone)]
pub struct NewMechanic {
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
    pub salary: f64,
}

/// Create payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MechanicPayload {
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
        length(min = 1, max = 360, message = "Address must be 1-360 characters")
    )]
    pub address: Option<String>,

    #[validate(
        required(message = "Missing data for required field."),
        length(min = 1, max = 25, message = "Phone must be 1-25 characters")
    )]
    pub phone: Option<String>,

    #[validate(
        required(message = "Missing data for required field."),
        range(min = 0.0, message = "Salary must not be negative")
    )]
    pub salary: Option<f64>,
}

/// Partial update payload; also the validated change set for [`Mechanic::apply`]
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MechanicPatch {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Not a valid email address."))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 360, message = "Address must be 1-360 characters"))]
    pub address: Option<String>,

    #[validate(length(min = 1, max = 25, message = "Phone must be 1-25 characters"))]
    pub phone: Option<String>,

    #[validate(range(min = 0.0, message = "Salary must not be negative"))]
    pub salary: Option<f64>,
}

impl MechanicPayload {
    /// Converts a validated payload into an insert
    ///
    /// Returns `None` if a required field is absent, which `validate()`
    /// already reports.
    pub fn into_new(self) -> Option<NewMechanic> {
        Some(NewMechanic {
            name: self.name?,
            email: self.email?,
            address: self.address?,
            phone: self.phone?,
            salary: self.salary?,
        })
    }
}

impl Mechanic {
    /// Merges whitelisted fields; `id` is never touched
    pub fn apply(&mut self, patch: MechanicPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(address) = patch.address {
            self.address = address;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(salary) = patch.salary {
            self.salary = salary;
        }
    }
}

/// A mechanic together with the number of distinct tickets it works on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanicWorkload {
    #[serde(flatten)]
    pub mechanic: Mechanic,

    pub ticket_count: u64,
}
