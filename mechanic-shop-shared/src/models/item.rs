/// Inventory item model
///
/// Items are parts that can be consumed on any number of service tickets.
/// Each consumption is its own `ticket_items` row carrying a quantity.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Inventory item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

/// Input for inserting an item
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub price: f64,
}

/// Create payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ItemPayload {
    #[validate(
        required(message = "Missing data for required field."),
        length(min = 1, max = 255, message = "Name must be 1-255 characters")
    )]
    pub name: Option<String>,

    #[validate(
        required(message = "Missing data for required field."),
        range(min = 0.0, message = "Price must not be negative")
    )]
    pub price: Option<f64>,
}

impl ItemPayload {
    pub fn into_new(self) -> Option<NewItem> {
        Some(NewItem {
            name: self.name?,
            price: self.price?,
        })
    }
}

/// Partial update payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ItemPatch {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(range(min = 0.0, message = "Price must not be negative"))]
    pub price: Option<f64>,
}

impl Item {
    pub fn apply(&mut self, patch: ItemPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
    }
}

/// One consumption record as shown on a ticket: item snapshot plus quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConsumedItem {
    /// Item ID
    pub id: i64,

    pub name: String,

    pub price: f64,

    /// Units used on this record
    pub quantity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_price() {
        let payload = ItemPayload {
            name: Some("Test Item".to_string()),
            price: None,
        };

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        let price_errors = fields["price"];
        assert_eq!(
            price_errors[0].message.as_deref(),
            Some("Missing data for required field.")
        );
    }

    #[test]
    fn test_into_new() {
        let new = ItemPayload {
            name: Some("brake pad".to_string()),
            price: Some(45.5),
        }
        .into_new()
        .unwrap();

        assert_eq!(new.name, "brake pad");
        assert_eq!(new.price, 45.5);
    }
}
