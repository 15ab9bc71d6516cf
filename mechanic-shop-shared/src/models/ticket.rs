/// Service ticket model
///
/// # Schema
///
/// ```sql
/// CREATE TABLE service_tickets (
///     id BIGSERIAL PRIMARY KEY,
///     vin VARCHAR(25) NOT NULL,
///     service_date DATE NOT NULL,
///     service_description VARCHAR(360) NOT NULL,
///     customer_id BIGINT NOT NULL REFERENCES customers(id) ON DELETE RESTRICT
/// );
///
/// CREATE TABLE ticket_mechanics (
///     ticket_id BIGINT NOT NULL REFERENCES service_tickets(id) ON DELETE CASCADE,
///     mechanic_id BIGINT NOT NULL REFERENCES mechanics(id) ON DELETE CASCADE,
///     seq BIGSERIAL NOT NULL,
///     PRIMARY KEY (ticket_id, mechanic_id)
/// );
///
/// CREATE TABLE ticket_items (
///     id BIGSERIAL PRIMARY KEY,
///     ticket_id BIGINT NOT NULL REFERENCES service_tickets(id) ON DELETE CASCADE,
///     item_id BIGINT NOT NULL REFERENCES items(id) ON DELETE RESTRICT,
///     quantity INTEGER NOT NULL CHECK (quantity > 0)
/// );
/// ```
///
/// A ticket on the wire is a [`TicketView`]: the row plus its mechanic
/// membership set (insertion order) and its consumption records.

use super::{item::ConsumedItem, mechanic::Mechanic};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Service ticket row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceTicket {
    pub id: i64,

    /// Vehicle identification number
    pub vin: String,

    pub service_date: NaiveDate,

    pub service_description: String,

    /// Owning customer
    pub customer_id: i64,
}

/// Input for inserting a ticket
#[derive(Debug, Clone)]
pub struct NewServiceTicket {
    pub vin: String,
    pub service_date: NaiveDate,
    pub service_description: String,
    pub customer_id: i64,
}

/// Create payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TicketPayload {
    #[validate(
        required(message = "Missing data for required field."),
        length(min = 1, max = 25, message = "VIN must be 1-25 characters")
    )]
    pub vin: Option<String>,

    #[validate(required(message = "Missing data for required field."))]
    pub service_date: Option<NaiveDate>,

    #[validate(
        required(message = "Missing data for required field."),
        length(min = 1, max = 360, message = "Description must be 1-360 characters")
    )]
    pub service_description: Option<String>,

    #[validate(required(message = "Missing data for required field."))]
    pub customer_id: Option<i64>,
}

impl TicketPayload {
    pub fn into_new(self) -> Option<NewServiceTicket> {
        Some(NewServiceTicket {
            vin: self.vin?,
            service_date: self.service_date?,
            service_description: self.service_description?,
            customer_id: self.customer_id?,
        })
    }
}

/// Partial update payload
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TicketPatch {
    #[validate(length(min = 1, max = 25, message = "VIN must be 1-25 characters"))]
    pub vin: Option<String>,

    pub service_date: Option<NaiveDate>,

    #[validate(length(min = 1, max = 360, message = "Description must be 1-360 characters"))]
    pub service_description: Option<String>,

    pub customer_id: Option<i64>,
}

impl ServiceTicket {
    /// Merges whitelisted fields; `id` is never touched
    ///
    /// The caller must already have resolved a changed `customer_id`.
    pub fn apply(&mut self, patch: TicketPatch) {
        if let Some(vin) = patch.vin {
            self.vin = vin;
        }
        if let Some(service_date) = patch.service_date {
            self.service_date = service_date;
        }
        if let Some(service_description) = patch.service_description {
            self.service_description = service_description;
        }
        if let Some(customer_id) = patch.customer_id {
            self.customer_id = customer_id;
        }
    }
}

/// Bulk membership edit payload
///
/// Both lists are required; either may be empty.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct MechanicEdit {
    #[validate(required(message = "Missing data for required field."))]
    pub add_mechanic_ids: Option<Vec<i64>>,

    #[validate(required(message = "Missing data for required field."))]
    pub remove_mechanic_ids: Option<Vec<i64>>,
}

impl MechanicEdit {
    pub fn new(add: Vec<i64>, remove: Vec<i64>) -> Self {
        Self {
            add_mechanic_ids: Some(add),
            remove_mechanic_ids: Some(remove),
        }
    }

    pub fn additions(&self) -> &[i64] {
        self.add_mechanic_ids.as_deref().unwrap_or_default()
    }

    pub fn removals(&self) -> &[i64] {
        self.remove_mechanic_ids.as_deref().unwrap_or_default()
    }
}

/// Ticket as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketView {
    pub id: i64,
    pub vin: String,
    pub service_date: NaiveDate,
    pub service_description: String,
    pub customer_id: i64,

    /// Membership set in insertion order
    pub mechanics: Vec<Mechanic>,

    /// Consumption records in insertion order
    pub items: Vec<ConsumedItem>,
}

impl TicketView {
    pub fn new(ticket: ServiceTicket, mechanics: Vec<Mechanic>, items: Vec<ConsumedItem>) -> Self {
        Self {
            id: ticket.id,
            vin: ticket.vin,
            service_date: ticket.service_date,
            service_description: ticket.service_description,
            customer_id: ticket.customer_id,
            mechanics,
            items,
        }
    }

    pub fn has_mechanic(&self, mechanic_id: i64) -> bool {
        self.mechanics.iter().any(|m| m.id == mechanic_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket() -> ServiceTicket {
        ServiceTicket {
            id: 1,
            vin: "111111111111111".to_string(),
            service_date: NaiveDate::from_ymd_opt(2025, 12, 21).unwrap(),
            service_description: "test_ticket_description".to_string(),
            customer_id: 1,
        }
    }

    #[test]
    fn test_view_serializes_iso_date() {
        let view = TicketView::new(ticket(), vec![], vec![]);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["service_date"], "2025-12-21");
        assert_eq!(json["customer_id"], 1);
        assert_eq!(json["mechanics"].as_array().unwrap().len(), 0);
        assert_eq!(json["items"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_missing_description_reported() {
        let payload: TicketPayload = serde_json::from_value(serde_json::json!({
            "vin": "12345678901234",
            "service_date": "2025-12-21",
            "customer_id": 1
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("service_description"));
    }

    #[test]
    fn test_edit_requires_both_lists() {
        let edit: MechanicEdit =
            serde_json::from_value(serde_json::json!({ "add_mechanic_ids": [1] })).unwrap();
        assert!(edit.validate().is_err());

        let edit = MechanicEdit::new(vec![1], vec![]);
        assert!(edit.validate().is_ok());
        assert_eq!(edit.additions(), &[1]);
        assert!(edit.removals().is_empty());
    }

    #[test]
    fn test_apply_patch_keeps_id() {
        let mut t = ticket();
        t.apply(TicketPatch {
            vin: Some("999".to_string()),
            ..Default::default()
        });
        assert_eq!(t.id, 1);
        assert_eq!(t.vin, "999");
        assert_eq!(t.service_description, "test_ticket_description");
    }
}
