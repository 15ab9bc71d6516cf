/// Data models for the mechanic shop
///
/// # Models
///
/// - `customer`: Customer accounts (own service tickets)
/// - `mechanic`: Mechanics (join tickets through the membership set)
/// - `item`: Inventory items and per-ticket consumption records
/// - `ticket`: Service tickets, bulk-edit payload and the ticket view
///
/// Each entity comes with a `*Payload` (create, all fields required), a
/// `*Patch` (partial update) and an `apply` merge that whitelists the
/// updatable fields.

pub mod customer;
pub mod item;
pub mod mechanic;
pub mod ticket;

pub use customer::{Customer, CustomerChanges, CustomerPatch, CustomerPayload, LoginPayload, NewCustomer};
pub use item::{ConsumedItem, Item, ItemPatch, ItemPayload, NewItem};
pub use mechanic::{Mechanic, MechanicPatch, MechanicPayload, MechanicWorkload, NewMechanic};
pub use ticket::{MechanicEdit, NewServiceTicket, ServiceTicket, TicketPatch, TicketPayload, TicketView};
