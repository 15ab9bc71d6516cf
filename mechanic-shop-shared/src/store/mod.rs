/// Resource Store port
///
/// Durable storage for customers, mechanics, items and service tickets,
/// plus the two link tables (`ticket_mechanics`, `ticket_items`).
///
/// All access goes through a transaction obtained from
/// [`ResourceStore::begin`]. A transaction that is dropped without
/// [`StoreTx::commit`] is rolled back, so an error returned with `?`
/// anywhere in a service method leaves previously committed state intact.
///
/// # Adapters
///
/// - [`postgres::PgStore`]: PostgreSQL via sqlx; `lock_ticket` takes a
///   `FOR UPDATE` row lock so membership changes on one ticket serialize
/// - [`memory::InMemoryStore`]: process-local; every transaction holds one
///   global lock and commits by swapping its working copy in
///
/// # Example
///
/// ```no_run
/// use mechanic_shop_shared::store::{memory::InMemoryStore, ResourceStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryStore::new();
/// let mut tx = store.begin().await?;
/// let tickets = tx.list_tickets(mechanic_shop_shared::store::TicketFilter::All).await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use crate::models::{
    ConsumedItem, Customer, Item, Mechanic, NewCustomer, NewItem, NewMechanic, NewServiceTicket,
    ServiceTicket, TicketView,
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Storage-level error
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Unique constraint rejected the write
    #[error("Duplicate value violates {constraint}")]
    Duplicate { constraint: String },

    /// Foreign key constraint rejected the write or delete
    #[error("Foreign key violation on {constraint}")]
    ForeignKey { constraint: String },

    /// Anything else (connectivity, protocol, unexpected rows)
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Predicate for ticket selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketFilter {
    /// Every ticket
    All,

    /// Tickets owned by one customer
    Customer(i64),
}

/// One ticket-mechanic link row
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct Membership {
    pub ticket_id: i64,
    pub mechanic_id: i64,
}

/// Entry point to the store
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Opens a transaction
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Cheap connectivity probe for health checks
    async fn ping(&self) -> StoreResult<()>;
}

/// A unit of work against the store
///
/// Selects return rows in ascending id order unless noted otherwise.
#[async_trait]
pub trait StoreTx: Send {
    // Customers
    async fn get_customer(&mut self, id: i64) -> StoreResult<Option<Customer>>;
    async fn find_customer_by_email(&mut self, email: &str) -> StoreResult<Option<Customer>>;
    async fn list_customers(&mut self) -> StoreResult<Vec<Customer>>;
    async fn insert_customer(&mut self, new: NewCustomer) -> StoreResult<Customer>;
    async fn update_customer(&mut self, customer: &Customer) -> StoreResult<Customer>;
    async fn delete_customer(&mut self, id: i64) -> StoreResult<bool>;

    // Mechanics
    async fn get_mechanic(&mut self, id: i64) -> StoreResult<Option<Mechanic>>;
    async fn list_mechanics(&mut self) -> StoreResult<Vec<Mechanic>>;
    async fn insert_mechanic(&mut self, new: NewMechanic) -> StoreResult<Mechanic>;
    async fn update_mechanic(&mut self, mechanic: &Mechanic) -> StoreResult<Mechanic>;
    async fn delete_mechanic(&mut self, id: i64) -> StoreResult<bool>;

    // Items
    async fn get_item(&mut self, id: i64) -> StoreResult<Option<Item>>;
    async fn list_items(&mut self) -> StoreResult<Vec<Item>>;
    async fn insert_item(&mut self, new: NewItem) -> StoreResult<Item>;
    async fn update_item(&mut self, item: &Item) -> StoreResult<Item>;
    async fn delete_item(&mut self, id: i64) -> StoreResult<bool>;

    // Tickets
    async fn get_ticket(&mut self, id: i64) -> StoreResult<Option<ServiceTicket>>;

    /// Like `get_ticket`, but holds the row until commit/rollback
    async fn lock_ticket(&mut self, id: i64) -> StoreResult<Option<ServiceTicket>>;

    async fn list_tickets(&mut self, filter: TicketFilter) -> StoreResult<Vec<ServiceTicket>>;
    async fn insert_ticket(&mut self, new: NewServiceTicket) -> StoreResult<ServiceTicket>;
    async fn update_ticket(&mut self, ticket: &ServiceTicket) -> StoreResult<ServiceTicket>;

    /// Deletes the ticket with its membership and consumption rows
    async fn delete_ticket(&mut self, id: i64) -> StoreResult<bool>;

    // Ticket-mechanic links
    /// Member ids of one ticket in insertion order
    async fn ticket_mechanic_ids(&mut self, ticket_id: i64) -> StoreResult<Vec<i64>>;

    /// Fails with `Duplicate` if the pair already exists
    async fn link_mechanic(&mut self, ticket_id: i64, mechanic_id: i64) -> StoreResult<()>;

    /// Returns whether a row was removed
    async fn unlink_mechanic(&mut self, ticket_id: i64, mechanic_id: i64) -> StoreResult<bool>;

    /// Every link row
    async fn memberships(&mut self) -> StoreResult<Vec<Membership>>;

    /// `(ticket_id, mechanic)` pairs for the given tickets, insertion order per ticket
    async fn mechanics_for_tickets(&mut self, ticket_ids: &[i64])
        -> StoreResult<Vec<(i64, Mechanic)>>;

    // Ticket-item consumption records
    /// Appends a record and returns its id
    async fn attach_item(&mut self, ticket_id: i64, item_id: i64, quantity: i32)
        -> StoreResult<i64>;

    /// `(ticket_id, record)` pairs for the given tickets, insertion order per ticket
    async fn items_for_tickets(&mut self, ticket_ids: &[i64])
        -> StoreResult<Vec<(i64, ConsumedItem)>>;

    /// Number of consumption records referencing an item
    async fn item_usage_count(&mut self, item_id: i64) -> StoreResult<i64>;

    /// Makes every change of this transaction durable
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Loads mechanics and consumption records for `tickets` and assembles views
///
/// Two batch reads regardless of how many tickets are passed. Output
/// order follows `tickets`.
pub async fn load_views(
    tx: &mut dyn StoreTx,
    tickets: Vec<ServiceTicket>,
) -> StoreResult<Vec<TicketView>> {
    if tickets.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = tickets.iter().map(|t| t.id).collect();

    let mut mechanics: HashMap<i64, Vec<Mechanic>> = HashMap::new();
    for (ticket_id, mechanic) in tx.mechanics_for_tickets(&ids).await? {
        mechanics.entry(ticket_id).or_default().push(mechanic);
    }

    let mut items: HashMap<i64, Vec<ConsumedItem>> = HashMap::new();
    for (ticket_id, item) in tx.items_for_tickets(&ids).await? {
        items.entry(ticket_id).or_default().push(item);
    }

    Ok(tickets
        .into_iter()
        .map(|ticket| {
            let id = ticket.id;
            TicketView::new(
                ticket,
                mechanics.remove(&id).unwrap_or_default(),
                items.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

/// Single-ticket form of [`load_views`]
pub async fn load_view(tx: &mut dyn StoreTx, ticket: ServiceTicket) -> StoreResult<TicketView> {
    let mut views = load_views(tx, vec![ticket]).await?;
    views
        .pop()
        .ok_or_else(|| StoreError::Backend("ticket view assembly returned no rows".to_string()))
}
