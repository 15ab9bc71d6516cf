/// Ticket membership and consumption engine
///
/// Owns every change to a ticket's mechanic set and item list. Each
/// operation is one store transaction that starts by locking the ticket
/// row, so membership changes on the same ticket run one after another and
/// the precondition check cannot race with a concurrent insert. The view
/// returned to the caller is read inside the same transaction.
///
/// # Example
///
/// ```no_run
/// use mechanic_shop_shared::association::AssociationEngine;
/// use mechanic_shop_shared::store::memory::InMemoryStore;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = AssociationEngine::new(Arc::new(InMemoryStore::new()));
/// let view = engine.assign_mechanic(1, 2).await?;
/// assert!(view.has_mechanic(2));
/// # Ok(())
/// # }
/// ```

use crate::error::{ShopError, ShopResult};
use crate::models::{MechanicEdit, ServiceTicket, TicketView};
use crate::store::{load_view, ResourceStore, StoreError, StoreTx};
use std::sync::Arc;
use tracing::{debug, info};

pub const TICKET_NOT_FOUND: &str = "Service ticket not found.";
pub const MECHANIC_NOT_FOUND: &str = "Mechanic not found.";
pub const ITEM_NOT_FOUND: &str = "Item not found.";
pub const ALREADY_ASSIGNED: &str = "Mechanic already assigned to this ticket.";
pub const NOT_ASSIGNED: &str = "Mechanic is not assigned to this ticket.";

/// Membership and consumption operations on service tickets
#[derive(Clone)]
pub struct AssociationEngine {
    store: Arc<dyn ResourceStore>,
}

async fn locked_ticket(tx: &mut dyn StoreTx, ticket_id: i64) -> ShopResult<ServiceTicket> {
    tx.lock_ticket(ticket_id)
        .await?
        .ok_or_else(|| ShopError::NotFound(TICKET_NOT_FOUND.to_string()))
}

impl AssociationEngine {
    pub fn new(store: Arc<dyn ResourceStore>) -> Self {
        Self { store }
    }

    /// Adds a mechanic to a ticket
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ticket or mechanic does not exist
    /// - `Conflict` if the mechanic is already a member
    pub async fn assign_mechanic(&self, ticket_id: i64, mechanic_id: i64) -> ShopResult<TicketView> {
        let mut tx = self.store.begin().await?;
        let ticket = locked_ticket(tx.as_mut(), ticket_id).await?;

        if tx.get_mechanic(mechanic_id).await?.is_none() {
            return Err(ShopError::NotFound(MECHANIC_NOT_FOUND.to_string()));
        }

        if tx.ticket_mechanic_ids(ticket_id).await?.contains(&mechanic_id) {
            return Err(ShopError::Conflict(ALREADY_ASSIGNED.to_string()));
        }

        match tx.link_mechanic(ticket_id, mechanic_id).await {
            Ok(()) => {}
            // the link key caught a duplicate the lock did not
            Err(StoreError::Duplicate { .. }) => {
                return Err(ShopError::Conflict(ALREADY_ASSIGNED.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        let view = load_view(tx.as_mut(), ticket).await?;
        tx.commit().await?;

        info!(ticket_id, mechanic_id, "Mechanic assigned");
        Ok(view)
    }

    /// Removes a mechanic from a ticket
    ///
    /// # Errors
    ///
    /// - `NotFound` if the ticket or mechanic does not exist
    /// - `Conflict` if the mechanic is not a member
    pub async fn remove_mechanic(&self, ticket_id: i64, mechanic_id: i64) -> ShopResult<TicketView> {
        let mut tx = self.store.begin().await?;
        let ticket = locked_ticket(tx.as_mut(), ticket_id).await?;

        if tx.get_mechanic(mechanic_id).await?.is_none() {
            return Err(ShopError::NotFound(MECHANIC_NOT_FOUND.to_string()));
        }

        if !tx.unlink_mechanic(ticket_id, mechanic_id).await? {
            return Err(ShopError::Conflict(NOT_ASSIGNED.to_string()));
        }

        let view = load_view(tx.as_mut(), ticket).await?;
        tx.commit().await?;

        info!(ticket_id, mechanic_id, "Mechanic removed");
        Ok(view)
    }

    /// Applies additions, then removals
    ///
    /// Ids that are already members (for additions), not members (for
    /// removals) or that name no mechanic are skipped without error.
    pub async fn bulk_edit_mechanics(
        &self,
        ticket_id: i64,
        edit: &MechanicEdit,
    ) -> ShopResult<TicketView> {
        let mut tx = self.store.begin().await?;
        let ticket = locked_ticket(tx.as_mut(), ticket_id).await?;

        let mut members = tx.ticket_mechanic_ids(ticket_id).await?;
        let mut added = 0usize;
        let mut removed = 0usize;

        for &mechanic_id in edit.additions() {
            if members.contains(&mechanic_id) {
                continue;
            }
            if tx.get_mechanic(mechanic_id).await?.is_none() {
                debug!(ticket_id, mechanic_id, "Skipping unknown mechanic");
                continue;
            }
            tx.link_mechanic(ticket_id, mechanic_id).await?;
            members.push(mechanic_id);
            added += 1;
        }

        for &mechanic_id in edit.removals() {
            if !members.contains(&mechanic_id) {
                continue;
            }
            tx.unlink_mechanic(ticket_id, mechanic_id).await?;
            members.retain(|&id| id != mechanic_id);
            removed += 1;
        }

        let view = load_view(tx.as_mut(), ticket).await?;
        tx.commit().await?;

        info!(ticket_id, added, removed, "Ticket mechanics edited");
        Ok(view)
    }

    /// Appends a consumption record of `quantity` units of an item
    ///
    /// The same item may be attached any number of times; each call adds
    /// its own record.
    ///
    /// # Errors
    ///
    /// - `Validation` if `quantity` is not a positive 32-bit value
    /// - `NotFound` if the ticket or item does not exist
    pub async fn attach_item(
        &self,
        ticket_id: i64,
        item_id: i64,
        quantity: i64,
    ) -> ShopResult<TicketView> {
        let quantity = i32::try_from(quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| ShopError::invalid("quantity", "Quantity must be at least 1."))?;

        let mut tx = self.store.begin().await?;
        let ticket = locked_ticket(tx.as_mut(), ticket_id).await?;

        if tx.get_item(item_id).await?.is_none() {
            return Err(ShopError::NotFound(ITEM_NOT_FOUND.to_string()));
        }

        let record_id = tx.attach_item(ticket_id, item_id, quantity).await?;
        let view = load_view(tx.as_mut(), ticket).await?;
        tx.commit().await?;

        info!(ticket_id, item_id, quantity, record_id, "Item attached to ticket");
        Ok(view)
    }
}
