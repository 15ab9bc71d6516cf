/// In-memory Resource Store
///
/// Holds all rows in ordered maps behind one async mutex. A transaction
/// takes the mutex for its whole lifetime and works on a private copy;
/// `commit` writes the copy back, dropping the transaction discards it.
/// Transactions therefore run one at a time.
///
/// Constraint names match the PostgreSQL schema.

use super::{Membership, ResourceStore, StoreError, StoreResult, StoreTx, TicketFilter};
use crate::models::{
    ConsumedItem, Customer, Item, Mechanic, NewCustomer, NewItem, NewMechanic, NewServiceTicket,
    ServiceTicket,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone)]
struct ConsumptionRow {
    id: i64,
    ticket_id: i64,
    item_id: i64,
    quantity: i32,
}

#[derive(Debug, Clone, Default)]
struct Sequences {
    customer: i64,
    mechanic: i64,
    item: i64,
    ticket: i64,
    consumption: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    customers: BTreeMap<i64, Customer>,
    mechanics: BTreeMap<i64, Mechanic>,
    items: BTreeMap<i64, Item>,
    tickets: BTreeMap<i64, ServiceTicket>,
    /// Insertion order is membership display order
    links: Vec<Membership>,
    consumptions: Vec<ConsumptionRow>,
    seq: Sequences,
}

fn missing_row(table: &str, id: i64) -> StoreError {
    StoreError::Backend(format!("no row in {} with id {}", table, id))
}

/// Process-local store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Transaction over [`InMemoryStore`]
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTx {
    fn email_taken<'a>(
        mut emails: impl Iterator<Item = (i64, &'a str)>,
        email: &str,
        except: Option<i64>,
    ) -> bool {
        emails.any(|(id, e)| e == email && Some(id) != except)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn get_customer(&mut self, id: i64) -> StoreResult<Option<Customer>> {
        Ok(self.working.customers.get(&id).cloned())
    }

    async fn find_customer_by_email(&mut self, email: &str) -> StoreResult<Option<Customer>> {
        Ok(self
            .working
            .customers
            .values()
            .find(|c| c.email == email)
            .cloned())
    }

    async fn list_customers(&mut self) -> StoreResult<Vec<Customer>> {
        Ok(self.working.customers.values().cloned().collect())
    }

    async fn insert_customer(&mut self, new: NewCustomer) -> StoreResult<Customer> {
        let emails = self.working.customers.values().map(|c| (c.id, c.email.as_str()));
        if Self::email_taken(emails, &new.email, None) {
            return Err(StoreError::Duplicate {
                constraint: "customers_email_key".to_string(),
            });
        }

        let customer = Customer {
            id: next(&mut self.working.seq.customer),
            name: new.name,
            email: new.email,
            phone: new.phone,
            password_hash: new.password_hash,
        };
        self.working.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn update_customer(&mut self, customer: &Customer) -> StoreResult<Customer> {
        let emails = self.working.customers.values().map(|c| (c.id, c.email.as_str()));
        if Self::email_taken(emails, &customer.email, Some(customer.id)) {
            return Err(StoreError::Duplicate {
                constraint: "customers_email_key".to_string(),
            });
        }

        let slot = self
            .working
            .customers
            .get_mut(&customer.id)
            .ok_or_else(|| missing_row("customers", customer.id))?;
        *slot = customer.clone();
        Ok(customer.clone())
    }

    async fn delete_customer(&mut self, id: i64) -> StoreResult<bool> {
        if self.working.tickets.values().any(|t| t.customer_id == id) {
            return Err(StoreError::ForeignKey {
                constraint: "service_tickets_customer_id_fkey".to_string(),
            });
        }
        Ok(self.working.customers.remove(&id).is_some())
    }

    async fn get_mechanic(&mut self, id: i64) -> StoreResult<Option<Mechanic>> {
        Ok(self.working.mechanics.get(&id).cloned())
    }

    async fn list_mechanics(&mut self) -> StoreResult<Vec<Mechanic>> {
        Ok(self.working.mechanics.values().cloned().collect())
    }

    async fn insert_mechanic(&mut self, new: NewMechanic) -> StoreResult<Mechanic> {
        let emails = self.working.mechanics.values().map(|m| (m.id, m.email.as_str()));
        if Self::email_taken(emails, &new.email, None) {
            return Err(StoreError::Duplicate {
                constraint: "mechanics_email_key".to_string(),
            });
        }

        let mechanic = Mechanic {
            id: next(&mut self.working.seq.mechanic),
            name: new.name,
            email: new.email,
            address: new.address,
            phone: new.phone,
            salary: new.salary,
        };
        self.working.mechanics.insert(mechanic.id, mechanic.clone());
        Ok(mechanic)
    }

    async fn update_mechanic(&mut self, mechanic: &Mechanic) -> StoreResult<Mechanic> {
        let emails = self.working.mechanics.values().map(|m| (m.id, m.email.as_str()));
        if Self::email_taken(emails, &mechanic.email, Some(mechanic.id)) {
            return Err(StoreError::Duplicate {
                constraint: "mechanics_email_key".to_string(),
            });
        }

        let slot = self
            .working
            .mechanics
            .get_mut(&mechanic.id)
            .ok_or_else(|| missing_row("mechanics", mechanic.id))?;
        *slot = mechanic.clone();
        Ok(mechanic.clone())
    }

    async fn delete_mechanic(&mut self, id: i64) -> StoreResult<bool> {
        let removed = self.working.mechanics.remove(&id).is_some();
        if removed {
            self.working.links.retain(|l| l.mechanic_id != id);
        }
        Ok(removed)
    }

    async fn get_item(&mut self, id: i64) -> StoreResult<Option<Item>> {
        Ok(self.working.items.get(&id).cloned())
    }

    async fn list_items(&mut self) -> StoreResult<Vec<Item>> {
        Ok(self.working.items.values().cloned().collect())
    }

    async fn insert_item(&mut self, new: NewItem) -> StoreResult<Item> {
        let item = Item {
            id: next(&mut self.working.seq.item),
            name: new.name,
            price: new.price,
        };
        self.working.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_item(&mut self, item: &Item) -> StoreResult<Item> {
        let slot = self
            .working
            .items
            .get_mut(&item.id)
            .ok_or_else(|| missing_row("items", item.id))?;
        *slot = item.clone();
        Ok(item.clone())
    }

    async fn delete_item(&mut self, id: i64) -> StoreResult<bool> {
        if self.working.consumptions.iter().any(|c| c.item_id == id) {
            return Err(StoreError::ForeignKey {
                constraint: "ticket_items_item_id_fkey".to_string(),
            });
        }
        Ok(self.working.items.remove(&id).is_some())
    }

    async fn get_ticket(&mut self, id: i64) -> StoreResult<Option<ServiceTicket>> {
        Ok(self.working.tickets.get(&id).cloned())
    }

    async fn lock_ticket(&mut self, id: i64) -> StoreResult<Option<ServiceTicket>> {
        // the whole store is already held by this transaction
        self.get_ticket(id).await
    }

    async fn list_tickets(&mut self, filter: TicketFilter) -> StoreResult<Vec<ServiceTicket>> {
        Ok(self
            .working
            .tickets
            .values()
            .filter(|t| match filter {
                TicketFilter::All => true,
                TicketFilter::Customer(customer_id) => t.customer_id == customer_id,
            })
            .cloned()
            .collect())
    }

    async fn insert_ticket(&mut self, new: NewServiceTicket) -> StoreResult<ServiceTicket> {
        if !self.working.customers.contains_key(&new.customer_id) {
            return Err(StoreError::ForeignKey {
                constraint: "service_tickets_customer_id_fkey".to_string(),
            });
        }

        let ticket = ServiceTicket {
            id: next(&mut self.working.seq.ticket),
            vin: new.vin,
            service_date: new.service_date,
            service_description: new.service_description,
            customer_id: new.customer_id,
        };
        self.working.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn update_ticket(&mut self, ticket: &ServiceTicket) -> StoreResult<ServiceTicket> {
        if !self.working.customers.contains_key(&ticket.customer_id) {
            return Err(StoreError::ForeignKey {
                constraint: "service_tickets_customer_id_fkey".to_string(),
            });
        }

        let slot = self
            .working
            .tickets
            .get_mut(&ticket.id)
            .ok_or_else(|| missing_row("service_tickets", ticket.id))?;
        *slot = ticket.clone();
        Ok(ticket.clone())
    }

    async fn delete_ticket(&mut self, id: i64) -> StoreResult<bool> {
        let removed = self.working.tickets.remove(&id).is_some();
        if removed {
            self.working.links.retain(|l| l.ticket_id != id);
            self.working.consumptions.retain(|c| c.ticket_id != id);
        }
        Ok(removed)
    }

    async fn ticket_mechanic_ids(&mut self, ticket_id: i64) -> StoreResult<Vec<i64>> {
        Ok(self
            .working
            .links
            .iter()
            .filter(|l| l.ticket_id == ticket_id)
            .map(|l| l.mechanic_id)
            .collect())
    }

    async fn link_mechanic(&mut self, ticket_id: i64, mechanic_id: i64) -> StoreResult<()> {
        if !self.working.tickets.contains_key(&ticket_id) {
            return Err(StoreError::ForeignKey {
                constraint: "ticket_mechanics_ticket_id_fkey".to_string(),
            });
        }
        if !self.working.mechanics.contains_key(&mechanic_id) {
            return Err(StoreError::ForeignKey {
                constraint: "ticket_mechanics_mechanic_id_fkey".to_string(),
            });
        }

        let link = Membership {
            ticket_id,
            mechanic_id,
        };
        if self.working.links.contains(&link) {
            return Err(StoreError::Duplicate {
                constraint: "ticket_mechanics_pkey".to_string(),
            });
        }

        self.working.links.push(link);
        Ok(())
    }

    async fn unlink_mechanic(&mut self, ticket_id: i64, mechanic_id: i64) -> StoreResult<bool> {
        let before = self.working.links.len();
        self.working
            .links
            .retain(|l| !(l.ticket_id == ticket_id && l.mechanic_id == mechanic_id));
        Ok(self.working.links.len() < before)
    }

    async fn memberships(&mut self) -> StoreResult<Vec<Membership>> {
        Ok(self.working.links.clone())
    }

    async fn mechanics_for_tickets(
        &mut self,
        ticket_ids: &[i64],
    ) -> StoreResult<Vec<(i64, Mechanic)>> {
        let mut rows = Vec::new();
        for link in self.working.links.iter().filter(|l| ticket_ids.contains(&l.ticket_id)) {
            let mechanic = self
                .working
                .mechanics
                .get(&link.mechanic_id)
                .ok_or_else(|| missing_row("mechanics", link.mechanic_id))?;
            rows.push((link.ticket_id, mechanic.clone()));
        }
        Ok(rows)
    }

    async fn attach_item(
        &mut self,
        ticket_id: i64,
        item_id: i64,
        quantity: i32,
    ) -> StoreResult<i64> {
        if !self.working.tickets.contains_key(&ticket_id) {
            return Err(StoreError::ForeignKey {
                constraint: "ticket_items_ticket_id_fkey".to_string(),
            });
        }
        if !self.working.items.contains_key(&item_id) {
            return Err(StoreError::ForeignKey {
                constraint: "ticket_items_item_id_fkey".to_string(),
            });
        }

        let id = next(&mut self.working.seq.consumption);
        self.working.consumptions.push(ConsumptionRow {
            id,
            ticket_id,
            item_id,
            quantity,
        });
        Ok(id)
    }

    async fn items_for_tickets(
        &mut self,
        ticket_ids: &[i64],
    ) -> StoreResult<Vec<(i64, ConsumedItem)>> {
        let mut records: Vec<&ConsumptionRow> = self
            .working
            .consumptions
            .iter()
            .filter(|c| ticket_ids.contains(&c.ticket_id))
            .collect();
        records.sort_by_key(|c| (c.ticket_id, c.id));

        let mut rows = Vec::new();
        for record in records {
            let item = self
                .working
                .items
                .get(&record.item_id)
                .ok_or_else(|| missing_row("items", record.item_id))?;
            rows.push((
                record.ticket_id,
                ConsumedItem {
                    id: item.id,
                    name: item.name.clone(),
                    price: item.price,
                    quantity: record.quantity,
                },
            ));
        }
        Ok(rows)
    }

    async fn item_usage_count(&mut self, item_id: i64) -> StoreResult<i64> {
        Ok(self
            .working
            .consumptions
            .iter()
            .filter(|c| c.item_id == item_id)
            .count() as i64)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
