/// CRUD services for customers, mechanics, inventory items and tickets
///
/// Every method validates its payload, runs in one store transaction and
/// commits only on success. Partial updates go through each entity's
/// `apply` merge, so only whitelisted fields can change.
///
/// Also home to customer login and the customer-scoped ticket lookup.

use crate::association::{ITEM_NOT_FOUND, MECHANIC_NOT_FOUND, TICKET_NOT_FOUND};
use crate::auth::{jwt, password};
use crate::error::{ShopError, ShopResult};
use crate::models::{
    Customer, CustomerChanges, CustomerPatch, CustomerPayload, Item, ItemPatch, ItemPayload,
    LoginPayload, Mechanic, MechanicPatch, MechanicPayload, NewCustomer, ServiceTicket, TicketPatch,
    TicketPayload, TicketView,
};
use crate::store::{load_view, load_views, ResourceStore, StoreTx, TicketFilter};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

pub const CUSTOMER_NOT_FOUND: &str = "Customer not found.";
pub const TICKET_CUSTOMER_NOT_FOUND: &str = "Customer not found. Please provide a valid customer_id.";
pub const NO_TICKETS_FOR_CALLER: &str = "No tickets associated with you";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Signing settings for login tokens
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub ttl_seconds: i64,
}

fn not_found(message: &str) -> ShopError {
    ShopError::NotFound(message.to_string())
}

fn incomplete() -> ShopError {
    ShopError::invalid("payload", "Missing data for required field.")
}

fn hash(plain: &str) -> ShopResult<String> {
    password::hash_password(plain).map_err(|e| ShopError::Internal(e.to_string()))
}

async fn require_customer(tx: &mut dyn StoreTx, customer_id: i64) -> ShopResult<()> {
    match tx.get_customer(customer_id).await? {
        Some(_) => Ok(()),
        None => Err(not_found(TICKET_CUSTOMER_NOT_FOUND)),
    }
}

#[derive(Clone)]
pub struct ResourceService {
    store: Arc<dyn ResourceStore>,
    tokens: TokenSettings,
}

impl ResourceService {
    pub fn new(store: Arc<dyn ResourceStore>, tokens: TokenSettings) -> Self {
        Self { store, tokens }
    }

    // Customers

    pub async fn create_customer(&self, payload: CustomerPayload) -> ShopResult<Customer> {
        payload.validate()?;
        let (name, email, phone, plain) = match payload {
            CustomerPayload {
                name: Some(name),
                email: Some(email),
                phone: Some(phone),
                password: Some(plain),
            } => (name, email, phone, plain),
            _ => return Err(incomplete()),
        };

        let new = NewCustomer {
            name,
            email,
            phone,
            password_hash: hash(&plain)?,
        };

        let mut tx = self.store.begin().await?;
        let customer = tx.insert_customer(new).await?;
        tx.commit().await?;

        info!(customer_id = customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn list_customers(&self) -> ShopResult<Vec<Customer>> {
        let mut tx = self.store.begin().await?;
        let customers = tx.list_customers().await?;
        tx.commit().await?;
        Ok(customers)
    }

    pub async fn get_customer(&self, id: i64) -> ShopResult<Customer> {
        let mut tx = self.store.begin().await?;
        let customer = tx.get_customer(id).await?.ok_or_else(|| not_found(CUSTOMER_NOT_FOUND))?;
        tx.commit().await?;
        Ok(customer)
    }

    pub async fn update_customer(&self, id: i64, patch: CustomerPatch) -> ShopResult<Customer> {
        patch.validate()?;
        let password_hash = patch.password.as_deref().map(hash).transpose()?;

        let mut tx = self.store.begin().await?;
        let mut customer = tx.get_customer(id).await?.ok_or_else(|| not_found(CUSTOMER_NOT_FOUND))?;
        customer.apply(CustomerChanges {
            name: patch.name,
            email: patch.email,
            phone: patch.phone,
            password_hash,
        });
        let customer = tx.update_customer(&customer).await?;
        tx.commit().await?;

        info!(customer_id = id, "Customer updated");
        Ok(customer)
    }

    /// Refused while the customer still owns tickets
    pub async fn delete_customer(&self, id: i64) -> ShopResult<()> {
        let mut tx = self.store.begin().await?;
        if tx.get_customer(id).await?.is_none() {
            return Err(not_found(CUSTOMER_NOT_FOUND));
        }
        if !tx.list_tickets(TicketFilter::Customer(id)).await?.is_empty() {
            return Err(ShopError::ConstraintViolation(
                "Customer has service tickets and cannot be deleted.".to_string(),
            ));
        }
        tx.delete_customer(id).await?;
        tx.commit().await?;

        info!(customer_id = id, "Customer deleted");
        Ok(())
    }

    /// Verifies credentials and issues a bearer token
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, payload: LoginPayload) -> ShopResult<String> {
        payload.validate()?;
        let (email, plain) = match (payload.email, payload.password) {
            (Some(email), Some(plain)) => (email, plain),
            _ => return Err(incomplete()),
        };

        let mut tx = self.store.begin().await?;
        let customer = tx.find_customer_by_email(&email).await?;
        tx.commit().await?;

        let customer = match customer {
            Some(customer) => customer,
            None => {
                warn!("Login attempt for unknown email");
                return Err(ShopError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        let verified = password::verify_password(&plain, &customer.password_hash)
            .map_err(|e| ShopError::Internal(e.to_string()))?;
        if !verified {
            warn!(customer_id = customer.id, "Login attempt with wrong password");
            return Err(ShopError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let token = jwt::issue_token(customer.id, self.tokens.ttl_seconds, &self.tokens.secret)
            .map_err(|e| ShopError::Internal(e.to_string()))?;

        info!(customer_id = customer.id, "Customer logged in");
        Ok(token)
    }

    // Mechanics

    pub async fn create_mechanic(&self, payload: MechanicPayload) -> ShopResult<Mechanic> {
        payload.validate()?;
        let new = payload.into_new().ok_or_else(incomplete)?;

        let mut tx = self.store.begin().await?;
        let mechanic = tx.insert_mechanic(new).await?;
        tx.commit().await?;

        info!(mechanic_id = mechanic.id, "Mechanic created");
        Ok(mechanic)
    }

    pub async fn list_mechanics(&self) -> ShopResult<Vec<Mechanic>> {
        let mut tx = self.store.begin().await?;
        let mechanics = tx.list_mechanics().await?;
        tx.commit().await?;
        Ok(mechanics)
    }

    pub async fn get_mechanic(&self, id: i64) -> ShopResult<Mechanic> {
        let mut tx = self.store.begin().await?;
        let mechanic = tx.get_mechanic(id).await?.ok_or_else(|| not_found(MECHANIC_NOT_FOUND))?;
        tx.commit().await?;
        Ok(mechanic)
    }

    pub async fn update_mechanic(&self, id: i64, patch: MechanicPatch) -> ShopResult<Mechanic> {
        patch.validate()?;

        let mut tx = self.store.begin().await?;
        let mut mechanic = tx.get_mechanic(id).await?.ok_or_else(|| not_found(MECHANIC_NOT_FOUND))?;
        mechanic.apply(patch);
        let mechanic = tx.update_mechanic(&mechanic).await?;
        tx.commit().await?;

        info!(mechanic_id = id, "Mechanic updated");
        Ok(mechanic)
    }

    /// Also drops the mechanic from every ticket
    pub async fn delete_mechanic(&self, id: i64) -> ShopResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_mechanic(id).await? {
            return Err(not_found(MECHANIC_NOT_FOUND));
        }
        tx.commit().await?;

        info!(mechanic_id = id, "Mechanic deleted");
        Ok(())
    }

    // Inventory

    pub async fn create_item(&self, payload: ItemPayload) -> ShopResult<Item> {
        payload.validate()?;
        let new = payload.into_new().ok_or_else(incomplete)?;

        let mut tx = self.store.begin().await?;
        let item = tx.insert_item(new).await?;
        tx.commit().await?;

        info!(item_id = item.id, "Item created");
        Ok(item)
    }

    pub async fn list_items(&self) -> ShopResult<Vec<Item>> {
        let mut tx = self.store.begin().await?;
        let items = tx.list_items().await?;
        tx.commit().await?;
        Ok(items)
    }

    pub async fn get_item(&self, id: i64) -> ShopResult<Item> {
        let mut tx = self.store.begin().await?;
        let item = tx.get_item(id).await?.ok_or_else(|| not_found(ITEM_NOT_FOUND))?;
        tx.commit().await?;
        Ok(item)
    }

    pub async fn update_item(&self, id: i64, patch: ItemPatch) -> ShopResult<Item> {
        patch.validate()?;

        let mut tx = self.store.begin().await?;
        let mut item = tx.get_item(id).await?.ok_or_else(|| not_found(ITEM_NOT_FOUND))?;
        item.apply(patch);
        let item = tx.update_item(&item).await?;
        tx.commit().await?;

        info!(item_id = id, "Item updated");
        Ok(item)
    }

    /// Refused while any ticket records the item as consumed
    pub async fn delete_item(&self, id: i64) -> ShopResult<()> {
        let mut tx = self.store.begin().await?;
        if tx.get_item(id).await?.is_none() {
            return Err(not_found(ITEM_NOT_FOUND));
        }
        if tx.item_usage_count(id).await? > 0 {
            return Err(ShopError::ConstraintViolation(
                "Item is used on service tickets and cannot be deleted.".to_string(),
            ));
        }
        tx.delete_item(id).await?;
        tx.commit().await?;

        info!(item_id = id, "Item deleted");
        Ok(())
    }

    // Service tickets

    pub async fn create_ticket(&self, payload: TicketPayload) -> ShopResult<TicketView> {
        payload.validate()?;
        let new = payload.into_new().ok_or_else(incomplete)?;

        let mut tx = self.store.begin().await?;
        require_customer(tx.as_mut(), new.customer_id).await?;
        let ticket = tx.insert_ticket(new).await?;
        let view = load_view(tx.as_mut(), ticket).await?;
        tx.commit().await?;

        info!(ticket_id = view.id, customer_id = view.customer_id, "Service ticket created");
        Ok(view)
    }

    /// Every ticket, ascending id
    pub async fn list_ticket_views(&self) -> ShopResult<Vec<TicketView>> {
        let mut tx = self.store.begin().await?;
        let tickets = tx.list_tickets(TicketFilter::All).await?;
        let views = load_views(tx.as_mut(), tickets).await?;
        tx.commit().await?;
        Ok(views)
    }

    pub async fn get_ticket(&self, id: i64) -> ShopResult<TicketView> {
        let mut tx = self.store.begin().await?;
        let ticket = tx.get_ticket(id).await?.ok_or_else(|| not_found(TICKET_NOT_FOUND))?;
        let view = load_view(tx.as_mut(), ticket).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Tickets owned by the authenticated caller
    ///
    /// `customer_id` must come from a validated token.
    pub async fn list_tickets_for_customer(&self, customer_id: i64) -> ShopResult<Vec<TicketView>> {
        let mut tx = self.store.begin().await?;
        let tickets = tx.list_tickets(TicketFilter::Customer(customer_id)).await?;
        if tickets.is_empty() {
            return Err(not_found(NO_TICKETS_FOR_CALLER));
        }
        let views = load_views(tx.as_mut(), tickets).await?;
        tx.commit().await?;
        Ok(views)
    }

    pub async fn update_ticket(&self, id: i64, patch: TicketPatch) -> ShopResult<TicketView> {
        patch.validate()?;

        let mut tx = self.store.begin().await?;
        let mut ticket: ServiceTicket =
            tx.lock_ticket(id).await?.ok_or_else(|| not_found(TICKET_NOT_FOUND))?;

        if let Some(customer_id) = patch.customer_id {
            if customer_id != ticket.customer_id {
                require_customer(tx.as_mut(), customer_id).await?;
            }
        }

        ticket.apply(patch);
        let ticket = tx.update_ticket(&ticket).await?;
        let view = load_view(tx.as_mut(), ticket).await?;
        tx.commit().await?;

        info!(ticket_id = id, "Service ticket updated");
        Ok(view)
    }

    /// Removes the ticket together with its mechanic links and item records
    pub async fn delete_ticket(&self, id: i64) -> ShopResult<()> {
        let mut tx = self.store.begin().await?;
        if !tx.delete_ticket(id).await? {
            return Err(not_found(TICKET_NOT_FOUND));
        }
        tx.commit().await?;

        info!(ticket_id = id, "Service ticket deleted");
        Ok(())
    }
}
