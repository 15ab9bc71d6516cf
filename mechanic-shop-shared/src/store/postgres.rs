/// PostgreSQL Resource Store
///
/// Each [`StoreTx`] wraps one sqlx transaction. Constraint violations are
/// surfaced by SQLSTATE:
///
/// - `23505` (unique_violation) -> [`StoreError::Duplicate`]
/// - `23503` (foreign_key_violation) -> [`StoreError::ForeignKey`]
///
/// # Example
///
/// ```no_run
/// use mechanic_shop_shared::db::pool::{create_pool, DatabaseConfig};
/// use mechanic_shop_shared::store::{postgres::PgStore, ResourceStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgStore::new(pool);
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```

use super::{Membership, ResourceStore, StoreError, StoreResult, StoreTx, TicketFilter};
use crate::db::pool::health_check;
use crate::models::{
    ConsumedItem, Customer, Item, Mechanic, NewCustomer, NewItem, NewMechanic, NewServiceTicket,
    ServiceTicket,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, password_hash";
const MECHANIC_COLUMNS: &str = "id, name, email, address, phone, salary";
const ITEM_COLUMNS: &str = "id, name, price";
const TICKET_COLUMNS: &str = "id, vin, service_date, service_description, customer_id";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or_default().to_string();
            match db.code().as_deref() {
                Some("23505") => return StoreError::Duplicate { constraint },
                Some("23503") => return StoreError::ForeignKey { constraint },
                _ => {}
            }
        }
        StoreError::Backend(err.to_string())
    }
}

fn missing_row(table: &str, id: i64) -> StoreError {
    StoreError::Backend(format!("no row in {} with id {}", table, id))
}

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ResourceStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }
}

/// Transaction over [`PgStore`]; rolled back by sqlx on drop
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn get_customer(&mut self, id: i64) -> StoreResult<Option<Customer>> {
        let sql = format!("SELECT {} FROM customers WHERE id = $1", CUSTOMER_COLUMNS);
        Ok(sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn find_customer_by_email(&mut self, email: &str) -> StoreResult<Option<Customer>> {
        let sql = format!("SELECT {} FROM customers WHERE email = $1", CUSTOMER_COLUMNS);
        Ok(sqlx::query_as::<_, Customer>(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn list_customers(&mut self) -> StoreResult<Vec<Customer>> {
        let sql = format!("SELECT {} FROM customers ORDER BY id", CUSTOMER_COLUMNS);
        Ok(sqlx::query_as::<_, Customer>(&sql)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn insert_customer(&mut self, new: NewCustomer) -> StoreResult<Customer> {
        let sql = format!(
            "INSERT INTO customers (name, email, phone, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            CUSTOMER_COLUMNS
        );
        Ok(sqlx::query_as::<_, Customer>(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(&new.password_hash)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn update_customer(&mut self, customer: &Customer) -> StoreResult<Customer> {
        let sql = format!(
            "UPDATE customers
             SET name = $2, email = $3, phone = $4, password_hash = $5
             WHERE id = $1
             RETURNING {}",
            CUSTOMER_COLUMNS
        );
        sqlx::query_as::<_, Customer>(&sql)
            .bind(customer.id)
            .bind(&customer.name)
            .bind(&customer.email)
            .bind(&customer.phone)
            .bind(&customer.password_hash)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| missing_row("customers", customer.id))
    }

    async fn delete_customer(&mut self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_mechanic(&mut self, id: i64) -> StoreResult<Option<Mechanic>> {
        let sql = format!("SELECT {} FROM mechanics WHERE id = $1", MECHANIC_COLUMNS);
        Ok(sqlx::query_as::<_, Mechanic>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn list_mechanics(&mut self) -> StoreResult<Vec<Mechanic>> {
        let sql = format!("SELECT {} FROM mechanics ORDER BY id", MECHANIC_COLUMNS);
        Ok(sqlx::query_as::<_, Mechanic>(&sql)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn insert_mechanic(&mut self, new: NewMechanic) -> StoreResult<Mechanic> {
        let sql = format!(
            "INSERT INTO mechanics (name, email, address, phone, salary)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            MECHANIC_COLUMNS
        );
        Ok(sqlx::query_as::<_, Mechanic>(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.address)
            .bind(&new.phone)
            .bind(new.salary)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn update_mechanic(&mut self, mechanic: &Mechanic) -> StoreResult<Mechanic> {
        let sql = format!(
            "UPDATE mechanics
             SET name = $2, email = $3, address = $4, phone = $5, salary = $6
             WHERE id = $1
             RETURNING {}",
            MECHANIC_COLUMNS
        );
        sqlx::query_as::<_, Mechanic>(&sql)
            .bind(mechanic.id)
            .bind(&mechanic.name)
            .bind(&mechanic.email)
            .bind(&mechanic.address)
            .bind(&mechanic.phone)
            .bind(mechanic.salary)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| missing_row("mechanics", mechanic.id))
    }

    async fn delete_mechanic(&mut self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM mechanics WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_item(&mut self, id: i64) -> StoreResult<Option<Item>> {
        let sql = format!("SELECT {} FROM items WHERE id = $1", ITEM_COLUMNS);
        Ok(sqlx::query_as::<_, Item>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn list_items(&mut self) -> StoreResult<Vec<Item>> {
        let sql = format!("SELECT {} FROM items ORDER BY id", ITEM_COLUMNS);
        Ok(sqlx::query_as::<_, Item>(&sql)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn insert_item(&mut self, new: NewItem) -> StoreResult<Item> {
        let sql = format!(
            "INSERT INTO items (name, price) VALUES ($1, $2) RETURNING {}",
            ITEM_COLUMNS
        );
        Ok(sqlx::query_as::<_, Item>(&sql)
            .bind(&new.name)
            .bind(new.price)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn update_item(&mut self, item: &Item) -> StoreResult<Item> {
        let sql = format!(
            "UPDATE items SET name = $2, price = $3 WHERE id = $1 RETURNING {}",
            ITEM_COLUMNS
        );
        sqlx::query_as::<_, Item>(&sql)
            .bind(item.id)
            .bind(&item.name)
            .bind(item.price)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| missing_row("items", item.id))
    }

    async fn delete_item(&mut self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_ticket(&mut self, id: i64) -> StoreResult<Option<ServiceTicket>> {
        let sql = format!("SELECT {} FROM service_tickets WHERE id = $1", TICKET_COLUMNS);
        Ok(sqlx::query_as::<_, ServiceTicket>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn lock_ticket(&mut self, id: i64) -> StoreResult<Option<ServiceTicket>> {
        let sql = format!(
            "SELECT {} FROM service_tickets WHERE id = $1 FOR UPDATE",
            TICKET_COLUMNS
        );
        Ok(sqlx::query_as::<_, ServiceTicket>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn list_tickets(&mut self, filter: TicketFilter) -> StoreResult<Vec<ServiceTicket>> {
        let rows = match filter {
            TicketFilter::All => {
                let sql = format!("SELECT {} FROM service_tickets ORDER BY id", TICKET_COLUMNS);
                sqlx::query_as::<_, ServiceTicket>(&sql)
                    .fetch_all(&mut *self.tx)
                    .await?
            }
            TicketFilter::Customer(customer_id) => {
                let sql = format!(
                    "SELECT {} FROM service_tickets WHERE customer_id = $1 ORDER BY id",
                    TICKET_COLUMNS
                );
                sqlx::query_as::<_, ServiceTicket>(&sql)
                    .bind(customer_id)
                    .fetch_all(&mut *self.tx)
                    .await?
            }
        };
        Ok(rows)
    }

    async fn insert_ticket(&mut self, new: NewServiceTicket) -> StoreResult<ServiceTicket> {
        let sql = format!(
            "INSERT INTO service_tickets (vin, service_date, service_description, customer_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {}",
            TICKET_COLUMNS
        );
        Ok(sqlx::query_as::<_, ServiceTicket>(&sql)
            .bind(&new.vin)
            .bind(new.service_date)
            .bind(&new.service_description)
            .bind(new.customer_id)
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn update_ticket(&mut self, ticket: &ServiceTicket) -> StoreResult<ServiceTicket> {
        let sql = format!(
            "UPDATE service_tickets
             SET vin = $2, service_date = $3, service_description = $4, customer_id = $5
             WHERE id = $1
             RETURNING {}",
            TICKET_COLUMNS
        );
        sqlx::query_as::<_, ServiceTicket>(&sql)
            .bind(ticket.id)
            .bind(&ticket.vin)
            .bind(ticket.service_date)
            .bind(&ticket.service_description)
            .bind(ticket.customer_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| missing_row("service_tickets", ticket.id))
    }

    async fn delete_ticket(&mut self, id: i64) -> StoreResult<bool> {
        // link and consumption rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM service_tickets WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ticket_mechanic_ids(&mut self, ticket_id: i64) -> StoreResult<Vec<i64>> {
        Ok(sqlx::query_scalar::<_, i64>(
            "SELECT mechanic_id FROM ticket_mechanics WHERE ticket_id = $1 ORDER BY seq",
        )
        .bind(ticket_id)
        .fetch_all(&mut *self.tx)
        .await?)
    }

    async fn link_mechanic(&mut self, ticket_id: i64, mechanic_id: i64) -> StoreResult<()> {
        sqlx::query("INSERT INTO ticket_mechanics (ticket_id, mechanic_id) VALUES ($1, $2)")
            .bind(ticket_id)
            .bind(mechanic_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn unlink_mechanic(&mut self, ticket_id: i64, mechanic_id: i64) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM ticket_mechanics WHERE ticket_id = $1 AND mechanic_id = $2")
                .bind(ticket_id)
                .bind(mechanic_id)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn memberships(&mut self) -> StoreResult<Vec<Membership>> {
        Ok(sqlx::query_as::<_, Membership>(
            "SELECT ticket_id, mechanic_id FROM ticket_mechanics ORDER BY seq",
        )
        .fetch_all(&mut *self.tx)
        .await?)
    }

    async fn mechanics_for_tickets(
        &mut self,
        ticket_ids: &[i64],
    ) -> StoreResult<Vec<(i64, Mechanic)>> {
        let rows = sqlx::query_as::<_, (i64, i64, String, String, String, String, f64)>(
            "SELECT tm.ticket_id, m.id, m.name, m.email, m.address, m.phone, m.salary
             FROM ticket_mechanics tm
             JOIN mechanics m ON m.id = tm.mechanic_id
             WHERE tm.ticket_id = ANY($1)
             ORDER BY tm.ticket_id, tm.seq",
        )
        .bind(ticket_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(ticket_id, id, name, email, address, phone, salary)| {
                (
                    ticket_id,
                    Mechanic {
                        id,
                        name,
                        email,
                        address,
                        phone,
                        salary,
                    },
                )
            })
            .collect())
    }

    async fn attach_item(
        &mut self,
        ticket_id: i64,
        item_id: i64,
        quantity: i32,
    ) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>(
            "INSERT INTO ticket_items (ticket_id, item_id, quantity)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(ticket_id)
        .bind(item_id)
        .bind(quantity)
        .fetch_one(&mut *self.tx)
        .await?)
    }

    async fn items_for_tickets(
        &mut self,
        ticket_ids: &[i64],
    ) -> StoreResult<Vec<(i64, ConsumedItem)>> {
        let rows = sqlx::query_as::<_, (i64, i64, String, f64, i32)>(
            "SELECT ti.ticket_id, i.id, i.name, i.price, ti.quantity
             FROM ticket_items ti
             JOIN items i ON i.id = ti.item_id
             WHERE ti.ticket_id = ANY($1)
             ORDER BY ti.ticket_id, ti.id",
        )
        .bind(ticket_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(ticket_id, id, name, price, quantity)| {
                (
                    ticket_id,
                    ConsumedItem {
                        id,
                        name,
                        price,
                        quantity,
                    },
                )
            })
            .collect())
    }

    async fn item_usage_count(&mut self, item_id: i64) -> StoreResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ticket_items WHERE item_id = $1")
                .bind(item_id)
                .fetch_one(&mut *self.tx)
                .await?,
        )
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
