/// Database plumbing for the PostgreSQL store adapter
///
/// - `pool`: connection pool creation and health probe
/// - `migrations`: embedded schema migrations (`mechanic-shop-shared/migrations/`)
///
/// # Example
///
/// ```no_run
/// use mechanic_shop_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
