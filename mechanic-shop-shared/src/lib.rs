//! # Mechanic Shop Shared Library
//!
//! Domain types, storage and services behind the mechanic shop API.
//!
//! ## Module Organization
//!
//! - `models`: customers, mechanics, inventory items, service tickets
//! - `store`: the Resource Store port and its PostgreSQL / in-memory adapters
//! - `db`: connection pool and migrations for the PostgreSQL adapter
//! - `auth`: password hashing, bearer tokens, caller identity
//! - `association`: ticket membership and item consumption engine
//! - `workload`: most-worked mechanic ranking
//! - `resources`: CRUD, login and the customer-scoped ticket lookup
//! - `policy`: rate limiting and the response cache
//! - `error`: domain error taxonomy

pub mod association;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod policy;
pub mod resources;
pub mod store;
pub mod workload;

pub use error::{FieldError, ShopError, ShopResult};

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
