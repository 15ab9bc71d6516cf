//! # Mechanic Shop API Server Library
//!
//! HTTP surface of the mechanic shop, built on the services in
//! `mechanic_shop_shared`.
//!
//! ## Modules
//!
//! - `app`: Application state, router builder and bearer-token middleware
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers and per-route rate limiting
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
