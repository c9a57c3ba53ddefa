//! Stocks API library.
//!
//! Inventory and order management backend: a product catalog with
//! stock-tracked colors, and customer orders that draw stock down.
//! The binary in `main.rs` wires this library to `PostgreSQL`; tests drive
//! the same router against [`db::MemoryStore`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod validation;

pub use error::AppError;
pub use state::AppState;
