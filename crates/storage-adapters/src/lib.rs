//! # storage-adapters
//!
//! Persistence gateways implementing the `domains` repository ports.
//! `memory` is always compiled; `postgres` is behind the `db-postgres` feature.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::MemoryStore;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
