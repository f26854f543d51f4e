//! move2play-store/crates/domains/src/lib.rs
//!
//! The central domain model and port definitions for the store.
//! Nothing in this crate performs I/O; adapters implement the ports.

pub mod errors;
pub mod filter;
pub mod genre;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use filter::GameFilter;
pub use genre::Genre;
pub use models::*;
pub use ports::*;
