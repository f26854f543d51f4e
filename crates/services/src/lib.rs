//! # services
//!
//! Application logic between the HTTP adapters and the persistence ports.

pub mod dto;
pub mod games;
pub mod mapper;
pub mod purchases;

pub use games::GameService;
pub use purchases::PurchaseService;
