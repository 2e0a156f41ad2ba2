//! Route handlers.

pub mod customers;
pub mod health;
pub mod inventory;
pub mod metrics;
pub mod orders;
pub mod production;
pub mod slots;
