//! Persistence layer for the storefront.
//!
//! A single [`Store`] trait covers orders, the inventory ledger, the
//! expedition slot pool, and customer accounts, with two backends:
//! [`PostgresStore`] for production and [`MemoryStore`] for tests and
//! local development.

pub mod auth;
pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use model::{Customer, ExpeditionSlot, InventoryItem, ProductionRecord, SlotStatus};
pub use postgres::PostgresStore;
pub use store::Store;
