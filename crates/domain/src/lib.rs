//! Fulfillment core for the sneaker customization storefront.
//!
//! This crate provides:
//! - the customization catalog (five closed option sets, one canonical table)
//! - the configuration mapper (production payload + inventory deductions)
//! - the order aggregate with its item and order state machines

pub mod catalog;
pub mod mapper;
pub mod order;

pub use catalog::{CatalogError, Color, LaceDetail, Material, SneakerConfig, Sole, Step, Style};
pub use mapper::{Blade, Block, InventoryDeduction, ProductionPayload};
pub use order::{Order, OrderError, OrderItem, OrderStatus, ProductionStatus};
