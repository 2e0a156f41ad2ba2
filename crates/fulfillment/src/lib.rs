//! Order fulfillment workflow.
//!
//! Orchestrates the path from order placement through production
//! submission, the production-finished callback, and delivery
//! confirmation, over the store and the external collaborators
//! (production queue middleware, image and message vendors).

pub mod error;
pub mod service;
pub mod services;

pub use error::{FulfillmentError, Result};
pub use service::{CallbackOutcome, FulfillmentService, RawItemConfig};
pub use services::{
    HttpImageGenerator, HttpMessageGenerator, HttpProductionQueue, ImageChain, ImageGenerator,
    InMemoryImageGenerator, InMemoryMessageGenerator, InMemoryProductionQueue, MessageChain,
    MessageGenerator, ProductionQueue,
};
