//! External collaborator traits and implementations.

pub mod generators;
pub mod production;

pub use generators::{
    HttpImageGenerator, HttpMessageGenerator, ImageChain, ImageGenerator,
    InMemoryImageGenerator, InMemoryMessageGenerator, MessageChain, MessageGenerator,
};
pub use production::{HttpProductionQueue, InMemoryProductionQueue, ProductionQueue};
