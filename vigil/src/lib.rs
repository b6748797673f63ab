#![forbid(unsafe_code)]

pub mod config;
mod context;
mod engine;
mod entity;
mod error;
mod pipeline;
mod processor;
pub mod processors;
mod registry;
mod subscriptions;

pub use context::*;
pub use engine::*;
pub use entity::*;
pub use error::*;
pub use pipeline::*;
pub use processor::*;
pub use registry::*;
pub use subscriptions::*;

pub use vigil_query;
pub use vigil_store;
