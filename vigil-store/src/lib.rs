#![forbid(unsafe_code)]

mod creator;
mod data;
mod engine;
mod entity_subscription;
mod error;
mod identifier;
mod store;

pub use creator::*;
pub use data::*;
pub use engine::*;
pub use entity_subscription::*;
pub use error::*;
pub use identifier::*;
pub use store::*;
