#![forbid(unsafe_code)]

pub mod conditions;
mod error;
mod expression;
mod formatter;
mod granularity;
mod parser;
mod query;
mod translation;
mod validator;

pub use error::*;
pub use expression::*;
pub use granularity::*;
pub use parser::{parse_expression, parse_query, MAX_NESTING_DEPTH};
pub use query::*;
pub use translation::*;
pub use validator::*;
