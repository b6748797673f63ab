mod granularity;
mod rate_limit;
mod tags_type;
mod time_series;

pub use granularity::*;
pub use rate_limit::*;
pub use tags_type::*;
pub use time_series::*;
