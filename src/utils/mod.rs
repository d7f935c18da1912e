pub mod time;

pub use time::{parse_timestamp, timestamp_from_value};
