pub mod client;
pub mod models;

pub use client::{fetch_query_aux, QueryAuxClient};
pub use models::{FetchError, QueryParams, QueryValue, Timeout};
