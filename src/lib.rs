//! Fetch JSON from the flotation analytics `query-aux` endpoint and draw
//! dual-axis time-series charts from tabular data.

pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use api::query_aux::{fetch_query_aux, FetchError, QueryAuxClient, QueryParams, QueryValue, Timeout};
pub use config::{Config, ConfigError, PlotConfig};
pub use models::{Dataset, DatasetError, DualAxisChart, Series, YAxis};
pub use services::chart_service::{build_chart, plot, plot_or_log, render_png, render_png_bytes, PlotError};
