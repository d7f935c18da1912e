//! Data models shared by the fetcher and the plotter

pub mod chart;
pub mod dataset;

pub use chart::{ChartStyle, DualAxisChart, Margins, Series, YAxis};
pub use dataset::{Column, Dataset, DatasetError};
