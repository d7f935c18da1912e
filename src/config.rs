//! Runtime configuration read from the environment (after `.env`)

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::api::query_aux::{QueryAuxClient, Timeout};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Columns and bounds for the chart the binary draws
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    pub x_column: String,
    pub y1_column: String,
    pub y2_column: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub timeout: Timeout,
    pub output_dir: PathBuf,
    pub plot: Option<PlotConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let read_secs = |key: &'static str| -> Result<Option<Duration>, ConfigError> {
            let Some(raw) = get(key) else {
                return Ok(None);
            };
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|secs| *secs > 0.0)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .map(Some)
                .ok_or(ConfigError::Invalid { key, value: raw })
        };

        let read = read_secs("QUERY_AUX_TIMEOUT_SECS")?
            .unwrap_or(Duration::from_secs(Timeout::DEFAULT_SECS));
        let timeout = match read_secs("QUERY_AUX_CONNECT_TIMEOUT_SECS")? {
            Some(connect) => Timeout::Split { connect, read },
            None => Timeout::Total(read),
        };

        let plot = match (get("PLOT_X_COLUMN"), get("PLOT_Y1_COLUMN")) {
            (Some(x_column), Some(y1_column)) => Some(PlotConfig {
                x_column,
                y1_column,
                y2_column: get("PLOT_Y2_COLUMN"),
                start: get("PLOT_START"),
                end: get("PLOT_END"),
            }),
            _ => None,
        };

        Ok(Self {
            base_url: get("QUERY_AUX_URL")
                .unwrap_or_else(|| QueryAuxClient::DEFAULT_BASE_URL.to_string()),
            timeout,
            output_dir: get("CHART_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("charts")),
            plot,
        })
    }
}
