use serde::Serialize;
use std::time::{Duration, TryFromFloatSecsError};
use thiserror::Error;

/// A single scalar query-string value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl QueryValue {
    /// Infer the scalar type of a raw command-line value
    /// Order: bool, integer, float, falling back to string
    pub fn infer(raw: &str) -> Self {
        match raw {
            "true" => return QueryValue::Bool(true),
            "false" => return QueryValue::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return QueryValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return QueryValue::Float(f);
        }
        QueryValue::Str(raw.to_string())
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::Str(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::Str(v)
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Int(v)
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Float(v)
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Bool(v)
    }
}

/// Ordered query parameters, sent exactly as given
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QueryParams(Vec<(String, QueryValue)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How long a fetch may take before it is treated as failed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timeout {
    /// One bound for connecting and for the whole request
    Total(Duration),
    /// Separate connect and read bounds
    Split { connect: Duration, read: Duration },
}

impl Timeout {
    pub const DEFAULT_SECS: u64 = 10;

    /// Fails on negative, NaN or out-of-range seconds
    pub fn secs(secs: f64) -> Result<Self, TryFromFloatSecsError> {
        Ok(Timeout::Total(Duration::try_from_secs_f64(secs)?))
    }

    pub fn split_secs(connect: f64, read: f64) -> Result<Self, TryFromFloatSecsError> {
        Ok(Timeout::Split {
            connect: Duration::try_from_secs_f64(connect)?,
            read: Duration::try_from_secs_f64(read)?,
        })
    }

    pub fn connect(&self) -> Duration {
        match self {
            Timeout::Total(total) => *total,
            Timeout::Split { connect, .. } => *connect,
        }
    }

    /// Upper bound on the whole request, connect included
    pub fn request(&self) -> Duration {
        match self {
            Timeout::Total(total) => *total,
            Timeout::Split { connect, read } => connect.saturating_add(*read),
        }
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Timeout::Total(Duration::from_secs(Self::DEFAULT_SECS))
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Timeout::Total(d)
    }
}

impl From<(Duration, Duration)> for Timeout {
    fn from((connect, read): (Duration, Duration)) -> Self {
        Timeout::Split { connect, read }
    }
}

/// Errors returned by the query-aux fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error ({status}): {body}")]
    Http { status: u16, body: String },
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Invalid JSON payload: {0}")]
    Decode(String),
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// HTTP status when the server answered with 4xx/5xx
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Connection(e.to_string())
        }
    }
}
