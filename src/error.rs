//! Error types shared by the client, query builder, and citation formatter.

use thiserror::Error;

/// Errors surfaced by the PubMed client and its supporting components
#[derive(Debug, Error)]
pub enum Error {
    /// Request failed validation before any network activity
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    /// Rate limiter was constructed with a non-positive rate
    #[error("Invalid rate limit: {0} requests/second (must be positive)")]
    InvalidRateLimit(f64),

    /// Transport-level failure: network error, timeout, or non-success status
    #[error("Fetch failed: {message}")]
    Fetch {
        /// HTTP status code, when one was received
        status: Option<u16>,
        message: String,
    },

    /// Response could not be normalized into article records
    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Transport failure without an HTTP status (connect error, timeout)
    pub fn fetch(message: impl Into<String>) -> Self {
        Error::Fetch {
            status: None,
            message: message.into(),
        }
    }

    /// Transport failure carrying the offending HTTP status
    pub fn fetch_status(status: u16, message: impl Into<String>) -> Self {
        Error::Fetch {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Fetch {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::DeError> for Error {
    fn from(err: quick_xml::DeError) -> Self {
        Error::Parse(format!("XML: {}", err))
    }
}
