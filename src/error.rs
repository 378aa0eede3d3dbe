use std::time::Duration;
use thiserror::Error;

/// Outcome of a failed lookup. These are the only errors a query returns.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    /// The input is not an IPv4 or IPv6 literal. No refresh is attempted.
    #[error("'{0}' does not appear to be a valid IP address")]
    InvalidAddress(String),

    /// The address is valid but no known subnet contains it.
    #[error("address does not appear to be through a known vpn")]
    NotFound,
}

/// Failure to retrieve a single source location.
///
/// Absorbed by the refresh cycle: the source simply contributes nothing
/// until the next cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {location} failed: {source}")]
    Http {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{location} answered with status {status}")]
    Status { location: String, status: u16 },

    #[error("{location} timed out after {after:?}")]
    Timeout { location: String, after: Duration },

    #[error("{location} is unavailable: {reason}")]
    Unavailable { location: String, reason: String },
}

impl FetchError {
    pub fn location(&self) -> &str {
        match self {
            FetchError::Http { location, .. }
            | FetchError::Status { location, .. }
            | FetchError::Timeout { location, .. }
            | FetchError::Unavailable { location, .. } => location,
        }
    }
}
