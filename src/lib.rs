//! Answers "does this IP address belong to a known VPN or proxy network?"
//!
//! A [`SubnetCache`] holds the subnets published by a set of remote lists,
//! grouped by origin, and refreshes them when a query finds them stale.

pub mod config;
pub mod engine;
pub mod error;
pub mod init;
pub mod registry;

pub use config::Config;
pub use engine::{CacheSettings, HttpFetcher, Snapshot, SourceFetcher, SubnetCache};
pub use error::{FetchError, LookupError};
pub use registry::SourceRegistry;
