mod cache;
mod fetcher;
mod parser;
mod snapshot;
mod traits;

pub use cache::{CacheSettings, SubnetCache};
pub use fetcher::HttpFetcher;
pub use parser::{parse_cidrs, ParsedList};
pub use snapshot::Snapshot;
pub use traits::SourceFetcher;
