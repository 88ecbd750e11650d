//! Network adapters.

mod fetcher;

pub use fetcher::HttpMediaFetcher;
