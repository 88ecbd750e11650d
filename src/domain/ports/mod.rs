mod media_cache_port;
mod media_fetcher_port;

pub use media_cache_port::MediaCachePort;
pub use media_fetcher_port::MediaFetcherPort;
