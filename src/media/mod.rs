/// Listing photo handling
///
/// This module handles:
/// - Deriving responsive URL variants for listing photos (urls.rs)
/// - Memoizing URL sets and coalescing preloads (cache.rs)
/// - Pluggable fetch backends (fetch.rs)

pub mod cache;
pub mod fetch;
pub mod urls;

pub use cache::{ImageCacheStats, ImageResourceCache, PreloadOutcome};
pub use fetch::{DiskFetcher, FetchError, ImageFetcher, Priority};
pub use urls::{derive_urls, ImageOptions, ImageUrlSet, VariantFormat};
