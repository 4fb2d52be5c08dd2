/// Image URL memoization and de-duplicated preloading
///
/// URL sets are derived once per (base URL, options) and shared afterwards.
/// Preloads are coalesced per URL: while a load is in flight every caller
/// awaits the same `OnceCell`, so the fetcher sees exactly one request.
/// Successful loads are remembered for the session; failures are not, so a
/// later preload may try again.

use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::fetch::{FetchError, ImageFetcher, Priority};
use super::urls::{derive_urls, ImageOptions, ImageUrlSet};

/// Final state of a preload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadOutcome {
    Loaded,
    Failed(FetchError),
}

impl PreloadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, PreloadOutcome::Loaded)
    }
}

/// Cache counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageCacheStats {
    /// URL-set lookups answered from the cache
    pub hits: u64,
    /// URL-set lookups that had to derive
    pub misses: u64,
    /// Successful underlying loads
    pub preloaded: u64,
    /// Failed underlying loads
    pub failed: u64,
    /// Number of memoized URL sets
    pub cache_size: usize,
    /// Number of URLs known to be loaded
    pub loaded_count: usize,
}

impl ImageCacheStats {
    /// hits / (hits + misses), or 0 before any lookup
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

type UrlKey = (String, ImageOptions);
type InFlight = Arc<OnceCell<PreloadOutcome>>;

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    preloaded: AtomicU64,
    failed: AtomicU64,
}

/// Session-wide image URL and preload cache
pub struct ImageResourceCache {
    fetcher: Arc<dyn ImageFetcher>,
    urls: Mutex<HashMap<UrlKey, Arc<ImageUrlSet>>>,
    loaded: Mutex<HashSet<String>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    counters: Counters,
}

/// Lock a map, recovering from a poisoned mutex. The maps only ever grow by
/// whole entries, so a panic elsewhere cannot leave one half-written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ImageResourceCache {
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            fetcher,
            urls: Mutex::new(HashMap::new()),
            loaded: Mutex::new(HashSet::new()),
            in_flight: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// URL set for `base_url` under `options`, derived on first request
    pub fn urls(&self, base_url: &str, options: &ImageOptions) -> Arc<ImageUrlSet> {
        let key = (base_url.to_string(), options.clone());
        let mut urls = lock(&self.urls);

        if let Some(set) = urls.get(&key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(set);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let set = Arc::new(derive_urls(base_url, options));
        urls.insert(key, Arc::clone(&set));
        set
    }

    pub fn is_loaded(&self, url: &str) -> bool {
        lock(&self.loaded).contains(url)
    }

    /// Load `url` once.
    ///
    /// Already loaded: resolves immediately. In flight: joins the running
    /// load. Otherwise starts a new load through the fetcher.
    pub async fn preload(&self, url: &str, priority: Priority) -> PreloadOutcome {
        if self.is_loaded(url) {
            return PreloadOutcome::Loaded;
        }

        let cell: InFlight = {
            let mut in_flight = lock(&self.in_flight);
            // A load may have finished and retired its entry since the check above
            if self.is_loaded(url) {
                return PreloadOutcome::Loaded;
            }
            Arc::clone(in_flight.entry(url.to_string()).or_default())
        };

        let outcome = cell
            .get_or_init(|| self.load(url, priority))
            .await
            .clone();

        // Whoever gets here first retires the entry; later joiners find it gone
        let mut in_flight = lock(&self.in_flight);
        if in_flight.get(url).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
            in_flight.remove(url);
        }

        outcome
    }

    async fn load(&self, url: &str, priority: Priority) -> PreloadOutcome {
        match self.fetcher.fetch(url, priority).await {
            Ok(()) => {
                lock(&self.loaded).insert(url.to_string());
                self.counters.preloaded.fetch_add(1, Ordering::Relaxed);
                debug!(url, "image preloaded");
                PreloadOutcome::Loaded
            }
            Err(error) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!(url, %error, "image preload failed");
                PreloadOutcome::Failed(error)
            }
        }
    }

    /// Preload `count` URLs starting at `start`, concurrently, waiting for all
    pub async fn preload_sequence(
        &self,
        urls: &[String],
        start: usize,
        count: usize,
    ) -> Vec<(String, PreloadOutcome)> {
        let selected: Vec<&String> = urls.iter().skip(start).take(count).collect();
        let outcomes = join_all(selected.iter().map(|url| self.preload(url, Priority::High))).await;
        selected.into_iter().cloned().zip(outcomes).collect()
    }

    pub fn stats(&self) -> ImageCacheStats {
        ImageCacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            preloaded: self.counters.preloaded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            cache_size: lock(&self.urls).len(),
            loaded_count: lock(&self.loaded).len(),
        }
    }

    /// Drop every memoized URL set, loaded marker and counter
    pub fn clear(&self) {
        lock(&self.urls).clear();
        lock(&self.loaded).clear();
        lock(&self.in_flight).clear();
        self.counters.hits.store(0, Ordering::Relaxed);
        self.counters.misses.store(0, Ordering::Relaxed);
        self.counters.preloaded.store(0, Ordering::Relaxed);
        self.counters.failed.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for ImageResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageResourceCache")
            .field("stats", &self.stats())
            .finish()
    }
}
