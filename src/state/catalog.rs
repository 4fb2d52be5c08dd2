use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

use super::data::{listings_from_json, seed_listings, Category, Listing, Listings};
use super::filter::{AdvancedFilter, FilterCriteria, FilterUpdate};
use crate::config::CatalogConfig;
use crate::error::Result;

/// Filtered and sorted listings. Cloning is cheap; two views are the same
/// derivation exactly when `Arc::ptr_eq` holds.
pub type DerivedView = Arc<[Listing]>;

/// Presentation mode of the property showcase
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Grid,
    Swipe,
}

/// Lowest and highest price in a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceSpan {
    pub min: u64,
    pub max: u64,
}

/// Aggregate figures over a derived view
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogStatistics {
    pub total_count: usize,
    pub total_value: u64,
    pub average_price: f64,
    pub average_size: f64,
    /// Zeroed for an empty view
    pub price_range: PriceSpan,
    pub category_distribution: BTreeMap<Category, usize>,
}

/// Compute statistics in a single pass. An empty view yields all zeros.
pub fn statistics(view: &[Listing]) -> CatalogStatistics {
    let mut stats = CatalogStatistics::default();
    let mut total_size: u64 = 0;
    let mut span: Option<PriceSpan> = None;

    for listing in view {
        stats.total_count += 1;
        stats.total_value += listing.price;
        total_size += u64::from(listing.size);
        *stats.category_distribution.entry(listing.category).or_insert(0) += 1;

        span = Some(match span {
            None => PriceSpan { min: listing.price, max: listing.price },
            Some(s) => PriceSpan {
                min: s.min.min(listing.price),
                max: s.max.max(listing.price),
            },
        });
    }

    if stats.total_count > 0 {
        let count = stats.total_count as f64;
        stats.average_price = stats.total_value as f64 / count;
        stats.average_size = total_size as f64 / count;
    }
    stats.price_range = span.unwrap_or_default();
    stats
}

/// One page of the derived view
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number actually served (clamped to the last page)
    pub number: usize,
    pub page_count: usize,
    pub total_items: usize,
    pub items: Vec<Listing>,
}

/// Last derivation, keyed by the criteria it was computed from
#[derive(Debug)]
struct Memo {
    criteria: FilterCriteria,
    view: DerivedView,
}

/// A named snapshot of the filter criteria
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSearch {
    pub id: u64,
    pub name: String,
    pub criteria: FilterCriteria,
    pub created_at: DateTime<Utc>,
}

/// The CatalogStore owns the listing set and the active filter criteria.
///
/// Listings never change after construction. Criteria change only through
/// the `set_*`/`clear_filters` entry points, and the derived view is
/// recomputed lazily the next time it is requested after such a change.
pub struct CatalogStore {
    listings: Listings,
    criteria: FilterCriteria,
    config: CatalogConfig,
    memo: Option<Memo>,
    search_history: VecDeque<String>,
    saved_searches: Vec<SavedSearch>,
    next_search_id: u64,
    view_mode: ViewMode,
    selected: Option<u32>,
    comparison: Vec<u32>,
    current_page: usize,
    items_per_page: usize,
}

impl CatalogStore {
    /// Create a store over `listings`
    pub fn new(listings: Listings, config: CatalogConfig) -> Self {
        let criteria = FilterCriteria::with_ceiling(config.price_ceiling);
        let items_per_page = config.items_per_page.max(1);
        debug!(listings = listings.len(), "catalog store created");

        Self {
            listings,
            criteria,
            config,
            memo: None,
            search_history: VecDeque::new(),
            saved_searches: Vec::new(),
            next_search_id: 0,
            view_mode: ViewMode::default(),
            selected: None,
            comparison: Vec::new(),
            current_page: 1,
            items_per_page,
        }
    }

    /// Create a store over the built-in seed catalog
    pub fn with_seed(config: CatalogConfig) -> Self {
        Self::new(seed_listings(), config)
    }

    /// Create a store over a JSON array of listings
    pub fn from_json(json: &str, config: CatalogConfig) -> Result<Self> {
        Ok(Self::new(listings_from_json(json)?, config))
    }

    /// All listings in catalog order
    pub fn listings(&self) -> &Listings {
        &self.listings
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    // ========== Filter updates ==========

    /// Apply a typed filter update.
    /// A non-empty query not seen before is prepended to the search history.
    pub fn set_filter(&mut self, update: FilterUpdate) {
        if let FilterUpdate::Query(query) = &update {
            self.remember_query(query);
        }
        self.criteria.apply(update);
        self.current_page = 1;
    }

    /// Apply an untyped `(field, value)` update.
    ///
    /// Unknown fields and malformed values leave the criteria untouched.
    /// Returns whether the update was accepted.
    pub fn set_filter_raw(&mut self, field: &str, value: &str) -> bool {
        match FilterUpdate::parse(field, value) {
            Some(update) => {
                self.set_filter(update);
                true
            }
            None => {
                debug!(field, value, "ignoring malformed filter input");
                false
            }
        }
    }

    /// Update the numeric filters in one step
    pub fn set_advanced_filter(&mut self, filter: AdvancedFilter) {
        if let Some(range) = filter.price_range {
            self.criteria.price_range = range;
        }
        if let Some(beds) = filter.min_beds {
            self.criteria.min_beds = beds;
        }
        if let Some(baths) = filter.min_baths {
            self.criteria.min_baths = baths;
        }
        self.current_page = 1;
    }

    /// Reset every filter to its default and drop the memoized view
    pub fn clear_filters(&mut self) {
        self.criteria = FilterCriteria::with_ceiling(self.config.price_ceiling);
        self.memo = None;
        self.current_page = 1;
    }

    fn remember_query(&mut self, query: &str) {
        if query.trim().is_empty() || self.search_history.iter().any(|q| q == query) {
            return;
        }
        self.search_history.push_front(query.to_string());
        self.search_history.truncate(self.config.search_history_limit);
    }

    /// Recent distinct queries, newest first
    pub fn search_history(&self) -> impl Iterator<Item = &str> {
        self.search_history.iter().map(String::as_str)
    }

    // ========== Saved searches ==========

    /// Save the current criteria under `name`.
    /// Returns the new search's id, or None if the name is blank or taken.
    pub fn save_search(&mut self, name: &str) -> Option<u64> {
        let name = name.trim();
        if name.is_empty() || self.saved_searches.iter().any(|s| s.name == name) {
            debug!(name, "search not saved");
            return None;
        }

        self.next_search_id += 1;
        let id = self.next_search_id;
        self.saved_searches.push(SavedSearch {
            id,
            name: name.to_string(),
            criteria: self.criteria.clone(),
            created_at: Utc::now(),
        });
        Some(id)
    }

    /// Remove a saved search; unknown ids are ignored
    pub fn remove_search(&mut self, id: u64) {
        self.saved_searches.retain(|s| s.id != id);
    }

    /// Saved searches in the order they were saved
    pub fn saved_searches(&self) -> &[SavedSearch] {
        &self.saved_searches
    }

    /// Make a saved search's criteria the active ones.
    /// Returns false for unknown ids.
    pub fn apply_saved_search(&mut self, id: u64) -> bool {
        let Some(search) = self.saved_searches.iter().find(|s| s.id == id) else {
            return false;
        };
        self.criteria = search.criteria.clone();
        self.current_page = 1;
        true
    }

    // ========== Derivation ==========

    /// The filtered and sorted view for the current criteria.
    ///
    /// Returns the same `Arc` as the previous call while the criteria are
    /// unchanged.
    pub fn derived_view(&mut self) -> DerivedView {
        if let Some(memo) = &self.memo {
            if memo.criteria == self.criteria {
                return Arc::clone(&memo.view);
            }
        }

        let view = derive(&self.listings, &self.criteria);
        debug!(
            matches = view.len(),
            total = self.listings.len(),
            sort = %self.criteria.sort,
            "derived catalog view"
        );
        self.memo = Some(Memo {
            criteria: self.criteria.clone(),
            view: Arc::clone(&view),
        });
        view
    }

    /// Statistics over the current derived view
    pub fn statistics(&mut self) -> CatalogStatistics {
        statistics(&self.derived_view())
    }

    // ========== Pagination ==========

    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    pub fn set_items_per_page(&mut self, per_page: usize) {
        self.items_per_page = per_page.max(1);
        self.current_page = 1;
    }

    /// The current page of the derived view.
    /// Pages past the end clamp to the last page; an empty view has one empty page.
    pub fn page(&mut self) -> Page {
        let view = self.derived_view();
        let per_page = self.items_per_page;
        let page_count = view.len().div_ceil(per_page).max(1);
        let number = self.current_page.min(page_count);
        let start = (number - 1) * per_page;
        let end = (start + per_page).min(view.len());

        Page {
            number,
            page_count,
            total_items: view.len(),
            items: view[start..end].to_vec(),
        }
    }

    // ========== Lookups ==========

    pub fn listing(&self, id: u32) -> Option<&Listing> {
        self.listings.iter().find(|l| l.id == id)
    }

    /// Distinct categories present in the catalog, sorted by name
    pub fn categories(&self) -> Vec<Category> {
        let set: BTreeSet<&'static str> = self.listings.iter().map(|l| l.category.as_str()).collect();
        set.into_iter().filter_map(|name| name.parse().ok()).collect()
    }

    /// Autocomplete candidates for the current query (at least 2 characters).
    /// Distinct titles, locations and category names in catalog order.
    pub fn search_suggestions(&self) -> Vec<String> {
        let query = self.criteria.query.as_str();
        if query.chars().count() < 2 {
            return Vec::new();
        }

        let needle = query.to_lowercase();
        let mut seen = HashSet::new();
        let mut suggestions = Vec::new();

        for listing in self.listings.iter() {
            for candidate in [
                listing.title.as_str(),
                listing.location.as_str(),
                listing.category.as_str(),
            ] {
                if candidate.to_lowercase().contains(&needle) && seen.insert(candidate) {
                    suggestions.push(candidate.to_string());
                }
            }
        }

        suggestions.truncate(self.config.suggestion_limit);
        suggestions
    }

    // ========== Featured ==========

    /// Featured listings in catalog order
    pub fn featured_listings(&self) -> Vec<&Listing> {
        self.listings
            .iter()
            .filter(|l| self.config.featured_ids.contains(&l.id))
            .collect()
    }

    /// Derived view without the featured listings
    pub fn regular_listings(&mut self) -> Vec<Listing> {
        let featured = self.config.featured_ids.clone();
        self.derived_view()
            .iter()
            .filter(|l| !featured.contains(&l.id))
            .cloned()
            .collect()
    }

    // ========== Comparison ==========

    /// Add a listing to the comparison list.
    /// Unknown ids, duplicates and additions past the limit are refused.
    pub fn add_to_comparison(&mut self, id: u32) -> bool {
        if self.listing(id).is_none()
            || self.comparison.contains(&id)
            || self.comparison.len() >= self.config.max_comparison
        {
            return false;
        }
        self.comparison.push(id);
        true
    }

    pub fn remove_from_comparison(&mut self, id: u32) {
        self.comparison.retain(|&c| c != id);
    }

    pub fn clear_comparison(&mut self) {
        self.comparison.clear();
    }

    /// Listings under comparison, in catalog order
    pub fn comparison_listings(&self) -> Vec<&Listing> {
        self.listings
            .iter()
            .filter(|l| self.comparison.contains(&l.id))
            .collect()
    }

    // ========== View state ==========

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    /// Select a listing for the detail view. Unknown ids are ignored.
    pub fn select(&mut self, id: u32) -> bool {
        if self.listing(id).is_some() {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Listing> {
        self.selected.and_then(|id| self.listing(id))
    }
}

/// Filter then stable-sort; ties keep catalog order
fn derive(listings: &[Listing], criteria: &FilterCriteria) -> DerivedView {
    let mut view: Vec<Listing> = listings
        .iter()
        .filter(|l| criteria.matches(l))
        .cloned()
        .collect();

    // slice::sort_by is stable
    view.sort_by(|a, b| criteria.sort.compare(a, b));
    view.into()
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogStore")
            .field("listings", &self.listings.len())
            .field("criteria", &self.criteria)
            .field("view_mode", &self.view_mode)
            .finish()
    }
}
