/// State management module
///
/// This module handles all catalog and user state, including:
/// - Listing records and seed data (data.rs)
/// - Filter criteria and sort orders (filter.rs)
/// - The memoized catalog store (catalog.rs)
/// - Persisted user preferences (preferences.rs)
/// - The SQLite preference store (library.rs)

pub mod catalog;
pub mod data;
pub mod filter;
pub mod library;
pub mod preferences;

pub use catalog::{CatalogStatistics, CatalogStore, DerivedView, Page, PriceSpan, SavedSearch, ViewMode};
pub use data::{listings_from_json, seed_listings, Category, Listing, Listings};
pub use filter::{AdvancedFilter, FilterCriteria, FilterField, FilterUpdate, PriceRange, SortKey};
pub use library::PreferenceLibrary;
pub use preferences::UserPreferences;
