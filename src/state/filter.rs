/// Filter and sort criteria for the property catalog
///
/// This struct stores every active search/filter setting.
/// It is a plain value: the catalog store owns the only mutable copy and
/// compares it against the last derivation to decide whether to recompute.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::data::{Category, Listing};

/// Default upper bound of the price filter
pub const DEFAULT_PRICE_CEILING: u64 = 15_000_000;

/// Inclusive price bounds. Always `min <= max`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceRange {
    min: u64,
    max: u64,
}

impl PriceRange {
    /// Build a range, swapping reversed bounds
    pub fn new(a: u64, b: u64) -> Self {
        Self { min: a.min(b), max: a.max(b) }
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn contains(&self, price: u64) -> bool {
        self.min <= price && price <= self.max
    }
}

/// Sort order of the derived view
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    /// Keep catalog order
    #[default]
    None,
    PriceAsc,
    PriceDesc,
    SizeAsc,
    SizeDesc,
    BedsAsc,
    BedsDesc,
    TitleAsc,
    TitleDesc,
    LocationAsc,
    LocationDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 11] = [
        SortKey::None,
        SortKey::PriceAsc,
        SortKey::PriceDesc,
        SortKey::SizeAsc,
        SortKey::SizeDesc,
        SortKey::BedsAsc,
        SortKey::BedsDesc,
        SortKey::TitleAsc,
        SortKey::TitleDesc,
        SortKey::LocationAsc,
        SortKey::LocationDesc,
    ];

    /// Wire name used by form inputs ("price-asc", ...). `None` is the empty string.
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::None => "",
            SortKey::PriceAsc => "price-asc",
            SortKey::PriceDesc => "price-desc",
            SortKey::SizeAsc => "size-asc",
            SortKey::SizeDesc => "size-desc",
            SortKey::BedsAsc => "beds-asc",
            SortKey::BedsDesc => "beds-desc",
            SortKey::TitleAsc => "title-asc",
            SortKey::TitleDesc => "title-desc",
            SortKey::LocationAsc => "location-asc",
            SortKey::LocationDesc => "location-desc",
        }
    }

    /// Ordering of two listings under this key. `Equal` for ties, so a
    /// stable sort keeps catalog order between them.
    pub fn compare(self, a: &Listing, b: &Listing) -> Ordering {
        match self {
            SortKey::None => Ordering::Equal,
            SortKey::PriceAsc => a.price.cmp(&b.price),
            SortKey::PriceDesc => b.price.cmp(&a.price),
            SortKey::SizeAsc => a.size.cmp(&b.size),
            SortKey::SizeDesc => b.size.cmp(&a.size),
            SortKey::BedsAsc => a.beds.cmp(&b.beds),
            SortKey::BedsDesc => b.beds.cmp(&a.beds),
            SortKey::TitleAsc => text_order(&a.title, &b.title),
            SortKey::TitleDesc => text_order(&b.title, &a.title),
            SortKey::LocationAsc => text_order(&a.location, &b.location),
            SortKey::LocationDesc => text_order(&b.location, &a.location),
        }
    }
}

/// Case-insensitive text ordering. Titles that differ only in case compare
/// equal, so the stable sort keeps them in catalog order.
fn text_order(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// All active catalog filters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterCriteria {
    /// Free-text search over title, location and category
    pub query: String,
    /// Exact category match, or any category
    pub category: Option<Category>,
    pub sort: SortKey,
    pub price_range: PriceRange,
    pub min_beds: u32,
    pub min_baths: u32,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self::with_ceiling(DEFAULT_PRICE_CEILING)
    }
}

impl FilterCriteria {
    /// Defaults with a custom upper price bound
    pub fn with_ceiling(price_ceiling: u64) -> Self {
        Self {
            query: String::new(),
            category: None,
            sort: SortKey::None,
            price_range: PriceRange::new(0, price_ceiling),
            min_beds: 0,
            min_baths: 0,
        }
    }

    /// Check whether a listing passes every active filter.
    /// A blank query is inactive; otherwise the query is matched as typed,
    /// surrounding whitespace included.
    pub fn matches(&self, listing: &Listing) -> bool {
        if !self.query.trim().is_empty() {
            let needle = self.query.to_lowercase();
            let hit = listing.title.to_lowercase().contains(&needle)
                || listing.location.to_lowercase().contains(&needle)
                || listing.category.as_str().to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(category) = self.category {
            if listing.category != category {
                return false;
            }
        }

        self.price_range.contains(listing.price)
            && listing.beds >= self.min_beds
            && listing.baths >= self.min_baths
    }

    /// Apply a single typed update
    pub fn apply(&mut self, update: FilterUpdate) {
        match update {
            FilterUpdate::Query(query) => self.query = query,
            FilterUpdate::Category(category) => self.category = category,
            FilterUpdate::Sort(sort) => self.sort = sort,
            FilterUpdate::PriceRange(range) => self.price_range = range,
            FilterUpdate::MinBeds(beds) => self.min_beds = beds,
            FilterUpdate::MinBaths(baths) => self.min_baths = baths,
        }
    }
}

/// Filter field names accepted by the untyped entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Query,
    Category,
    Sort,
    PriceRange,
    MinBeds,
    MinBaths,
}

impl FromStr for FilterField {
    type Err = ();

    /// Accepts both camelCase form names and snake_case; `type` is an alias of `category`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "query" => Ok(FilterField::Query),
            "category" | "type" => Ok(FilterField::Category),
            "sort" => Ok(FilterField::Sort),
            "priceRange" | "price_range" => Ok(FilterField::PriceRange),
            "minBeds" | "min_beds" => Ok(FilterField::MinBeds),
            "minBaths" | "min_baths" => Ok(FilterField::MinBaths),
            _ => Err(()),
        }
    }
}

/// A single typed change to the filter criteria
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterUpdate {
    Query(String),
    Category(Option<Category>),
    Sort(SortKey),
    PriceRange(PriceRange),
    MinBeds(u32),
    MinBaths(u32),
}

impl FilterUpdate {
    /// Coerce an untyped `(field, value)` pair into an update.
    ///
    /// Returns `None` for unknown fields and malformed values; callers treat
    /// that as a no-op rather than an error.
    pub fn parse(field: &str, value: &str) -> Option<Self> {
        let field: FilterField = field.parse().ok()?;
        let trimmed = value.trim();

        match field {
            // Free text is kept as typed
            FilterField::Query => Some(FilterUpdate::Query(value.to_string())),
            FilterField::Category => {
                if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
                    Some(FilterUpdate::Category(None))
                } else {
                    trimmed.parse().ok().map(|c| FilterUpdate::Category(Some(c)))
                }
            }
            FilterField::Sort => trimmed.parse().ok().map(FilterUpdate::Sort),
            FilterField::PriceRange => {
                // "min,max"
                let (min, max) = trimmed.split_once(',')?;
                let min = min.trim().parse::<u64>().ok()?;
                let max = max.trim().parse::<u64>().ok()?;
                Some(FilterUpdate::PriceRange(PriceRange::new(min, max)))
            }
            FilterField::MinBeds => trimmed.parse().ok().map(FilterUpdate::MinBeds),
            FilterField::MinBaths => trimmed.parse().ok().map(FilterUpdate::MinBaths),
        }
    }
}

/// Batch update of the numeric filters; `None` leaves a field untouched
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdvancedFilter {
    pub price_range: Option<PriceRange>,
    pub min_beds: Option<u32>,
    pub min_baths: Option<u32>,
}
