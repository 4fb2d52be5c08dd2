/// Shared data structures for the catalog state
///
/// These structs represent the listing data model that flows between
/// the catalog store, the swipe deck and the image cache.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Result, ShowcaseError};

/// Property category
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Penthouse,
    Villa,
    Estate,
    Loft,
    Residence,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Penthouse,
        Category::Villa,
        Category::Estate,
        Category::Loft,
        Category::Residence,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Penthouse => "Penthouse",
            Category::Villa => "Villa",
            Category::Estate => "Estate",
            Category::Loft => "Loft",
            Category::Residence => "Residence",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ();

    /// Case-insensitive parse from the display name
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

/// Represents a single property in the catalog
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Listing {
    /// Unique listing ID
    pub id: u32,
    pub title: String,
    pub location: String,
    /// Asking price in whole currency units
    pub price: u64,
    #[serde(rename = "type")]
    pub category: Category,
    pub beds: u32,
    pub baths: u32,
    /// Floor area in square feet
    pub size: u32,
    /// Base image URL; variants are derived by appending query parameters
    pub image: String,
    pub blurb: String,
}

/// Ordered, immutable listing sequence shared by the store and its views
pub type Listings = Arc<[Listing]>;

/// Parse listings from a JSON array, rejecting duplicate IDs
pub fn listings_from_json(json: &str) -> Result<Listings> {
    let listings: Vec<Listing> = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    for listing in &listings {
        if !seen.insert(listing.id) {
            return Err(ShowcaseError::InvalidListings(format!(
                "duplicate listing id {}",
                listing.id
            )));
        }
    }

    Ok(listings.into())
}

/// The built-in showcase catalog
pub fn seed_listings() -> Listings {
    fn listing(
        id: u32,
        title: &str,
        location: &str,
        price: u64,
        category: Category,
        (beds, baths, size): (u32, u32, u32),
        image: &str,
        blurb: &str,
    ) -> Listing {
        Listing {
            id,
            title: title.to_string(),
            location: location.to_string(),
            price,
            category,
            beds,
            baths,
            size,
            image: image.to_string(),
            blurb: blurb.to_string(),
        }
    }

    vec![
        listing(
            1,
            "Skyline Penthouse",
            "Downtown Core",
            5_400_000,
            Category::Penthouse,
            (4, 5, 6200),
            "https://images.unsplash.com/photo-1502005097973-6a7082348e28",
            "Glass-framed panoramic city vistas with private roof deck and spa.",
        ),
        listing(
            2,
            "Coastal Glass Villa",
            "Azure Coast",
            8_700_000,
            Category::Villa,
            (6, 7, 9800),
            "https://images.unsplash.com/photo-1600585154340-be6161a56a0c",
            "Seamless indoor-outdoor flow, infinity edge pool and ocean horizon.",
        ),
        listing(
            3,
            "Modern Heritage Estate",
            "Old Ridge",
            12_500_000,
            Category::Estate,
            (8, 9, 15200),
            "https://images.unsplash.com/photo-1512917774080-9991f1c4c750",
            "Restored classical detailing integrated with advanced sustainability systems.",
        ),
        listing(
            4,
            "Lakeview Retreat",
            "Emerald Lake",
            4_600_000,
            Category::Villa,
            (5, 5, 7200),
            "https://images.unsplash.com/photo-1550966871-3ed3cdb5ed0c",
            "Timber-accented serenity with private dock and cantilevered terrace.",
        ),
        listing(
            5,
            "Urban Luxe Loft",
            "Arts District",
            2_100_000,
            Category::Loft,
            (2, 2, 2800),
            "https://images.unsplash.com/photo-1554995207-c18c203602cb",
            "Double-height volume, industrial beams, curated gallery illumination.",
        ),
        listing(
            6,
            "Desert Horizon Residence",
            "Sunspire Dunes",
            6_900_000,
            Category::Residence,
            (5, 6, 8400),
            "https://images.unsplash.com/photo-1479839672679-a46483c0e7c8",
            "Thermal-mass architecture oriented for passive cooling and sunrise framing.",
        ),
    ]
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_ids_are_unique() {
        let seed = seed_listings();
        let ids: HashSet<u32> = seed.iter().map(|l| l.id).collect();
        assert_eq!(ids.len(), seed.len());
        assert_eq!(seed.len(), 6);
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("villa".parse::<Category>(), Ok(Category::Villa));
        assert_eq!(" LOFT ".parse::<Category>(), Ok(Category::Loft));
        assert!("Castle".parse::<Category>().is_err());
    }

    #[test]
    fn test_listings_from_json_uses_type_field() {
        let json = r#"[{"id":7,"title":"Harbor Loft","location":"Pier 9","price":1900000,
            "type":"Loft","beds":2,"baths":2,"size":2100,"image":"https://img/x","blurb":"Brick."}]"#;
        let listings = listings_from_json(json).unwrap();
        assert_eq!(listings[0].category, Category::Loft);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let one = r#"{"id":1,"title":"A","location":"B","price":1,"type":"Villa","beds":1,"baths":1,"size":1,"image":"i","blurb":"b"}"#;
        let json = format!("[{one},{one}]");
        assert!(matches!(
            listings_from_json(&json),
            Err(ShowcaseError::InvalidListings(_))
        ));
    }
}
