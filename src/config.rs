/// Engine configuration
///
/// Every tunable threshold lives here so hosts can adjust them without
/// touching engine code. The file is optional JSON; any field left out keeps
/// its default value.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, ShowcaseError};
use crate::media::ImageOptions;

/// Swipe deck thresholds and animation timings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DeckConfig {
    /// Horizontal drag distance beyond which a gesture commits
    pub commit_distance_px: f64,
    /// Horizontal release velocity beyond which a gesture commits
    pub commit_velocity_px_s: f64,
    /// Duration of the card fly-out animation
    pub fly_duration_ms: u64,
    /// Grace period after the fly-out before the leaving card is cleared
    pub settle_ms: u64,
    /// Number of stacked cards rendered at once
    pub visible_cards: usize,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            commit_distance_px: 110.0,
            commit_velocity_px_s: 620.0,
            fly_duration_ms: 380,
            settle_ms: 80,
            visible_cards: 3,
        }
    }
}

impl DeckConfig {
    /// Pointer advance happens mid-flight
    pub fn advance_delay_ms(&self) -> u64 {
        self.fly_duration_ms / 2
    }

    /// Leaving card and busy flag clear once the fly-out has settled
    pub fn clear_delay_ms(&self) -> u64 {
        self.fly_duration_ms + self.settle_ms
    }
}

/// Resource gate timing
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GateConfig {
    /// How long a mounted asset may take to report load/error
    pub mount_timeout_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { mount_timeout_ms: 12_000 }
    }
}

/// Catalog limits
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    pub search_history_limit: usize,
    pub items_per_page: usize,
    pub max_comparison: usize,
    pub suggestion_limit: usize,
    /// Upper bound of the default price range
    pub price_ceiling: u64,
    /// Listings highlighted outside the regular grid
    pub featured_ids: Vec<u32>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            search_history_limit: 10,
            items_per_page: 12,
            max_comparison: 4,
            suggestion_limit: 8,
            price_ceiling: 15_000_000,
            featured_ids: vec![1, 2],
        }
    }
}

/// Top-level configuration
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ShowcaseConfig {
    pub deck: DeckConfig,
    pub gate: GateConfig,
    pub catalog: CatalogConfig,
    pub images: ImageOptions,
}

impl ShowcaseConfig {
    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to a pretty-printed JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Default location of the config file
    /// - Linux: ~/.config/estate-showcase/config.json
    /// - macOS: ~/Library/Application Support/estate-showcase/config.json
    /// - Windows: %APPDATA%\estate-showcase\config.json
    pub fn default_path() -> Result<PathBuf> {
        Self::path_under(dirs::config_dir().or_else(dirs::home_dir))
    }

    fn path_under(config_dir: Option<PathBuf>) -> Result<PathBuf> {
        let mut path = config_dir.ok_or(ShowcaseError::NoConfigDir)?;
        path.push("estate-showcase");
        path.push("config.json");
        Ok(path)
    }

    fn validate(&self) -> Result<()> {
        if self.deck.visible_cards == 0 {
            return Err(ShowcaseError::Config("deck.visible_cards must be at least 1".into()));
        }
        if self.catalog.items_per_page == 0 {
            return Err(ShowcaseError::Config("catalog.items_per_page must be at least 1".into()));
        }
        if self.images.widths.is_empty() {
            return Err(ShowcaseError::Config("images.widths must not be empty".into()));
        }
        Ok(())
    }
}
