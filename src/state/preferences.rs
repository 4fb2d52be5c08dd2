/// User preferences
///
/// This is the only state that survives across sessions. It is serialized to
/// JSON and stored by the preference library. Device capabilities are not
/// part of it: they are re-probed every session.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::catalog::ViewMode;
use crate::device::gate::device_can_autoload;
use crate::device::CapabilitySnapshot;
use crate::media::VariantFormat;

/// Loading and rendering cost preferences
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PerformancePreferences {
    /// Load 3D scenes without asking when the device can take it
    pub autoload_scenes: bool,
    pub enable_animations: bool,
    pub high_quality_images: bool,
    pub preload_images: bool,
    pub enable_performance_monitoring: bool,
}

impl Default for PerformancePreferences {
    fn default() -> Self {
        Self {
            autoload_scenes: true,
            enable_animations: true,
            high_quality_images: true,
            preload_images: true,
            enable_performance_monitoring: cfg!(debug_assertions),
        }
    }
}

/// Look and feel preferences
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct VisualPreferences {
    pub prefers_reduced_motion: bool,
    pub default_view_mode: ViewMode,
    pub enable_glass_effects: bool,
    pub enable_parallax: bool,
}

impl Default for VisualPreferences {
    fn default() -> Self {
        Self {
            prefers_reduced_motion: false,
            default_view_mode: ViewMode::Grid,
            enable_glass_effects: true,
            enable_parallax: true,
        }
    }
}

/// Miscellaneous behavior settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UserSettings {
    pub auto_expand_stats: bool,
    pub remember_filters: bool,
    pub enable_keyboard_navigation: bool,
    pub contact_form_autofill: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            auto_expand_stats: false,
            remember_filters: true,
            enable_keyboard_navigation: true,
            contact_form_autofill: true,
        }
    }
}

/// Everything persisted for a user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct UserPreferences {
    pub performance: PerformancePreferences,
    pub visual: VisualPreferences,
    pub settings: UserSettings,
    /// Gated scenes the user explicitly enabled (gate override flags)
    pub enabled_scenes: BTreeSet<String>,
}

impl UserPreferences {
    /// Restore performance, visual and settings defaults.
    /// Explicit scene opt-ins are kept.
    pub fn reset(&mut self) {
        self.performance = PerformancePreferences::default();
        self.visual = VisualPreferences::default();
        self.settings = UserSettings::default();
    }

    /// Turn off whatever the device is unlikely to handle well
    pub fn optimize_for_device(&mut self, snapshot: &CapabilitySnapshot) {
        if snapshot.is_low_end_device() {
            self.performance.autoload_scenes = false;
            self.performance.high_quality_images = false;
            self.performance.preload_images = false;
            self.visual.enable_glass_effects = false;
            self.visual.enable_parallax = false;
        }

        if !snapshot.has_high_bandwidth() {
            self.performance.preload_images = false;
            self.performance.high_quality_images = false;
        }

        if snapshot.save_data() {
            self.performance.autoload_scenes = false;
            self.performance.high_quality_images = false;
            self.performance.preload_images = false;
            self.performance.enable_animations = false;
        }
    }

    pub fn can_autoload_scenes(&self, snapshot: &CapabilitySnapshot) -> bool {
        device_can_autoload(snapshot, self.performance.autoload_scenes)
    }

    /// Best format for single-URL contexts
    pub fn optimal_image_format(&self, snapshot: &CapabilitySnapshot) -> VariantFormat {
        if !self.performance.high_quality_images {
            return VariantFormat::Jpg;
        }
        snapshot
            .image_formats()
            .into_iter()
            .find_map(VariantFormat::from_image_format)
            .unwrap_or(VariantFormat::Jpg)
    }

    pub fn should_preload_images(&self, snapshot: &CapabilitySnapshot) -> bool {
        self.performance.preload_images && snapshot.has_high_bandwidth() && !snapshot.save_data()
    }

    // ========== Scene overrides ==========

    pub fn scene_enabled(&self, scene: &str) -> bool {
        self.enabled_scenes.contains(scene)
    }

    pub fn enable_scene(&mut self, scene: &str) {
        self.enabled_scenes.insert(scene.to_string());
    }

    pub fn disable_scene(&mut self, scene: &str) {
        self.enabled_scenes.remove(scene);
    }

    /// Convert to JSON string for storage
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON string (from storage)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
