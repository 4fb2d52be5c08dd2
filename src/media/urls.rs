/// Responsive image URL derivation
///
/// Every variant of a listing photo is the base URL plus query parameters
/// (width, quality, format). Derivation is a pure function of the base URL
/// and the options, which is what makes memoizing it in the cache safe.

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::device::CapabilitySnapshot;

/// Output format of a URL variant
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VariantFormat {
    Avif,
    Webp,
    Jpg,
}

impl VariantFormat {
    pub fn image_format(self) -> ImageFormat {
        match self {
            VariantFormat::Avif => ImageFormat::Avif,
            VariantFormat::Webp => ImageFormat::WebP,
            VariantFormat::Jpg => ImageFormat::Jpeg,
        }
    }

    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Avif => Some(VariantFormat::Avif),
            ImageFormat::WebP => Some(VariantFormat::Webp),
            ImageFormat::Jpeg => Some(VariantFormat::Jpg),
            _ => None,
        }
    }

    /// Value of the `fm` query parameter ("avif", "webp", "jpg")
    pub fn param(self) -> &'static str {
        self.image_format().extensions_str()[0]
    }
}

/// Options controlling which variants are derived
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct ImageOptions {
    /// Responsive widths in pixels
    pub widths: Vec<u32>,
    /// One srcset is produced per format
    pub formats: Vec<VariantFormat>,
    /// Encoder quality (1-100)
    pub quality: u8,
    /// Extra query parameters shared by every variant
    pub base_params: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            widths: vec![480, 720, 900, 1400],
            formats: vec![VariantFormat::Avif, VariantFormat::Webp, VariantFormat::Jpg],
            quality: 70,
            base_params: "auto=format&fit=crop".to_string(),
        }
    }
}

impl ImageOptions {
    /// Options used for swipe deck cards
    pub fn deck() -> Self {
        Self {
            widths: vec![720, 900],
            formats: vec![VariantFormat::Webp, VariantFormat::Jpg],
            quality: 60,
            ..Self::default()
        }
    }

    /// Keep only formats the device can decode, in the current order
    pub fn for_device(mut self, snapshot: &CapabilitySnapshot) -> Self {
        self.formats.retain(|f| snapshot.supports(f.image_format()));
        if self.formats.is_empty() {
            self.formats.push(VariantFormat::Jpg);
        }
        self
    }
}

/// CSS `sizes` hints for the three layouts photos appear in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeHints {
    pub feature: &'static str,
    pub card: &'static str,
    pub modal: &'static str,
}

pub const SIZE_HINTS: SizeHints = SizeHints {
    feature: "(min-width: 1100px) 560px, (min-width:640px) 50vw, 100vw",
    card: "(min-width:900px) 320px, (min-width:640px) 33vw, 100vw",
    modal: "(min-width: 1200px) 1200px, 100vw",
};

/// Every derived URL for one photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrlSet {
    /// Default display URL (JPEG at the display width)
    pub base: String,
    /// Tiny blurred placeholder shown until the real image decodes
    pub low_quality: String,
    /// `(format, srcset)` in option order
    pub src_sets: Vec<(VariantFormat, String)>,
    pub sizes: SizeHints,
}

impl ImageUrlSet {
    pub fn src_set(&self, format: VariantFormat) -> Option<&str> {
        self.src_sets
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, set)| set.as_str())
    }
}

/// Display width: the third configured width, or the widest when fewer are given
fn display_width(widths: &[u32]) -> u32 {
    widths
        .get(2)
        .or_else(|| widths.last())
        .copied()
        .unwrap_or(900)
}

/// Derive the URL set for `base_url`
pub fn derive_urls(base_url: &str, options: &ImageOptions) -> ImageUrlSet {
    let params = &options.base_params;
    let quality = options.quality;

    let base = format!(
        "{base_url}?w={}&{params}&q={quality}&fm=jpg",
        display_width(&options.widths)
    );
    let low_quality = format!("{base_url}?w=80&blur=80&auto=format&q=20");

    let src_sets = options
        .formats
        .iter()
        .map(|&format| {
            let set = options
                .widths
                .iter()
                .map(|w| format!("{base_url}?w={w}&{params}&q={quality}&fm={} {w}w", format.param()))
                .collect::<Vec<_>>()
                .join(", ");
            (format, set)
        })
        .collect();

    ImageUrlSet {
        base,
        low_quality,
        src_sets,
        sizes: SIZE_HINTS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HostEnvironment;

    const PHOTO: &str = "https://images.unsplash.com/photo-1";

    #[test]
    fn test_default_urls() {
        let urls = derive_urls(PHOTO, &ImageOptions::default());
        assert_eq!(urls.base, format!("{PHOTO}?w=900&auto=format&fit=crop&q=70&fm=jpg"));
        assert_eq!(urls.low_quality, format!("{PHOTO}?w=80&blur=80&auto=format&q=20"));
        assert_eq!(urls.src_sets.len(), 3);

        let webp = urls.src_set(VariantFormat::Webp).unwrap();
        assert!(webp.starts_with(&format!("{PHOTO}?w=480&auto=format&fit=crop&q=70&fm=webp 480w, ")));
        assert!(webp.ends_with("fm=webp 1400w"));
    }

    #[test]
    fn test_deck_options_use_widest_for_base() {
        let urls = derive_urls(PHOTO, &ImageOptions::deck());
        assert_eq!(urls.base, format!("{PHOTO}?w=900&auto=format&fit=crop&q=60&fm=jpg"));
        assert!(urls.src_set(VariantFormat::Avif).is_none());
    }

    #[test]
    fn test_format_params() {
        assert_eq!(VariantFormat::Avif.param(), "avif");
        assert_eq!(VariantFormat::Webp.param(), "webp");
        assert_eq!(VariantFormat::Jpg.param(), "jpg");
    }

    #[test]
    fn test_for_device_drops_unsupported_formats() {
        let snapshot = CapabilitySnapshot::probe(&HostEnvironment {
            supports_webp: true,
            ..HostEnvironment::default()
        });
        let options = ImageOptions::default().for_device(&snapshot);
        assert_eq!(options.formats, vec![VariantFormat::Webp, VariantFormat::Jpg]);
    }
}
