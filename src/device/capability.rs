/// Phase 2: Device capability detection
///
/// The host supplies raw environment readings; probing turns them into an
/// immutable snapshot with the derived "low-end" and "high bandwidth" flags.
/// Nothing here queries the environment directly except `from_system`.

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Assumed when the host cannot report a core count
const DEFAULT_CORES: u32 = 4;
/// Assumed when the host cannot report memory (GB)
const DEFAULT_MEMORY_GB: f32 = 8.0;
/// Devices below either threshold are treated as low-end
const LOW_END_CORES: u32 = 4;
const LOW_END_MEMORY_GB: f32 = 4.0;

/// Network effective connection type, as reported by the host
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectiveConnectionType {
    Slow2g,
    TwoG,
    ThreeG,
    #[default]
    FourG,
    Wifi,
}

impl EffectiveConnectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            EffectiveConnectionType::Slow2g => "slow-2g",
            EffectiveConnectionType::TwoG => "2g",
            EffectiveConnectionType::ThreeG => "3g",
            EffectiveConnectionType::FourG => "4g",
            EffectiveConnectionType::Wifi => "wifi",
        }
    }

    pub fn is_high_bandwidth(self) -> bool {
        matches!(self, EffectiveConnectionType::FourG | EffectiveConnectionType::Wifi)
    }

    pub fn is_slow(self) -> bool {
        matches!(
            self,
            EffectiveConnectionType::Slow2g
                | EffectiveConnectionType::TwoG
                | EffectiveConnectionType::ThreeG
        )
    }
}

impl fmt::Display for EffectiveConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffectiveConnectionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Ok(EffectiveConnectionType::Slow2g),
            "2g" => Ok(EffectiveConnectionType::TwoG),
            "3g" => Ok(EffectiveConnectionType::ThreeG),
            "4g" => Ok(EffectiveConnectionType::FourG),
            "wifi" => Ok(EffectiveConnectionType::Wifi),
            _ => Err(()),
        }
    }
}

/// Network information, when the host exposes any
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ConnectionInfo {
    /// Raw effective type string ("4g", "3g", ...). Unknown or missing values
    /// are classified as 4g but never count as high bandwidth.
    pub effective_type: Option<String>,
    pub save_data: bool,
}

/// Raw host readings fed into the probe
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct HostEnvironment {
    pub hardware_concurrency: Option<u32>,
    pub device_memory_gb: Option<f32>,
    pub connection: Option<ConnectionInfo>,
    pub prefers_reduced_motion: bool,
    pub supports_webp: bool,
    pub supports_avif: bool,
}

impl HostEnvironment {
    /// Readings available to a native process: CPU parallelism only.
    /// Memory and network stay unknown and fall back to the probe defaults.
    pub fn from_system() -> Self {
        let cores = std::thread::available_parallelism()
            .ok()
            .and_then(|n| u32::try_from(n.get()).ok());

        Self {
            hardware_concurrency: cores,
            supports_webp: true,
            ..Self::default()
        }
    }
}

/// Immutable per-session view of what the device can handle
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CapabilitySnapshot {
    hardware_cores: u32,
    device_memory_gb: f32,
    connection_type: EffectiveConnectionType,
    save_data: bool,
    reduced_motion: bool,
    supports_webp: bool,
    supports_avif: bool,
    has_high_bandwidth: bool,
    is_low_end_device: bool,
}

impl Default for CapabilitySnapshot {
    /// Snapshot of a capable desktop with no reported constraints
    fn default() -> Self {
        Self::probe(&HostEnvironment {
            supports_webp: true,
            ..HostEnvironment::default()
        })
    }
}

impl CapabilitySnapshot {
    /// Derive a snapshot from host readings
    pub fn probe(env: &HostEnvironment) -> Self {
        let hardware_cores = env.hardware_concurrency.filter(|&c| c > 0).unwrap_or(DEFAULT_CORES);
        let device_memory_gb = env
            .device_memory_gb
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(DEFAULT_MEMORY_GB);

        let (connection_type, save_data, has_high_bandwidth) = match &env.connection {
            Some(conn) => {
                let parsed: Option<EffectiveConnectionType> =
                    conn.effective_type.as_deref().and_then(|t| t.parse().ok());
                // A reported connection has to prove it is fast
                let fast = parsed.is_some_and(EffectiveConnectionType::is_high_bandwidth);
                (parsed.unwrap_or_default(), conn.save_data, fast)
            }
            // No network information: assume a fast connection
            None => (EffectiveConnectionType::default(), false, true),
        };

        let is_low_end_device = hardware_cores < LOW_END_CORES
            || device_memory_gb < LOW_END_MEMORY_GB
            || connection_type.is_slow()
            || save_data;

        let snapshot = Self {
            hardware_cores,
            device_memory_gb,
            connection_type,
            save_data,
            reduced_motion: env.prefers_reduced_motion,
            supports_webp: env.supports_webp,
            supports_avif: env.supports_avif,
            has_high_bandwidth,
            is_low_end_device,
        };

        info!(
            cores = snapshot.hardware_cores,
            memory_gb = snapshot.device_memory_gb,
            connection = %snapshot.connection_type,
            low_end = snapshot.is_low_end_device,
            high_bandwidth = snapshot.has_high_bandwidth,
            "device capabilities probed"
        );
        snapshot
    }

    pub fn hardware_cores(&self) -> u32 {
        self.hardware_cores
    }

    pub fn device_memory_gb(&self) -> f32 {
        self.device_memory_gb
    }

    pub fn connection_type(&self) -> EffectiveConnectionType {
        self.connection_type
    }

    pub fn save_data(&self) -> bool {
        self.save_data
    }

    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    pub fn has_high_bandwidth(&self) -> bool {
        self.has_high_bandwidth
    }

    pub fn is_low_end_device(&self) -> bool {
        self.is_low_end_device
    }

    /// Whether the device decodes `format`. JPEG is always supported.
    pub fn supports(&self, format: ImageFormat) -> bool {
        match format {
            ImageFormat::Jpeg => true,
            ImageFormat::WebP => self.supports_webp,
            ImageFormat::Avif => self.supports_avif,
            _ => false,
        }
    }

    /// Supported responsive formats, best first
    pub fn image_formats(&self) -> Vec<ImageFormat> {
        [ImageFormat::Avif, ImageFormat::WebP, ImageFormat::Jpeg]
            .into_iter()
            .filter(|f| self.supports(*f))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::gate::device_can_autoload;

    fn env(cores: u32, memory: f32, effective: &str, save_data: bool) -> HostEnvironment {
        HostEnvironment {
            hardware_concurrency: Some(cores),
            device_memory_gb: Some(memory),
            connection: Some(ConnectionInfo {
                effective_type: Some(effective.to_string()),
                save_data,
            }),
            ..HostEnvironment::default()
        }
    }

    #[test]
    fn test_missing_readings_use_defaults() {
        let snapshot = CapabilitySnapshot::probe(&HostEnvironment::default());
        assert_eq!(snapshot.hardware_cores(), 4);
        assert_eq!(snapshot.device_memory_gb(), 8.0);
        assert_eq!(snapshot.connection_type(), EffectiveConnectionType::FourG);
        assert!(snapshot.has_high_bandwidth());
        assert!(!snapshot.is_low_end_device());
    }

    #[test]
    fn test_low_end_triggers() {
        assert!(CapabilitySnapshot::probe(&env(2, 8.0, "4g", false)).is_low_end_device());
        assert!(CapabilitySnapshot::probe(&env(8, 2.0, "4g", false)).is_low_end_device());
        assert!(CapabilitySnapshot::probe(&env(8, 8.0, "3g", false)).is_low_end_device());
        assert!(CapabilitySnapshot::probe(&env(8, 8.0, "wifi", true)).is_low_end_device());
        assert!(!CapabilitySnapshot::probe(&env(8, 8.0, "wifi", false)).is_low_end_device());
    }

    #[test]
    fn test_bandwidth_follows_effective_type() {
        assert!(!CapabilitySnapshot::probe(&env(8, 8.0, "3g", false)).has_high_bandwidth());
        assert!(CapabilitySnapshot::probe(&env(8, 8.0, "WIFI", false)).has_high_bandwidth());
        assert!(CapabilitySnapshot::probe(&env(8, 8.0, "4g", false)).has_high_bandwidth());
    }

    #[test]
    fn test_unknown_connection_is_not_high_bandwidth() {
        let unknown = CapabilitySnapshot::probe(&env(8, 8.0, "5g", false));
        assert_eq!(unknown.connection_type(), EffectiveConnectionType::FourG);
        assert!(!unknown.has_high_bandwidth());

        let unreported = CapabilitySnapshot::probe(&HostEnvironment {
            connection: Some(ConnectionInfo {
                effective_type: None,
                save_data: false,
            }),
            ..HostEnvironment::default()
        });
        assert!(!unreported.has_high_bandwidth());
        assert!(!device_can_autoload(&unreported, true));
    }

    #[test]
    fn test_image_formats_best_first() {
        let snapshot = CapabilitySnapshot::probe(&HostEnvironment {
            supports_webp: true,
            supports_avif: true,
            ..HostEnvironment::default()
        });
        assert_eq!(
            snapshot.image_formats(),
            vec![ImageFormat::Avif, ImageFormat::WebP, ImageFormat::Jpeg]
        );

        let plain = CapabilitySnapshot::probe(&HostEnvironment::default());
        assert_eq!(plain.image_formats(), vec![ImageFormat::Jpeg]);
    }
}
