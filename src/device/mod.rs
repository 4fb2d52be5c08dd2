/// Adaptive resource loading
///
/// This module handles:
/// - Device/network capability probing (capability.rs)
/// - Permission and mount lifecycle of heavy optional visuals (gate.rs)

pub mod capability;
pub mod gate;

pub use capability::{CapabilitySnapshot, ConnectionInfo, EffectiveConnectionType, HostEnvironment};
pub use gate::{FailureReason, GatePhase, GatePresentation, Permission, ResourceGate};
