/// Permission and lifecycle control for heavy optional visuals
///
/// One `ResourceGate` guards one asset (the hero 3D scene, the showcase
/// scene). It decides whether the asset may load at all, defers mounting
/// until the asset is visible, and bounds the mount with a timeout.
///
/// Lifecycle:
/// Idle -> Denied | Preparing -> Mounting -> Loaded | Failed
///
/// `Loaded` and `Failed` are terminal. Only an explicit user override can
/// restart a gate, and it never restarts a loaded asset.

use std::time::Duration;
use tracing::{debug, info, warn};

use super::capability::CapabilitySnapshot;
use crate::config::GateConfig;
use crate::timer::{Generation, TimerQueue};

/// Outcome of the permission rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Allowed,
    Denied,
}

impl Permission {
    pub fn is_allowed(self) -> bool {
        self == Permission::Allowed
    }
}

/// Whether the device may fetch heavy visuals without being asked
pub fn device_can_autoload(snapshot: &CapabilitySnapshot, autoload_enabled: bool) -> bool {
    autoload_enabled && !snapshot.is_low_end_device() && snapshot.has_high_bandwidth()
}

/// Permission rule:
/// `(override || !reduced_motion) && (device_can_autoload || override)`
pub fn evaluate_permission(
    snapshot: &CapabilitySnapshot,
    autoload_enabled: bool,
    user_override: bool,
) -> Permission {
    let motion_ok = user_override || !snapshot.reduced_motion();
    let capable = device_can_autoload(snapshot, autoload_enabled) || user_override;
    if motion_ok && capable {
        Permission::Allowed
    } else {
        Permission::Denied
    }
}

/// Why a gated asset failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The asset reported an error
    Error(String),
    /// No load or error signal arrived before the mount deadline
    Timeout,
}

/// Current lifecycle phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatePhase {
    /// Permission not evaluated yet
    Idle,
    Denied,
    /// Allowed; waiting for the asset to become visible
    Preparing,
    /// Asset mounted at `since`; waiting for load/error
    Mounting { since: Duration },
    Loaded,
    Failed(FailureReason),
}

impl GatePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GatePhase::Loaded | GatePhase::Failed(_))
    }
}

/// What the view layer should render for the gated slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePresentation {
    /// Static poster while permission/visibility are pending
    Placeholder,
    /// Static poster plus an "enable" control
    OptIn,
    /// Asset mounted, loading indicator shown
    Loading,
    Interactive,
    /// Deterministic static fallback after a failure
    StaticFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateTimer {
    MountTimeout,
}

/// Permission + lifecycle state machine for one gated asset
pub struct ResourceGate {
    name: String,
    phase: GatePhase,
    snapshot: CapabilitySnapshot,
    autoload_enabled: bool,
    user_override: bool,
    visible: bool,
    mount_timeout: Duration,
    generation: Generation,
    timers: TimerQueue<GateTimer>,
}

impl ResourceGate {
    /// Create a gate in `Idle`. Call `evaluate` to run the permission rule.
    pub fn new(
        name: impl Into<String>,
        snapshot: CapabilitySnapshot,
        autoload_enabled: bool,
        user_override: bool,
        config: &GateConfig,
    ) -> Self {
        Self {
            name: name.into(),
            phase: GatePhase::Idle,
            snapshot,
            autoload_enabled,
            user_override,
            visible: false,
            mount_timeout: Duration::from_millis(config.mount_timeout_ms),
            generation: Generation::new(),
            timers: TimerQueue::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> &GatePhase {
        &self.phase
    }

    pub fn user_override(&self) -> bool {
        self.user_override
    }

    /// Permission under the current inputs
    pub fn permission(&self) -> Permission {
        evaluate_permission(&self.snapshot, self.autoload_enabled, self.user_override)
    }

    /// Run the permission rule.
    ///
    /// Moves `Idle`/`Denied`/`Preparing` according to the result. An active
    /// mount and terminal phases are left alone.
    pub fn evaluate(&mut self, now: Duration) -> Permission {
        let permission = self.permission();

        let waiting = matches!(self.phase, GatePhase::Idle | GatePhase::Denied);
        let pending = matches!(self.phase, GatePhase::Idle | GatePhase::Preparing);

        match permission {
            Permission::Allowed if waiting => {
                debug!(gate = %self.name, "permission granted");
                self.phase = GatePhase::Preparing;
                if self.visible {
                    self.begin_mount(now);
                }
            }
            Permission::Denied if pending => {
                debug!(gate = %self.name, "permission denied");
                self.phase = GatePhase::Denied;
            }
            _ => {}
        }

        permission
    }

    // ========== Inputs ==========

    /// Replace the capability snapshot (after a re-probe) and re-evaluate
    pub fn set_snapshot(&mut self, snapshot: CapabilitySnapshot, now: Duration) -> Permission {
        self.snapshot = snapshot;
        self.evaluate(now)
    }

    /// Change the stored autoload preference and re-evaluate
    pub fn set_autoload(&mut self, enabled: bool, now: Duration) -> Permission {
        self.autoload_enabled = enabled;
        self.evaluate(now)
    }

    /// Explicit user opt-in. Restarts a denied or failed gate; a loaded or
    /// mounting asset is kept as is.
    pub fn enable_override(&mut self, now: Duration) -> Permission {
        self.user_override = true;
        if matches!(self.phase, GatePhase::Failed(_)) {
            info!(gate = %self.name, "user override restarts failed asset");
            self.phase = GatePhase::Idle;
        }
        self.evaluate(now)
    }

    /// Withdraw the user opt-in
    pub fn disable_override(&mut self, now: Duration) -> Permission {
        self.user_override = false;
        self.evaluate(now)
    }

    /// Visibility signal from the host (intersection observer equivalent)
    pub fn set_visible(&mut self, visible: bool, now: Duration) {
        self.visible = visible;
        if visible && self.phase == GatePhase::Preparing && self.permission().is_allowed() {
            self.begin_mount(now);
        }
    }

    fn begin_mount(&mut self, now: Duration) {
        let token = self.generation.bump();
        self.timers.schedule(now + self.mount_timeout, token, GateTimer::MountTimeout);
        self.phase = GatePhase::Mounting { since: now };
        info!(gate = %self.name, token = token.value(), "mounting asset");
    }

    // ========== Asset callbacks ==========

    /// The asset reported a successful load. Ignored outside `Mounting`.
    pub fn on_loaded(&mut self) -> bool {
        if !matches!(self.phase, GatePhase::Mounting { .. }) {
            debug!(gate = %self.name, phase = ?self.phase, "ignoring late load signal");
            return false;
        }
        self.finish(GatePhase::Loaded);
        info!(gate = %self.name, "asset loaded");
        true
    }

    /// The asset reported an error. Ignored outside `Mounting`.
    pub fn on_error(&mut self, message: impl Into<String>) -> bool {
        if !matches!(self.phase, GatePhase::Mounting { .. }) {
            debug!(gate = %self.name, phase = ?self.phase, "ignoring late error signal");
            return false;
        }
        let message = message.into();
        warn!(gate = %self.name, error = %message, "asset failed to load");
        self.finish(GatePhase::Failed(FailureReason::Error(message)));
        true
    }

    /// Enter a terminal phase and cancel the mount deadline
    fn finish(&mut self, phase: GatePhase) {
        self.timers.cancel(self.generation.current());
        self.generation.bump();
        self.phase = phase;
    }

    // ========== Timers ==========

    /// Fire due timers. Returns true if the phase changed.
    pub fn tick(&mut self, now: Duration) -> bool {
        let mut changed = false;
        for entry in self.timers.drain_due(now) {
            if !self.generation.is_current(entry.token) {
                continue;
            }
            match entry.event {
                GateTimer::MountTimeout => {
                    if let GatePhase::Mounting { since } = self.phase {
                        warn!(
                            gate = %self.name,
                            waited_ms = (now - since).as_millis() as u64,
                            "asset mount timed out"
                        );
                        self.finish(GatePhase::Failed(FailureReason::Timeout));
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// When the host should call `tick` next
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    // ========== Presentation ==========

    pub fn presentation(&self) -> GatePresentation {
        match self.phase {
            GatePhase::Idle | GatePhase::Preparing => GatePresentation::Placeholder,
            GatePhase::Denied => GatePresentation::OptIn,
            GatePhase::Mounting { .. } => GatePresentation::Loading,
            GatePhase::Loaded => GatePresentation::Interactive,
            GatePhase::Failed(_) => GatePresentation::StaticFallback,
        }
    }

    /// Whether the asset widget should be in the tree
    pub fn should_mount(&self) -> bool {
        matches!(self.phase, GatePhase::Mounting { .. } | GatePhase::Loaded)
    }

    /// Tear the gate down, cancelling any pending deadline
    pub fn dispose(mut self) {
        self.timers.cancel_all();
        debug!(gate = %self.name, phase = ?self.phase, "gate disposed");
    }
}

impl std::fmt::Debug for ResourceGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGate")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("user_override", &self.user_override)
            .field("visible", &self.visible)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::capability::{ConnectionInfo, HostEnvironment};
    use crate::timer::ms;

    fn capable() -> CapabilitySnapshot {
        CapabilitySnapshot::probe(&HostEnvironment {
            hardware_concurrency: Some(8),
            device_memory_gb: Some(16.0),
            ..HostEnvironment::default()
        })
    }

    fn reduced_motion() -> CapabilitySnapshot {
        CapabilitySnapshot::probe(&HostEnvironment {
            prefers_reduced_motion: true,
            ..HostEnvironment::default()
        })
    }

    fn slow_network() -> CapabilitySnapshot {
        CapabilitySnapshot::probe(&HostEnvironment {
            connection: Some(ConnectionInfo {
                effective_type: Some("3g".into()),
                save_data: false,
            }),
            ..HostEnvironment::default()
        })
    }

    fn gate(snapshot: CapabilitySnapshot) -> ResourceGate {
        ResourceGate::new("hero", snapshot, true, false, &GateConfig::default())
    }

    fn mounted_at(start: Duration) -> ResourceGate {
        let mut gate = gate(capable());
        gate.evaluate(start);
        gate.set_visible(true, start);
        assert_eq!(gate.phase(), &GatePhase::Mounting { since: start });
        gate
    }

    #[test]
    fn test_permission_truth_table() {
        assert!(evaluate_permission(&capable(), true, false).is_allowed());
        assert!(!evaluate_permission(&capable(), false, false).is_allowed());
        assert!(evaluate_permission(&capable(), false, true).is_allowed());
        assert!(!evaluate_permission(&reduced_motion(), true, false).is_allowed());
        assert!(evaluate_permission(&reduced_motion(), true, true).is_allowed());
        assert!(!evaluate_permission(&slow_network(), true, false).is_allowed());
        assert!(evaluate_permission(&slow_network(), true, true).is_allowed());
    }

    #[test]
    fn test_mount_waits_for_visibility() {
        let mut gate = gate(capable());
        assert_eq!(gate.evaluate(ms(0)), Permission::Allowed);
        assert_eq!(gate.phase(), &GatePhase::Preparing);
        assert!(!gate.should_mount());

        gate.set_visible(true, ms(500));
        assert_eq!(gate.phase(), &GatePhase::Mounting { since: ms(500) });
        assert_eq!(gate.next_deadline(), Some(ms(12_500)));
    }

    #[test]
    fn test_visible_before_permission_mounts_on_grant() {
        let mut gate = ResourceGate::new("hero", capable(), false, false, &GateConfig::default());
        gate.set_visible(true, ms(0));
        assert_eq!(gate.evaluate(ms(10)), Permission::Denied);
        assert_eq!(gate.presentation(), GatePresentation::OptIn);

        gate.set_autoload(true, ms(20));
        assert_eq!(gate.phase(), &GatePhase::Mounting { since: ms(20) });
    }

    #[test]
    fn test_timeout_fails_mount() {
        let mut gate = mounted_at(ms(0));
        assert!(!gate.tick(ms(11_999)));
        assert!(gate.tick(ms(12_001)));
        assert_eq!(gate.phase(), &GatePhase::Failed(FailureReason::Timeout));
        assert_eq!(gate.presentation(), GatePresentation::StaticFallback);
    }

    #[test]
    fn test_load_cancels_timeout() {
        let mut gate = mounted_at(ms(0));
        assert!(gate.on_loaded());
        assert_eq!(gate.next_deadline(), None);
        assert!(!gate.tick(ms(20_000)));
        assert_eq!(gate.phase(), &GatePhase::Loaded);
    }

    #[test]
    fn test_terminal_phases_ignore_late_signals() {
        let mut gate = mounted_at(ms(0));
        assert!(gate.on_error("decode failed"));
        assert!(!gate.on_loaded());
        assert!(!gate.on_error("again"));
        gate.tick(ms(60_000));
        assert_eq!(
            gate.phase(),
            &GatePhase::Failed(FailureReason::Error("decode failed".into()))
        );
    }

    #[test]
    fn test_reevaluation_does_not_preempt_mount() {
        let mut gate = mounted_at(ms(0));
        gate.set_autoload(false, ms(100));
        assert_eq!(gate.phase(), &GatePhase::Mounting { since: ms(0) });
    }

    #[test]
    fn test_preparing_falls_back_to_denied() {
        let mut gate = gate(capable());
        gate.evaluate(ms(0));
        gate.set_autoload(false, ms(5));
        assert_eq!(gate.phase(), &GatePhase::Denied);
    }

    #[test]
    fn test_override_restarts_failed_gate_but_not_loaded() {
        let mut gate = mounted_at(ms(0));
        gate.tick(ms(12_000));
        assert!(matches!(gate.phase(), GatePhase::Failed(_)));

        gate.enable_override(ms(15_000));
        // Still visible, so the restart mounts immediately
        assert_eq!(gate.phase(), &GatePhase::Mounting { since: ms(15_000) });
        assert!(gate.on_loaded());

        gate.enable_override(ms(16_000));
        assert_eq!(gate.phase(), &GatePhase::Loaded);
    }

    #[test]
    fn test_stale_timer_cannot_fail_restarted_mount() {
        let mut gate = mounted_at(ms(0));
        gate.on_error("boom");
        gate.enable_override(ms(1_000));
        assert_eq!(gate.phase(), &GatePhase::Mounting { since: ms(1_000) });

        // The first mount's deadline (12 000) was cancelled; only 13 000 is armed
        assert!(!gate.tick(ms(12_500)));
        assert!(gate.tick(ms(13_000)));
    }
}
