// THEORY:
// The `config` module is the single source of tunable behaviour for the engine.
// It mirrors the installation's calibration file: a ring of snap angles, the
// rotation offset between the sensor and the ring, the hysteresis and debounce
// knobs, and the timing of the rise / collapse choreography.
//
// A configuration is plain data (serde in, serde out) plus a `validate` pass. The
// engine refuses to start from an invalid configuration, which is the only place
// in the crate where an error is surfaced to the caller; everything that happens
// per tick degrades silently instead.

use crate::coordinator::SpawnMode;
use crate::core_modules::angle::SlotId;
use crate::core_modules::lifecycle::LifecycleTiming;
use crate::core_modules::slot_classifier::SlotWindow;
use crate::error::ConfigError;
use crate::frame_queue::DrainPolicy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Timers of the presence gate, the rise choreography and the teardown path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Continuous occupancy required before a slot's entity may start rising.
    #[serde(with = "duration_secs")]
    pub presence_confirm: Duration,
    /// How long the entity holds at the intermediate reveal before going full.
    #[serde(with = "duration_secs")]
    pub rise_hold: Duration,
    /// How long a slot may go unseen before its presence lock is released.
    #[serde(with = "duration_secs")]
    pub presence_timeout: Duration,
    /// How long without any frame before the whole ring is torn down.
    #[serde(with = "duration_secs")]
    pub data_interruption_timeout: Duration,
    /// Pause between an entity reaching hidden and its destruction.
    #[serde(with = "duration_secs")]
    pub destroy_delay: Duration,
    /// Waiting on the renderer longer than this is reported as stuck.
    #[serde(with = "duration_secs")]
    pub stuck_after: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            presence_confirm: Duration::from_millis(500),
            rise_hold: Duration::from_secs(3),
            presence_timeout: Duration::from_secs(1),
            data_interruption_timeout: Duration::from_millis(500),
            destroy_delay: Duration::from_secs(1),
            stuck_after: Duration::from_secs(10),
        }
    }
}

impl TimingConfig {
    pub fn lifecycle(&self) -> LifecycleTiming {
        LifecycleTiming {
            rise_hold: self.rise_hold,
            destroy_delay: self.destroy_delay,
            stuck_after: self.stuck_after,
        }
    }
}

/// Full configuration of a ring engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Snap angles in degrees. 360 is accepted and folds to 0.
    pub slot_angles: Vec<u16>,
    /// Max circular distance (degrees) between a subject and a slot for a match.
    pub acceptance_radius: f32,
    /// Per-slot overrides of `acceptance_radius`, keyed by slot angle.
    pub slot_radii: BTreeMap<u16, f32>,
    /// Rotation between the sensor's frame and the ring: `internal = shift - raw`.
    pub angle_shift: f32,
    /// A subject stays on its previous slot while it is closer than this (degrees).
    pub switch_threshold: f32,
    /// Consecutive identical observations before a new activation value is accepted.
    pub stabilization_threshold: u32,
    /// Number of distinct visual variants that can be live at once.
    pub variant_pool_size: usize,
    pub spawn_mode: SpawnMode,
    pub drain_policy: DrainPolicy,
    pub timing: TimingConfig,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            slot_angles: vec![115, 160, 205, 250],
            acceptance_radius: 20.0,
            slot_radii: BTreeMap::new(),
            angle_shift: 45.0,
            switch_threshold: 10.0,
            stabilization_threshold: 30,
            variant_pool_size: 4,
            spawn_mode: SpawnMode::SlotDriven,
            drain_policy: DrainPolicy::ProcessAll,
            timing: TimingConfig::default(),
        }
    }
}

impl RingConfig {
    /// Parses a JSON document (missing fields fall back to defaults) and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_angles.is_empty() {
            return Err(ConfigError::NoSlots);
        }

        let mut seen = HashSet::with_capacity(self.slot_angles.len());
        for &angle in &self.slot_angles {
            if angle > 360 {
                return Err(ConfigError::SlotAngleOutOfRange(angle));
            }
            let slot = SlotId::from_degrees(angle);
            if !seen.insert(slot) {
                return Err(ConfigError::DuplicateSlot(slot));
            }
        }

        for &angle in self.slot_radii.keys() {
            if angle > 360 || !seen.contains(&SlotId::from_degrees(angle)) {
                return Err(ConfigError::UnknownSlotRadius(angle));
            }
        }

        let windows = self.slot_windows();
        let mut narrowest = f32::INFINITY;
        for window in &windows {
            if !window.radius.is_finite() || window.radius <= 0.0 {
                return Err(ConfigError::InvalidAcceptanceRadius(window.radius));
            }
            narrowest = narrowest.min(window.radius);
        }
        if !self.switch_threshold.is_finite()
            || self.switch_threshold < 0.0
            || self.switch_threshold > narrowest
        {
            return Err(ConfigError::InvalidSwitchThreshold {
                threshold: self.switch_threshold,
                acceptance_radius: narrowest,
            });
        }
        if !self.angle_shift.is_finite() {
            return Err(ConfigError::InvalidAngleShift(self.angle_shift));
        }
        if self.stabilization_threshold == 0 {
            return Err(ConfigError::ZeroStabilizationThreshold);
        }
        if self.variant_pool_size == 0 {
            return Err(ConfigError::EmptyVariantPool);
        }
        Ok(())
    }

    /// Configured slots in declaration order.
    pub fn slots(&self) -> Vec<SlotId> {
        self.slot_angles.iter().map(|&a| SlotId::from_degrees(a)).collect()
    }

    /// Configured slots with their effective acceptance radius, in declaration order.
    pub fn slot_windows(&self) -> Vec<SlotWindow> {
        self.slot_angles
            .iter()
            .map(|&angle| {
                let slot = SlotId::from_degrees(angle);
                let radius = self
                    .slot_radii
                    .iter()
                    .find(|&(&key, _)| SlotId::from_degrees(key) == slot)
                    .map_or(self.acceptance_radius, |(_, &radius)| radius);
                SlotWindow { slot, radius }
            })
            .collect()
    }
}

/// Serde adapter storing a `Duration` as fractional seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
