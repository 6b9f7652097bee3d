use crate::core_modules::angle::SlotId;

/// Reasons a `RingConfig` is refused before an engine is built from it.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one slot angle must be configured")]
    NoSlots,

    #[error("slot angle {0} is outside 0..=360")]
    SlotAngleOutOfRange(u16),

    #[error("slot {0} is configured more than once (360 and 0 are the same slot)")]
    DuplicateSlot(SlotId),

    #[error("acceptance radius given for slot angle {0}, which is not a configured slot")]
    UnknownSlotRadius(u16),

    #[error("acceptance radius must be a positive, finite number of degrees, got {0}")]
    InvalidAcceptanceRadius(f32),

    #[error("switch threshold {threshold} must lie within 0..={acceptance_radius} (the narrowest acceptance radius)")]
    InvalidSwitchThreshold { threshold: f32, acceptance_radius: f32 },

    #[error("angle shift must be finite, got {0}")]
    InvalidAngleShift(f32),

    #[error("stabilization threshold must be at least 1 observation")]
    ZeroStabilizationThreshold,

    #[error("visual variant pool must hold at least one variant")]
    EmptyVariantPool,

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The only failure that crosses the producer/consumer boundary.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FrameQueueError {
    #[error("frame queue closed: the consumer has been dropped")]
    Closed,
}
