// THEORY:
// The `angle` module holds the circular geometry every other layer leans on. The
// sensing side reports a raw orientation in its own frame of reference, and the
// ring of slots lives in a second, rotated frame. Everything that compares two
// angles must do so on the circle, never on the number line: 359° and 1° are two
// degrees apart, not 358.
//
// Key architectural principles:
// 1.  **One Frame of Comparison**: Raw angles and configured slot angles are both
//     pushed through the same `to_internal` transform before they are compared, so
//     the acceptance radius and switch threshold are measured in a single frame.
// 2.  **Shortest Arc Only**: `circular_distance` always returns the minor arc in
//     [0, 180]. No caller ever subtracts two angles directly.
// 3.  **Stateless Utility**: Like the pixel heuristics, these are plain functions
//     with no memory. The stateful layers (classifier hysteresis, resolver) are
//     built on top of them.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const FULL_TURN: f32 = 360.0;

/// Identifier of a slot: its configured angle in whole degrees, folded into [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(u16);

impl SlotId {
    /// Builds a slot id from a configured angle. A configured 360 is the same slot as 0.
    pub fn from_degrees(degrees: u16) -> Self {
        Self(degrees % 360)
    }

    pub fn degrees(self) -> u16 {
        self.0
    }

    pub fn as_f32(self) -> f32 {
        self.0 as f32
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Wraps any real angle into [0, 360).
pub fn normalize(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(FULL_TURN);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= FULL_TURN { 0.0 } else { wrapped }
}

/// Moves a raw angle into the ring's internal frame: `shift - angle`, wrapped.
pub fn to_internal(raw_degrees: f32, shift: f32) -> f32 {
    normalize(shift - normalize(raw_degrees))
}

/// Minimal arc between two angles, in [0, 180].
pub fn circular_distance(a: f32, b: f32) -> f32 {
    let diff = (normalize(a) - normalize(b)).abs();
    if diff > FULL_TURN / 2.0 { FULL_TURN - diff } else { diff }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_wraps_negative_and_large_angles() {
        assert_eq!(normalize(-90.0), 270.0);
        assert_eq!(normalize(720.0), 0.0);
        assert_eq!(normalize(365.5), 5.5);
        assert!(normalize(-1e-7) < FULL_TURN);
    }

    #[test]
    fn distance_takes_the_short_way_round() {
        assert_eq!(circular_distance(359.0, 1.0), 2.0);
        assert_eq!(circular_distance(1.0, 359.0), 2.0);
        assert_eq!(circular_distance(0.0, 180.0), 180.0);
        assert_eq!(circular_distance(-10.0, 10.0), 20.0);
    }

    #[test]
    fn internal_frame_is_shift_minus_angle() {
        assert_eq!(to_internal(160.0, 45.0), 245.0);
        assert_eq!(to_internal(45.0, 45.0), 0.0);
        assert_eq!(to_internal(-315.0, 45.0), 0.0);
    }

    #[test]
    fn slot_360_folds_to_zero() {
        assert_eq!(SlotId::from_degrees(360), SlotId::from_degrees(0));
        assert_eq!(SlotId::from_degrees(205).degrees(), 205);
    }
}
