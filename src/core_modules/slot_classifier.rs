// THEORY:
// The `AngleSlotClassifier` quantizes a continuously drifting orientation into one
// of a handful of named slots. A person standing near the border between two
// slots produces an angle that jitters across that border every few frames; a
// naive nearest-slot rule would make the assigned slot flicker with it.
//
// Key architectural principles:
// 1.  **Acceptance Window**: A slot is only a candidate if the subject is within
//     that slot's own acceptance radius on the circle. Subjects outside every
//     window, or with no usable angle at all, are unslotted and ignored for the
//     rest of the tick.
// 2.  **Hysteresis**: If the subject already had a slot last tick and is still
//     within `switch_threshold` of it, it keeps that slot even when another slot
//     has become nearer. Because the threshold never exceeds the narrowest
//     acceptance radius, a retained slot always still satisfies its window.
// 3.  **Engagement Reset**: Moving to a different slot (or to no slot) is reported
//     as a switch, which the caller uses to forget that subject's debounced
//     activation. A new slot is a new engagement.
// 4.  **Pure Geometry**: The classifier itself holds only configuration. The
//     per-subject memory of previous slots belongs to the coordinator.

use crate::core_modules::angle::{circular_distance, to_internal, SlotId};

/// A configured slot together with its acceptance radius, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotWindow {
    pub slot: SlotId,
    pub radius: f32,
}

/// A configured slot together with its position in the internal frame.
#[derive(Debug, Clone, Copy)]
struct SlotGeometry {
    id: SlotId,
    internal: f32,
    radius: f32,
}

/// Result of classifying one subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// The slot the subject is assigned to, if any.
    pub slot: Option<SlotId>,
    /// The subject's angle in the internal frame.
    pub internal_angle: f32,
    /// True when a previous slot existed and the subject left it this call.
    pub switched: bool,
}

pub struct AngleSlotClassifier {
    slots: Vec<SlotGeometry>,
    shift: f32,
    switch_threshold: f32,
}

impl AngleSlotClassifier {
    pub fn new(windows: &[SlotWindow], shift: f32, switch_threshold: f32) -> Self {
        let slots = windows
            .iter()
            .map(|w| SlotGeometry { id: w.slot, internal: to_internal(w.slot.as_f32(), shift), radius: w.radius })
            .collect();
        Self { slots, shift, switch_threshold }
    }

    pub fn internal_angle(&self, raw_angle: f32) -> f32 {
        to_internal(raw_angle, self.shift)
    }

    /// The slot's own position in the internal frame, if it is configured.
    pub fn slot_internal(&self, slot: SlotId) -> Option<f32> {
        self.slots.iter().find(|g| g.id == slot).map(|g| g.internal)
    }

    /// Nearest slot whose window contains the angle, ignoring any history.
    /// Ties go to the slot declared first. A non-finite angle matches nothing.
    pub fn nearest(&self, raw_angle: f32) -> Option<(SlotId, f32)> {
        if !raw_angle.is_finite() {
            return None;
        }
        let internal = self.internal_angle(raw_angle);
        let mut best: Option<(SlotId, f32)> = None;
        for geometry in &self.slots {
            let distance = circular_distance(internal, geometry.internal);
            if distance > geometry.radius {
                continue;
            }
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((geometry.id, distance)),
            }
        }
        best
    }

    /// Classifies a raw angle, honouring the subject's previous slot.
    pub fn classify(&self, raw_angle: f32, previous: Option<SlotId>) -> Classification {
        let internal_angle = self.internal_angle(raw_angle);

        if let Some(previous_slot) = previous {
            if let Some(previous_internal) = self.slot_internal(previous_slot) {
                // NaN distances fail this comparison and fall through to unslotted.
                if circular_distance(internal_angle, previous_internal) < self.switch_threshold {
                    return Classification { slot: Some(previous_slot), internal_angle, switched: false };
                }
            }
        }

        let slot = self.nearest(raw_angle).map(|(id, _)| id);
        Classification {
            slot,
            internal_angle,
            switched: previous.is_some() && previous != slot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(degrees: &[u16], radius: f32) -> Vec<SlotWindow> {
        degrees.iter().map(|&d| SlotWindow { slot: SlotId::from_degrees(d), radius }).collect()
    }

    fn scenario_classifier() -> AngleSlotClassifier {
        AngleSlotClassifier::new(&windows(&[115, 160, 205, 250], 20.0), 45.0, 10.0)
    }

    #[test]
    fn subject_at_slot_angle_classifies_to_that_slot() {
        let classifier = scenario_classifier();
        let c = classifier.classify(160.0, None);
        assert_eq!(c.slot, Some(SlotId::from_degrees(160)));
        assert_eq!(c.internal_angle, 245.0);
        assert!(!c.switched);
    }

    #[test]
    fn drift_within_switch_threshold_keeps_previous_slot() {
        let classifier = scenario_classifier();
        let slot_160 = SlotId::from_degrees(160);
        let c = classifier.classify(168.0, Some(slot_160));
        assert_eq!(c.slot, Some(slot_160));
        assert!(!c.switched);
    }

    #[test]
    fn hysteresis_beats_a_nearer_slot() {
        let classifier = scenario_classifier();
        let slot_160 = SlotId::from_degrees(160);
        let wide = AngleSlotClassifier::new(&windows(&[160, 180], 20.0), 45.0, 15.0);
        // 172 is 8° from 180 and 12° from 160: nearest is 180, hysteresis keeps 160.
        assert_eq!(wide.nearest(172.0).map(|(s, _)| s), Some(SlotId::from_degrees(180)));
        let c = wide.classify(172.0, Some(slot_160));
        assert_eq!(c.slot, Some(slot_160));

        // Outside the threshold the nearest slot wins and the switch is reported.
        let c = classifier.classify(200.0, Some(slot_160));
        assert_eq!(c.slot, Some(SlotId::from_degrees(205)));
        assert!(c.switched);
    }

    #[test]
    fn outside_every_window_is_unslotted() {
        let classifier = scenario_classifier();
        let c = classifier.classify(0.0, None);
        assert_eq!(c.slot, None);
        assert!(!c.switched);

        let c = classifier.classify(0.0, Some(SlotId::from_degrees(115)));
        assert_eq!(c.slot, None);
        assert!(c.switched);
    }

    #[test]
    fn acceptance_is_measured_on_the_circle() {
        // Slot 0 with no shift sits at internal 0; raw 350 is internal 10.
        let classifier = AngleSlotClassifier::new(&windows(&[0], 15.0), 0.0, 5.0);
        assert_eq!(classifier.nearest(350.0), Some((SlotId::from_degrees(0), 10.0)));
        assert_eq!(classifier.nearest(10.0), Some((SlotId::from_degrees(0), 10.0)));
        assert_eq!(classifier.nearest(200.0), None);
    }

    #[test]
    fn ties_go_to_the_first_declared_slot() {
        let classifier = AngleSlotClassifier::new(&windows(&[100, 120], 20.0), 0.0, 5.0);
        // raw 110 lands on internal 250, exactly 10° from both slots (internal 260 and 240).
        let tie = classifier.nearest(110.0);
        assert_eq!(tie.map(|(s, _)| s), Some(SlotId::from_degrees(100)));
    }

    #[test]
    fn every_returned_slot_respects_the_radius() {
        let classifier = scenario_classifier();
        let mut angle = -720.0_f32;
        while angle < 720.0 {
            if let Some((slot, distance)) = classifier.nearest(angle) {
                let centre = classifier.slot_internal(slot).expect("configured slot");
                let measured = circular_distance(classifier.internal_angle(angle), centre);
                assert!(measured <= 20.0, "angle {angle} matched {slot} at {measured}");
                assert_eq!(measured, distance);
            }
            angle += 0.5;
        }
    }

    #[test]
    fn each_slot_uses_its_own_window() {
        // No shift: slot 0 sits at internal 0 with a 30° window, slot 90 at internal 270 with 5°.
        let classifier = AngleSlotClassifier::new(
            &[
                SlotWindow { slot: SlotId::from_degrees(0), radius: 30.0 },
                SlotWindow { slot: SlotId::from_degrees(90), radius: 5.0 },
            ],
            0.0,
            5.0,
        );
        // raw 335 is internal 25: inside the wide window.
        assert_eq!(classifier.nearest(335.0), Some((SlotId::from_degrees(0), 25.0)));
        // raw 100 is internal 260, 10° from slot 90: outside its narrow window.
        assert_eq!(classifier.nearest(100.0), None);
        assert_eq!(classifier.nearest(93.0).map(|(s, _)| s), Some(SlotId::from_degrees(90)));
    }

    #[test]
    fn non_finite_angle_is_unslotted() {
        let classifier = scenario_classifier();
        let slot_160 = SlotId::from_degrees(160);
        for raw in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert_eq!(classifier.nearest(raw), None);
            let c = classifier.classify(raw, Some(slot_160));
            assert_eq!(c.slot, None);
            assert!(c.switched);
            assert_eq!(classifier.classify(raw, None).slot, None);
        }
    }
}
