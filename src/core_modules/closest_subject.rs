// THEORY:
// Several people can stand inside the same slot's window at once, but a slot
// drives exactly one entity and that entity listens to exactly one activation
// signal. `ClosestSubjectResolver` is the single authority on who that is: the
// subject whose internal angle sits closest to the slot's centre. Ties go to the
// subject seen first, so the choice is stable from one identical frame to the next.

use crate::core_modules::angle::{circular_distance, SlotId};
use crate::core_modules::slot_classifier::AngleSlotClassifier;

/// A subject competing for a slot, as seen by the resolver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contender {
    pub index: usize,
    pub internal_angle: f32,
}

pub struct ClosestSubjectResolver<'a> {
    classifier: &'a AngleSlotClassifier,
}

impl<'a> ClosestSubjectResolver<'a> {
    pub fn new(classifier: &'a AngleSlotClassifier) -> Self {
        Self { classifier }
    }

    /// Picks the driving subject for `slot`. Returns `None` only for an empty
    /// contender list or an unknown slot.
    pub fn resolve(&self, slot: SlotId, contenders: &[Contender]) -> Option<usize> {
        let centre = self.classifier.slot_internal(slot)?;
        let mut best: Option<(usize, f32)> = None;
        for contender in contenders {
            let distance = circular_distance(contender.internal_angle, centre);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((contender.index, distance)),
            }
        }
        best.map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::slot_classifier::SlotWindow;

    fn classifier() -> AngleSlotClassifier {
        let windows: Vec<SlotWindow> = [115, 160, 205, 250]
            .into_iter()
            .map(|d| SlotWindow { slot: SlotId::from_degrees(d), radius: 20.0 })
            .collect();
        AngleSlotClassifier::new(&windows, 45.0, 10.0)
    }

    #[test]
    fn closest_contender_drives_the_slot() {
        let classifier = classifier();
        let resolver = ClosestSubjectResolver::new(&classifier);
        let slot = SlotId::from_degrees(205);
        let centre = classifier.slot_internal(slot).expect("configured");

        let contenders = [
            Contender { index: 0, internal_angle: centre + 9.0 },
            Contender { index: 1, internal_angle: centre - 3.0 },
        ];
        assert_eq!(resolver.resolve(slot, &contenders), Some(1));
    }

    #[test]
    fn ties_go_to_the_first_contender() {
        let classifier = classifier();
        let resolver = ClosestSubjectResolver::new(&classifier);
        let slot = SlotId::from_degrees(160);
        let centre = classifier.slot_internal(slot).expect("configured");

        let contenders = [
            Contender { index: 4, internal_angle: centre + 5.0 },
            Contender { index: 2, internal_angle: centre - 5.0 },
        ];
        assert_eq!(resolver.resolve(slot, &contenders), Some(4));
    }

    #[test]
    fn wraps_around_zero() {
        let classifier = AngleSlotClassifier::new(&[SlotWindow { slot: SlotId::from_degrees(0), radius: 20.0 }], 0.0, 5.0);
        let resolver = ClosestSubjectResolver::new(&classifier);
        let contenders = [
            Contender { index: 0, internal_angle: 15.0 },
            Contender { index: 1, internal_angle: 357.0 },
        ];
        assert_eq!(resolver.resolve(SlotId::from_degrees(0), &contenders), Some(1));
    }

    #[test]
    fn nothing_to_resolve() {
        let classifier = classifier();
        let resolver = ClosestSubjectResolver::new(&classifier);
        assert_eq!(resolver.resolve(SlotId::from_degrees(160), &[]), None);
        let stray = [Contender { index: 0, internal_angle: 0.0 }];
        assert_eq!(resolver.resolve(SlotId::from_degrees(1), &stray), None);
    }
}
