// THEORY:
// The engine never draws anything. It decides *what* each visual entity should be
// doing and talks to the rendering side through two narrow capabilities:
//
// - `EntityHandle` is one live visual instance. The engine sets its orientation
//   and its rise target; the renderer eases toward those targets at its own pace
//   and reports back, through `has_reached_full` / `has_reached_hidden`, whether
//   the motion has actually finished. The engine never assumes a motion is
//   instantaneous.
// - `Presentation` is the factory that creates and destroys instances and maps
//   variant tokens onto actual visual assets.
//
// Keeping these as traits is what lets the whole lifecycle run under test with a
// fake renderer and no real time passing.

use crate::core_modules::angle::SlotId;
use crate::core_modules::variant_pool::VariantToken;
use std::fmt;

/// The three reveal levels an entity can be told to move to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiseLevel {
    Hidden,
    Intermediate,
    Full,
}

/// What an entity is bound to: a fixed slot, or (legacy mode) a subject index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKey {
    Slot(SlotId),
    Subject(usize),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Slot(slot) => write!(f, "slot {slot}"),
            EntityKey::Subject(index) => write!(f, "subject #{index}"),
        }
    }
}

/// One live visual instance, as seen by the lifecycle controller.
pub trait EntityHandle {
    fn set_orientation(&mut self, angle_degrees: f32);
    fn set_rise_target(&mut self, level: RiseLevel);
    fn has_reached_full(&self) -> bool;
    fn has_reached_hidden(&self) -> bool;
}

/// Creates, dresses and removes visual instances.
pub trait Presentation {
    type Entity: EntityHandle;

    fn create(&mut self, key: EntityKey) -> Self::Entity;
    fn destroy(&mut self, key: EntityKey, entity: Self::Entity);
    fn acquire_visual_variant(&mut self, entity: &mut Self::Entity, token: VariantToken);
    fn release_visual_variant(&mut self, token: VariantToken);
}
