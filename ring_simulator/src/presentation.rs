// THEORY:
// The simulator's stand-in for the rendering side. Each `EasedEntity` moves its
// reveal level toward the commanded target at a fixed rate per tick, the way the
// installation's animated figures slide up and down, and only reports having
// reached full or hidden once the level actually gets there. That gives the
// engine's lifecycle controller a renderer with real, non-instant latency.

use ring_slots::{EntityHandle, EntityKey, Presentation, RiseLevel, VariantToken};

pub fn reveal_of(level: RiseLevel) -> f32 {
    match level {
        RiseLevel::Hidden => 0.0,
        RiseLevel::Intermediate => 0.5,
        RiseLevel::Full => 1.0,
    }
}

#[derive(Debug, Clone)]
pub struct EasedEntity {
    key: EntityKey,
    level: f32,
    target: f32,
    orientation: Option<f32>,
    variant: Option<VariantToken>,
}

impl EasedEntity {
    fn new(key: EntityKey) -> Self {
        Self { key, level: 0.0, target: 0.0, orientation: None, variant: None }
    }

    /// Moves the reveal level at most `step` toward the target, landing on it exactly.
    pub fn ease(&mut self, step: f32) {
        let delta = self.target - self.level;
        if delta.abs() <= step {
            self.level = self.target;
        } else {
            self.level += step.copysign(delta);
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn orientation(&self) -> Option<f32> {
        self.orientation
    }

    pub fn variant(&self) -> Option<VariantToken> {
        self.variant
    }
}

impl EntityHandle for EasedEntity {
    fn set_orientation(&mut self, angle_degrees: f32) {
        self.orientation = Some(angle_degrees);
    }

    fn set_rise_target(&mut self, level: RiseLevel) {
        self.target = reveal_of(level);
    }

    fn has_reached_full(&self) -> bool {
        self.level >= reveal_of(RiseLevel::Full)
    }

    fn has_reached_hidden(&self) -> bool {
        self.level <= reveal_of(RiseLevel::Hidden)
    }
}

#[derive(Debug)]
pub struct RingPresentation {
    variant_names: Vec<String>,
    live: usize,
    created_total: u64,
}

impl RingPresentation {
    pub fn new(variant_names: Vec<String>) -> Self {
        Self { variant_names, live: 0, created_total: 0 }
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn created_total(&self) -> u64 {
        self.created_total
    }

    fn variant_name(&self, token: VariantToken) -> &str {
        self.variant_names.get(token.index()).map(String::as_str).unwrap_or("unnamed")
    }
}

impl Presentation for RingPresentation {
    type Entity = EasedEntity;

    fn create(&mut self, key: EntityKey) -> EasedEntity {
        self.live += 1;
        self.created_total += 1;
        EasedEntity::new(key)
    }

    fn destroy(&mut self, key: EntityKey, entity: EasedEntity) {
        self.live = self.live.saturating_sub(1);
        tracing::debug!(%key, level = entity.level, "figure removed");
    }

    fn acquire_visual_variant(&mut self, entity: &mut EasedEntity, token: VariantToken) {
        entity.variant = Some(token);
        tracing::info!(key = %entity.key, variant = self.variant_name(token), "figure dressed");
    }

    fn release_visual_variant(&mut self, token: VariantToken) {
        tracing::debug!(variant = self.variant_name(token), "variant returned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring_slots::SlotId;

    fn entity() -> EasedEntity {
        EasedEntity::new(EntityKey::Slot(SlotId::from_degrees(160)))
    }

    #[test]
    fn easing_is_rate_limited_and_lands_exactly() {
        let mut e = entity();
        e.set_rise_target(RiseLevel::Full);
        e.ease(0.4);
        assert!((e.level() - 0.4).abs() < 1e-6);
        assert!(!e.has_reached_full());
        e.ease(0.4);
        e.ease(0.4);
        assert_eq!(e.level(), 1.0);
        assert!(e.has_reached_full());
    }

    #[test]
    fn fresh_entity_is_hidden() {
        let e = entity();
        assert!(e.has_reached_hidden());
        assert!(!e.has_reached_full());
    }

    #[test]
    fn retract_eases_back_down() {
        let mut e = entity();
        e.set_rise_target(RiseLevel::Intermediate);
        e.ease(1.0);
        assert_eq!(e.level(), 0.5);
        e.set_rise_target(RiseLevel::Hidden);
        e.ease(0.3);
        assert!(!e.has_reached_hidden());
        e.ease(0.3);
        assert!(e.has_reached_hidden());
    }

    #[test]
    fn presentation_tracks_live_figures_and_variants() {
        let mut presentation = RingPresentation::new(vec!["tabby".into()]);
        let key = EntityKey::Slot(SlotId::from_degrees(115));
        let mut e = presentation.create(key);
        assert_eq!(presentation.live(), 1);
        presentation.destroy(key, e.clone());
        assert_eq!(presentation.live(), 0);
        assert_eq!(presentation.created_total(), 1);
        assert_eq!(e.variant(), None);
        e.set_orientation(115.0);
        assert_eq!(e.orientation(), Some(115.0));
    }
}
