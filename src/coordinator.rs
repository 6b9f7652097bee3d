// THEORY:
// The `coordinator` module is the top-level API of the ring engine. It owns every
// piece of per-slot and per-subject state and runs one tick at a time, turning
// decoded frames into lifecycle commands for the visual entities.
//
// One tick is a fixed sequence of stages:
//   Stage 1: advance the monotonic clock.
//   Stage 2: replay the drained frames (classify, group by slot, refresh presence,
//            spawn or resume entities, resolve the driver, stabilize, drive).
//   Stage 3: sweep every previously seen slot that no frame refreshed this tick.
//   Stage 4: advance each entity's lifecycle timers and readiness predicates.
//   Stage 5: the global watchdog, independent of any per-slot state.
//
// Key architectural principles:
// 1.  **Single Owner**: The slot → entity table, the variant pool and all trackers
//     live here and are only ever touched from `tick`. The frame queue is the only
//     cross-thread boundary and it sits outside this struct.
// 2.  **Never Fails Per Tick**: Malformed frames are truncated, an exhausted pool
//     leaves the slot pending, duplicate commands are no-ops. `tick` returns a
//     `TickReport` describing what happened, never an error.
// 3.  **Two Allocation Strategies, One Table**: In `SlotDriven` mode each fixed
//     slot owns an entity. In the legacy `PersonDriven` mode each subject index
//     owns one. Both share the same entity table keyed by `EntityKey`.
// 4.  **Release On Destroy Only**: A variant token goes back to the pool, and a
//     slot becomes free for a new entity, only once the old entity has actually
//     been destroyed.

use crate::config::RingConfig;
use crate::core_modules::angle::SlotId;
use crate::core_modules::closest_subject::{ClosestSubjectResolver, Contender};
use crate::core_modules::entity::{EntityHandle, EntityKey, Presentation, RiseLevel};
use crate::core_modules::lifecycle::{
    CollapseOutcome, HeadState, LifecycleController, LifecycleState, Transition,
};
use crate::core_modules::presence::{PresenceChange, PresenceTracker};
use crate::core_modules::slot_classifier::AngleSlotClassifier;
use crate::core_modules::stable_value::StableValueTracker;
use crate::core_modules::variant_pool::{VariantPool, VariantToken};
use crate::error::ConfigError;
use crate::frame::Frame;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;

/// How entities are allocated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnMode {
    /// One entity per configured slot.
    #[default]
    SlotDriven,
    /// One entity per subject index (legacy installation behaviour).
    PersonDriven,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownCause {
    /// A frame arrived reporting nobody.
    EmptyFrame,
    /// No frame arrived for longer than the interruption timeout.
    DataInterrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Spawned { key: EntityKey, token: VariantToken },
    /// No variant token was free; the entity will be retried on later ticks.
    PoolExhausted { key: EntityKey },
    Transition { key: EntityKey, transition: Transition },
}

/// What a single call to `tick` did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub frames_processed: usize,
    pub malformed_frames: usize,
    pub events: Vec<LifecycleEvent>,
    pub teardown: Option<TeardownCause>,
}

impl TickReport {
    pub fn transitions_for(&self, key: EntityKey) -> impl Iterator<Item = Transition> + '_ {
        self.events.iter().filter_map(move |event| match event {
            LifecycleEvent::Transition { key: k, transition } if *k == key => Some(*transition),
            _ => None,
        })
    }

    pub fn has_transition(&self, key: EntityKey, transition: Transition) -> bool {
        self.transitions_for(key).any(|t| t == transition)
    }
}

struct EntityRecord<E> {
    controller: LifecycleController,
    entity: E,
    token: VariantToken,
}

pub struct FrameCoordinator<P: Presentation> {
    config: RingConfig,
    classifier: AngleSlotClassifier,
    stabilizer: StableValueTracker<usize>,
    presence: PresenceTracker,
    pool: VariantPool,
    presentation: P,
    entities: BTreeMap<EntityKey, EntityRecord<P::Entity>>,
    /// Entities that could not be spawned for lack of a variant token.
    pending: BTreeSet<EntityKey>,
    /// Slot each subject index held on the previous frame (hysteresis memory).
    last_slot: HashMap<usize, SlotId>,
    clock: Duration,
    since_last_frame: Duration,
    /// Armed by a frame, disarmed by the teardown it triggers.
    watchdog_armed: bool,
}

impl<P: Presentation> FrameCoordinator<P> {
    pub fn new(config: RingConfig, presentation: P) -> Result<Self, ConfigError> {
        config.validate()?;
        let classifier =
            AngleSlotClassifier::new(&config.slot_windows(), config.angle_shift, config.switch_threshold);
        Ok(Self {
            classifier,
            stabilizer: StableValueTracker::new(config.stabilization_threshold),
            presence: PresenceTracker::new(config.timing.presence_confirm, config.timing.presence_timeout),
            pool: VariantPool::new(config.variant_pool_size),
            presentation,
            entities: BTreeMap::new(),
            pending: BTreeSet::new(),
            last_slot: HashMap::new(),
            clock: Duration::ZERO,
            since_last_frame: Duration::ZERO,
            watchdog_armed: false,
            config,
        })
    }

    /// Runs one tick over every frame drained since the previous one.
    pub fn tick(&mut self, frames: &[Frame], dt: Duration) -> TickReport {
        let mut report = TickReport::default();

        // Stage 1: Clock
        self.clock += dt;
        self.since_last_frame += dt;

        // Stage 2: Frames, in arrival order. Only the first one carries the tick's dt.
        let mut refreshed = BTreeSet::new();
        for (i, frame) in frames.iter().enumerate() {
            let frame_dt = if i == 0 { dt } else { Duration::ZERO };
            self.process_frame(frame, frame_dt, &mut refreshed, &mut report);
        }

        // Stage 3: Slots nobody refreshed this tick
        self.sweep_absent_slots(&refreshed, dt, &mut report);

        // Stage 4: Lifecycle timers and renderer predicates
        self.advance_entities(dt, &mut report);

        // Stage 5: Global watchdog
        if self.watchdog_armed && self.since_last_frame > self.config.timing.data_interruption_timeout {
            tracing::warn!(
                silent_secs = self.since_last_frame.as_secs_f32(),
                "frame stream interrupted"
            );
            self.teardown(TeardownCause::DataInterrupted, &mut report);
        }

        report
    }

    /// Resets the interruption watchdog without delivering a frame.
    pub fn notify_keepalive(&mut self) {
        self.since_last_frame = Duration::ZERO;
    }

    fn process_frame(
        &mut self,
        frame: &Frame,
        dt: Duration,
        refreshed: &mut BTreeSet<SlotId>,
        report: &mut TickReport,
    ) {
        self.since_last_frame = Duration::ZERO;
        self.watchdog_armed = true;
        report.frames_processed += 1;

        if frame.is_malformed() {
            tracing::warn!(
                angles = frame.angles.len(),
                activations = frame.activations.len(),
                "malformed frame, truncating to the shorter sequence"
            );
            report.malformed_frames += 1;
        }

        let count = frame.subject_count();
        if count == 0 {
            self.teardown(TeardownCause::EmptyFrame, report);
            return;
        }
        self.forget_subjects_from(count, report);

        // Classify every subject and group the slotted ones by slot.
        let mut occupancy: BTreeMap<SlotId, Vec<Contender>> = BTreeMap::new();
        let mut raw_activations = Vec::with_capacity(count);
        let mut unslotted = Vec::new();
        for subject in frame.subjects() {
            raw_activations.push(subject.raw_activation);
            if !subject.raw_angle.is_finite() {
                tracing::warn!(
                    subject = subject.index,
                    angle = subject.raw_angle,
                    "non-finite angle, subject unslotted"
                );
            }
            let previous = self.last_slot.get(&subject.index).copied();
            let classification = self.classifier.classify(subject.raw_angle, previous);
            if classification.switched {
                tracing::debug!(
                    subject = subject.index,
                    from = ?previous,
                    to = ?classification.slot,
                    "subject changed slot, forgetting its activation"
                );
                self.stabilizer.reset(subject.index);
            }
            match classification.slot {
                Some(slot) => {
                    self.last_slot.insert(subject.index, slot);
                    occupancy.entry(slot).or_default().push(Contender {
                        index: subject.index,
                        internal_angle: classification.internal_angle,
                    });
                }
                None => {
                    self.last_slot.remove(&subject.index);
                    unslotted.push(subject.index);
                }
            }
        }

        // A person-driven entity lives only while its subject holds a slot.
        if self.config.spawn_mode == SpawnMode::PersonDriven {
            for index in unslotted {
                let key = EntityKey::Subject(index);
                self.pending.remove(&key);
                self.collapse_entity(key, report);
            }
        }

        for (&slot, contenders) in &occupancy {
            refreshed.insert(slot);
            self.presence.tick(slot, true, self.clock, dt);
            let driver = ClosestSubjectResolver::new(&self.classifier).resolve(slot, contenders);
            let Some(driver) = driver else { continue };
            match self.config.spawn_mode {
                SpawnMode::SlotDriven => self.drive_slot(slot, driver, &raw_activations, report),
                SpawnMode::PersonDriven => {
                    self.drive_subjects(slot, driver, contenders, &raw_activations, report)
                }
            }
        }
    }

    fn drive_slot(&mut self, slot: SlotId, driver: usize, raw_activations: &[f32], report: &mut TickReport) {
        let key = EntityKey::Slot(slot);
        if !self.ensure_entity(key, report) {
            return;
        }
        let stable = self.stabilizer.update(driver, raw_activations[driver]);
        let confirmed = self.presence.is_confirmed(slot);
        if let Some(record) = self.entities.get_mut(&key) {
            record.entity.set_orientation(slot.as_f32());
            if let Some(transition) = record.controller.drive(stable, confirmed, &mut record.entity) {
                tracing::debug!(%key, driver, stable, "rise triggered");
                report.events.push(LifecycleEvent::Transition { key, transition });
            }
        }
    }

    fn drive_subjects(
        &mut self,
        slot: SlotId,
        driver: usize,
        contenders: &[Contender],
        raw_activations: &[f32],
        report: &mut TickReport,
    ) {
        let confirmed = self.presence.is_confirmed(slot);
        for contender in contenders {
            let key = EntityKey::Subject(contender.index);
            if !self.ensure_entity(key, report) {
                continue;
            }
            let stable = if contender.index == driver {
                Some(self.stabilizer.update(driver, raw_activations[driver]))
            } else {
                None
            };
            let Some(record) = self.entities.get_mut(&key) else { continue };
            record.entity.set_orientation(slot.as_f32());
            let transition = match stable {
                Some(stable) => record.controller.drive(stable, confirmed, &mut record.entity),
                None => record.controller.suppress(&mut record.entity),
            };
            if let Some(transition) = transition {
                report.events.push(LifecycleEvent::Transition { key, transition });
            }
        }
    }

    /// Makes sure `key` has a live, non-collapsing entity. Returns false when the
    /// pool is exhausted and the key is left pending.
    fn ensure_entity(&mut self, key: EntityKey, report: &mut TickReport) -> bool {
        if let Some(record) = self.entities.get_mut(&key) {
            if let Some(transition) = record.controller.resume(&mut record.entity) {
                tracing::info!(%key, "subject returned, collapse cancelled");
                report.events.push(LifecycleEvent::Transition { key, transition });
            }
            return true;
        }

        let Some(token) = self.pool.acquire() else {
            if self.pending.insert(key) {
                tracing::warn!(%key, "no visual variant free, entity pending");
                report.events.push(LifecycleEvent::PoolExhausted { key });
            }
            return false;
        };
        self.pending.remove(&key);

        let mut entity = self.presentation.create(key);
        self.presentation.acquire_visual_variant(&mut entity, token);
        entity.set_rise_target(RiseLevel::Hidden);
        self.entities.insert(
            key,
            EntityRecord {
                controller: LifecycleController::new(self.config.timing.lifecycle()),
                entity,
                token,
            },
        );
        tracing::info!(%key, %token, "entity spawned");
        report.events.push(LifecycleEvent::Spawned { key, token });
        true
    }

    /// Drops per-subject memory for indices that are no longer in the frame.
    fn forget_subjects_from(&mut self, count: usize, report: &mut TickReport) {
        self.stabilizer.retain(|index| index < count);
        self.last_slot.retain(|&index, _| index < count);
        if self.config.spawn_mode != SpawnMode::PersonDriven {
            return;
        }
        self.pending.retain(|key| !matches!(key, EntityKey::Subject(i) if *i >= count));
        let departed: Vec<EntityKey> = self
            .entities
            .keys()
            .copied()
            .filter(|key| matches!(key, EntityKey::Subject(i) if *i >= count))
            .collect();
        for key in departed {
            self.collapse_entity(key, report);
        }
    }

    fn sweep_absent_slots(&mut self, refreshed: &BTreeSet<SlotId>, dt: Duration, report: &mut TickReport) {
        for slot in self.presence.tracked_slots() {
            if refreshed.contains(&slot) {
                continue;
            }
            if self.presence.tick(slot, false, self.clock, dt) != PresenceChange::Unlocked {
                continue;
            }
            if self.config.spawn_mode == SpawnMode::SlotDriven {
                let key = EntityKey::Slot(slot);
                self.pending.remove(&key);
                self.collapse_entity(key, report);
            }
            if !self.entities.contains_key(&EntityKey::Slot(slot)) {
                self.presence.forget(slot);
            }
        }
    }

    fn advance_entities(&mut self, dt: Duration, report: &mut TickReport) {
        let mut destroyed = Vec::new();
        for (key, record) in self.entities.iter_mut() {
            for transition in record.controller.advance(dt, &mut record.entity) {
                report.events.push(LifecycleEvent::Transition { key: *key, transition });
            }
            if record.controller.is_destroyed() {
                destroyed.push(*key);
            }
        }
        for key in destroyed {
            self.destroy_entity(key);
        }
    }

    fn collapse_entity(&mut self, key: EntityKey, report: &mut TickReport) {
        let Some(record) = self.entities.get_mut(&key) else { return };
        match record.controller.begin_collapse(&mut record.entity) {
            CollapseOutcome::DestroyNow => {
                tracing::debug!(%key, "entity never rose, destroying immediately");
                report.events.push(LifecycleEvent::Transition { key, transition: Transition::Destroyed });
                self.destroy_entity(key);
            }
            CollapseOutcome::Collapsing => {
                tracing::info!(%key, "entity collapsing");
                report.events.push(LifecycleEvent::Transition { key, transition: Transition::CollapseStarted });
            }
            CollapseOutcome::AlreadyCollapsing | CollapseOutcome::AlreadyDestroyed => {}
        }
    }

    fn destroy_entity(&mut self, key: EntityKey) {
        let Some(EntityRecord { entity, token, .. }) = self.entities.remove(&key) else { return };
        self.pool.release(token);
        self.presentation.release_visual_variant(token);
        self.presentation.destroy(key, entity);
        if let EntityKey::Slot(slot) = key {
            if !self.presence.is_removal_locked(slot) {
                self.presence.forget(slot);
            }
        }
        tracing::info!(%key, %token, "entity destroyed");
    }

    /// Collapses every live entity and clears all subject and slot tracking.
    fn teardown(&mut self, cause: TeardownCause, report: &mut TickReport) {
        tracing::info!(?cause, live = self.entities.len(), "tearing down the ring");
        let keys: Vec<EntityKey> = self.entities.keys().copied().collect();
        for key in keys {
            self.collapse_entity(key, report);
        }
        self.stabilizer.clear();
        self.last_slot.clear();
        self.presence.clear();
        self.pending.clear();
        self.since_last_frame = Duration::ZERO;
        self.watchdog_armed = false;
        report.teardown = Some(cause);
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn entity_state(&self, key: EntityKey) -> Option<LifecycleState> {
        self.entities.get(&key).map(|r| r.controller.state())
    }

    pub fn head_state(&self, key: EntityKey) -> Option<HeadState> {
        self.entities.get(&key).and_then(|r| r.controller.head_state())
    }

    pub fn controller(&self, key: EntityKey) -> Option<&LifecycleController> {
        self.entities.get(&key).map(|r| &r.controller)
    }

    pub fn entity(&self, key: EntityKey) -> Option<&P::Entity> {
        self.entities.get(&key).map(|r| &r.entity)
    }

    pub fn token(&self, key: EntityKey) -> Option<VariantToken> {
        self.entities.get(&key).map(|r| r.token)
    }

    pub fn live_entities(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.entities.keys().copied()
    }

    /// Mutable access for the rendering side, which eases each entity toward its targets.
    pub fn entities_mut(&mut self) -> impl Iterator<Item = (EntityKey, &mut P::Entity)> + '_ {
        self.entities.iter_mut().map(|(key, record)| (*key, &mut record.entity))
    }

    /// Entities whose renderer has not confirmed a commanded motion in time.
    pub fn stuck_entities(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.entities.iter().filter(|(_, r)| r.controller.is_stuck()).map(|(key, _)| *key)
    }

    pub fn pending_slots(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.pending.iter().copied()
    }

    pub fn subject_slot(&self, index: usize) -> Option<SlotId> {
        self.last_slot.get(&index).copied()
    }

    pub fn stable_activation(&self, index: usize) -> Option<f32> {
        self.stabilizer.current(index)
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn pool(&self) -> &VariantPool {
        &self.pool
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }
}
