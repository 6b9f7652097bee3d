// THEORY:
// The `PresenceTracker` answers two questions about each slot:
// 1.  **Has someone really been here?** Occupancy is accumulated while the slot
//     keeps being seen. Only once it reaches `confirm` is the slot "confirmed",
//     which is what gates an entity's rise. Someone walking past a slot's window
//     never accumulates enough to trigger the full choreography.
// 2.  **Has everyone really left?** A slot missing from a handful of frames is not
//     empty; detectors drop people all the time. The slot stays `removal_locked`
//     until it has gone unseen for longer than `timeout`. Unlocking is the signal
//     that authorizes teardown; the coordinator decides what to do with it.
//
// The tracker works on a monotonic clock supplied by the caller. It never reads
// the wall clock itself, which keeps it deterministic under test.

use crate::core_modules::angle::SlotId;
use std::collections::BTreeMap;
use std::time::Duration;

/// Presence bookkeeping for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPresence {
    /// Clock value of the last tick the slot was occupied.
    pub last_seen: Duration,
    /// Occupancy accumulated since the slot was last released.
    pub continuous: Duration,
    /// True while the slot is held; false once absence exceeded the timeout.
    pub removal_locked: bool,
}

/// What a call to `tick` did to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceChange {
    Refreshed,
    Waiting,
    /// Absence exceeded the timeout on this call; teardown is now allowed.
    Unlocked,
    /// Already unlocked, or never seen.
    Idle,
}

#[derive(Debug)]
pub struct PresenceTracker {
    confirm: Duration,
    timeout: Duration,
    slots: BTreeMap<SlotId, SlotPresence>,
}

impl PresenceTracker {
    pub fn new(confirm: Duration, timeout: Duration) -> Self {
        Self { confirm, timeout, slots: BTreeMap::new() }
    }

    pub fn tick(&mut self, slot: SlotId, occupied: bool, now: Duration, dt: Duration) -> PresenceChange {
        if occupied {
            let presence = self.slots.entry(slot).or_insert(SlotPresence {
                last_seen: now,
                continuous: Duration::ZERO,
                removal_locked: true,
            });
            presence.last_seen = now;
            presence.continuous += dt;
            presence.removal_locked = true;
            return PresenceChange::Refreshed;
        }

        let Some(presence) = self.slots.get_mut(&slot) else {
            return PresenceChange::Idle;
        };
        if !presence.removal_locked {
            return PresenceChange::Idle;
        }
        if now.saturating_sub(presence.last_seen) > self.timeout {
            presence.continuous = Duration::ZERO;
            presence.removal_locked = false;
            tracing::debug!(%slot, "slot presence released");
            PresenceChange::Unlocked
        } else {
            PresenceChange::Waiting
        }
    }

    pub fn is_confirmed(&self, slot: SlotId) -> bool {
        self.slots.get(&slot).is_some_and(|p| p.continuous >= self.confirm)
    }

    pub fn is_removal_locked(&self, slot: SlotId) -> bool {
        self.slots.get(&slot).is_some_and(|p| p.removal_locked)
    }

    /// Every slot that has been seen and not yet forgotten.
    pub fn tracked_slots(&self) -> Vec<SlotId> {
        self.slots.keys().copied().collect()
    }

    pub fn forget(&mut self, slot: SlotId) {
        self.slots.remove(&slot);
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
