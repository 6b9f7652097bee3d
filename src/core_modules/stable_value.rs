// THEORY:
// The activation signal coming off the sensor is noisy: a person holding a pose
// steady still flickers between neighbouring values for a frame or two. The
// `StableValueTracker` debounces it per subject, only accepting a new value once
// it has been observed for `threshold` consecutive frames.
//
// Key architectural principles:
// 1.  **Neutral Start**: A subject seen for the first time starts at 0, whatever it
//     first reported. The first report does count as the first observation of its
//     value, so a subject holding 50 from its very first frame becomes 50 on frame
//     `threshold`.
// 2.  **Consecutive, Not Cumulative**: Any different value breaks the run. A signal
//     toggling 0, 50, 0, 50 never gets anywhere.
// 3.  **Only Stable Values Escape**: `update` always returns the accepted value,
//     never the raw or the pending one.
// 4.  **Forgetting Is Explicit**: `reset` drops a subject's state so its next
//     observation is treated as first-seen (used when a subject changes slot).

use std::collections::HashMap;
use std::hash::Hash;

/// Equality for activation values, tolerant of float noise.
fn approximately(a: f32, b: f32) -> bool {
    (b - a).abs() < (1e-6 * a.abs().max(b.abs())).max(f32::EPSILON * 8.0)
}

/// Debounce state for one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct StableValue {
    /// The last accepted value.
    pub current: f32,
    /// The value trying to replace `current`.
    pub pending: f32,
    /// How many consecutive times `pending` has been observed.
    pub pending_count: u32,
}

#[derive(Debug)]
pub struct StableValueTracker<K = usize> {
    threshold: u32,
    states: HashMap<K, StableValue>,
}

impl<K: Eq + Hash + Copy> StableValueTracker<K> {
    pub fn new(threshold: u32) -> Self {
        Self { threshold: threshold.max(1), states: HashMap::new() }
    }

    /// Feeds one raw observation and returns the stable value.
    pub fn update(&mut self, key: K, raw: f32) -> f32 {
        let Some(state) = self.states.get_mut(&key) else {
            self.states.insert(key, StableValue { current: 0.0, pending: raw, pending_count: 1 });
            return 0.0;
        };

        if approximately(raw, state.current) {
            state.pending = raw;
            state.pending_count = 0;
            return state.current;
        }

        if approximately(raw, state.pending) {
            state.pending_count += 1;
        } else {
            state.pending = raw;
            state.pending_count = 1;
        }

        if state.pending_count >= self.threshold {
            tracing::debug!(
                from = state.current,
                to = state.pending,
                "activation value stabilized"
            );
            state.current = state.pending;
            state.pending_count = 0;
        }
        state.current
    }

    /// The accepted value for `key`, if it has been observed.
    pub fn current(&self, key: K) -> Option<f32> {
        self.states.get(&key).map(|s| s.current)
    }

    pub fn reset(&mut self, key: K) {
        self.states.remove(&key);
    }

    pub fn retain(&mut self, mut keep: impl FnMut(K) -> bool) {
        self.states.retain(|&k, _| keep(k));
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_zero() {
        let mut tracker: StableValueTracker = StableValueTracker::new(30);
        assert_eq!(tracker.update(0, 100.0), 0.0);
        assert_eq!(tracker.current(0), Some(0.0));
    }

    #[test]
    fn steady_value_lands_on_the_threshold_frame() {
        let mut tracker: StableValueTracker = StableValueTracker::new(30);
        for frame in 1..30 {
            assert_eq!(tracker.update(0, 50.0), 0.0, "frame {frame} switched early");
        }
        assert_eq!(tracker.update(0, 50.0), 50.0);
    }

    #[test]
    fn threshold_minus_one_repeats_leave_value_unchanged() {
        let mut tracker: StableValueTracker = StableValueTracker::new(5);
        tracker.update(3, 0.0);
        for _ in 0..4 {
            assert_eq!(tracker.update(3, 100.0), 0.0);
        }
        assert_eq!(tracker.update(3, 100.0), 100.0);
    }

    #[test]
    fn toggling_signal_never_settles() {
        let mut tracker: StableValueTracker = StableValueTracker::new(30);
        for i in 0..300 {
            let raw = if i % 2 == 0 { 0.0 } else { 50.0 };
            assert_eq!(tracker.update(1, raw), 0.0);
        }
    }

    #[test]
    fn interruption_restarts_the_run() {
        let mut tracker: StableValueTracker = StableValueTracker::new(3);
        tracker.update(0, 0.0);
        tracker.update(0, 50.0);
        tracker.update(0, 50.0);
        tracker.update(0, 100.0);
        assert_eq!(tracker.states.get(&0).map(|s| s.pending_count), Some(1));
        assert_eq!(tracker.update(0, 50.0), 0.0);
        assert_eq!(tracker.update(0, 50.0), 0.0);
        assert_eq!(tracker.update(0, 50.0), 50.0);
    }

    #[test]
    fn matching_current_clears_pending() {
        let mut tracker: StableValueTracker = StableValueTracker::new(3);
        tracker.update(0, 0.0);
        tracker.update(0, 50.0);
        tracker.update(0, 0.0);
        let state = tracker.states.get(&0).expect("tracked");
        assert_eq!(state.pending_count, 0);
        assert_eq!(state.current, 0.0);
    }

    #[test]
    fn reset_makes_the_next_observation_first_seen() {
        let mut tracker: StableValueTracker = StableValueTracker::new(2);
        tracker.update(0, 100.0);
        assert_eq!(tracker.update(0, 100.0), 100.0);
        tracker.reset(0);
        assert_eq!(tracker.update(0, 100.0), 0.0);
    }

    #[test]
    fn keys_are_independent() {
        let mut tracker: StableValueTracker = StableValueTracker::new(2);
        tracker.update(0, 100.0);
        tracker.update(1, 50.0);
        assert_eq!(tracker.update(0, 100.0), 100.0);
        assert_eq!(tracker.current(1), Some(0.0));
        tracker.retain(|k| k == 0);
        assert_eq!(tracker.current(1), None);
        assert_eq!(tracker.current(0), Some(100.0));
    }
}
