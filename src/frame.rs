// THEORY:
// A `Frame` is one decoded observation from the sensing side: two index-aligned
// sequences, one orientation angle and one activation value per detected person.
// It is the only input the engine consumes.
//
// Identity across frames is purely positional. Subject 0 in this frame is assumed
// to be subject 0 in the previous one; if the upstream detector reorders people,
// the engine will see them swap. That is a limitation of the sensing contract and
// is kept explicit here rather than papered over with a guessed tracker.
//
// A frame whose two sequences disagree in length is malformed. It is not
// rejected: the surplus values on the longer side are ignored and the caller is
// told via `is_malformed`.

use serde::{Deserialize, Serialize};

/// One decoded frame of per-person observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Raw orientation per subject, degrees, any real value.
    pub angles: Vec<f32>,
    /// Raw activation per subject, nominally 0..=100, never clamped.
    pub activations: Vec<f32>,
}

/// One person within a single frame. Lives only for the tick it arrived in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subject {
    /// Position in this frame's arrays. Not a stable identity.
    pub index: usize,
    pub raw_angle: f32,
    pub raw_activation: f32,
}

impl Frame {
    pub fn new(angles: Vec<f32>, activations: Vec<f32>) -> Self {
        Self { angles, activations }
    }

    /// The explicit "nobody is here" signal.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of usable subjects: the shorter of the two sequences.
    pub fn subject_count(&self) -> usize {
        self.angles.len().min(self.activations.len())
    }

    pub fn is_malformed(&self) -> bool {
        self.angles.len() != self.activations.len()
    }

    pub fn subjects(&self) -> impl Iterator<Item = Subject> + '_ {
        self.angles
            .iter()
            .zip(self.activations.iter())
            .enumerate()
            .map(|(index, (&raw_angle, &raw_activation))| Subject {
                index,
                raw_angle,
                raw_activation,
            })
    }
}
