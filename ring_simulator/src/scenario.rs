// THEORY:
// A scenario is a scripted stand-in for the sensing side: a ring configuration
// plus a list of timed steps, each describing who stands where and how engaged
// they are. The producer task turns each step into a run of identical frames at
// `frame_hz`. A `silent` step sends nothing at all, which is how the interruption
// watchdog is exercised; a step with no subjects sends explicit empty frames.

use anyhow::Context;
use ring_slots::{Frame, RingConfig};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScriptedSubject {
    pub angle: f32,
    pub activation: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub label: Option<String>,
    pub seconds: f64,
    #[serde(default)]
    pub subjects: Vec<ScriptedSubject>,
    #[serde(default)]
    pub silent: bool,
}

impl Step {
    pub fn frame(&self) -> Frame {
        Frame::new(
            self.subjects.iter().map(|s| s.angle).collect(),
            self.subjects.iter().map(|s| s.activation).collect(),
        )
    }

    pub fn frame_count(&self, frame_hz: f64) -> u64 {
        (self.seconds * frame_hz).round().max(0.0) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub config: RingConfig,
    pub frame_hz: f64,
    pub tick_hz: f64,
    /// Reveal levels per second the simulated renderer eases at (hidden 0, full 1).
    pub ease_per_second: f32,
    /// Write a snapshot every this many ticks; 0 disables snapshots.
    pub snapshot_every: u64,
    /// Display names of the visual variants, indexed by token.
    pub variants: Vec<String>,
    pub steps: Vec<Step>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            config: RingConfig::default(),
            frame_hz: 30.0,
            tick_hz: 60.0,
            ease_per_second: 1.5,
            snapshot_every: 15,
            variants: Vec::new(),
            steps: Vec::new(),
        }
    }
}

impl Scenario {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let scenario: Scenario = serde_json::from_str(json).context("scenario is not valid JSON")?;
        scenario.config.validate()?;
        anyhow::ensure!(scenario.frame_hz > 0.0, "frame_hz must be positive");
        anyhow::ensure!(scenario.tick_hz > 0.0, "tick_hz must be positive");
        anyhow::ensure!(scenario.ease_per_second > 0.0, "ease_per_second must be positive");
        Ok(scenario)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// One name per pool token, falling back to a generated one.
    pub fn variant_names(&self) -> Vec<String> {
        (0..self.config.variant_pool_size)
            .map(|i| self.variants.get(i).cloned().unwrap_or_else(|| format!("variant-{i}")))
            .collect()
    }
}
