// THEORY:
// The `EntityLifecycleController` is the choreography of one visual entity:
//
//     Idle ──► Rising ──► Held ──► Collapsing ──► Destroyed
//       │         │                    │
//       │         └──────► Collapsing  └──► Idle   (resume: the subject came back)
//       └──► Destroyed                              (fast path: never rose)
//
// Key architectural principles:
// 1.  **Explicit Phases, Polled Each Tick**: Every waiting step is a state value
//     carrying its own accumulated duration. `advance` is called once per tick
//     with the tick's elapsed time; nothing sleeps and nothing is scheduled. The
//     whole controller can be inspected (and tested) between any two ticks.
// 2.  **The Renderer Decides When a Motion Is Done**: After commanding the full
//     reveal the controller waits for `has_reached_full`; after commanding hidden
//     it waits for `has_reached_hidden`. It never assumes instant completion.
// 3.  **A Rise Is Never Interrupted Mid-Flight**: A collapse requested while the
//     forced rise sequence is still running is queued (`AwaitingRise`) until the
//     rise completes, and only then is the hidden target issued.
// 4.  **The Pending Destroy Lives in the State**: The destroy countdown is the
//     `DestroyCountdown` state itself. Resuming replaces that state, which is all
//     it takes to cancel the destroy; there is no timer left behind to fire.
// 5.  **Idempotent Commands**: Triggering a rise twice, or collapsing something
//     already collapsing, is a silent no-op.
// 6.  **Stalls Are Reported, Not Fatal**: If the renderer never confirms a motion,
//     the controller keeps waiting but raises one `Stuck` transition (and a
//     warning) once the wait exceeds `stuck_after`.

use crate::core_modules::entity::{EntityHandle, RiseLevel};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleTiming {
    pub rise_hold: Duration,
    pub destroy_delay: Duration,
    pub stuck_after: Duration,
}

/// Progress through the forced rise sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RisePhase {
    /// Intermediate reveal commanded; holding there.
    Intermediate { held: Duration },
    /// Full reveal commanded; waiting for the renderer to get there.
    AwaitingFull { waited: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapsePhase {
    /// Collapse requested while the rise was still in flight.
    AwaitingRise(RisePhase),
    /// Hidden target issued; waiting for the renderer to get there.
    Retracting { waited: Duration },
    /// Hidden reached; counting down to destruction.
    DestroyCountdown { elapsed: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Rising(RisePhase),
    Held,
    Collapsing(CollapsePhase),
    Destroyed,
}

/// Coarse head position, the view the rest of the installation cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadState {
    Idle,
    Risen,
    FullyRisen,
    Collapsing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitingFor {
    FullRise,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    RiseStarted,
    FullyRisen,
    CollapseStarted,
    RetractIssued,
    HiddenReached,
    Destroyed,
    Resumed,
    Suppressed,
    Stuck(WaitingFor),
}

/// Result of asking an entity to collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseOutcome {
    /// The entity never rose; it is already `Destroyed` and can be removed now.
    DestroyNow,
    /// The entity is now collapsing.
    Collapsing,
    AlreadyCollapsing,
    AlreadyDestroyed,
}

enum RiseStep {
    Continue(RisePhase),
    Complete,
}

#[derive(Debug, Clone)]
pub struct LifecycleController {
    state: LifecycleState,
    timing: LifecycleTiming,
    /// Latches when a rise starts; blocks re-triggering until a resume.
    popped_triggered: bool,
    /// Set when an entity that rose was told to collapse.
    has_popped_and_collapsed: bool,
    /// One `Stuck` report per waiting phase.
    stuck_reported: bool,
}

impl LifecycleController {
    pub fn new(timing: LifecycleTiming) -> Self {
        Self {
            state: LifecycleState::Idle,
            timing,
            popped_triggered: false,
            has_popped_and_collapsed: false,
            stuck_reported: false,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn head_state(&self) -> Option<HeadState> {
        match self.state {
            LifecycleState::Idle => Some(HeadState::Idle),
            LifecycleState::Rising(_) => Some(HeadState::Risen),
            LifecycleState::Held => Some(HeadState::FullyRisen),
            LifecycleState::Collapsing(_) => Some(HeadState::Collapsing),
            LifecycleState::Destroyed => None,
        }
    }

    pub fn popped_triggered(&self) -> bool {
        self.popped_triggered
    }

    pub fn has_popped_and_collapsed(&self) -> bool {
        self.has_popped_and_collapsed
    }

    pub fn is_collapsing(&self) -> bool {
        matches!(self.state, LifecycleState::Collapsing(_))
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == LifecycleState::Destroyed
    }

    /// True while the controller is waiting on a renderer that has exceeded `stuck_after`.
    pub fn is_stuck(&self) -> bool {
        self.stuck_reported
    }

    /// Idle → Rising, once, when the slot is confirmed and the stable activation is positive.
    pub fn drive<E: EntityHandle>(
        &mut self,
        stable_activation: f32,
        presence_confirmed: bool,
        entity: &mut E,
    ) -> Option<Transition> {
        if self.state != LifecycleState::Idle || self.popped_triggered {
            return None;
        }
        if !presence_confirmed || stable_activation <= 0.0 {
            return None;
        }
        self.popped_triggered = true;
        entity.set_rise_target(RiseLevel::Intermediate);
        self.state = LifecycleState::Rising(RisePhase::Intermediate { held: Duration::ZERO });
        Some(Transition::RiseStarted)
    }

    pub fn begin_collapse<E: EntityHandle>(&mut self, entity: &mut E) -> CollapseOutcome {
        match self.state {
            LifecycleState::Idle => {
                self.state = LifecycleState::Destroyed;
                CollapseOutcome::DestroyNow
            }
            LifecycleState::Rising(phase) => {
                self.has_popped_and_collapsed = true;
                self.state = LifecycleState::Collapsing(CollapsePhase::AwaitingRise(phase));
                CollapseOutcome::Collapsing
            }
            LifecycleState::Held => {
                self.has_popped_and_collapsed = true;
                self.start_retract(entity);
                CollapseOutcome::Collapsing
            }
            LifecycleState::Collapsing(_) => CollapseOutcome::AlreadyCollapsing,
            LifecycleState::Destroyed => CollapseOutcome::AlreadyDestroyed,
        }
    }

    /// Collapsing → Idle. Cancels any pending destroy and re-arms the rise.
    pub fn resume<E: EntityHandle>(&mut self, entity: &mut E) -> Option<Transition> {
        if !self.is_collapsing() {
            return None;
        }
        entity.set_rise_target(RiseLevel::Hidden);
        self.reset_to_idle();
        Some(Transition::Resumed)
    }

    /// Forces a risen entity straight back to hidden and re-arms it. Used when the
    /// entity's subject loses its slot to a closer contender.
    pub fn suppress<E: EntityHandle>(&mut self, entity: &mut E) -> Option<Transition> {
        match self.state {
            LifecycleState::Rising(_) | LifecycleState::Held => {
                entity.set_rise_target(RiseLevel::Hidden);
                self.reset_to_idle();
                Some(Transition::Suppressed)
            }
            _ => None,
        }
    }

    /// Advances timers and polls the renderer's predicates. Call once per tick.
    pub fn advance<E: EntityHandle>(&mut self, dt: Duration, entity: &mut E) -> Vec<Transition> {
        let mut transitions = Vec::new();
        match self.state {
            LifecycleState::Idle | LifecycleState::Held | LifecycleState::Destroyed => {}
            LifecycleState::Rising(phase) => match self.step_rise(phase, dt, entity, &mut transitions) {
                RiseStep::Continue(next) => self.state = LifecycleState::Rising(next),
                RiseStep::Complete => {
                    self.state = LifecycleState::Held;
                    transitions.push(Transition::FullyRisen);
                }
            },
            LifecycleState::Collapsing(CollapsePhase::AwaitingRise(phase)) => {
                match self.step_rise(phase, dt, entity, &mut transitions) {
                    RiseStep::Continue(next) => {
                        self.state = LifecycleState::Collapsing(CollapsePhase::AwaitingRise(next));
                    }
                    RiseStep::Complete => {
                        self.start_retract(entity);
                        transitions.push(Transition::RetractIssued);
                    }
                }
            }
            LifecycleState::Collapsing(CollapsePhase::Retracting { waited }) => {
                if entity.has_reached_hidden() {
                    self.stuck_reported = false;
                    transitions.push(Transition::HiddenReached);
                    self.state = LifecycleState::Collapsing(CollapsePhase::DestroyCountdown {
                        elapsed: Duration::ZERO,
                    });
                    if self.timing.destroy_delay.is_zero() {
                        self.state = LifecycleState::Destroyed;
                        transitions.push(Transition::Destroyed);
                    }
                } else {
                    let waited = waited + dt;
                    self.report_if_stuck(waited, WaitingFor::Hidden, &mut transitions);
                    self.state = LifecycleState::Collapsing(CollapsePhase::Retracting { waited });
                }
            }
            LifecycleState::Collapsing(CollapsePhase::DestroyCountdown { elapsed }) => {
                let elapsed = elapsed + dt;
                if elapsed >= self.timing.destroy_delay {
                    self.state = LifecycleState::Destroyed;
                    transitions.push(Transition::Destroyed);
                } else {
                    self.state = LifecycleState::Collapsing(CollapsePhase::DestroyCountdown { elapsed });
                }
            }
        }
        transitions
    }

    fn step_rise<E: EntityHandle>(
        &mut self,
        phase: RisePhase,
        dt: Duration,
        entity: &mut E,
        transitions: &mut Vec<Transition>,
    ) -> RiseStep {
        match phase {
            RisePhase::Intermediate { held } => {
                let held = held + dt;
                if held >= self.timing.rise_hold {
                    entity.set_rise_target(RiseLevel::Full);
                    RiseStep::Continue(RisePhase::AwaitingFull { waited: Duration::ZERO })
                } else {
                    RiseStep::Continue(RisePhase::Intermediate { held })
                }
            }
            RisePhase::AwaitingFull { waited } => {
                if entity.has_reached_full() {
                    self.stuck_reported = false;
                    RiseStep::Complete
                } else {
                    let waited = waited + dt;
                    self.report_if_stuck(waited, WaitingFor::FullRise, transitions);
                    RiseStep::Continue(RisePhase::AwaitingFull { waited })
                }
            }
        }
    }

    fn start_retract<E: EntityHandle>(&mut self, entity: &mut E) {
        entity.set_rise_target(RiseLevel::Hidden);
        self.stuck_reported = false;
        self.state = LifecycleState::Collapsing(CollapsePhase::Retracting { waited: Duration::ZERO });
    }

    fn report_if_stuck(&mut self, waited: Duration, waiting_for: WaitingFor, transitions: &mut Vec<Transition>) {
        if waited >= self.timing.stuck_after && !self.stuck_reported {
            self.stuck_reported = true;
            tracing::warn!(
                ?waiting_for,
                waited_secs = waited.as_secs_f32(),
                "renderer has not confirmed the commanded motion"
            );
            transitions.push(Transition::Stuck(waiting_for));
        }
    }

    fn reset_to_idle(&mut self) {
        self.state = LifecycleState::Idle;
        self.popped_triggered = false;
        self.has_popped_and_collapsed = false;
        self.stuck_reported = false;
    }
}
