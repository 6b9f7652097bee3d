// THEORY:
// This file is the main entry point for the `ring_slots` library crate.
//
// The engine turns a stream of per-person observations (an orientation angle and
// an activation value per detected person) into the choreography of a small ring
// of visual entities: which slot each person stands at, when that slot's entity
// rises, and when it collapses and disappears again.
//
// The public surface is the `FrameCoordinator` together with its `RingConfig`,
// the `Frame` input, the frame queue that carries frames across from the network
// side, and the two collaborator traits (`Presentation`, `EntityHandle`) that the
// rendering side implements. The individual components in `core_modules` are
// public too, so they can be reused and tested on their own.

pub mod config;
pub mod coordinator;
pub mod core_modules;
pub mod error;
pub mod frame;
pub mod frame_queue;

pub use crate::config::{RingConfig, TimingConfig};
pub use crate::coordinator::{FrameCoordinator, LifecycleEvent, SpawnMode, TeardownCause, TickReport};
pub use crate::core_modules::angle::SlotId;
pub use crate::core_modules::entity::{EntityHandle, EntityKey, Presentation, RiseLevel};
pub use crate::core_modules::lifecycle::{HeadState, LifecycleState, Transition};
pub use crate::core_modules::variant_pool::VariantToken;
pub use crate::error::{ConfigError, FrameQueueError};
pub use crate::frame::Frame;
pub use crate::frame_queue::{frame_queue, DrainPolicy, FrameReceiver, FrameSender};
