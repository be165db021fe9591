//! Timers
//!
//! Per-player run timing. Everything here is synchronous and runs on the
//! simulation thread.
//!
//! ## Module Structure
//!
//! - `input`: what the host reports each tick
//! - `run`: timer state and checkpoint segments
//! - `sampler`: per-tick movement statistics
//! - `gate`: prespeed clamp and prejump cap
//! - `machine`: zone-driven state machine over a main/stage pair
//! - `events`: lifecycle notifications

pub mod events;
pub mod gate;
pub mod input;
pub mod machine;
pub mod run;
pub mod sampler;

pub use events::{TimerEvent, ViolationKind};
pub use gate::{clamp_prespeed, GateOutcome, PrejumpRule, PrespeedLimits};
pub use input::{Buttons, MoveInput, MoveType, TickSnapshot};
pub use machine::{Runner, TimerPair, TransitionResult};
pub use run::{CheckpointSnapshot, TimerKind, TimerRun, TimerStatus};
pub use sampler::{is_surfing, yaw_delta, SampleContext};
