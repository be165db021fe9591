//! # Surf Timer
//!
//! Movement timing engine for surf/bhop maps: zone sequencing, dual run/stage
//! timers, per-tick movement statistics, prespeed and prejump limits, and
//! best-time classification against an asynchronous results store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       SURF TIMER                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── vec3.rs     - 3D vector                                 │
//! │  └── time.rs     - Tick/second conversion and formatting     │
//! │                                                              │
//! │  zone/           - Trigger volumes                           │
//! │  ├── matcher.rs  - Trigger name classification               │
//! │  ├── registry.rs - Per-map zone set and track queries        │
//! │  └── file.rs     - Hand-authored zone file (JSON)            │
//! │                                                              │
//! │  timer/          - Per-tick, per-player (synchronous)        │
//! │  ├── input.rs    - Tick snapshot and pre-move input          │
//! │  ├── run.rs      - Timer run state and checkpoints           │
//! │  ├── sampler.rs  - Movement statistics sampler               │
//! │  ├── gate.rs     - Prespeed clamp and prejump cap            │
//! │  ├── machine.rs  - Zone transition state machine             │
//! │  └── events.rs   - Timer lifecycle events                    │
//! │                                                              │
//! │  record/         - Best times                                │
//! │  ├── model.rs    - Run records and classification            │
//! │  ├── cache.rs    - Sorted best-time buckets                  │
//! │  └── evaluator.rs- Finish → submit → reconcile               │
//! │                                                              │
//! │  store/          - Results store (asynchronous boundary)     │
//! │  ├── mod.rs      - Store trait and ordering contract         │
//! │  └── memory.rs   - In-memory reference backend               │
//! │                                                              │
//! │  slots.rs        - Fixed-capacity player slot table          │
//! │  style.rs        - Style table (JSON)                        │
//! │  config.rs       - Engine configuration (JSON)               │
//! │  host.rs         - Ground trace and trigger volumes          │
//! │  engine.rs       - Host-facing façade, owns everything       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threading
//!
//! Everything under `timer/`, `zone/` and `record/` runs on the host's
//! simulation thread without locks. Store calls run as tokio tasks and their
//! results are applied by [`engine::TimingEngine::frame`] on the next tick,
//! after re-checking that the player they belong to is still connected.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod engine;
pub mod host;
pub mod record;
pub mod slots;
pub mod store;
pub mod style;
pub mod timer;
pub mod zone;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig};
pub use crate::core::vec3::Vec3;
pub use engine::{EngineError, MapTrigger, TimingEngine};
pub use host::{HostWorld, ScriptedWorld};
pub use record::{RecordClass, RunRecord};
pub use slots::{PlayerId, PlayerSlot};
pub use store::{MemoryStore, ResultsStore, StoreError};
pub use timer::{MoveInput, TickSnapshot, TimerEvent, TimerRun, TimerStatus};
pub use zone::{Zone, ZoneKind, ZoneRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 64;

/// Seconds per simulation tick
pub const TICK_INTERVAL: f32 = 1.0 / TICK_RATE as f32;

/// Maximum number of styles
pub const MAX_STYLE: usize = 16;

/// Maximum number of tracks (main + bonuses)
pub const MAX_TRACK: usize = 32;

/// Maximum number of stages per track
pub const MAX_STAGE: usize = 64;

/// Maximum concurrent players
pub const MAX_PLAYER_SLOTS: usize = 64;
