//! Core primitives.
//!
//! Math and time helpers shared by the zone, timer and record layers.

pub mod time;
pub mod vec3;

// Re-export core types
pub use time::{format_time, ticks_to_seconds, track_name};
pub use vec3::Vec3;
