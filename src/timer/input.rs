//! Tick Input
//!
//! What the host reports about a player each simulation tick. Two views
//! exist: [`MoveInput`] before movement is processed (the prejump cap may
//! rewrite it) and [`TickSnapshot`] after the command has run (sampled).

use serde::{Serialize, Deserialize};

use crate::core::vec3::Vec3;

// =============================================================================
// BUTTONS
// =============================================================================

/// Pressed input buttons (bitmask).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buttons(pub u64);

impl Buttons {
    /// Jump held
    pub const JUMP: Self = Self(1 << 1);
    /// Forward held
    pub const FORWARD: Self = Self(1 << 3);
    /// Back held
    pub const BACK: Self = Self(1 << 4);
    /// Use held
    pub const USE: Self = Self(1 << 5);
    /// Strafe left held
    pub const MOVE_LEFT: Self = Self(1 << 9);
    /// Strafe right held
    pub const MOVE_RIGHT: Self = Self(1 << 10);

    /// No buttons.
    pub const NONE: Self = Self(0);

    /// Whether every bit of `other` is held.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two masks.
    #[inline]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// `self` with every bit of `other` released.
    #[inline]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

/// Host movement mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveType {
    /// Regular movement
    #[default]
    Walk,
    /// Attached to a ladder
    Ladder,
    /// Free flight through geometry
    NoClip,
}

// =============================================================================
// INPUT TYPES
// =============================================================================

/// Pre-move input. The prejump cap may zero `velocity`, `forward_move` and
/// `side_move` before the host applies them; style key blocks may also
/// release `buttons`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoveInput {
    /// Velocity about to be simulated
    pub velocity: Vec3,
    /// Forward movement input
    pub forward_move: f32,
    /// Lateral movement input
    pub side_move: f32,
    /// Held buttons
    pub buttons: Buttons,
    /// Whether the player stands on ground this tick
    pub on_ground: bool,
    /// Movement mode
    pub move_type: MoveType,
}

/// Post-command state of a player for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    /// World position
    pub position: Vec3,
    /// Velocity
    pub velocity: Vec3,
    /// Eye angles (pitch, yaw, roll) in degrees
    pub angles: Vec3,
    /// Held buttons
    pub buttons: Buttons,
    /// Lateral movement input
    pub side_move: f32,
    /// Forward movement input
    pub forward_move: f32,
    /// Standing on ground
    pub on_ground: bool,
    /// Crouched (smaller hull for the ground trace)
    pub ducked: bool,
    /// Movement mode
    pub move_type: MoveType,
}

impl TickSnapshot {
    /// Yaw in degrees.
    #[inline]
    pub fn yaw(&self) -> f32 {
        self.angles.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buttons() {
        let held = Buttons::MOVE_LEFT.with(Buttons::JUMP);
        assert!(held.contains(Buttons::MOVE_LEFT));
        assert_eq!(held.without(Buttons::MOVE_LEFT), Buttons::JUMP);
        assert_eq!(held.without(Buttons::MOVE_RIGHT), held);
        assert!(held.contains(Buttons::JUMP));
        assert!(!held.contains(Buttons::MOVE_RIGHT));
        assert!(!held.contains(Buttons::MOVE_LEFT.with(Buttons::MOVE_RIGHT)));
        assert!(Buttons::NONE.contains(Buttons::NONE));
    }
}
