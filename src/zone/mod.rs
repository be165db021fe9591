//! Zones
//!
//! Classified trigger volumes that drive the timers.
//!
//! ## Module Structure
//!
//! - `matcher`: trigger name → zone classification (pure)
//! - `registry`: per-map zone set and track queries
//! - `file`: per-map zone definition file

pub mod file;
pub mod matcher;
pub mod registry;

use serde::{Serialize, Deserialize};

use crate::core::vec3::Vec3;

pub use file::{ZoneDefinition, ZoneFileError};
pub use matcher::{classify, ZoneMatch};
pub use registry::{ZoneError, ZoneIssue, ZoneRegistry};

/// Name prefix of the trigger volumes the timer spawns itself.
pub const ENGINE_ZONE_PREFIX: &str = "surftimer_";

/// Opaque handle of a trigger volume in the host engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VolumeHandle(pub u32);

/// Zone type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    /// Run start line
    Start,
    /// Run finish line
    End,
    /// Start line of stage N (also the end line of stage N-1)
    Stage,
    /// Intermediate statistics marker
    Checkpoint,
    /// Stops any running timer
    StopTimer,
}

impl ZoneKind {
    /// Whether zones of this kind carry a sequence index.
    pub fn is_sequenced(self) -> bool {
        matches!(self, ZoneKind::Stage | ZoneKind::Checkpoint)
    }
}

/// Axis-aligned box given by two opposite corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// First corner
    pub corner1: Vec3,
    /// Opposite corner
    pub corner2: Vec3,
}

impl BoundingBox {
    /// Create from two opposite corners, in any order.
    pub const fn new(corner1: Vec3, corner2: Vec3) -> Self {
        Self { corner1, corner2 }
    }

    /// Minimum corner.
    pub fn mins(&self) -> Vec3 {
        self.corner1.min(self.corner2)
    }

    /// Maximum corner.
    pub fn maxs(&self) -> Vec3 {
        self.corner1.max(self.corner2)
    }

    /// Centre of the box.
    pub fn center(&self) -> Vec3 {
        self.corner1.midpoint(self.corner2)
    }

    /// Inclusive point containment.
    pub fn contains(&self, point: Vec3) -> bool {
        let mins = self.mins();
        let maxs = self.maxs();
        mins.x <= point.x
            && point.x <= maxs.x
            && mins.y <= point.y
            && point.y <= maxs.y
            && mins.z <= point.z
            && point.z <= maxs.z
    }
}

/// Teleport destination.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// World position
    pub origin: Vec3,
    /// View angles (pitch, yaw, roll), when known
    pub angles: Option<Vec3>,
}

impl Pose {
    /// Pose at a position with no preferred view angles.
    pub const fn at(origin: Vec3) -> Self {
        Self { origin, angles: None }
    }
}

/// A classified zone. Immutable once registered, apart from its teleport
/// pose which may be discovered after the map has spawned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone type
    pub kind: ZoneKind,
    /// Track (0 = main)
    pub track: u32,
    /// Stage or checkpoint number, 0 when not applicable
    pub index: u32,
    /// Volume
    pub bounds: BoundingBox,
    /// Preferred teleport destination
    pub teleport: Option<Pose>,
    /// Classified from a map trigger name (never saved to the zone file)
    pub prebuilt: bool,
    /// Source trigger name for prebuilt zones
    pub name: Option<String>,
}

impl Zone {
    /// Create a hand-authored zone.
    pub fn authored(kind: ZoneKind, track: u32, index: u32, bounds: BoundingBox) -> Self {
        Self {
            kind,
            track,
            index,
            bounds,
            teleport: None,
            prebuilt: false,
            name: None,
        }
    }

    /// Where players are sent when teleporting to this zone.
    pub fn teleport_pose(&self) -> Pose {
        self.teleport.unwrap_or_else(|| Pose::at(self.bounds.center()))
    }

    /// Name the timer gives its own trigger volume for this zone.
    pub fn engine_trigger_name(&self) -> String {
        format!("{}{}_{:?}_{}", ENGINE_ZONE_PREFIX, self.track, self.kind, self.index).to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_any_corner_order() {
        let a = BoundingBox::new(Vec3::new(10.0, -10.0, 0.0), Vec3::new(-10.0, 10.0, 100.0));
        assert_eq!(a.mins(), Vec3::new(-10.0, -10.0, 0.0));
        assert_eq!(a.maxs(), Vec3::new(10.0, 10.0, 100.0));
        assert_eq!(a.center(), Vec3::new(0.0, 0.0, 50.0));
        assert!(a.contains(Vec3::new(10.0, 10.0, 100.0)));
        assert!(!a.contains(Vec3::new(0.0, 0.0, 100.5)));
    }

    #[test]
    fn test_teleport_pose_falls_back_to_center() {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::new(64.0, 64.0, 64.0));
        let mut zone = Zone::authored(ZoneKind::Start, 0, 0, bounds);
        assert_eq!(zone.teleport_pose(), Pose::at(Vec3::new(32.0, 32.0, 32.0)));

        let pose = Pose { origin: Vec3::new(1.0, 2.0, 3.0), angles: Some(Vec3::new(0.0, 90.0, 0.0)) };
        zone.teleport = Some(pose);
        assert_eq!(zone.teleport_pose(), pose);
    }

    #[test]
    fn test_engine_trigger_name() {
        let zone = Zone::authored(ZoneKind::Checkpoint, 2, 5, BoundingBox::new(Vec3::ZERO, Vec3::ZERO));
        assert_eq!(zone.engine_trigger_name(), "surftimer_2_checkpoint_5");
    }
}
