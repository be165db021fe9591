//! Host World
//!
//! What the engine needs from the game engine it is embedded in: a ground
//! trace for surf detection and trigger volumes for hand-authored zones.
//! [`ScriptedWorld`] is a small geometric stand-in used by the demo binary
//! and the tests.

use crate::core::vec3::Vec3;
use crate::zone::{BoundingBox, VolumeHandle};

/// Player hull half-width.
pub const HULL_HALF_WIDTH: f32 = 16.0;

/// Standing hull height.
pub const HULL_HEIGHT: f32 = 72.0;

/// Crouched hull height.
pub const HULL_HEIGHT_DUCKED: f32 = 54.0;

/// Player hull bounds relative to the origin (feet).
pub fn hull(ducked: bool) -> BoundingBox {
    let height = if ducked { HULL_HEIGHT_DUCKED } else { HULL_HEIGHT };
    BoundingBox::new(
        Vec3::new(-HULL_HALF_WIDTH, -HULL_HALF_WIDTH, 0.0),
        Vec3::new(HULL_HALF_WIDTH, HULL_HALF_WIDTH, height),
    )
}

/// Host engine services.
pub trait HostWorld: Send {
    /// Sweep the player hull from `origin` down by `distance`. Returns the
    /// plane normal of the first surface hit.
    fn trace_ground(&self, origin: Vec3, ducked: bool, distance: f32) -> Option<Vec3>;

    /// Create a trigger volume named `name`. Returns its handle, or `None`
    /// when the host could not create it.
    fn spawn_trigger(&mut self, name: &str, bounds: &BoundingBox) -> Option<VolumeHandle>;

    /// Delete a trigger volume created by [`HostWorld::spawn_trigger`].
    fn remove_trigger(&mut self, handle: VolumeHandle);
}

/// Flat floor plus sloped boxes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedWorld {
    floor_z: f32,
    ramps: Vec<(BoundingBox, Vec3)>,
    triggers: Vec<(VolumeHandle, String)>,
    next_handle: u32,
}

impl ScriptedWorld {
    /// World with a floor at `floor_z`. Trigger handles start at
    /// `first_handle` so they never collide with map triggers.
    pub fn new(floor_z: f32, first_handle: u32) -> Self {
        Self {
            floor_z,
            ramps: Vec::new(),
            triggers: Vec::new(),
            next_handle: first_handle,
        }
    }

    /// Add a sloped surface occupying `bounds` with surface `normal`.
    pub fn add_ramp(&mut self, bounds: BoundingBox, normal: Vec3) {
        self.ramps.push((bounds, normal));
    }

    /// Live trigger volumes.
    pub fn triggers(&self) -> &[(VolumeHandle, String)] {
        &self.triggers
    }
}

impl HostWorld for ScriptedWorld {
    fn trace_ground(&self, origin: Vec3, ducked: bool, distance: f32) -> Option<Vec3> {
        let shape = hull(ducked);
        let sweep_mins = origin + shape.mins() - Vec3::new(0.0, 0.0, distance);
        let sweep_maxs = origin + shape.maxs();

        let hit = self.ramps.iter().find(|(bounds, _)| {
            let (mins, maxs) = (bounds.mins(), bounds.maxs());
            sweep_mins.x <= maxs.x
                && mins.x <= sweep_maxs.x
                && sweep_mins.y <= maxs.y
                && mins.y <= sweep_maxs.y
                && sweep_mins.z <= maxs.z
                && mins.z <= sweep_maxs.z
        });

        if let Some((_, normal)) = hit {
            return Some(*normal);
        }

        (sweep_mins.z <= self.floor_z).then_some(Vec3::UP)
    }

    fn spawn_trigger(&mut self, name: &str, _bounds: &BoundingBox) -> Option<VolumeHandle> {
        let handle = VolumeHandle(self.next_handle);
        self.next_handle += 1;
        self.triggers.push((handle, name.to_string()));
        Some(handle)
    }

    fn remove_trigger(&mut self, handle: VolumeHandle) {
        self.triggers.retain(|(h, _)| *h != handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hull_sizes() {
        assert_eq!(hull(false).maxs().z, 72.0);
        assert_eq!(hull(true).maxs().z, 54.0);
        assert_eq!(hull(true).mins(), Vec3::new(-16.0, -16.0, 0.0));
    }

    #[test]
    fn test_trace_floor_and_ramp() {
        let mut world = ScriptedWorld::new(0.0, 1000);
        let ramp_normal = Vec3::new(0.8, 0.0, 0.6);
        world.add_ramp(
            BoundingBox::new(Vec3::new(500.0, -100.0, 100.0), Vec3::new(700.0, 100.0, 300.0)),
            ramp_normal,
        );

        assert_eq!(world.trace_ground(Vec3::new(0.0, 0.0, 10.0), false, 54.0), Some(Vec3::UP));
        assert_eq!(world.trace_ground(Vec3::new(0.0, 0.0, 100.0), false, 54.0), None);
        assert_eq!(world.trace_ground(Vec3::new(600.0, 0.0, 320.0), true, 54.0), Some(ramp_normal));
    }

    #[test]
    fn test_triggers() {
        let mut world = ScriptedWorld::new(0.0, 1000);
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));
        let a = world.spawn_trigger("surftimer_0_start_0", &bounds).unwrap();
        let b = world.spawn_trigger("surftimer_0_end_0", &bounds).unwrap();

        assert_eq!(a, VolumeHandle(1000));
        assert_eq!(b, VolumeHandle(1001));

        world.remove_trigger(a);
        assert_eq!(world.triggers().len(), 1);
    }
}
