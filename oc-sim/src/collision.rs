use bevy::math::Vec3;

use crate::types::SurfaceType;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub position: Vec3,
    pub normal: Vec3,
    pub surface: SurfaceType,
}

/// World queries the core is allowed to make. There is no collision
/// resolution: only ground height, the stand-up sweep and hitscan traces.
pub trait WorldProbe {
    /// Height of the walkable surface under `pos`, if any.
    fn ground_height(&self, pos: Vec3) -> Option<f32>;

    /// True if a sphere of `radius` swept from `start` to `end` hits anything.
    fn sweep_obstructed(&self, start: Vec3, end: Vec3, radius: f32) -> bool;

    fn raycast(&self, _origin: Vec3, _direction: Vec3, _range: f32) -> Option<RayHit> {
        None
    }
}

/// Infinite floor at a fixed height with an optional ceiling and target wall.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatWorld {
    pub floor: f32,
    pub ceiling: Option<f32>,
    /// Plane `z = wall_z` facing +Z, hit by traces heading down -Z.
    pub wall_z: Option<f32>,
}

impl FlatWorld {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_ceiling(height: f32) -> Self {
        Self {
            ceiling: Some(height),
            ..Self::default()
        }
    }
}

impl WorldProbe for FlatWorld {
    fn ground_height(&self, _pos: Vec3) -> Option<f32> {
        Some(self.floor)
    }

    fn sweep_obstructed(&self, start: Vec3, end: Vec3, radius: f32) -> bool {
        self.ceiling
            .is_some_and(|ceiling| start.y.max(end.y) + radius >= ceiling)
    }

    fn raycast(&self, origin: Vec3, direction: Vec3, range: f32) -> Option<RayHit> {
        let wall_z = self.wall_z?;
        if direction.z >= -f32::EPSILON {
            return None;
        }
        let t = (wall_z - origin.z) / direction.z;
        if !(0.0..=range).contains(&t) {
            return None;
        }
        Some(RayHit {
            position: origin + direction * t,
            normal: Vec3::Z,
            surface: SurfaceType::Concrete,
        })
    }
}
