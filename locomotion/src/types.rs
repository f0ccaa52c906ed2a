/*!
Core locomotion types and math aliases shared by the controller submodules.

This module intentionally contains no algorithms. It defines the data types
exchanged between:
- the obstruction probe (ground, ground-close, head and stand sphere casts)
- the horizontal and vertical integrators
- the controller and its host (velocity hand-off, entity identity)

Conventions
- World +Z is up. Local +Y is forward, local +X is right.
- Heading is a yaw angle (radians) about +Z.
- Distances are in meters, time in seconds, velocities in m/s.
*/

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec2 = na::Vector2<f32>;
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;

/// Opaque identity of an entity in the host world.
pub type EntityId = u64;

/// A single hit reported by a sphere cast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeHit {
    /// Entity owning the collider that was hit.
    pub entity: EntityId,
    /// World-space surface normal at the contact, pointing away from the obstacle.
    pub normal: Vec3,
    /// World-space contact position.
    pub position: Vec3,
    /// Distance travelled along the cast direction before contact (0 when initially overlapping).
    pub distance: f32,
    /// Whether the collider belongs to a simulated (dynamic, non-kinematic) rigid body.
    pub dynamic: bool,
}

/// Rotation about world +Z by `angle` radians.
#[inline]
pub fn rot_z(angle: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::z_axis(), angle)
}

/// Rotate a planar vector about +Z by `angle` radians.
#[inline]
pub fn rotate_xy(v: Vec2, angle: f32) -> Vec2 {
    let r = rot_z(angle) * Vec3::new(v.x, v.y, 0.0);
    Vec2::new(r.x, r.y)
}

#[inline]
pub fn xy(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.y)
}
