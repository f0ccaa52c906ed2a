/*!
Collaborator seams: the physics world the controller queries and the character body
it drives.

Both are narrow on purpose. The controller never moves the body's translation
itself; it hands a velocity to the body each update and lets the host's character
controller resolve collisions. Only the heading and camera pitch are written
directly.

Notes
- `CharacterBody::position()` is the base of the capsule (its lowest point) in world space.
- Hits returned by `ObstructionProbe::sphere_cast` are unfiltered by entity; the
  controller drops the character's own entity and its children itself.
*/

use crate::config::ProbeFilter;
use crate::types::{EntityId, ProbeHit, Vec3};

/// A sphere swept along `direction` for up to `max_distance`.
#[derive(Clone, Copy, Debug)]
pub struct SphereCast {
    pub origin: Vec3,
    pub radius: f32,
    /// Unit sweep direction.
    pub direction: Vec3,
    pub max_distance: f32,
    pub filter: ProbeFilter,
}

/// Scene query capability.
pub trait ObstructionProbe {
    /// All hits along the sweep, including shapes overlapping at the start (distance 0).
    fn sphere_cast(&self, cast: &SphereCast) -> Vec<ProbeHit>;
}

/// The externally simulated capsule the controller steers.
pub trait CharacterBody {
    fn entity(&self) -> EntityId;

    /// Child entities attached to the character (camera rig, held items, ...).
    fn children(&self) -> Vec<EntityId>;

    /// Capsule base in world space.
    fn position(&self) -> Vec3;

    /// Velocity the body actually moved with on its last step.
    fn velocity(&self) -> Vec3;

    /// Queue a velocity for the next frame tick.
    fn add_velocity_for_tick(&mut self, velocity: Vec3);

    /// Queue a velocity for the next physics step.
    fn add_velocity_for_physics_timestep(&mut self, velocity: Vec3);

    fn capsule_height(&self) -> f32;
    fn capsule_radius(&self) -> f32;
    fn resize_capsule(&mut self, height: f32);
    fn step_height(&self) -> f32;
    fn slope_limit_degrees(&self) -> f32;

    /// Yaw of the character about world +Z.
    fn set_heading(&mut self, heading: f32);

    /// Camera pitch and its local height offset from the standing eye height.
    fn set_camera(&mut self, pitch: f32, local_z_offset: f32);

    /// Whether a physics scene is available to drive `add_velocity_for_physics_timestep`.
    fn has_physics_scene(&self) -> bool {
        true
    }
}

/// Run `cast` and drop hits on `ignore` (self and children) and, if the cast's
/// filter asks for it, hits on simulated bodies.
pub fn cast_excluding(
    probe: &dyn ObstructionProbe,
    cast: &SphereCast,
    ignore: &[EntityId],
) -> Vec<ProbeHit> {
    probe
        .sphere_cast(cast)
        .into_iter()
        .filter(|h| !ignore.contains(&h.entity))
        .filter(|h| !(cast.filter.ignore_dynamic && h.dynamic))
        .collect()
}

/// Upward cast of a capsule-radius sphere from the top hemisphere of a capsule of
/// `height`, used by both the head-hit and the stand-up checks.
pub fn capsule_top_cast(
    base: Vec3,
    up: Vec3,
    height: f32,
    radius: f32,
    distance: f32,
    filter: ProbeFilter,
) -> SphereCast {
    SphereCast {
        origin: base + up * (height - radius),
        radius,
        direction: up,
        max_distance: distance,
        filter,
    }
}
