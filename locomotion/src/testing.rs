//! Deterministic stand-in for the physics world and the character body.
//!
//! The world is a horizontal floor plus an optional horizontal ceiling. Sphere casts
//! only resolve along ±Z, which is all the controller issues with the default axes.

use crate::probe::{CharacterBody, ObstructionProbe, SphereCast};
use crate::settings::{DEFAULT_CAPSULE_HEIGHT, DEFAULT_CAPSULE_RADIUS, DEFAULT_STEP_HEIGHT};
use crate::types::{EntityId, ProbeHit, Vec3};

pub const FLOOR_ENTITY: EntityId = 1;

#[derive(Clone, Debug)]
pub struct FakeWorld {
    pub entity: EntityId,
    pub children: Vec<EntityId>,
    /// Capsule base.
    pub position: Vec3,
    /// Reported body velocity.
    pub velocity: Vec3,
    pub capsule_height: f32,
    pub capsule_radius: f32,
    pub step_height: f32,
    pub slope_limit: f32,
    /// Floor height and owning entity.
    pub floor: Option<(f32, EntityId)>,
    /// Ceiling height and owning entity.
    pub ceiling: Option<(f32, EntityId)>,
    /// Returned as-is by every downward cast.
    pub extra_ground_hits: Vec<ProbeHit>,
    pub tick_velocities: Vec<Vec3>,
    pub physics_velocities: Vec<Vec3>,
    pub heading: f32,
    pub camera: (f32, f32),
    pub physics_scene: bool,
}

impl FakeWorld {
    /// Character standing on a floor at z = 0.
    pub fn flat() -> Self {
        Self {
            entity: 100,
            children: vec![101],
            position: Vec3::zeros(),
            velocity: Vec3::zeros(),
            capsule_height: DEFAULT_CAPSULE_HEIGHT,
            capsule_radius: DEFAULT_CAPSULE_RADIUS,
            step_height: DEFAULT_STEP_HEIGHT,
            slope_limit: 30.0,
            floor: Some((0.0, FLOOR_ENTITY)),
            ceiling: None,
            extra_ground_hits: Vec::new(),
            tick_velocities: Vec::new(),
            physics_velocities: Vec::new(),
            heading: 0.0,
            camera: (0.0, 0.0),
            physics_scene: true,
        }
    }

    fn plane_hit(entity: EntityId, distance: f32, normal: Vec3, cast: &SphereCast) -> Option<ProbeHit> {
        let distance = distance.max(0.0);
        if distance > cast.max_distance {
            return None;
        }
        let centre = cast.origin + cast.direction * distance;
        Some(ProbeHit {
            entity,
            normal,
            position: centre - normal * cast.radius,
            distance,
            dynamic: false,
        })
    }
}

impl ObstructionProbe for FakeWorld {
    fn sphere_cast(&self, cast: &SphereCast) -> Vec<ProbeHit> {
        let mut hits = Vec::new();
        if cast.direction.z < 0.0 {
            if let Some((height, entity)) = self.floor {
                let gap = cast.origin.z - cast.radius - height;
                hits.extend(Self::plane_hit(entity, gap, Vec3::z(), cast));
            }
            hits.extend(self.extra_ground_hits.iter().copied());
        } else if cast.direction.z > 0.0 {
            if let Some((height, entity)) = self.ceiling {
                let gap = height - (cast.origin.z + cast.radius);
                hits.extend(Self::plane_hit(entity, gap, -Vec3::z(), cast));
            }
        }
        hits
    }
}

impl CharacterBody for FakeWorld {
    fn entity(&self) -> EntityId {
        self.entity
    }

    fn children(&self) -> Vec<EntityId> {
        self.children.clone()
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn add_velocity_for_tick(&mut self, velocity: Vec3) {
        self.tick_velocities.push(velocity);
    }

    fn add_velocity_for_physics_timestep(&mut self, velocity: Vec3) {
        self.physics_velocities.push(velocity);
    }

    fn capsule_height(&self) -> f32 {
        self.capsule_height
    }

    fn capsule_radius(&self) -> f32 {
        self.capsule_radius
    }

    fn resize_capsule(&mut self, height: f32) {
        self.capsule_height = height;
    }

    fn step_height(&self) -> f32 {
        self.step_height
    }

    fn slope_limit_degrees(&self) -> f32 {
        self.slope_limit
    }

    fn set_heading(&mut self, heading: f32) {
        self.heading = heading;
    }

    fn set_camera(&mut self, pitch: f32, local_z_offset: f32) {
        self.camera = (pitch, local_z_offset);
    }

    fn has_physics_scene(&self) -> bool {
        self.physics_scene
    }
}
