//! Rapier-backed obstruction probe.
//!
//! Builds an in-memory Rapier scene from a list of collider definitions and answers the
//! controller's sphere casts against it. Hosts that already run Rapier can use this as
//! their [`ObstructionProbe`]; tests use it to exercise the controller against real
//! shape casts instead of the analytic fake.
//!
//! Conventions
//! - Units are meters, +Z is up.
//! - Each collider's `user_data` packs its owning entity (low 64 bits) and its layer
//!   mask (high 64 bits).
//! - Planes derive their normal from the pose: `normal = rotation * +Z`.

pub use rapier3d;

use rapier3d::na::{Translation3, UnitQuaternion};
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::prelude::*;

use crate::probe::{ObstructionProbe, SphereCast};
use crate::types::{EntityId, ProbeHit, Vec3};

/// Upper bound on hits gathered by a single sphere cast.
const MAX_CAST_HITS: usize = 8;

/// Rigid-body kind the collider is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyKind {
    Fixed,
    /// Simulated; filtered out by probes that ignore dynamic bodies.
    Dynamic,
    Kinematic,
}

/// Definition of one world collider.
#[derive(Clone, Debug)]
pub struct WorldColliderDef {
    /// Stable unique identifier used to ensure deterministic insertion order.
    pub id: u32,
    /// Entity reported in hits against this collider.
    pub entity: EntityId,
    /// Collision layers this collider belongs to.
    pub layers: u32,
    pub kind: BodyKind,
    pub translation: Vector<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub shape: ColliderShapeDef,
}

#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Infinite plane (half-space) offset along its pose-derived normal.
    Plane { offset_along_normal: f32 },
    Cuboid { half_extents: Vector<f32> },
    Sphere { radius: f32 },
    /// Z-aligned capsule, e.g. another character.
    CapsuleZ { radius: f32, half_height: f32 },
}

/// In-memory Rapier sets plus the phases needed to borrow a `QueryPipeline`.
pub struct RapierQueryWorld {
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub broad_phase: BroadPhaseBvh,
    pub narrow_phase: NarrowPhase,
}

#[inline]
fn pack_user_data(entity: EntityId, layers: u32) -> u128 {
    ((layers as u128) << 64) | entity as u128
}

#[inline]
fn unpack_entity(user_data: u128) -> EntityId {
    user_data as u64
}

#[inline]
fn unpack_layers(user_data: u128) -> u32 {
    (user_data >> 64) as u32
}

impl RapierQueryWorld {
    /// Build a query world. Definitions are inserted sorted by `id`.
    pub fn build(mut defs: Vec<WorldColliderDef>) -> Self {
        defs.sort_by_key(|d| d.id);

        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        for def in defs.into_iter() {
            let iso = Isometry::from_parts(Translation3::from(def.translation), def.rotation);

            let builder = match def.kind {
                BodyKind::Fixed => RigidBodyBuilder::fixed(),
                BodyKind::Dynamic => RigidBodyBuilder::dynamic(),
                BodyKind::Kinematic => RigidBodyBuilder::kinematic_position_based(),
            };
            let rb_handle = bodies.insert(builder.pose(iso).build());

            let collider = collider_from_def(&def);
            colliders.insert_with_parent(collider, rb_handle, &mut bodies);
        }

        log::debug!("rapier query world built with {} colliders", colliders.len());

        // Collision detection only, to populate the broad and narrow phases.
        let mut broad_phase = BroadPhaseBvh::new();
        let mut narrow_phase = NarrowPhase::new();
        let mut collision_pipeline = CollisionPipeline::new();
        let hooks = ();
        let events = ();

        collision_pipeline.step(
            0.0,
            &mut broad_phase,
            &mut narrow_phase,
            &mut bodies,
            &mut colliders,
            &hooks,
            &events,
        );

        Self {
            bodies,
            colliders,
            broad_phase,
            narrow_phase,
        }
    }

    /// Borrowed `QueryPipeline` view over the world.
    pub fn query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }

    fn is_dynamic(&self, collider: &Collider) -> bool {
        collider
            .parent()
            .and_then(|h| self.bodies.get(h))
            .is_some_and(|b| b.is_dynamic())
    }
}

impl ObstructionProbe for RapierQueryWorld {
    /// Repeated closest-hit casts, excluding each collider once it has been reported.
    fn sphere_cast(&self, cast: &SphereCast) -> Vec<ProbeHit> {
        let ball = Ball::new(cast.radius);
        let pos = Isometry::translation(cast.origin.x, cast.origin.y, cast.origin.z);
        let dir = Vector::new(cast.direction.x, cast.direction.y, cast.direction.z);
        let mut options = ShapeCastOptions::with_max_time_of_impact(cast.max_distance);
        options.stop_at_penetration = true;
        options.compute_impact_geometry_on_penetration = true;
        let mask = cast.filter.group_mask;

        let mut seen: Vec<ColliderHandle> = Vec::new();
        let mut hits = Vec::new();

        while hits.len() < MAX_CAST_HITS {
            let found = {
                let predicate = |handle: ColliderHandle, collider: &Collider| {
                    !seen.contains(&handle) && unpack_layers(collider.user_data) & mask != 0
                };
                let filter = QueryFilter::new().predicate(&predicate);
                self.query_pipeline(filter).cast_shape(&pos, &dir, &ball, options)
            };
            let Some((handle, hit)) = found else {
                break;
            };
            seen.push(handle);

            let Some(collider) = self.colliders.get(handle) else {
                continue;
            };

            // Normal on the obstacle, facing back along the cast.
            let n = hit.normal1.into_inner();
            let mut normal = Vec3::new(n.x, n.y, n.z);
            if normal.dot(&cast.direction) > 0.0 {
                normal = -normal;
            }
            let w = hit.witness1;

            hits.push(ProbeHit {
                entity: unpack_entity(collider.user_data),
                normal,
                position: Vec3::new(w.x, w.y, w.z),
                distance: hit.time_of_impact,
                dynamic: self.is_dynamic(collider),
            });
        }

        hits
    }
}

fn collider_from_def(def: &WorldColliderDef) -> Collider {
    let user_data = pack_user_data(def.entity, def.layers);
    let builder = match &def.shape {
        ColliderShapeDef::Plane {
            offset_along_normal,
        } => {
            // Local +Z half-space; the body pose rotates it so that `n = R * +Z` and
            // `n ⋅ x = n ⋅ t + offset` in world space.
            ColliderBuilder::halfspace(Vector::z_axis())
                .translation(Vector::new(0.0, 0.0, *offset_along_normal))
        }
        ColliderShapeDef::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }
        ColliderShapeDef::Sphere { radius } => ColliderBuilder::ball(*radius),
        ColliderShapeDef::CapsuleZ {
            radius,
            half_height,
        } => ColliderBuilder::capsule_z(*half_height, *radius),
    };
    builder.user_data(user_data).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LocomotionConfig, ProbeFilter};
    use crate::controller::FirstPersonController;
    use crate::input::InputChannel;
    use crate::testing::FakeWorld;

    const FLOOR: EntityId = 7;
    const CEILING: EntityId = 8;
    const CRATE: EntityId = 9;

    fn def(id: u32, entity: EntityId, layers: u32, kind: BodyKind, z: f32, shape: ColliderShapeDef) -> WorldColliderDef {
        WorldColliderDef {
            id,
            entity,
            layers,
            kind,
            translation: Vector::new(0.0, 0.0, z),
            rotation: UnitQuaternion::identity(),
            shape,
        }
    }

    fn room() -> RapierQueryWorld {
        RapierQueryWorld::build(vec![
            def(2, CEILING, 0b10, BodyKind::Fixed, 3.0, ColliderShapeDef::Cuboid {
                half_extents: Vector::new(10.0, 10.0, 0.5),
            }),
            def(1, FLOOR, 0b01, BodyKind::Fixed, 0.0, ColliderShapeDef::Plane {
                offset_along_normal: 0.0,
            }),
        ])
    }

    fn down(z: f32, max_distance: f32, filter: ProbeFilter) -> SphereCast {
        SphereCast {
            origin: Vec3::new(0.0, 0.0, z),
            radius: 0.3,
            direction: -Vec3::z(),
            max_distance,
            filter,
        }
    }

    #[test]
    fn downward_cast_hits_floor() {
        let world = room();
        let hits = world.sphere_cast(&down(1.0, 2.0, ProbeFilter::ALL));

        assert_eq!(hits.len(), 1);
        let hit = hits[0];
        assert_eq!(hit.entity, FLOOR);
        assert!((hit.distance - 0.7).abs() < 1.0e-3);
        assert!((hit.normal - Vec3::z()).norm() < 1.0e-3);
        assert!(!hit.dynamic);
    }

    #[test]
    fn cast_stops_short_of_floor() {
        let world = room();
        assert!(world.sphere_cast(&down(1.0, 0.5, ProbeFilter::ALL)).is_empty());
    }

    #[test]
    fn upward_cast_hits_ceiling_underside() {
        let world = room();
        let cast = SphereCast {
            direction: Vec3::z(),
            ..down(1.0, 2.0, ProbeFilter::ALL)
        };
        let hits = world.sphere_cast(&cast);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity, CEILING);
        // Underside at 2.5, sphere top at 1.3.
        assert!((hits[0].distance - 1.2).abs() < 1.0e-3);
        assert!((hits[0].normal + Vec3::z()).norm() < 1.0e-3);
    }

    #[test]
    fn layer_mask_filters_colliders() {
        let world = room();
        let hits = world.sphere_cast(&down(1.0, 2.0, ProbeFilter::new(0b10, false)));
        assert!(hits.is_empty());
    }

    #[test]
    fn cast_reports_every_obstacle() {
        let world = RapierQueryWorld::build(vec![
            def(1, FLOOR, 1, BodyKind::Fixed, 0.0, ColliderShapeDef::Plane {
                offset_along_normal: 0.0,
            }),
            def(2, CRATE, 1, BodyKind::Dynamic, 0.25, ColliderShapeDef::Sphere { radius: 0.25 }),
        ]);
        let hits = world.sphere_cast(&down(1.0, 2.0, ProbeFilter::ALL));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entity, CRATE);
        assert!(hits[0].dynamic);
        assert_eq!(hits[1].entity, FLOOR);
    }

    #[test]
    fn controller_stands_and_jumps_on_rapier_floor() {
        let probe = room();
        let mut body = FakeWorld::flat();
        body.floor = None;
        let mut ctl = FirstPersonController::new(LocomotionConfig::default());
        assert_eq!(ctl.activate(&body), Ok(()));

        ctl.on_frame(1.0 / 60.0, &probe, &mut body);
        assert!(ctl.grounded());
        assert!(!ctl.head_hit());

        ctl.press(InputChannel::Jump, 1.0);
        ctl.on_frame(1.0 / 60.0, &probe, &mut body);
        let v = body.tick_velocities.last().copied().unwrap();
        assert!((v.z - 6.0).abs() < 1.0e-5);
    }
}
