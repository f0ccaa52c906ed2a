/*!
Grounded and ground-close detection.

Two downward sphere casts share one pose: a sphere slightly wider than the capsule
(`1 + pct/100` times its radius) resting on the capsule base.
- the grounded cast reaches `grounded_offset` below the base,
- the ground-close cast reaches `ground_close_offset` and anticipates landings.

Behavior
- Hits on the character and its children are dropped.
- Hits steeper than the max grounded angle (measured against the cast axis) are set
  aside. If nothing else was hit but several steep surfaces were, the character still
  counts as grounded when the sum of their normals is within the max angle (standing
  in a V-shaped crease).
- Edge events compare against the previous call only, so re-running the check within
  one tick never fires twice.
*/

use crate::config::GroundConfig;
use crate::events::{EventQueue, LocomotionEvent};
use crate::probe::{ObstructionProbe, SphereCast, cast_excluding};
use crate::types::{EntityId, ProbeHit, Vec3};
use crate::utils::{angle_between, normalize_or_up};

#[derive(Clone, Debug, Default)]
pub struct GroundState {
    pub grounded: bool,
    pub ground_close: bool,
    /// Seconds since the last grounded check that found ground.
    pub air_time: f32,
    pub ground_hits: Vec<ProbeHit>,
    pub ground_close_hits: Vec<ProbeHit>,
    /// One-shot overrides consumed by the next check.
    pub script_grounded: Option<bool>,
    pub script_ground_close: Option<bool>,
}

pub struct GroundStep<'a> {
    pub cfg: &'a GroundConfig,
    /// Capsule base in world space.
    pub position: Vec3,
    /// Axis the casts are aligned with (unit).
    pub cast_up: Vec3,
    pub capsule_radius: f32,
    pub ignore: &'a [EntityId],
    pub dt: f32,
}

#[inline]
fn sum_normals(hits: &[ProbeHit]) -> Vec3 {
    hits.iter().fold(Vec3::zeros(), |acc, h| acc + h.normal)
}

impl GroundState {
    /// Normalized sum of the grounded hit normals, +Z without hits.
    pub fn ground_sum_normals_direction(&self) -> Vec3 {
        if self.ground_hits.is_empty() {
            return Vec3::z();
        }
        normalize_or_up(sum_normals(&self.ground_hits))
    }

    pub fn ground_close_sum_normals_direction(&self) -> Vec3 {
        if self.ground_close_hits.is_empty() {
            return Vec3::z();
        }
        normalize_or_up(sum_normals(&self.ground_close_hits))
    }

    pub fn check_grounded(
        &mut self,
        step: &GroundStep<'_>,
        world: &dyn ObstructionProbe,
        events: &mut EventQueue,
    ) {
        let cfg = step.cfg;
        let prev_grounded = self.grounded;
        let prev_ground_close = self.ground_close;

        let radius = (1.0 + cfg.sphere_radius_increase_pct / 100.0) * step.capsule_radius;
        let mut cast = SphereCast {
            origin: step.position + step.cast_up * radius,
            radius,
            direction: -step.cast_up,
            max_distance: cfg.grounded_offset,
            filter: cfg.filter,
        };

        // 1) Grounded cast.
        let (flat, steep) = split_steep(
            cast_excluding(world, &cast, step.ignore),
            step.cast_up,
            cfg.max_grounded_angle_degrees,
        );
        self.grounded = !flat.is_empty();
        self.ground_hits = flat;

        if !self.grounded && steep.len() > 1 {
            let sum_angle = angle_between(sum_normals(&steep), step.cast_up).to_degrees();
            if sum_angle.abs() <= cfg.max_grounded_angle_degrees {
                self.grounded = true;
                self.ground_hits.extend(steep);
            }
        }

        if let Some(grounded) = self.script_grounded.take() {
            self.grounded = grounded;
        }

        if self.grounded {
            self.air_time = 0.0;
        }
        self.air_time += step.dt;

        // 2) Ground-close cast over the longer reach.
        cast.max_distance = cfg.ground_close_offset;
        let (close, _) = split_steep(
            cast_excluding(world, &cast, step.ignore),
            step.cast_up,
            cfg.max_grounded_angle_degrees,
        );
        self.ground_close = !close.is_empty();
        self.ground_close_hits = close;

        if let Some(close) = self.script_ground_close.take() {
            self.ground_close = close;
        }

        // 3) Edges, most significant first.
        if !prev_grounded && self.grounded {
            events.emit(LocomotionEvent::GroundHit);
        } else if !prev_ground_close && self.ground_close {
            events.emit(LocomotionEvent::GroundSoonHit);
        } else if prev_grounded && !self.grounded {
            events.emit(LocomotionEvent::Ungrounded);
        }
    }
}

/// Split hits into walkable and steep by their angle to `up`.
fn split_steep(hits: Vec<ProbeHit>, up: Vec3, max_degrees: f32) -> (Vec<ProbeHit>, Vec<ProbeHit>) {
    hits.into_iter()
        .partition(|h| angle_between(h.normal, up).to_degrees().abs() <= max_degrees)
}
