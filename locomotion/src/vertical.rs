/*!
Vertical velocity integrator: gravity, jump hold window, double jump and head hits.

The vertical component is integrated with the average of this tick's and last tick's
velocity delta. The tick a jump starts is the exception: the jump velocity is applied
as-is.

Behavior
- Grounded: velocity, delta and hold counter reset. A fresh jump press while standing
  and with a clear head starts the first jump.
- Ascending with jump held inside the hold window: gravity scaled by
  `held_gravity_factor`. Releasing ends the window and applies plain gravity.
- Otherwise plain gravity while ascending and `falling_gravity_factor` while falling.
- A head hit while ascending zeroes the velocity if `head_hit_sets_apogee`.
- Two consecutive frames of the body refusing to fall (see the controller's hit
  detection) restore the corrected velocity and count as grounded.

Notes
- A jump press while crouched does not jump; it only asks the crouch to stand when
  `jump_causes_standing` is set, and skips integration for that tick.
*/

use crate::config::JumpConfig;
use crate::crouch::CrouchState;
use crate::events::{EventQueue, LocomotionEvent};
use crate::ground::GroundState;
use crate::probe::{ObstructionProbe, capsule_top_cast, cast_excluding};
use crate::types::{EntityId, Quat, Vec3};

#[derive(Clone, Debug, Default)]
pub struct VerticalState {
    pub apply_velocity_z: f32,
    pub current_delta: f32,
    pub prev_delta: f32,
    pub jump_held: bool,
    pub jump_req_repress: bool,
    /// Seconds the jump has been held in the current hold window.
    pub jump_counter: f32,
    pub jump_max_hold_time: f32,
    pub second_jump: bool,
    pub head_hit: bool,
    pub head_hit_entities: Vec<EntityId>,
    /// Body refused to fall on the last two frames.
    pub gravity_prevented: [bool; 2],
    /// Actual vertical speed of the body after an obstacle hit.
    pub corrected_velocity_z: f32,
    /// Configuration the last unreachable-hold-distance warning was logged for.
    last_warned: Option<[f32; 4]>,
    /// Unreachable-hold-distance warnings logged so far.
    pub hold_time_warnings: u32,
}

pub struct VerticalStep<'a> {
    pub cfg: &'a JumpConfig,
    pub jump_value: f32,
    pub crouch_jump_causes_standing: bool,
    /// Capsule base in world space.
    pub position: Vec3,
    /// Axis the head cast is aligned with (unit).
    pub cast_up: Vec3,
    /// Positive direction of the vertical velocity (unit).
    pub velocity_z_pos_direction: Vec3,
    /// Velocity the body actually moved with last step.
    pub body_velocity: Vec3,
    pub ignore: &'a [EntityId],
    pub dt: f32,
}

impl VerticalState {
    /// Recompute how long a held jump keeps the reduced gravity.
    ///
    /// The window lasts until the character has risen `hold_distance` under the held
    /// gravity. If that height is never reached, the window is the time to apogee and a
    /// warning is logged once per configuration.
    pub fn update_jump_max_hold_time(&mut self, cfg: &JumpConfig) {
        let v0 = cfg.initial_velocity;
        let g = cfg.gravity * cfg.held_gravity_factor;
        let d = cfg.hold_distance;

        // v² at the top of the hold distance.
        let edge_sq = v0 * v0 + 2.0 * g * d;
        if edge_sq >= 0.0 {
            self.jump_max_hold_time = d / ((v0 + edge_sq.sqrt()) / 2.0);
            return;
        }

        let key = [v0, cfg.gravity, cfg.held_gravity_factor, d];
        if self.last_warned != Some(key) {
            log::warn!(
                "jump hold distance {d} exceeds the apogee of a {v0} m/s jump; holding until apogee"
            );
            self.last_warned = Some(key);
            self.hold_time_warnings += 1;
        }
        self.jump_max_hold_time = (v0 / g).abs();
    }

    /// Set the vertical velocity directly; the caller treats the next tick as airborne.
    pub fn set_apply_velocity_z(&mut self, velocity: f32) {
        self.apply_velocity_z = velocity;
    }

    pub fn set_gravity_prevented(&mut self, prevented: bool) {
        self.gravity_prevented = [prevented, prevented];
    }

    fn probe_head(&mut self, step: &VerticalStep<'_>, crouch: &CrouchState, world: &dyn ObstructionProbe) {
        let cast = capsule_top_cast(
            step.position,
            step.cast_up,
            crouch.capsule_current_height,
            crouch.capsule_radius,
            step.cfg.head_offset,
            step.cfg.head_filter,
        );
        let hits = cast_excluding(world, &cast, step.ignore);
        self.head_hit = !hits.is_empty();
        self.head_hit_entities = hits.iter().map(|h| h.entity).collect();
    }

    pub fn update_velocity_z(
        &mut self,
        step: &VerticalStep<'_>,
        ground: &mut GroundState,
        crouch: &mut CrouchState,
        world: &dyn ObstructionProbe,
        events: &mut EventQueue,
    ) {
        let cfg = step.cfg;
        let dt = step.dt;
        let jump = step.jump_value;

        // 1) Head probe.
        self.probe_head(step, crouch, world);
        if self.head_hit && !ground.grounded && self.apply_velocity_z >= 0.0 {
            events.emit(LocomotionEvent::HeadHit);
        }

        if self.gravity_prevented[0] && self.gravity_prevented[1] {
            self.apply_velocity_z = self.corrected_velocity_z;
            self.gravity_prevented = [false, false];
            ground.grounded = true;
            ground.ground_close = true;
            if cfg.allowed_when_gravity_prevented {
                self.jump_held = false;
            }
        }

        let prev_velocity_z = self.apply_velocity_z;
        let mut initial_jump = false;

        // 2) Pick this tick's delta.
        if ground.grounded && (self.jump_req_repress || self.apply_velocity_z <= 0.0) {
            if jump != 0.0 && !self.jump_held && !self.head_hit {
                if !crouch.standing {
                    if step.crouch_jump_causes_standing {
                        crouch.crouching = false;
                    }
                    return;
                }
                self.current_delta = cfg.initial_velocity;
                initial_jump = true;
                self.jump_held = true;
                self.jump_req_repress = false;
                events.emit(LocomotionEvent::FirstJump);
            } else {
                self.apply_velocity_z = 0.0;
                self.current_delta = 0.0;
                self.jump_counter = 0.0;
                if jump == 0.0 && self.jump_held {
                    self.jump_held = false;
                }
                if cfg.double_jump && self.second_jump {
                    self.second_jump = false;
                }
            }
        } else if self.jump_counter + dt / 2.0 < self.jump_max_hold_time
            && self.apply_velocity_z > 0.0
            && self.jump_held
            && !self.jump_req_repress
        {
            if jump == 0.0 {
                self.jump_held = false;
                self.jump_counter = 0.0;
                self.current_delta = cfg.gravity * dt;
            } else {
                self.jump_counter += dt;
                self.current_delta = cfg.gravity * cfg.held_gravity_factor * dt;
            }
        } else {
            self.jump_req_repress = true;
            self.jump_counter = 0.0;

            self.current_delta = if self.apply_velocity_z <= 0.0 {
                cfg.gravity * cfg.falling_gravity_factor * dt
            } else {
                cfg.gravity * dt
            };

            if !cfg.double_jump && !self.jump_held {
                self.jump_held = true;
            } else if cfg.double_jump && !self.second_jump && jump == 0.0 && self.jump_held {
                self.jump_held = false;
            }

            if cfg.double_jump && !self.second_jump && !self.jump_held && jump != 0.0 {
                if !crouch.standing {
                    if step.crouch_jump_causes_standing {
                        crouch.crouching = false;
                    }
                    return;
                }
                self.apply_velocity_z = cfg.second_initial_velocity;
                self.current_delta = 0.0;
                self.second_jump = true;
                self.jump_held = true;
                events.emit(LocomotionEvent::SecondJump);
            }
        }

        // 3) Integrate.
        if initial_jump {
            self.apply_velocity_z += self.current_delta;
        } else {
            self.apply_velocity_z += (self.current_delta + self.prev_delta) / 2.0;
            self.prev_delta = self.current_delta;
        }

        if self.head_hit && self.apply_velocity_z > 0.0 && cfg.head_hit_sets_apogee {
            self.apply_velocity_z = 0.0;
            self.current_delta = 0.0;
        }

        // 4) With gravity left to the body, don't fight it pulling us into the ground.
        if cfg.gravity == 0.0 && ground.grounded {
            let up = step.velocity_z_pos_direction;
            let mut v = step.body_velocity;
            if up != Vec3::z() {
                v = if up.z >= 0.0 {
                    Quat::rotation_between(&up, &Vec3::z()).unwrap_or_else(Quat::identity) * v
                } else {
                    Quat::rotation_between(&up, &-Vec3::z()).unwrap_or_else(Quat::identity) * -v
                };
            }
            if v.z < 0.0 {
                self.apply_velocity_z = 0.0;
                self.current_delta = 0.0;
            }
        }

        if prev_velocity_z >= 0.0 && self.apply_velocity_z < 0.0 {
            events.emit(LocomotionEvent::StartedFalling);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWorld;

    const DT: f32 = 1.0 / 60.0;

    struct Rig {
        cfg: JumpConfig,
        state: VerticalState,
        ground: GroundState,
        crouch: CrouchState,
        world: FakeWorld,
        events: EventQueue,
    }

    impl Rig {
        fn new(cfg: JumpConfig) -> Self {
            let world = FakeWorld::flat();
            let mut state = VerticalState::default();
            state.update_jump_max_hold_time(&cfg);
            Self {
                cfg,
                state,
                ground: GroundState {
                    grounded: true,
                    ..GroundState::default()
                },
                crouch: CrouchState {
                    capsule_height: world.capsule_height,
                    capsule_current_height: world.capsule_height,
                    capsule_radius: world.capsule_radius,
                    ..CrouchState::default()
                },
                world,
                events: EventQueue::default(),
            }
        }

        fn tick(&mut self, jump_value: f32) {
            let ignore = [self.world.entity];
            let step = VerticalStep {
                cfg: &self.cfg,
                jump_value,
                crouch_jump_causes_standing: true,
                position: self.world.position,
                cast_up: Vec3::z(),
                velocity_z_pos_direction: Vec3::z(),
                body_velocity: Vec3::zeros(),
                ignore: &ignore,
                dt: DT,
            };
            self.state
                .update_velocity_z(&step, &mut self.ground, &mut self.crouch, &self.world, &mut self.events);
        }
    }

    #[test]
    fn hold_time_satisfies_uniform_acceleration() {
        let cfg = JumpConfig::default();
        let mut s = VerticalState::default();
        s.update_jump_max_hold_time(&cfg);

        let t = s.jump_max_hold_time;
        let g = cfg.gravity * cfg.held_gravity_factor;
        let travelled = cfg.initial_velocity * t + 0.5 * g * t * t;
        assert!((travelled - cfg.hold_distance).abs() < 1.0e-4);
        assert_eq!(s.hold_time_warnings, 0);
    }

    #[test]
    fn unreachable_hold_distance_falls_back_and_warns_once() {
        let cfg = JumpConfig {
            hold_distance: 20.0,
            ..JumpConfig::default()
        };
        let mut s = VerticalState::default();
        s.update_jump_max_hold_time(&cfg);
        s.update_jump_max_hold_time(&cfg);

        // |v0 / (g·f)| = 6 / 3
        assert!((s.jump_max_hold_time - 2.0).abs() < 1.0e-6);
        assert_eq!(s.hold_time_warnings, 1);
    }

    #[test]
    fn grounded_press_starts_first_jump() {
        let mut rig = Rig::new(JumpConfig::default());
        rig.tick(0.0);
        assert_eq!(rig.state.apply_velocity_z, 0.0);

        rig.tick(1.0);
        assert_eq!(rig.state.apply_velocity_z, 6.0);
        assert!(rig.state.jump_held && !rig.state.jump_req_repress);
        assert_eq!(rig.events.count(LocomotionEvent::FirstJump), 1);

        // Still touching the ground next tick: the jump carries on.
        rig.tick(1.0);
        assert!(rig.state.apply_velocity_z > 5.9);
        assert!(rig.state.jump_counter > 0.0);
        assert_eq!(rig.events.count(LocomotionEvent::FirstJump), 1);
    }

    #[test]
    fn held_jump_uses_reduced_gravity() {
        let cfg = JumpConfig::default();
        let mut rig = Rig::new(cfg.clone());
        rig.tick(1.0);
        rig.ground.grounded = false;
        rig.tick(1.0);
        let held = 6.0 - rig.state.apply_velocity_z;

        let mut released = Rig::new(cfg);
        released.tick(1.0);
        released.ground.grounded = false;
        released.tick(0.0);
        let free = 6.0 - released.state.apply_velocity_z;

        assert!(held > 0.0 && free > held * 5.0);
        assert!(!released.state.jump_held);
    }

    #[test]
    fn falling_fires_started_falling_once() {
        let mut rig = Rig::new(JumpConfig::default());
        rig.ground.grounded = false;
        rig.tick(0.0);
        rig.tick(0.0);
        assert!(rig.state.apply_velocity_z < 0.0);
        assert_eq!(rig.events.count(LocomotionEvent::StartedFalling), 1);
        // First tick: half of g·falling·dt from the average with a zero previous delta.
        let first = -30.0 * 0.9 * DT / 2.0;
        assert!(rig.state.apply_velocity_z < first);
    }

    #[test]
    fn head_hit_caps_ascent() {
        let mut rig = Rig::new(JumpConfig::default());
        rig.ground.grounded = false;
        rig.state.apply_velocity_z = 3.0;
        rig.world.ceiling = Some((1.85, 9));
        rig.tick(0.0);

        assert_eq!(rig.state.apply_velocity_z, 0.0);
        assert_eq!(rig.state.head_hit_entities, vec![9]);
        assert_eq!(rig.events.count(LocomotionEvent::HeadHit), 1);
    }

    #[test]
    fn blocked_head_prevents_jump() {
        let mut rig = Rig::new(JumpConfig::default());
        rig.world.ceiling = Some((1.85, 9));
        rig.tick(1.0);
        assert_eq!(rig.state.apply_velocity_z, 0.0);
        assert_eq!(rig.events.count(LocomotionEvent::FirstJump), 0);
    }

    #[test]
    fn double_jump_after_release() {
        let mut rig = Rig::new(JumpConfig {
            double_jump: true,
            ..JumpConfig::default()
        });
        rig.tick(1.0);
        rig.ground.grounded = false;
        rig.tick(0.0);
        rig.tick(1.0);
        assert_eq!(rig.events.count(LocomotionEvent::SecondJump), 1);
        assert!(rig.state.apply_velocity_z > 5.5);

        rig.tick(1.0);
        rig.tick(0.0);
        rig.tick(1.0);
        assert_eq!(rig.events.count(LocomotionEvent::SecondJump), 1);
    }

    #[test]
    fn crouched_double_jump_stands_up_instead() {
        let mut rig = Rig::new(JumpConfig {
            double_jump: true,
            ..JumpConfig::default()
        });
        rig.tick(1.0);
        rig.ground.grounded = false;
        rig.tick(0.0);

        rig.crouch.standing = false;
        rig.crouch.crouching = true;
        let before = rig.state.apply_velocity_z;
        rig.tick(1.0);
        assert!(!rig.crouch.crouching);
        assert!(!rig.state.second_jump);
        assert_eq!(rig.state.apply_velocity_z, before);
        assert_eq!(rig.events.count(LocomotionEvent::SecondJump), 0);

        // Upright again: the second jump is still available.
        rig.crouch.standing = true;
        rig.tick(1.0);
        assert!(rig.state.second_jump);
        assert_eq!(rig.events.count(LocomotionEvent::SecondJump), 1);
        assert!((rig.state.apply_velocity_z - rig.cfg.second_initial_velocity).abs() < 0.5);
    }

    #[test]
    fn crouched_jump_requests_standing() {
        let mut rig = Rig::new(JumpConfig::default());
        rig.crouch.standing = false;
        rig.crouch.crouching = true;
        rig.tick(1.0);
        assert!(!rig.crouch.crouching);
        assert_eq!(rig.state.apply_velocity_z, 0.0);
    }

    #[test]
    fn gravity_prevented_twice_lands() {
        let mut rig = Rig::new(JumpConfig::default());
        rig.ground.grounded = false;
        rig.state.apply_velocity_z = -4.0;
        rig.state.corrected_velocity_z = 0.0;
        rig.state.set_gravity_prevented(true);
        rig.tick(0.0);
        assert!(rig.ground.grounded);
        assert_eq!(rig.state.apply_velocity_z, 0.0);
        assert_eq!(rig.state.gravity_prevented, [false, false]);
    }
}
