/*!
Horizontal velocity integrator.

The applied velocity lerps from a snapshot of itself (`prev_apply_velocity_xy`) toward
the target, over `total_lerp_time = |prev_apply - target| / accel`. Whenever the target
changes the snapshot is retaken and the lerp restarts.

Behavior
- Lerp time advances by half a step before and half after sampling (midpoint rule).
- The step is scaled by the sprint acceleration boost while it is active or bleeding
  off, and by `jump_accel_factor` while airborne.
- When the sampled speed drops, the step is redone with a deceleration factor. Turning
  more than 90° away from the current velocity uses the opposing factor, blended
  toward `opposing_decel` by how fast the new target is relative to top speed.
- Lerp runs in the character frame with instant velocity rotation (the result is then
  rotated by the heading) and in world space otherwise.

Notes
- "Reached" events compare exactly; they fire on the tick the lerp lands on its
  target, not when it comes close.
*/

use crate::config::{MovementConfig, SprintConfig};
use crate::crouch::CrouchState;
use crate::ellipse::{DirectionalScales, ellipse_scaled};
use crate::events::{EventQueue, LocomotionEvent};
use crate::input::{InputChannel, InputTable};
use crate::sprint::{SprintState, SprintStep};
use crate::types::{Vec2, Vec3, rotate_xy};
use crate::utils::{angle_between_2d, is_close, sign};
use std::f32::consts::FRAC_PI_2;

/// Per-tick working state of the horizontal integrator.
#[derive(Clone, Debug)]
pub struct LocomotionFrame {
    /// Velocity handed to the body, world frame.
    pub apply_velocity_xy: Vec2,
    /// Lerp origin, taken when the target last changed.
    pub prev_apply_velocity_xy: Vec2,
    /// Target of the running lerp.
    pub prev_target_velocity_xy: Vec2,
    /// Actual body velocity projected on the movement plane after an obstacle hit.
    pub corrected_velocity_xy: Vec2,
    pub script_target_velocity_xy: Vec2,
    pub script_sets_target: bool,
    pub lerp_time: f32,
    pub total_lerp_time: f32,
    pub accelerating: bool,
    pub deceleration_factor: f32,
    pub deceleration_factor_applied: bool,
    pub opposing_decel_factor_applied: bool,
    /// Normal of the plane the horizontal velocity lives in.
    pub velocity_x_cross_y: Vec3,
    pub prev_velocity_x_cross_y: Vec3,
}

impl Default for LocomotionFrame {
    fn default() -> Self {
        Self {
            apply_velocity_xy: Vec2::zeros(),
            prev_apply_velocity_xy: Vec2::zeros(),
            prev_target_velocity_xy: Vec2::zeros(),
            corrected_velocity_xy: Vec2::zeros(),
            script_target_velocity_xy: Vec2::zeros(),
            script_sets_target: false,
            lerp_time: 0.0,
            total_lerp_time: 0.0,
            accelerating: false,
            deceleration_factor: 1.0,
            deceleration_factor_applied: false,
            opposing_decel_factor_applied: false,
            velocity_x_cross_y: Vec3::z(),
            prev_velocity_x_cross_y: Vec3::z(),
        }
    }
}

/// Everything the horizontal update reads but does not own.
pub struct HorizontalStep<'a> {
    pub cfg: &'a MovementConfig,
    pub sprint_cfg: &'a SprintConfig,
    pub crouch_scale: f32,
    pub crouch_sprint_causes_standing: bool,
    pub heading: f32,
    pub grounded: bool,
    /// An obstacle deflected the body on the last frame.
    pub hit_something: bool,
    pub dt: f32,
}

#[inline]
fn unscale(v: f32, scale: f32) -> f32 {
    if scale == 0.0 { 0.0 } else { v / scale }
}

/// Unit-length-capped movement direction from the four movement channels, shaped by
/// the walk ellipse. Mirrored when the movement plane is upside down.
pub fn target_from_input(input: &InputTable, scales: &DirectionalScales, flipped: bool) -> Vec2 {
    let mut forward_back = input.value(InputChannel::Forward) * scales.forward
        - input.value(InputChannel::Back) * scales.back;
    let mut left_right = -input.value(InputChannel::Left) * scales.left
        + input.value(InputChannel::Right) * scales.right;

    // The scales come back through the ellipse; only the direction matters here.
    forward_back = if forward_back >= 0.0 {
        unscale(forward_back, scales.forward)
    } else {
        unscale(forward_back, scales.back)
    };

    if flipped {
        forward_back = -forward_back;
        left_right = -left_right;
    }

    left_right = if left_right >= 0.0 {
        unscale(left_right, scales.right)
    } else {
        unscale(left_right, scales.left)
    };

    let mut target = Vec2::new(left_right, forward_back);
    if (forward_back != 0.0 || left_right != 0.0) && target.norm() > 1.0 {
        target = target.normalize();
    }

    if flipped {
        -ellipse_scaled(-target, scales)
    } else {
        ellipse_scaled(target, scales)
    }
}

impl LocomotionFrame {
    #[inline]
    pub fn flipped(&self) -> bool {
        self.velocity_x_cross_y.z < 0.0
    }

    /// Overwrite the applied velocity and the lerp origin in one go.
    pub fn set_apply_velocity_xy(&mut self, velocity: Vec2, heading: f32, instant_rotation: bool) {
        self.apply_velocity_xy = velocity;
        self.prev_apply_velocity_xy = if instant_rotation {
            rotate_xy(velocity, -heading)
        } else {
            velocity
        };
    }

    /// Compute this tick's target and advance the applied velocity toward it.
    pub fn update_velocity_xy(
        &mut self,
        step: &HorizontalStep<'_>,
        input: &mut InputTable,
        sprint: &mut SprintState,
        crouch: &mut CrouchState,
        events: &mut EventQueue,
    ) {
        let cfg = step.cfg;
        let flipped = self.flipped();
        let mut target = target_from_input(input, &cfg.scales, flipped);

        if !self.script_sets_target {
            self.run_sprint(step, target, input, sprint, crouch, events);
        }

        // 1) Speed, sprint boost and crouch slowdown.
        let multiplier = if crouch.standing {
            cfg.speed * sprint.velocity_adjust
        } else if step.sprint_cfg.while_crouched {
            cfg.speed * sprint.velocity_adjust * step.crouch_scale
        } else {
            cfg.speed * step.crouch_scale
        };
        target *= multiplier;

        if self.script_sets_target {
            target = self.script_target_velocity_xy;
            self.run_sprint(step, target, input, sprint, crouch, events);
        } else {
            self.script_target_velocity_xy = target;
        }

        let target_world = rotate_xy(target, step.heading);

        // 2) Restart the lerp when the target moved, an obstacle corrected us, or the
        //    movement plane flipped over.
        let reset_on_hit = !cfg.velocity_xy_ignores_obstacles && step.hit_something;
        let plane_flipped =
            sign(self.prev_velocity_x_cross_y.z) != sign(self.velocity_x_cross_y.z);
        let target_changed = if cfg.instant_velocity_rotation {
            self.prev_target_velocity_xy != target
        } else {
            self.prev_target_velocity_xy != target_world
        };

        if target_changed || reset_on_hit || plane_flipped {
            if cfg.instant_velocity_rotation {
                self.prev_target_velocity_xy = target;
                if reset_on_hit {
                    self.apply_velocity_xy = self.corrected_velocity_xy;
                    self.corrected_velocity_xy = Vec2::zeros();
                }
                self.prev_apply_velocity_xy = rotate_xy(self.apply_velocity_xy, -step.heading);
            } else {
                self.prev_target_velocity_xy = target_world;
                if reset_on_hit {
                    self.apply_velocity_xy = self.corrected_velocity_xy;
                }
                self.prev_apply_velocity_xy = self.apply_velocity_xy;
            }

            // Mirror the origin too, unless the flip happened about world X.
            if plane_flipped && !is_close(self.velocity_x_cross_y.y, 0.0) {
                self.prev_apply_velocity_xy = -self.prev_apply_velocity_xy;
            }

            self.lerp_time = 0.0;
        }

        self.prev_velocity_x_cross_y = self.velocity_x_cross_y;

        // 3) Lerp unless already there.
        if self.apply_velocity_xy != target_world {
            let sprint_accel_value = input.sprint_accel_value();
            if cfg.instant_velocity_rotation {
                let local = self.lerp_velocity_xy(target, step, sprint, sprint_accel_value, crouch.standing, events);
                self.apply_velocity_xy = rotate_xy(local, step.heading);
            } else {
                self.apply_velocity_xy =
                    self.lerp_velocity_xy(target_world, step, sprint, sprint_accel_value, crouch.standing, events);
            }
        } else {
            self.accelerating = false;
            self.deceleration_factor_applied = false;
            self.opposing_decel_factor_applied = false;
        }
    }

    fn run_sprint(
        &self,
        step: &HorizontalStep<'_>,
        target: Vec2,
        input: &mut InputTable,
        sprint: &mut SprintState,
        crouch: &mut CrouchState,
        events: &mut EventQueue,
    ) {
        let sprint_step = SprintStep {
            cfg: step.sprint_cfg,
            crouch_sprint_causes_standing: step.crouch_sprint_causes_standing,
            target,
            apply_xy: self.apply_velocity_xy,
            prev_target_xy: self.prev_target_velocity_xy,
            heading: step.heading,
            instant_velocity_rotation: step.cfg.instant_velocity_rotation,
            flipped: self.flipped(),
            dt: step.dt,
        };
        sprint.update(&sprint_step, input, crouch, events);
    }

    /// One lerp step toward `target` (character frame with instant rotation, world
    /// frame otherwise). Returns the new velocity in the same frame.
    pub fn lerp_velocity_xy(
        &mut self,
        target: Vec2,
        step: &HorizontalStep<'_>,
        sprint: &mut SprintState,
        sprint_accel_value: f32,
        standing: bool,
        events: &mut EventQueue,
    ) -> Vec2 {
        let cfg = step.cfg;
        self.total_lerp_time = (self.prev_apply_velocity_xy - target).norm() / cfg.accel;

        if self.total_lerp_time == 0.0 {
            self.accelerating = false;
            self.deceleration_factor_applied = false;
            self.opposing_decel_factor_applied = false;
            return self.prev_apply_velocity_xy;
        }

        let last_lerp_time = self.lerp_time;
        let current_speed = self.apply_velocity_xy.norm();

        // 1) Step size.
        let sprint_active = sprint.accumulated_accel > 0.0 || sprint.velocity_adjust != 1.0;
        let mut lerp_dt = if sprint_active || (sprint_accel_value < 1.0 && sprint.accumulated_accel > 0.0) {
            step.dt * sprint.accel_adjust
        } else {
            step.dt
        };
        if !step.grounded {
            lerp_dt *= cfg.jump_accel_factor;
        }

        // 2) Midpoint sample.
        self.lerp_time = (self.lerp_time + lerp_dt * 0.5).min(self.total_lerp_time);
        let mut new_velocity = self
            .prev_apply_velocity_xy
            .lerp(&target, self.lerp_time / self.total_lerp_time);
        if self.lerp_time != self.total_lerp_time {
            self.lerp_time += lerp_dt * 0.5;
        }

        // 3) Slowing down: redo the step with the deceleration factor.
        if new_velocity.norm() < current_speed {
            self.accelerating = false;
            self.deceleration_factor_applied = true;

            let current = if cfg.instant_velocity_rotation {
                rotate_xy(self.apply_velocity_xy, -step.heading)
            } else {
                self.apply_velocity_xy
            };

            if target.norm() != 0.0 && angle_between_2d(current, target).abs() > FRAC_PI_2 {
                self.opposing_decel_factor_applied = true;
                self.deceleration_factor_applied = false;

                let greatest = cfg.scales.greatest_abs(cfg.scales.forward);
                let target_local = if cfg.instant_velocity_rotation {
                    target
                } else {
                    rotate_xy(target, -step.heading)
                };
                let top_speed = if standing || step.sprint_cfg.while_crouched {
                    cfg.speed * sprint.velocity_adjust * greatest
                } else {
                    cfg.speed * step.crouch_scale * greatest
                };
                self.deceleration_factor =
                    cfg.decel + (cfg.opposing_decel - cfg.decel) * target_local.norm() / top_speed;
            } else {
                self.deceleration_factor = cfg.decel;
                self.opposing_decel_factor_applied = false;
            }

            let decel_dt = lerp_dt * self.deceleration_factor;
            self.lerp_time = (last_lerp_time + decel_dt * 0.5).min(self.total_lerp_time);
            let decelerated = self
                .prev_apply_velocity_xy
                .lerp(&target, self.lerp_time / self.total_lerp_time);
            if decelerated.norm() < current_speed {
                new_velocity = decelerated;
            }
            if self.lerp_time != self.total_lerp_time {
                self.lerp_time += decel_dt * 0.5;
            }
        } else {
            self.accelerating = true;
            self.deceleration_factor_applied = false;
            self.opposing_decel_factor_applied = false;
        }
        self.lerp_time = self.lerp_time.min(self.total_lerp_time);

        // 4) Let the sprint acceleration boost bleed off with the speed it produced.
        if !is_close(sprint.accel_adjust, 1.0) {
            if !is_close(sprint.velocity_adjust, 1.0) || new_velocity.norm() < current_speed {
                sprint.accumulated_accel += new_velocity.norm() - current_speed;
            } else {
                sprint.accumulated_accel = 0.0;
            }
            sprint.accumulated_accel = sprint.accumulated_accel.max(0.0);
        } else {
            sprint.accumulated_accel = 0.0;
        }

        // 5) Events.
        if self.apply_velocity_xy == Vec2::zeros() {
            events.emit(LocomotionEvent::StartedMoving);
        }
        if new_velocity == target {
            events.emit(LocomotionEvent::TargetVelocityReached);
            self.emit_top_speed(new_velocity, cfg, step.sprint_cfg, events);
        }

        new_velocity
    }

    fn emit_top_speed(
        &self,
        velocity: Vec2,
        cfg: &MovementConfig,
        sprint_cfg: &SprintConfig,
        events: &mut EventQueue,
    ) {
        let speed = velocity.norm();
        if speed == 0.0 {
            events.emit(LocomotionEvent::Stopped);
            return;
        }
        let dir = if self.flipped() {
            -velocity.normalize()
        } else {
            velocity.normalize()
        };
        let sprint_scales = sprint_cfg.scales.scaled_by(&cfg.scales);
        if speed == cfg.speed * ellipse_scaled(dir, &cfg.scales).norm() {
            events.emit(LocomotionEvent::TopWalkSpeedReached);
        } else if speed == cfg.speed * ellipse_scaled(dir, &sprint_scales).norm() {
            events.emit(LocomotionEvent::TopSprintSpeedReached);
        }
    }
}
