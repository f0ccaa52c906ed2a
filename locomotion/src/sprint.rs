/*!
Sprint and stamina bookkeeping.

There is no explicit state enum. Three timers carry the state:
- `held_duration` grows while a boosted sprint is applied and shrinks while regenerating,
- `cooldown` counts down once the held duration reaches the maximum,
- `pause` delays regeneration after the last boosted tick.

Behavior
- The velocity boost (`velocity_adjust`) is the length of the sprint ellipse in the
  direction of travel, so strafing sprints boost (and drain) less than straight ones.
- Draining is normalized by the greatest sprint scale: a full-strength sprint drains
  one second of stamina per second.
- Regeneration is calibrated so refilling from near-empty takes about as long as the
  cooldown, times `regen_rate`.
- The acceleration boost used by the horizontal lerp (`accel_adjust`) is frozen when
  the target drops to zero and released once the accumulated sprint acceleration
  has bled off.

Notes
- The acceleration formula switches between `greatest - 1` and `greatest` as the
  normalizer depending on which side of 1 the greatest scale lies. That split makes the
  result jump at exactly 1; it is kept as-is. A normalizer of exactly zero yields no
  boost instead of dividing by zero.
*/

use crate::config::SprintConfig;
use crate::crouch::CrouchState;
use crate::ellipse::ellipse_scaled;
use crate::events::{EventQueue, LocomotionEvent};
use crate::input::{InputChannel, InputTable};
use crate::settings::FLOAT_EPS;
use crate::types::{Vec2, rotate_xy};
use crate::utils::{is_close, is_zero_vec2};

#[derive(Clone, Debug)]
pub struct SprintState {
    /// Speed multiplier from sprinting; 1 when not boosted.
    pub velocity_adjust: f32,
    /// Lerp-time multiplier from sprinting; 1 when not boosted.
    pub accel_adjust: f32,
    /// Velocity change integrated while a sprint boost or its decay is active.
    pub accumulated_accel: f32,
    pub held_duration: f32,
    pub cooldown: f32,
    pub pause: f32,
    pub prev_velocity_length: f32,
    pub stop_accel_captured: bool,
    pub stamina_percentage: f32,
    pub stamina_increasing: bool,
    pub stamina_decreasing: bool,
    /// Sprint is forced by `enabled_via_script` instead of the input.
    pub via_script: bool,
    pub enabled_via_script: bool,
}

impl Default for SprintState {
    fn default() -> Self {
        Self {
            velocity_adjust: 1.0,
            accel_adjust: 1.0,
            accumulated_accel: 0.0,
            held_duration: 0.0,
            cooldown: 0.0,
            pause: 0.0,
            prev_velocity_length: 0.0,
            stop_accel_captured: false,
            stamina_percentage: 100.0,
            stamina_increasing: false,
            stamina_decreasing: false,
            via_script: false,
            enabled_via_script: false,
        }
    }
}

/// Inputs of one sprint update that live outside the sprint state.
pub struct SprintStep<'a> {
    pub cfg: &'a SprintConfig,
    pub crouch_sprint_causes_standing: bool,
    /// Shaped target velocity in the local frame, before the speed multiplier.
    pub target: Vec2,
    /// Currently applied horizontal velocity.
    pub apply_xy: Vec2,
    /// Target of the running lerp (local with instant rotation, world otherwise).
    pub prev_target_xy: Vec2,
    pub heading: f32,
    pub instant_velocity_rotation: bool,
    /// The movement plane is upside down.
    pub flipped: bool,
    pub dt: f32,
}

/// Acceleration boost for a velocity boost of `adjust`, normalized by `greatest`.
fn accel_adjust_for(accel_value: f32, greatest: f32, adjust: f32) -> f32 {
    let above = greatest >= 1.0;
    let denom = if above { greatest - 1.0 } else { greatest };
    if denom == 0.0 {
        return 1.0;
    }
    match (accel_value >= 1.0, above) {
        (true, true) => (accel_value - 1.0) / denom * (adjust - 1.0) + 1.0,
        (true, false) => (accel_value - 1.0) / denom * adjust + 1.0,
        (false, true) => accel_value / denom * (adjust - 1.0),
        (false, false) => accel_value / denom * adjust,
    }
}

impl SprintState {
    /// Boost currently applied and allowed by the crouch posture.
    pub fn sprinting(&self, standing: bool, while_crouched: bool) -> bool {
        self.velocity_adjust != 1.0 && (standing || while_crouched)
    }

    pub fn update(
        &mut self,
        step: &SprintStep<'_>,
        input: &mut InputTable,
        crouch: &mut CrouchState,
        events: &mut EventQueue,
    ) {
        let cfg = step.cfg;
        let target = step.target;
        let forward = input.value(InputChannel::Forward);
        let back = input.value(InputChannel::Back);
        let left = input.value(InputChannel::Left);
        let right = input.value(InputChannel::Right);
        let mut sprint_value = input.value(InputChannel::Sprint);

        // 1) Cancel the sprint input when it cannot apply.
        let backwards_blocked = !cfg.backwards
            && ((forward == 0.0 && left == 0.0 && right == 0.0)
                || (forward == 0.0 && -left == right)
                || target.y < 0.0);
        if sprint_value == 0.0
            || (!cfg.while_crouched && !step.crouch_sprint_causes_standing && !crouch.standing)
            || (step.apply_xy.x == 0.0 && step.apply_xy.y == 0.0)
            || (forward == -back && -left == right)
            || is_zero_vec2(target)
            || backwards_blocked
        {
            sprint_value = 0.0;
        }

        // 2) Script override.
        if self.via_script && self.enabled_via_script && (target.y > 0.0 || cfg.backwards) {
            sprint_value = 1.0;
            input.set_sprint_accel_value(cfg.accel_scale);
        } else if self.via_script && !self.enabled_via_script {
            sprint_value = 0.0;
        }
        input.set_value(InputChannel::Sprint, sprint_value);

        if is_zero_vec2(step.apply_xy) {
            self.accumulated_accel = 0.0;
        }

        // 3) Boost in the direction of travel.
        self.velocity_adjust = if sprint_value == 0.0 || self.cooldown != 0.0 {
            1.0
        } else {
            let dir = if step.flipped { -target } else { target };
            ellipse_scaled(dir.normalize(), &cfg.scales).norm()
        };

        let can_boost = !is_close(self.velocity_adjust, 1.0)
            && self.held_duration < cfg.max_time
            && self.cooldown == 0.0;
        if input.sprint_prev_value() == 0.0 && can_boost {
            events.emit(LocomotionEvent::SprintStarted);
        }
        input.set_sprint_prev_value(sprint_value);

        if can_boost {
            self.apply_boost(step, input, crouch, events);
        } else {
            input.set_value(InputChannel::Sprint, 0.0);
            self.recover(step, input, events);
        }

        self.stamina_percentage = if cfg.max_time != 0.0 {
            100.0 * (cfg.max_time - self.held_duration) / cfg.max_time
        } else {
            0.0
        };
    }

    fn apply_boost(
        &mut self,
        step: &SprintStep<'_>,
        input: &InputTable,
        crouch: &mut CrouchState,
        events: &mut EventQueue,
    ) {
        let cfg = step.cfg;
        self.stamina_increasing = false;

        if step.crouch_sprint_causes_standing && crouch.crouched {
            crouch.crouching = false;
        }

        let greatest = cfg.scales.greatest_by_magnitude(1.0);
        self.accel_adjust = accel_adjust_for(input.sprint_accel_value(), greatest, self.velocity_adjust);

        if cfg.uses_stamina {
            self.stamina_decreasing = true;
            let drain = if greatest == 1.0 {
                step.dt
            } else {
                step.dt * (self.velocity_adjust - 1.0) / (greatest - 1.0)
            };
            self.held_duration += drain;
        }

        if self.held_duration >= cfg.max_time {
            self.held_duration = cfg.max_time;
            events.emit(LocomotionEvent::StaminaReachedZero);
        }

        self.pause = cfg.pause_time;
        self.prev_velocity_length = step.apply_xy.norm();
    }

    fn recover(&mut self, step: &SprintStep<'_>, input: &InputTable, events: &mut EventQueue) {
        let cfg = step.cfg;
        self.stamina_decreasing = false;

        // 1) Freeze the acceleration boost from the last target while decelerating to rest.
        if !self.stop_accel_captured && is_zero_vec2(step.target) {
            let greatest = cfg.scales.greatest_by_magnitude(0.0);
            let mut last = if step.instant_velocity_rotation {
                step.prev_target_xy
            } else {
                rotate_xy(step.prev_target_xy, -step.heading)
            };
            if step.flipped {
                last = -last;
            }
            let last_adjust = if is_zero_vec2(last) {
                0.0
            } else {
                ellipse_scaled(last.normalize(), &cfg.scales).norm()
            };
            self.accel_adjust = accel_adjust_for(input.sprint_accel_value(), greatest, last_adjust);
            self.stop_accel_captured = true;
        } else if is_close(self.accumulated_accel, 0.0) && is_close(self.velocity_adjust, 1.0) {
            self.accumulated_accel = 0.0;
        }

        if self.accumulated_accel <= 0.0 {
            self.prev_velocity_length = 0.0;
            self.stop_accel_captured = false;
            self.accel_adjust = 1.0;
        }

        // 2) Exhausted: start the cooldown.
        if self.held_duration >= cfg.max_time && self.cooldown == 0.0 {
            self.velocity_adjust = 1.0;
            self.cooldown = cfg.cooldown_time;
            log::debug!("sprint cooldown started ({:.2}s)", cfg.cooldown_time);
            events.emit(LocomotionEvent::CooldownStarted);
        }

        // 3) Regenerate after the pause.
        self.pause = (self.pause - step.dt).max(0.0);

        if self.pause == 0.0
            && self.cooldown == 0.0
            && cfg.regenerate_automatically
            && self.held_duration > 0.0
        {
            // A zero cooldown refills at once.
            self.held_duration -= if cfg.cooldown_time > FLOAT_EPS {
                step.dt * ((cfg.max_time + cfg.pause_time) / cfg.cooldown_time) * cfg.regen_rate
            } else {
                self.held_duration
            };
            self.stamina_increasing = true;
            if self.held_duration <= 0.0 {
                self.held_duration = 0.0;
                events.emit(LocomotionEvent::StaminaCapped);
            }
        } else {
            self.stamina_increasing = false;
        }

        // 4) Cooldown countdown.
        if self.cooldown != 0.0 {
            self.cooldown -= step.dt;
            if self.cooldown <= 0.0 {
                self.cooldown = 0.0;
                self.pause = 0.0;
                log::debug!("sprint cooldown done");
                events.emit(LocomotionEvent::CooldownDone);
                if cfg.regenerate_automatically {
                    self.held_duration = 0.0;
                    self.stamina_increasing = true;
                    events.emit(LocomotionEvent::StaminaCapped);
                }
            }
        }
    }

    fn percentage_for(&self, held: f32, max_time: f32) -> f32 {
        if self.cooldown != 0.0 || max_time == 0.0 {
            return 0.0;
        }
        100.0 * (max_time - held) / max_time
    }

    /// Set the held duration, clamped to `[0, max_time]`.
    pub fn set_held_time(&mut self, held: f32, cfg: &SprintConfig) {
        let prev = self.held_duration;
        self.held_duration = held.clamp(0.0, cfg.max_time.max(0.0));
        self.stamina_percentage = self.percentage_for(self.held_duration, cfg.max_time);
        if self.held_duration > prev {
            self.stamina_decreasing = true;
            self.stamina_increasing = false;
        } else if self.held_duration < prev {
            self.stamina_decreasing = false;
            self.stamina_increasing = true;
        }
    }

    /// Set the stamina percentage, clamped to `[0, 100]`; the held duration follows.
    pub fn set_stamina_percentage(&mut self, pct: f32, cfg: &SprintConfig) {
        let prev = self.stamina_percentage;
        self.stamina_percentage = pct.clamp(0.0, 100.0);
        self.held_duration = cfg.max_time - cfg.max_time * self.stamina_percentage / 100.0;
        if self.stamina_percentage < prev {
            self.stamina_decreasing = true;
            self.stamina_increasing = false;
        } else if self.stamina_percentage > prev {
            self.stamina_decreasing = false;
            self.stamina_increasing = true;
        }
    }

    /// Recompute the stamina percentage after the max time changed.
    pub fn refresh_percentage(&mut self, cfg: &SprintConfig) {
        self.stamina_percentage = self.percentage_for(self.held_duration, cfg.max_time);
    }
}
