/*!
Per-character locomotion tuning.

`LocomotionConfig::default()` reproduces the stock controller feel; every field is
also reachable at runtime through the controller's setters. Builder-style `with_*`
helpers cover the groups that are usually tuned together.

Notes
- Collision filters are plain membership masks; the probe decides how a mask maps
  onto its own collision layers.
*/

use crate::ellipse::DirectionalScales;
use crate::settings::*;

/// Collision mask plus dynamic-body handling for one probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeFilter {
    /// Layers the probe may hit.
    pub group_mask: u32,
    /// Drop hits on simulated (dynamic, non-kinematic) bodies.
    pub ignore_dynamic: bool,
}

impl ProbeFilter {
    pub const ALL: ProbeFilter = ProbeFilter {
        group_mask: u32::MAX,
        ignore_dynamic: false,
    };

    pub const fn new(group_mask: u32, ignore_dynamic: bool) -> Self {
        Self {
            group_mask,
            ignore_dynamic,
        }
    }
}

impl Default for ProbeFilter {
    fn default() -> Self {
        Self::ALL
    }
}

#[derive(Clone, Debug)]
pub struct MovementConfig {
    pub speed: f32,
    pub accel: f32,
    pub jump_accel_factor: f32,
    pub decel: f32,
    pub opposing_decel: f32,
    pub scales: DirectionalScales,
    /// Rotate the applied velocity with the heading instantly instead of lerping it in world space.
    pub instant_velocity_rotation: bool,
    /// When false, a detected obstacle restarts the horizontal lerp from the corrected velocity.
    pub velocity_xy_ignores_obstacles: bool,
    pub update_xy_ascending: bool,
    pub update_xy_descending: bool,
    pub update_xy_only_near_ground: bool,
    pub velocity_close_tolerance: f32,
    /// Follow the ground normal with the horizontal velocity plane.
    pub velocity_x_cross_y_tracks_normal: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            accel: DEFAULT_ACCEL,
            jump_accel_factor: DEFAULT_JUMP_ACCEL_FACTOR,
            decel: DEFAULT_DECEL,
            opposing_decel: DEFAULT_OPPOSING_DECEL,
            scales: DirectionalScales::new(
                DEFAULT_FORWARD_SCALE,
                DEFAULT_BACK_SCALE,
                DEFAULT_LEFT_SCALE,
                DEFAULT_RIGHT_SCALE,
            ),
            instant_velocity_rotation: true,
            velocity_xy_ignores_obstacles: true,
            update_xy_ascending: true,
            update_xy_descending: true,
            update_xy_only_near_ground: false,
            velocity_close_tolerance: DEFAULT_VELOCITY_CLOSE_TOLERANCE,
            velocity_x_cross_y_tracks_normal: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SprintConfig {
    pub scales: DirectionalScales,
    pub accel_scale: f32,
    pub max_time: f32,
    pub cooldown_time: f32,
    /// Delay before stamina starts regenerating after a sprint.
    pub pause_time: f32,
    pub regen_rate: f32,
    pub backwards: bool,
    pub while_crouched: bool,
    pub uses_stamina: bool,
    pub regenerate_automatically: bool,
}

impl SprintConfig {
    /// Regeneration pause derived from the cooldown: none when the cooldown outlasts a
    /// full sprint, otherwise a tenth of the cooldown.
    pub fn derived_pause_time(max_time: f32, cooldown_time: f32) -> f32 {
        if cooldown_time > max_time {
            0.0
        } else {
            SPRINT_PAUSE_COOLDOWN_SHARE * cooldown_time
        }
    }
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            scales: DirectionalScales::new(
                DEFAULT_SPRINT_SCALE_FORWARD,
                DEFAULT_SPRINT_SCALE_BACK,
                DEFAULT_SPRINT_SCALE_LEFT,
                DEFAULT_SPRINT_SCALE_RIGHT,
            ),
            accel_scale: DEFAULT_SPRINT_ACCEL_SCALE,
            max_time: DEFAULT_SPRINT_MAX_TIME,
            cooldown_time: DEFAULT_SPRINT_COOLDOWN_TIME,
            pause_time: Self::derived_pause_time(DEFAULT_SPRINT_MAX_TIME, DEFAULT_SPRINT_COOLDOWN_TIME),
            regen_rate: DEFAULT_SPRINT_REGEN_RATE,
            backwards: true,
            while_crouched: true,
            uses_stamina: true,
            regenerate_automatically: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CrouchConfig {
    pub scale: f32,
    pub distance: f32,
    pub time: f32,
    pub enable_toggle: bool,
    pub jump_causes_standing: bool,
    pub sprint_causes_standing: bool,
    pub priority_when_sprint_pressed: bool,
    pub uncrouch_head_offset: f32,
    pub stand_filter: ProbeFilter,
}

impl Default for CrouchConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_CROUCH_SCALE,
            distance: DEFAULT_CROUCH_DISTANCE,
            time: DEFAULT_CROUCH_TIME,
            enable_toggle: true,
            jump_causes_standing: true,
            sprint_causes_standing: false,
            priority_when_sprint_pressed: true,
            uncrouch_head_offset: DEFAULT_UNCROUCH_HEAD_OFFSET,
            stand_filter: ProbeFilter::new(u32::MAX, true),
        }
    }
}

#[derive(Clone, Debug)]
pub struct JumpConfig {
    pub gravity: f32,
    pub initial_velocity: f32,
    pub second_initial_velocity: f32,
    pub hold_distance: f32,
    pub held_gravity_factor: f32,
    pub falling_gravity_factor: f32,
    pub double_jump: bool,
    pub head_offset: f32,
    pub head_hit_sets_apogee: bool,
    pub head_filter: ProbeFilter,
    pub gravity_ignores_obstacles: bool,
    pub allowed_when_gravity_prevented: bool,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            initial_velocity: DEFAULT_JUMP_INITIAL_VELOCITY,
            second_initial_velocity: DEFAULT_JUMP_SECOND_INITIAL_VELOCITY,
            hold_distance: DEFAULT_JUMP_HOLD_DISTANCE,
            held_gravity_factor: DEFAULT_JUMP_HELD_GRAVITY_FACTOR,
            falling_gravity_factor: DEFAULT_JUMP_FALLING_GRAVITY_FACTOR,
            double_jump: false,
            head_offset: DEFAULT_JUMP_HEAD_OFFSET,
            head_hit_sets_apogee: true,
            head_filter: ProbeFilter::new(u32::MAX, true),
            gravity_ignores_obstacles: false,
            allowed_when_gravity_prevented: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GroundConfig {
    pub grounded_offset: f32,
    pub ground_close_offset: f32,
    /// Ground sphere radius growth relative to the capsule radius (percent).
    pub sphere_radius_increase_pct: f32,
    /// Replaced by the body's slope limit on activation.
    pub max_grounded_angle_degrees: f32,
    pub filter: ProbeFilter,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            grounded_offset: DEFAULT_GROUNDED_OFFSET,
            ground_close_offset: DEFAULT_GROUND_CLOSE_OFFSET,
            sphere_radius_increase_pct: DEFAULT_GROUND_RADIUS_INCREASE_PCT,
            max_grounded_angle_degrees: DEFAULT_MAX_GROUNDED_ANGLE_DEGREES,
            filter: ProbeFilter::ALL,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RotationConfig {
    pub yaw_sensitivity: f32,
    pub pitch_sensitivity: f32,
    pub damp: f32,
    /// Slerp toward the target rotation; nlerp otherwise.
    pub slerp: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            yaw_sensitivity: DEFAULT_YAW_SENSITIVITY,
            pitch_sensitivity: DEFAULT_PITCH_SENSITIVITY,
            damp: DEFAULT_ROTATION_DAMP,
            slerp: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LocomotionConfig {
    pub movement: MovementConfig,
    pub sprint: SprintConfig,
    pub crouch: CrouchConfig,
    pub jump: JumpConfig,
    pub ground: GroundConfig,
    pub rotation: RotationConfig,
    /// Run the locomotion update from the physics step instead of the frame tick.
    pub physics_timestep_mode: bool,
    /// Multiplier applied to the physics step's `dt`.
    pub physics_timestep_scale: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            movement: MovementConfig::default(),
            sprint: SprintConfig::default(),
            crouch: CrouchConfig::default(),
            jump: JumpConfig::default(),
            ground: GroundConfig::default(),
            rotation: RotationConfig::default(),
            physics_timestep_mode: false,
            physics_timestep_scale: 1.0,
        }
    }
}

impl LocomotionConfig {
    pub fn with_speed(mut self, speed: f32, accel: f32) -> Self {
        self.movement.speed = speed;
        self.movement.accel = accel;
        self
    }

    pub fn with_walk_scales(mut self, scales: DirectionalScales) -> Self {
        self.movement.scales = scales;
        self
    }

    pub fn with_sprint_scales(mut self, scales: DirectionalScales) -> Self {
        self.sprint.scales = scales;
        self
    }

    /// Stamina budget; the regeneration pause is re-derived from the new values.
    pub fn with_stamina(mut self, max_time: f32, cooldown_time: f32) -> Self {
        self.sprint.max_time = max_time;
        self.sprint.cooldown_time = cooldown_time;
        self.sprint.pause_time = SprintConfig::derived_pause_time(max_time, cooldown_time);
        self
    }

    pub fn with_crouch(mut self, distance: f32, time: f32) -> Self {
        self.crouch.distance = distance;
        self.crouch.time = time;
        self
    }

    pub fn with_jump(mut self, gravity: f32, initial_velocity: f32, hold_distance: f32) -> Self {
        self.jump.gravity = gravity;
        self.jump.initial_velocity = initial_velocity;
        self.jump.hold_distance = hold_distance;
        self
    }

    pub fn with_double_jump(mut self, second_initial_velocity: f32) -> Self {
        self.jump.double_jump = true;
        self.jump.second_initial_velocity = second_initial_velocity;
        self
    }

    pub fn with_physics_timestep(mut self, scale: f32) -> Self {
        self.physics_timestep_mode = true;
        self.physics_timestep_scale = scale;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pause_time_is_tenth_of_cooldown() {
        let c = SprintConfig::default();
        assert!((c.pause_time - 0.1).abs() < 1.0e-6);
    }

    #[test]
    fn long_cooldown_has_no_pause() {
        let c = LocomotionConfig::default().with_stamina(2.0, 5.0);
        assert_eq!(c.sprint.pause_time, 0.0);
    }
}
