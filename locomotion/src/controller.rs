/*!
First-person controller: one owned instance per character.

The controller owns every piece of locomotion state and runs the per-tick pipeline
against two collaborators passed in by the host on each call:
- an [`ObstructionProbe`] for the ground, head and stand sphere casts,
- a [`CharacterBody`] that receives the composed velocity, heading and camera pose.

Cadence
- [`FirstPersonController::on_frame`] always smooths the look rotation and compares the
  body's actual velocity against what was requested two updates ago ("hit something").
  Outside physics-timestep mode it then runs the locomotion update and hands the
  velocity off with `add_velocity_for_tick`.
- [`FirstPersonController::on_physics_step`] runs the locomotion update only in
  physics-timestep mode, with `dt · physics_timestep_scale`, and hands the velocity off
  with `add_velocity_for_physics_timestep`.

Locomotion update order
1) ground check, 2) crouch (grounded only), 3) horizontal (gated by air control),
4) vertical, 5) movement plane follows the ground normal, 6) compose and hand off.

Notes
- Call [`FirstPersonController::activate`] once the body exists and before ticking.
- All getters and setters are meant for the thread that drives the ticks.
*/

use std::fmt;

use crate::config::{LocomotionConfig, SprintConfig};
use crate::crouch::{CrouchState, CrouchStep};
use crate::events::{EventFlags, EventQueue, LocomotionEvent};
use crate::ground::{GroundState, GroundStep};
use crate::horizontal::{HorizontalStep, LocomotionFrame};
use crate::input::{InputChannel, InputTable};
use crate::probe::{CharacterBody, ObstructionProbe};
use crate::rotation::RotationSmoother;
use crate::settings::GROUNDED_ANGLE_MARGIN_DEGREES;
use crate::sprint::SprintState;
use crate::types::{EntityId, ProbeHit, Vec2, Vec3, rot_z, xy};
use crate::utils::{is_close, is_close_vec3, is_zero_vec3, normalize_or_up, tilt_vector_x_cross_y};
use crate::vertical::{VerticalState, VerticalStep};

/// Degraded-but-running outcome of activation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationWarning {
    /// Physics-timestep mode was requested but the body has no physics scene; the
    /// controller falls back to the frame cadence.
    PhysicsSceneMissing,
}

impl fmt::Display for ActivationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationWarning::PhysicsSceneMissing => {
                write!(f, "no physics scene; physics-timestep mode disabled")
            }
        }
    }
}

pub struct FirstPersonController {
    cfg: LocomotionConfig,
    input: InputTable,
    events: EventQueue,
    ground: GroundState,
    crouch: CrouchState,
    sprint: SprintState,
    frame: LocomotionFrame,
    vertical: VerticalState,
    rotation: RotationSmoother,
    /// The character's own entity followed by its children, cached on activation.
    ignore: Vec<EntityId>,
    hit_something: bool,
    prev_target_velocity: Vec3,
    prev_prev_target_velocity: Vec3,
    add_velocity_world: Vec3,
    add_velocity_heading: Vec3,
    velocity_z_pos_direction: Vec3,
    sphere_casts_axis: Vec3,
    /// Persistent script target flag; the one-tick override restores it afterwards.
    script_sets_target: bool,
    target_for_tick: bool,
}

impl FirstPersonController {
    pub fn new(cfg: LocomotionConfig) -> Self {
        Self {
            cfg,
            input: InputTable::default(),
            events: EventQueue::default(),
            ground: GroundState::default(),
            crouch: CrouchState::default(),
            sprint: SprintState::default(),
            frame: LocomotionFrame::default(),
            vertical: VerticalState::default(),
            rotation: RotationSmoother::default(),
            ignore: Vec::new(),
            hit_something: false,
            prev_target_velocity: Vec3::zeros(),
            prev_prev_target_velocity: Vec3::zeros(),
            add_velocity_world: Vec3::zeros(),
            add_velocity_heading: Vec3::zeros(),
            velocity_z_pos_direction: Vec3::z(),
            sphere_casts_axis: Vec3::z(),
            script_sets_target: false,
            target_for_tick: false,
        }
    }

    /// Bind to the body: capture capsule dimensions and children, derive the grounded
    /// angle and jump hold time, and check that physics-timestep mode can run.
    ///
    /// Returns a warning (and logs an error) if physics-timestep mode had to be turned
    /// off. The controller is fully usable either way.
    pub fn activate(&mut self, body: &dyn CharacterBody) -> Result<(), ActivationWarning> {
        // 1) Capsule.
        let height = body.capsule_height();
        let radius = body.capsule_radius();
        self.crouch.capsule_height = height;
        self.crouch.capsule_current_height = height;
        self.crouch.capsule_radius = radius;

        let max_crouch = (height - 2.0 * radius).max(0.0);
        if self.cfg.crouch.distance > max_crouch {
            self.cfg.crouch.distance = max_crouch;
        }

        // 2) Derived tuning.
        self.cfg.ground.max_grounded_angle_degrees =
            body.slope_limit_degrees() + GROUNDED_ANGLE_MARGIN_DEGREES;
        self.cfg.sprint.pause_time =
            SprintConfig::derived_pause_time(self.cfg.sprint.max_time, self.cfg.sprint.cooldown_time);
        self.vertical.update_jump_max_hold_time(&self.cfg.jump);

        // 3) Entities excluded from every cast.
        self.ignore.clear();
        self.ignore.push(body.entity());
        self.ignore.extend(body.children());

        log::debug!(
            "locomotion activated for entity {} (capsule {height} x {radius}, {} children)",
            body.entity(),
            self.ignore.len() - 1
        );

        self.set_physics_timestep_mode(self.cfg.physics_timestep_mode, body)
    }

    /// Switch between the frame and physics-step cadence. Enabling it without a physics
    /// scene leaves the controller on the frame cadence.
    pub fn set_physics_timestep_mode(
        &mut self,
        enabled: bool,
        body: &dyn CharacterBody,
    ) -> Result<(), ActivationWarning> {
        if enabled && !body.has_physics_scene() {
            log::error!("failed to retrieve the physics scene; physics-timestep mode disabled");
            self.cfg.physics_timestep_mode = false;
            return Err(ActivationWarning::PhysicsSceneMissing);
        }
        self.cfg.physics_timestep_mode = enabled;
        Ok(())
    }

    /// Frame callback.
    pub fn on_frame(&mut self, dt: f32, world: &dyn ObstructionProbe, body: &mut dyn CharacterBody) {
        self.events.begin_update();

        let yaw = self.input.value(InputChannel::Yaw);
        let pitch = self.input.value(InputChannel::Pitch);
        self.rotation.update(yaw, pitch, &self.cfg.rotation, dt);
        body.set_heading(self.rotation.heading);
        body.set_camera(self.rotation.pitch, self.crouch.camera_z_travel);

        self.detect_hit(body.velocity());
        self.prev_prev_target_velocity = self.prev_target_velocity;

        if !self.cfg.physics_timestep_mode {
            let velocity = self.locomotion_update(dt, world, body);
            body.add_velocity_for_tick(velocity);
        }
    }

    /// Physics-step callback; a no-op outside physics-timestep mode.
    pub fn on_physics_step(
        &mut self,
        dt: f32,
        world: &dyn ObstructionProbe,
        body: &mut dyn CharacterBody,
    ) {
        if !self.cfg.physics_timestep_mode {
            return;
        }
        self.events.begin_update();
        self.prev_prev_target_velocity = self.prev_target_velocity;

        let velocity = self.locomotion_update(dt * self.cfg.physics_timestep_scale, world, body);
        body.add_velocity_for_physics_timestep(velocity);
    }

    /// Compare the velocity requested two updates ago with what the body actually did.
    fn detect_hit(&mut self, actual: Vec3) {
        let tolerance = self.cfg.movement.velocity_close_tolerance;
        if is_close_vec3(self.prev_prev_target_velocity, actual, tolerance) {
            self.hit_something = false;
            return;
        }
        self.hit_something = true;

        let plane = self.frame.velocity_x_cross_y;
        self.frame.corrected_velocity_xy = if plane == Vec3::z() {
            xy(actual)
        } else {
            Vec2::new(
                actual.dot(&tilt_vector_x_cross_y(Vec2::x(), plane)),
                actual.dot(&tilt_vector_x_cross_y(Vec2::y(), plane)),
            )
        };

        let up = self.velocity_z_pos_direction;
        self.vertical.corrected_velocity_z = actual.dot(&up);

        // Gravity must be refused on two frames in a row before it is cancelled.
        let refused_fall = !is_close_vec3(self.prev_target_velocity, actual, tolerance)
            && self.prev_target_velocity.dot(&up) < 0.0
            && is_close(actual.dot(&up), 0.0);
        if !self.cfg.jump.gravity_ignores_obstacles && refused_fall {
            if self.vertical.gravity_prevented[0] {
                self.vertical.gravity_prevented[1] = true;
                self.events.emit(LocomotionEvent::GravityPrevented);
            } else {
                self.vertical.gravity_prevented[0] = true;
            }
        } else {
            self.vertical.gravity_prevented = [false, false];
        }

        self.events.emit(LocomotionEvent::HitSomething);
    }

    fn locomotion_update(
        &mut self,
        dt: f32,
        world: &dyn ObstructionProbe,
        body: &mut dyn CharacterBody,
    ) -> Vec3 {
        let position = body.position();

        // 1) Ground.
        let ground_step = GroundStep {
            cfg: &self.cfg.ground,
            position,
            cast_up: self.sphere_casts_axis,
            capsule_radius: self.crouch.capsule_radius,
            ignore: &self.ignore,
            dt,
        };
        self.ground.check_grounded(&ground_step, world, &mut self.events);

        // 2) Crouch.
        if self.ground.grounded {
            let crouch_step = CrouchStep {
                cfg: &self.cfg.crouch,
                sprint_while_crouched: self.cfg.sprint.while_crouched,
                jump_req_repress: self.vertical.jump_req_repress,
                up: self.sphere_casts_axis,
                ignore: &self.ignore,
                dt,
            };
            self.crouch
                .update(&crouch_step, &mut self.input, world, body, &mut self.events);
            body.set_camera(self.rotation.pitch, self.crouch.camera_z_travel);
        }

        // 3) Horizontal, subject to air control while airborne.
        if self.ground.grounded || self.air_control_allowed() {
            if self.target_for_tick {
                self.frame.script_sets_target = true;
            }
            let horizontal_step = HorizontalStep {
                cfg: &self.cfg.movement,
                sprint_cfg: &self.cfg.sprint,
                crouch_scale: self.cfg.crouch.scale,
                crouch_sprint_causes_standing: self.cfg.crouch.sprint_causes_standing,
                heading: self.rotation.heading,
                grounded: self.ground.grounded,
                hit_something: self.hit_something,
                dt,
            };
            self.frame.update_velocity_xy(
                &horizontal_step,
                &mut self.input,
                &mut self.sprint,
                &mut self.crouch,
                &mut self.events,
            );
        }
        if self.target_for_tick {
            self.target_for_tick = false;
            self.frame.script_sets_target = self.script_sets_target;
        }

        // 4) Vertical.
        let vertical_step = VerticalStep {
            cfg: &self.cfg.jump,
            jump_value: self.input.value(InputChannel::Jump),
            crouch_jump_causes_standing: self.cfg.crouch.jump_causes_standing,
            position,
            cast_up: self.sphere_casts_axis,
            velocity_z_pos_direction: self.velocity_z_pos_direction,
            body_velocity: body.velocity(),
            ignore: &self.ignore,
            dt,
        };
        self.vertical.update_velocity_z(
            &vertical_step,
            &mut self.ground,
            &mut self.crouch,
            world,
            &mut self.events,
        );

        // 5) Movement plane.
        if self.cfg.movement.velocity_x_cross_y_tracks_normal {
            self.frame.velocity_x_cross_y = normalize_or_up(self.ground.ground_sum_normals_direction());
        }

        // 6) Compose.
        self.prev_target_velocity = self.compose_velocity();
        self.prev_target_velocity
    }

    fn air_control_allowed(&self) -> bool {
        let cfg = &self.cfg.movement;
        let vz = self.vertical.apply_velocity_z;
        let near = !cfg.update_xy_only_near_ground || self.ground.ground_close;
        (cfg.update_xy_ascending && cfg.update_xy_descending && !cfg.update_xy_only_near_ground)
            || (cfg.update_xy_ascending && vz >= 0.0 && near)
            || (cfg.update_xy_descending && vz <= 0.0 && near)
    }

    fn compose_velocity(&self) -> Vec3 {
        let add_heading = if is_zero_vec3(self.add_velocity_heading) {
            self.add_velocity_heading
        } else {
            rot_z(self.rotation.heading) * self.add_velocity_heading
        };
        let planar = self.frame.apply_velocity_xy + xy(self.add_velocity_world) + xy(add_heading);
        let vertical =
            self.vertical.apply_velocity_z + self.add_velocity_world.z + add_heading.z;
        tilt_vector_x_cross_y(planar, self.frame.velocity_x_cross_y)
            + self.velocity_z_pos_direction * vertical
    }

    // --- Input ---

    pub fn press(&mut self, channel: InputChannel, value: f32) {
        self.input
            .press(channel, value, self.ground.grounded, self.cfg.sprint.accel_scale);
    }

    pub fn hold(&mut self, channel: InputChannel, value: f32) {
        self.input
            .hold(channel, value, self.ground.grounded, self.cfg.sprint.accel_scale);
    }

    pub fn release(&mut self, channel: InputChannel) {
        self.input.release(channel);
    }

    /// Route a press by the name the channel is registered under.
    pub fn press_named(&mut self, name: &str, value: f32) -> bool {
        self.input
            .press_named(name, value, self.ground.grounded, self.cfg.sprint.accel_scale)
    }

    pub fn input(&self) -> &InputTable {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputTable {
        &mut self.input
    }

    // --- Events ---

    /// Take every event fired since the last drain, in firing order.
    pub fn drain_events(&mut self) -> Vec<LocomotionEvent> {
        self.events.drain()
    }

    /// Events fired during the most recent update.
    pub fn fired_events(&self) -> EventFlags<u32> {
        self.events.fired()
    }

    // --- Configuration ---

    pub fn config(&self) -> &LocomotionConfig {
        &self.cfg
    }

    /// Replace the whole configuration and re-derive dependent values.
    pub fn set_config(&mut self, cfg: LocomotionConfig) {
        self.cfg = cfg;
        self.cfg.sprint.pause_time =
            SprintConfig::derived_pause_time(self.cfg.sprint.max_time, self.cfg.sprint.cooldown_time);
        self.vertical.update_jump_max_hold_time(&self.cfg.jump);
        self.sprint.refresh_percentage(&self.cfg.sprint);
    }

    pub fn set_gravity(&mut self, gravity: f32) {
        self.cfg.jump.gravity = gravity;
        self.vertical.update_jump_max_hold_time(&self.cfg.jump);
    }

    pub fn set_jump_initial_velocity(&mut self, velocity: f32) {
        self.cfg.jump.initial_velocity = velocity;
        self.vertical.update_jump_max_hold_time(&self.cfg.jump);
    }

    pub fn set_jump_hold_distance(&mut self, distance: f32) {
        self.cfg.jump.hold_distance = distance;
        self.vertical.update_jump_max_hold_time(&self.cfg.jump);
    }

    pub fn set_jump_held_gravity_factor(&mut self, factor: f32) {
        self.cfg.jump.held_gravity_factor = factor;
        self.vertical.update_jump_max_hold_time(&self.cfg.jump);
    }

    pub fn set_sprint_max_time(&mut self, max_time: f32) {
        self.cfg.sprint.max_time = max_time;
        self.sprint.refresh_percentage(&self.cfg.sprint);
    }

    pub fn set_sprint_cooldown_time(&mut self, cooldown_time: f32) {
        self.cfg.sprint.cooldown_time = cooldown_time;
        self.cfg.sprint.pause_time =
            SprintConfig::derived_pause_time(self.cfg.sprint.max_time, cooldown_time);
    }

    pub fn set_physics_timestep_scale(&mut self, scale: f32) {
        self.cfg.physics_timestep_scale = scale;
    }

    pub fn jump_max_hold_time(&self) -> f32 {
        self.vertical.jump_max_hold_time
    }

    // --- Ground ---

    pub fn grounded(&self) -> bool {
        self.ground.grounded
    }

    pub fn ground_close(&self) -> bool {
        self.ground.ground_close
    }

    pub fn air_time(&self) -> f32 {
        self.ground.air_time
    }

    pub fn ground_hits(&self) -> &[ProbeHit] {
        &self.ground.ground_hits
    }

    pub fn ground_close_hits(&self) -> &[ProbeHit] {
        &self.ground.ground_close_hits
    }

    pub fn ground_sum_normals_direction(&self) -> Vec3 {
        self.ground.ground_sum_normals_direction()
    }

    pub fn ground_close_sum_normals_direction(&self) -> Vec3 {
        self.ground.ground_close_sum_normals_direction()
    }

    /// Override the next grounded check's result.
    pub fn set_grounded_for_tick(&mut self, grounded: bool) {
        self.ground.script_grounded = Some(grounded);
    }

    pub fn set_ground_close_for_tick(&mut self, ground_close: bool) {
        self.ground.script_ground_close = Some(ground_close);
    }

    // --- Horizontal ---

    pub fn apply_velocity_xy(&self) -> Vec2 {
        self.frame.apply_velocity_xy
    }

    pub fn set_apply_velocity_xy(&mut self, velocity: Vec2) {
        self.frame.set_apply_velocity_xy(
            velocity,
            self.rotation.heading,
            self.cfg.movement.instant_velocity_rotation,
        );
    }

    pub fn frame(&self) -> &LocomotionFrame {
        &self.frame
    }

    /// Target velocity computed (or set) for the last update, in the character frame.
    pub fn target_velocity_xy(&self) -> Vec2 {
        self.frame.script_target_velocity_xy
    }

    /// Use `velocity` as the target instead of the movement input for the next update.
    pub fn set_target_velocity_xy_for_tick(&mut self, velocity: Vec2) {
        self.frame.script_target_velocity_xy = velocity;
        self.target_for_tick = true;
    }

    /// Keep using the last set target velocity until cleared.
    pub fn set_script_sets_target_velocity_xy(&mut self, enabled: bool) {
        self.script_sets_target = enabled;
        self.frame.script_sets_target = enabled;
    }

    pub fn add_velocity_world(&self) -> Vec3 {
        self.add_velocity_world
    }

    pub fn set_add_velocity_world(&mut self, velocity: Vec3) {
        self.add_velocity_world = velocity;
    }

    pub fn add_velocity_heading(&self) -> Vec3 {
        self.add_velocity_heading
    }

    /// Extra velocity expressed in the character frame, added every update.
    pub fn set_add_velocity_heading(&mut self, velocity: Vec3) {
        self.add_velocity_heading = velocity;
    }

    pub fn velocity_x_cross_y_direction(&self) -> Vec3 {
        self.frame.velocity_x_cross_y
    }

    pub fn set_velocity_x_cross_y_direction(&mut self, direction: Vec3) {
        self.frame.velocity_x_cross_y = normalize_or_up(direction);
    }

    pub fn velocity_z_pos_direction(&self) -> Vec3 {
        self.velocity_z_pos_direction
    }

    pub fn set_velocity_z_pos_direction(&mut self, direction: Vec3) {
        self.velocity_z_pos_direction = normalize_or_up(direction);
    }

    pub fn sphere_casts_axis(&self) -> Vec3 {
        self.sphere_casts_axis
    }

    /// Axis the ground, head and stand casts are aligned with.
    pub fn set_sphere_casts_axis(&mut self, axis: Vec3) {
        self.sphere_casts_axis = normalize_or_up(axis);
    }

    pub fn hit_something(&self) -> bool {
        self.hit_something
    }

    pub fn corrected_velocity_xy(&self) -> Vec2 {
        self.frame.corrected_velocity_xy
    }

    pub fn set_corrected_velocity_xy(&mut self, velocity: Vec2) {
        self.hit_something = true;
        self.frame.corrected_velocity_xy = velocity;
    }

    pub fn corrected_velocity_z(&self) -> f32 {
        self.vertical.corrected_velocity_z
    }

    pub fn set_corrected_velocity_z(&mut self, velocity: f32) {
        self.hit_something = true;
        self.vertical.corrected_velocity_z = velocity;
    }

    /// Velocity handed to the body on the last update.
    pub fn prev_target_velocity(&self) -> Vec3 {
        self.prev_target_velocity
    }

    // --- Sprint ---

    pub fn sprinting(&self) -> bool {
        self.sprint
            .sprinting(self.crouch.standing, self.cfg.sprint.while_crouched)
    }

    pub fn stamina_percentage(&self) -> f32 {
        self.sprint.stamina_percentage
    }

    pub fn set_stamina_percentage(&mut self, pct: f32) {
        self.sprint.set_stamina_percentage(pct, &self.cfg.sprint);
    }

    pub fn sprint_held_time(&self) -> f32 {
        self.sprint.held_duration
    }

    pub fn set_sprint_held_time(&mut self, held: f32) {
        self.sprint.set_held_time(held, &self.cfg.sprint);
    }

    pub fn sprint_cooldown(&self) -> f32 {
        self.sprint.cooldown
    }

    pub fn stamina_increasing(&self) -> bool {
        self.sprint.stamina_increasing
    }

    pub fn stamina_decreasing(&self) -> bool {
        self.sprint.stamina_decreasing
    }

    /// Drive the sprint from code; `enabled` picks whether it is on.
    pub fn set_sprint_via_script(&mut self, via_script: bool) {
        self.sprint.via_script = via_script;
    }

    pub fn set_sprint_enabled(&mut self, enabled: bool) {
        self.sprint.enabled_via_script = enabled;
    }

    pub fn sprint(&self) -> &SprintState {
        &self.sprint
    }

    // --- Crouch ---

    pub fn crouching(&self) -> bool {
        self.crouch.crouching
    }

    /// Request a crouch or a stand. Only effective while the crouch input is locked out.
    pub fn set_crouching(&mut self, crouching: bool) {
        self.crouch.crouching = crouching;
    }

    pub fn crouched(&self) -> bool {
        self.crouch.crouched
    }

    pub fn standing(&self) -> bool {
        self.crouch.standing
    }

    pub fn crouched_percentage(&self) -> f32 {
        self.crouch.crouched_percentage(self.cfg.crouch.distance)
    }

    pub fn camera_z_travel(&self) -> f32 {
        self.crouch.camera_z_travel
    }

    pub fn set_crouch_script_locked(&mut self, locked: bool) {
        self.crouch.script_locked = locked;
    }

    pub fn stand_prevented(&self) -> bool {
        self.crouch.stand_prevented
    }

    pub fn set_stand_prevented(&mut self, prevented: bool) {
        self.crouch.set_stand_prevented(prevented);
    }

    pub fn stand_prevented_entities(&self) -> &[EntityId] {
        &self.crouch.stand_prevented_entities
    }

    // --- Vertical ---

    pub fn apply_velocity_z(&self) -> f32 {
        self.vertical.apply_velocity_z
    }

    /// Set the vertical velocity; the next grounded check reports airborne.
    pub fn set_apply_velocity_z(&mut self, velocity: f32) {
        self.set_grounded_for_tick(false);
        self.vertical.set_apply_velocity_z(velocity);
    }

    pub fn head_hit(&self) -> bool {
        self.vertical.head_hit
    }

    pub fn head_hit_entities(&self) -> &[EntityId] {
        &self.vertical.head_hit_entities
    }

    pub fn second_jump(&self) -> bool {
        self.vertical.second_jump
    }

    pub fn gravity_prevented(&self) -> bool {
        self.vertical.gravity_prevented[0] && self.vertical.gravity_prevented[1]
    }

    pub fn set_gravity_prevented(&mut self, prevented: bool) {
        self.vertical.set_gravity_prevented(prevented);
    }

    // --- Rotation ---

    pub fn heading(&self) -> f32 {
        self.rotation.heading
    }

    pub fn set_heading_for_tick(&mut self, heading: f32) {
        self.rotation.set_heading_for_tick(heading);
    }

    pub fn camera_pitch(&self) -> f32 {
        self.rotation.pitch
    }

    pub fn set_rotation_target_for_tick(&mut self, pitch: f32, yaw: f32) {
        self.rotation.set_rotation_target_for_tick(pitch, yaw);
    }
}
