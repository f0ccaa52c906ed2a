/*!
Crouch / stand state machine.

The camera travels between 0 (standing) and `-distance` (fully crouched) at a rate of
`distance / time`, and the capsule collider is resized by the same amount each step.
Standing up is gated by an upward sphere cast from the top of the current capsule;
anything found there (other than the character itself, its children and, optionally,
simulated bodies) keeps the character down.

Behavior
- Toggle mode flips `crouching` on a fresh press; hold mode follows the input.
- With crouch priority, sprint is dropped while a crouch is in progress; without it,
  the crouch is dropped instead.
- The capsule never shrinks below its hemispheres or the controller's step height.
*/

use crate::config::CrouchConfig;
use crate::events::{EventQueue, LocomotionEvent};
use crate::input::{InputChannel, InputTable};
use crate::probe::{CharacterBody, ObstructionProbe, capsule_top_cast, cast_excluding};
use crate::settings::{CAPSULE_HEIGHT_MARGIN, FLOAT_EPS};
use crate::types::{EntityId, Vec3};

#[derive(Clone, Debug)]
pub struct CrouchState {
    /// Crouch requested (transitioning down or held down).
    pub crouching: bool,
    /// Fully down.
    pub crouched: bool,
    /// Fully up.
    pub standing: bool,
    /// Camera offset from the standing eye height, in `[-distance, 0]`.
    pub camera_z_travel: f32,
    pub prev_value: f32,
    /// Ignore the crouch input entirely (the crouch state is driven by setters).
    pub script_locked: bool,
    pub stand_prevented: bool,
    pub stand_prevented_via_script: bool,
    pub stand_prevented_entities: Vec<EntityId>,
    /// Standing capsule height, captured on activation.
    pub capsule_height: f32,
    pub capsule_current_height: f32,
    pub capsule_radius: f32,
}

impl Default for CrouchState {
    fn default() -> Self {
        Self {
            crouching: false,
            crouched: false,
            standing: true,
            camera_z_travel: 0.0,
            prev_value: 0.0,
            script_locked: false,
            stand_prevented: false,
            stand_prevented_via_script: false,
            stand_prevented_entities: Vec::new(),
            capsule_height: 0.0,
            capsule_current_height: 0.0,
            capsule_radius: 0.0,
        }
    }
}

/// Everything the crouch step reads but does not own.
pub struct CrouchStep<'a> {
    pub cfg: &'a CrouchConfig,
    pub sprint_while_crouched: bool,
    pub jump_req_repress: bool,
    /// Up axis for the stand-up cast.
    pub up: Vec3,
    pub ignore: &'a [EntityId],
    pub dt: f32,
}

/// Camera travel covered in one step; a zero crouch time snaps in a single step.
fn travel_per_step(cfg: &CrouchConfig, dt: f32) -> f32 {
    if cfg.time > FLOAT_EPS {
        cfg.distance * dt / cfg.time
    } else {
        cfg.distance
    }
}

impl CrouchState {
    /// Share of the crouch travel completed, in percent.
    pub fn crouched_percentage(&self, distance: f32) -> f32 {
        if distance == 0.0 {
            return 0.0;
        }
        -100.0 * self.camera_z_travel / distance
    }

    /// Set the stand-prevented flag from outside; holding it true keeps the character down.
    pub fn set_stand_prevented(&mut self, prevented: bool) {
        self.stand_prevented = prevented;
        self.stand_prevented_via_script = prevented;
    }

    /// Advance one grounded step.
    pub fn update(
        &mut self,
        step: &CrouchStep<'_>,
        input: &mut InputTable,
        world: &dyn ObstructionProbe,
        body: &mut dyn CharacterBody,
        events: &mut EventQueue,
    ) {
        let cfg = step.cfg;
        let crouch_value = input.value(InputChannel::Crouch);
        let sprint_value = input.value(InputChannel::Sprint);
        let jump_value = input.value(InputChannel::Jump);

        // 1) Resolve the request from the input mode.
        if cfg.enable_toggle && !self.script_locked && self.prev_value == 0.0 && crouch_value == 1.0 {
            self.crouching = !self.crouching;
        } else if !cfg.enable_toggle && !self.script_locked {
            let sprint_allows = (sprint_value == 0.0 || !cfg.sprint_causes_standing)
                || (cfg.priority_when_sprint_pressed
                    && (self.standing || (self.crouching && !self.crouched)));
            let jump_allows = jump_value == 0.0
                || !cfg.jump_causes_standing
                || (step.jump_req_repress && (self.standing || self.crouching));
            self.crouching = crouch_value != 0.0 && sprint_allows && jump_allows;
        }

        // 2) Crouch vs sprint priority while the crouch is still in progress.
        let in_progress = self.camera_z_travel > -cfg.distance;
        if cfg.priority_when_sprint_pressed
            && !step.sprint_while_crouched
            && sprint_value != 0.0
            && self.crouching
            && in_progress
        {
            input.set_value(InputChannel::Sprint, 0.0);
        } else if !cfg.priority_when_sprint_pressed && sprint_value != 0.0 && self.crouching && in_progress {
            self.crouching = false;
        }

        // 3) Move down, or up if nothing blocks the way.
        if self.crouching && self.camera_z_travel > -cfg.distance {
            self.step_down(cfg, body, step.dt, events);
        } else if !self.crouching && self.camera_z_travel != 0.0 {
            self.step_up(step, world, body, events);
        }

        self.prev_value = crouch_value;
    }

    fn step_down(
        &mut self,
        cfg: &CrouchConfig,
        body: &mut dyn CharacterBody,
        dt: f32,
        events: &mut EventQueue,
    ) {
        self.standing = false;

        if self.camera_z_travel == 0.0 {
            events.emit(LocomotionEvent::StartedCrouching);
        }

        let mut delta = -travel_per_step(cfg, dt);
        self.camera_z_travel += delta;

        if self.camera_z_travel <= -cfg.distance {
            delta += self.camera_z_travel.abs() - cfg.distance;
            self.camera_z_travel = -cfg.distance;
            self.crouched = true;
            log::debug!("crouched");
            events.emit(LocomotionEvent::Crouched);
        }

        let floor = (2.0 * self.capsule_radius + CAPSULE_HEIGHT_MARGIN)
            .max(body.step_height() + CAPSULE_HEIGHT_MARGIN);
        self.capsule_current_height = (body.capsule_height() + delta).max(floor);
        body.resize_capsule(self.capsule_current_height);
    }

    fn step_up(
        &mut self,
        step: &CrouchStep<'_>,
        world: &dyn ObstructionProbe,
        body: &mut dyn CharacterBody,
        events: &mut EventQueue,
    ) {
        let cfg = step.cfg;
        self.crouched = false;

        if self.camera_z_travel == -cfg.distance {
            events.emit(LocomotionEvent::StartedStanding);
        }

        let cast = capsule_top_cast(
            body.position(),
            step.up,
            self.capsule_current_height,
            self.capsule_radius,
            cfg.uncrouch_head_offset,
            cfg.stand_filter,
        );
        let hits = cast_excluding(world, &cast, step.ignore);
        self.stand_prevented_entities = hits.iter().map(|h| h.entity).collect();

        if !hits.is_empty() || self.stand_prevented_via_script {
            self.stand_prevented = true;
            events.emit(LocomotionEvent::StandPrevented);
            return;
        }
        self.stand_prevented = false;

        let mut delta = travel_per_step(cfg, step.dt);
        self.camera_z_travel += delta;

        if self.camera_z_travel >= 0.0 {
            delta -= self.camera_z_travel;
            self.camera_z_travel = 0.0;
            self.standing = true;
            log::debug!("stood up");
            events.emit(LocomotionEvent::StoodUp);
        }

        self.capsule_current_height = (body.capsule_height() + delta).min(self.capsule_height);
        body.resize_capsule(self.capsule_current_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWorld;

    fn hold_cfg() -> CrouchConfig {
        CrouchConfig {
            enable_toggle: false,
            ..CrouchConfig::default()
        }
    }

    fn state_for(world: &FakeWorld) -> CrouchState {
        CrouchState {
            capsule_height: world.capsule_height,
            capsule_current_height: world.capsule_height,
            capsule_radius: world.capsule_radius,
            ..CrouchState::default()
        }
    }

    fn run(
        state: &mut CrouchState,
        cfg: &CrouchConfig,
        input: &mut InputTable,
        world: &mut FakeWorld,
        dt: f32,
        events: &mut EventQueue,
    ) {
        let ignore = [world.entity];
        let step = CrouchStep {
            cfg,
            sprint_while_crouched: true,
            jump_req_repress: false,
            up: Vec3::z(),
            ignore: &ignore,
            dt,
        };
        let probe = world.clone();
        state.update(&step, input, &probe, world, events);
    }

    #[test]
    fn full_crouch_takes_crouch_time_and_fires_once() {
        // distance 0.5 over 0.2 s: four 0.05 s steps land exactly on -0.5.
        let cfg = hold_cfg();
        let mut world = FakeWorld::flat();
        let mut state = state_for(&world);
        let mut input = InputTable::default();
        let mut events = EventQueue::default();
        input.set_value(InputChannel::Crouch, 1.0);

        for _ in 0..4 {
            run(&mut state, &cfg, &mut input, &mut world, cfg.time / 4.0, &mut events);
        }
        assert_eq!(state.camera_z_travel, -0.5);
        assert!(state.crouched && !state.standing);
        assert_eq!(events.count(LocomotionEvent::Crouched), 1);
        assert_eq!(events.count(LocomotionEvent::StartedCrouching), 1);

        // Holding longer changes nothing.
        run(&mut state, &cfg, &mut input, &mut world, 0.05, &mut events);
        assert_eq!(events.count(LocomotionEvent::Crouched), 1);
        assert!((world.capsule_height - 1.3).abs() < 1.0e-5);
    }

    #[test]
    fn ceiling_blocks_standing_and_reports_entity() {
        let cfg = hold_cfg();
        let mut world = FakeWorld::flat();
        let mut state = state_for(&world);
        let mut input = InputTable::default();
        let mut events = EventQueue::default();

        input.set_value(InputChannel::Crouch, 1.0);
        for _ in 0..4 {
            run(&mut state, &cfg, &mut input, &mut world, 0.05, &mut events);
        }

        // A ceiling just above the crouched capsule.
        world.ceiling = Some((1.35, 77));
        input.set_value(InputChannel::Crouch, 0.0);
        run(&mut state, &cfg, &mut input, &mut world, 0.05, &mut events);

        assert!(state.stand_prevented);
        assert_eq!(state.stand_prevented_entities, vec![77]);
        assert_eq!(state.camera_z_travel, -0.5);
        assert_eq!(events.count(LocomotionEvent::StandPrevented), 1);
        assert_eq!(events.count(LocomotionEvent::StartedStanding), 1);

        // Ceiling gone: stands back up over crouch time.
        world.ceiling = None;
        for _ in 0..4 {
            run(&mut state, &cfg, &mut input, &mut world, 0.05, &mut events);
        }
        assert!(state.standing && !state.stand_prevented);
        assert_eq!(state.camera_z_travel, 0.0);
        assert_eq!(events.count(LocomotionEvent::StoodUp), 1);
        assert!((world.capsule_height - 1.8).abs() < 1.0e-5);
    }

    #[test]
    fn toggle_mode_flips_on_fresh_press_only() {
        let cfg = CrouchConfig::default();
        let mut world = FakeWorld::flat();
        let mut state = state_for(&world);
        let mut input = InputTable::default();
        let mut events = EventQueue::default();

        input.set_value(InputChannel::Crouch, 1.0);
        run(&mut state, &cfg, &mut input, &mut world, 0.01, &mut events);
        assert!(state.crouching);
        // Still held: no second flip.
        run(&mut state, &cfg, &mut input, &mut world, 0.01, &mut events);
        assert!(state.crouching);

        input.set_value(InputChannel::Crouch, 0.0);
        run(&mut state, &cfg, &mut input, &mut world, 0.01, &mut events);
        input.set_value(InputChannel::Crouch, 1.0);
        run(&mut state, &cfg, &mut input, &mut world, 0.01, &mut events);
        assert!(!state.crouching);
    }

    #[test]
    fn crouch_priority_drops_sprint_mid_transition() {
        let cfg = CrouchConfig {
            enable_toggle: false,
            ..CrouchConfig::default()
        };
        let mut world = FakeWorld::flat();
        let mut state = state_for(&world);
        let mut input = InputTable::default();
        let mut events = EventQueue::default();
        input.set_value(InputChannel::Crouch, 1.0);
        input.set_value(InputChannel::Sprint, 1.0);

        let ignore = [world.entity];
        let step = CrouchStep {
            cfg: &cfg,
            sprint_while_crouched: false,
            jump_req_repress: false,
            up: Vec3::z(),
            ignore: &ignore,
            dt: 0.05,
        };
        let probe = world.clone();
        state.update(&step, &mut input, &probe, &mut world, &mut events);
        assert!(state.crouching);
        assert_eq!(input.value(InputChannel::Sprint), 0.0);
    }

    #[test]
    fn sprint_priority_cancels_crouch_mid_transition() {
        let cfg = CrouchConfig {
            enable_toggle: false,
            priority_when_sprint_pressed: false,
            ..CrouchConfig::default()
        };
        let mut world = FakeWorld::flat();
        let mut state = state_for(&world);
        let mut input = InputTable::default();
        let mut events = EventQueue::default();

        input.set_value(InputChannel::Crouch, 1.0);
        run(&mut state, &cfg, &mut input, &mut world, 0.05, &mut events);
        assert!(state.crouching && !state.crouched);
        assert!((state.camera_z_travel + 0.125).abs() < 1.0e-6);

        // Sprint wins while the crouch is still in progress: back up, sprint input kept.
        input.set_value(InputChannel::Sprint, 1.0);
        run(&mut state, &cfg, &mut input, &mut world, 0.05, &mut events);
        assert!(!state.crouching);
        assert!(state.standing);
        assert_eq!(state.camera_z_travel, 0.0);
        assert_eq!(input.value(InputChannel::Sprint), 1.0);
        assert_eq!(events.count(LocomotionEvent::StoodUp), 1);
        assert!((world.capsule_height - 1.8).abs() < 1.0e-5);
    }

    #[test]
    fn sprint_does_not_cancel_a_finished_crouch() {
        let cfg = CrouchConfig {
            enable_toggle: false,
            priority_when_sprint_pressed: false,
            ..CrouchConfig::default()
        };
        let mut world = FakeWorld::flat();
        let mut state = state_for(&world);
        let mut input = InputTable::default();
        let mut events = EventQueue::default();

        input.set_value(InputChannel::Crouch, 1.0);
        for _ in 0..4 {
            run(&mut state, &cfg, &mut input, &mut world, 0.05, &mut events);
        }
        assert!(state.crouched);

        input.set_value(InputChannel::Sprint, 1.0);
        run(&mut state, &cfg, &mut input, &mut world, 0.05, &mut events);
        assert!(state.crouching && state.crouched);
        assert_eq!(state.camera_z_travel, -0.5);
        assert_eq!(events.count(LocomotionEvent::StoodUp), 0);
    }

    #[test]
    fn zero_crouch_time_snaps_in_one_step() {
        let cfg = CrouchConfig {
            enable_toggle: false,
            time: 0.0,
            ..CrouchConfig::default()
        };
        let mut world = FakeWorld::flat();
        let mut state = state_for(&world);
        let mut input = InputTable::default();
        let mut events = EventQueue::default();

        input.set_value(InputChannel::Crouch, 1.0);
        run(&mut state, &cfg, &mut input, &mut world, 1.0 / 60.0, &mut events);
        assert!(state.crouched);
        assert_eq!(state.camera_z_travel, -0.5);
        assert!((world.capsule_height - 1.3).abs() < 1.0e-5);

        input.set_value(InputChannel::Crouch, 0.0);
        run(&mut state, &cfg, &mut input, &mut world, 1.0 / 60.0, &mut events);
        assert!(state.standing);
        assert_eq!(state.camera_z_travel, 0.0);
        assert!(world.capsule_height.is_finite());
        assert!((world.capsule_height - 1.8).abs() < 1.0e-5);
    }

    #[test]
    fn capsule_never_shrinks_below_hemispheres() {
        let cfg = CrouchConfig {
            enable_toggle: false,
            distance: 1.7,
            ..CrouchConfig::default()
        };
        let mut world = FakeWorld::flat();
        let mut state = state_for(&world);
        let mut input = InputTable::default();
        let mut events = EventQueue::default();
        input.set_value(InputChannel::Crouch, 1.0);
        for _ in 0..10 {
            run(&mut state, &cfg, &mut input, &mut world, 0.05, &mut events);
        }
        assert!(world.capsule_height >= 2.0 * world.capsule_radius);
    }
}
