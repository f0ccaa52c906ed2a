/*!
Locomotion defaults and tolerances.

These constants centralize the tuning values used by `LocomotionConfig::default()`
and the numeric guards used across the integrators.

Notes
- Distances are in meters, time in seconds, angles in radians unless the name says otherwise.
- These are sensible defaults; per-character values live in `LocomotionConfig`.
*/

use std::f32::consts::FRAC_PI_2;

// --- Tolerances ---

/// Comparison epsilon for "is zero" / "is close" checks on scalars and vector components.
pub const FLOAT_EPS: f32 = f32::EPSILON;

/// Extra margin kept above the capsule's hemispheres and step height when crouching (meters).
pub const CAPSULE_HEIGHT_MARGIN: f32 = 1.0e-5;

/// Added to the body's slope limit so a slope exactly at the limit still counts as ground.
pub const GROUNDED_ANGLE_MARGIN_DEGREES: f32 = 0.01;

// --- Horizontal movement ---

/// Top walk speed along the forward axis (m/s).
pub const DEFAULT_SPEED: f32 = 5.0;
/// Rate used to derive the total lerp time: `distance / accel` (m/s^2).
pub const DEFAULT_ACCEL: f32 = 30.0;
/// Lerp-time multiplier applied while airborne.
pub const DEFAULT_JUMP_ACCEL_FACTOR: f32 = 0.25;
/// Lerp-time multiplier while slowing down.
pub const DEFAULT_DECEL: f32 = 1.5;
/// Lerp-time multiplier while reversing against the current velocity at top speed.
pub const DEFAULT_OPPOSING_DECEL: f32 = 2.0;

pub const DEFAULT_FORWARD_SCALE: f32 = 1.0;
pub const DEFAULT_BACK_SCALE: f32 = 0.75;
pub const DEFAULT_LEFT_SCALE: f32 = 1.0;
pub const DEFAULT_RIGHT_SCALE: f32 = 1.0;

/// Largest difference between predicted and actual velocity still treated as "no obstacle" (m/s).
pub const DEFAULT_VELOCITY_CLOSE_TOLERANCE: f32 = 1.0;

// --- Sprint / stamina ---

pub const DEFAULT_SPRINT_SCALE_FORWARD: f32 = 1.5;
pub const DEFAULT_SPRINT_SCALE_BACK: f32 = 1.0;
pub const DEFAULT_SPRINT_SCALE_LEFT: f32 = 1.25;
pub const DEFAULT_SPRINT_SCALE_RIGHT: f32 = 1.25;
pub const DEFAULT_SPRINT_ACCEL_SCALE: f32 = 1.5;
/// Seconds of full-forward sprint before stamina is empty.
pub const DEFAULT_SPRINT_MAX_TIME: f32 = 120.0;
/// Seconds of cooldown once stamina is empty.
pub const DEFAULT_SPRINT_COOLDOWN_TIME: f32 = 1.0;
pub const DEFAULT_SPRINT_REGEN_RATE: f32 = 1.0;
/// Share of the cooldown time used as the regeneration pause when cooldown ≤ max time.
pub const SPRINT_PAUSE_COOLDOWN_SHARE: f32 = 0.1;

// --- Crouch ---

pub const DEFAULT_CROUCH_SCALE: f32 = 0.5;
/// Camera and capsule travel when fully crouched (meters).
pub const DEFAULT_CROUCH_DISTANCE: f32 = 0.5;
/// Seconds to go from standing to fully crouched (and back).
pub const DEFAULT_CROUCH_TIME: f32 = 0.2;
/// Length of the stand-up obstruction cast above the capsule (meters).
pub const DEFAULT_UNCROUCH_HEAD_OFFSET: f32 = 0.1;

// --- Vertical / jump ---

/// Gravity along the vertical axis (m/s^2, negative is down).
pub const DEFAULT_GRAVITY: f32 = -30.0;
pub const DEFAULT_JUMP_INITIAL_VELOCITY: f32 = 6.0;
pub const DEFAULT_JUMP_SECOND_INITIAL_VELOCITY: f32 = 6.0;
/// Height over which a held jump uses the weaker held gravity (meters).
pub const DEFAULT_JUMP_HOLD_DISTANCE: f32 = 0.8;
pub const DEFAULT_JUMP_HELD_GRAVITY_FACTOR: f32 = 0.1;
pub const DEFAULT_JUMP_FALLING_GRAVITY_FACTOR: f32 = 0.9;
/// Length of the head-hit cast above the capsule (meters).
pub const DEFAULT_JUMP_HEAD_OFFSET: f32 = 0.1;

// --- Ground probes ---

pub const DEFAULT_GROUNDED_OFFSET: f32 = 0.001;
pub const DEFAULT_GROUND_CLOSE_OFFSET: f32 = 0.5;
/// Ground sphere radius growth relative to the capsule radius (percent).
pub const DEFAULT_GROUND_RADIUS_INCREASE_PCT: f32 = 41.5;
pub const DEFAULT_MAX_GROUNDED_ANGLE_DEGREES: f32 = 30.0;

// --- Capsule ---

pub const DEFAULT_CAPSULE_RADIUS: f32 = 0.3;
pub const DEFAULT_CAPSULE_HEIGHT: f32 = 1.8;
pub const DEFAULT_STEP_HEIGHT: f32 = 0.1;

// --- Rotation ---

pub const DEFAULT_YAW_SENSITIVITY: f32 = 0.0035;
pub const DEFAULT_PITCH_SENSITIVITY: f32 = 0.0035;
pub const DEFAULT_ROTATION_DAMP: f32 = 30.0;
/// Camera pitch is clamped to ±this value.
pub const PITCH_LIMIT: f32 = FRAC_PI_2;
