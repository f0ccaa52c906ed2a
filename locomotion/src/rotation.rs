/*!
Look rotation smoothing.

Yaw and pitch input deltas become a target rotation delta; the applied delta eases
toward it at `damp · dt` per tick (slerp or nlerp) and snaps when that factor exceeds 1.
The smoothed yaw turns the character, the smoothed pitch tilts the camera.
*/

use crate::config::RotationConfig;
use crate::settings::PITCH_LIMIT;
use crate::types::Quat;
use crate::utils::wrap_angle;

const SLERP_EPSILON: f32 = 1.0e-6;

#[derive(Clone, Debug)]
pub struct RotationSmoother {
    /// Smoothed per-tick rotation delta.
    pub look_delta: Quat,
    /// Target delta as (pitch, roll, yaw) angles.
    pub angles: [f32; 3],
    /// Character yaw about +Z.
    pub heading: f32,
    /// Camera pitch, within ±π/2.
    pub pitch: f32,
    yaw_via_script: bool,
    pitch_via_script: bool,
    heading_via_script: bool,
}

impl Default for RotationSmoother {
    fn default() -> Self {
        Self {
            look_delta: Quat::identity(),
            angles: [0.0; 3],
            heading: 0.0,
            pitch: 0.0,
            yaw_via_script: false,
            pitch_via_script: false,
            heading_via_script: false,
        }
    }
}

impl RotationSmoother {
    /// Replace the target delta for the next tick instead of deriving it from input.
    pub fn set_rotation_target_for_tick(&mut self, pitch: f32, yaw: f32) {
        self.angles[0] = pitch;
        self.angles[2] = yaw;
        self.pitch_via_script = true;
        self.yaw_via_script = true;
    }

    /// Force the heading for the next tick; the smoothed yaw is not applied on top.
    pub fn set_heading_for_tick(&mut self, heading: f32) {
        self.heading = wrap_angle(heading);
        self.heading_via_script = true;
    }

    fn smooth(&mut self, yaw_value: f32, pitch_value: f32, cfg: &RotationConfig, dt: f32) {
        // Positive input turns right and looks down; positive angles go the other way.
        if self.yaw_via_script {
            self.yaw_via_script = false;
        } else {
            self.angles[2] = -yaw_value * cfg.yaw_sensitivity;
        }
        if self.pitch_via_script {
            self.pitch_via_script = false;
        } else {
            self.angles[0] = -pitch_value * cfg.pitch_sensitivity;
        }

        let target = Quat::from_euler_angles(self.angles[0], self.angles[1], self.angles[2]);
        let t = cfg.damp * dt;
        self.look_delta = if t > 1.0 {
            target
        } else if cfg.slerp {
            self.look_delta
                .try_slerp(&target, t, SLERP_EPSILON)
                .unwrap_or_else(|| self.look_delta.nlerp(&target, t))
        } else {
            self.look_delta.nlerp(&target, t)
        };
    }

    /// Advance one frame. Returns the yaw applied to the heading this frame.
    pub fn update(&mut self, yaw_value: f32, pitch_value: f32, cfg: &RotationConfig, dt: f32) -> f32 {
        self.smooth(yaw_value, pitch_value, cfg, dt);
        let (pitch_delta, _, yaw_delta) = self.look_delta.euler_angles();

        self.pitch = (self.pitch + pitch_delta).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        if self.heading_via_script {
            self.heading_via_script = false;
            return 0.0;
        }
        self.heading = wrap_angle(self.heading + yaw_delta);
        yaw_delta
    }
}
