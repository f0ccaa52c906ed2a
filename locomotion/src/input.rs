//! Latched input channels.
//!
//! The host feeds press/hold/release occurrences per channel; the controller only
//! reads the latched values during its update. There is no binding format here, a
//! channel's `name` is just the label the host used to route events to it.

/// The nine input channels the controller reads.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputChannel {
    Forward = 0,
    Back = 1,
    Left = 2,
    Right = 3,
    Yaw = 4,
    Pitch = 5,
    Sprint = 6,
    Crouch = 7,
    Jump = 8,
}

impl InputChannel {
    pub const COUNT: usize = 9;

    pub const ALL: [InputChannel; Self::COUNT] = [
        InputChannel::Forward,
        InputChannel::Back,
        InputChannel::Left,
        InputChannel::Right,
        InputChannel::Yaw,
        InputChannel::Pitch,
        InputChannel::Sprint,
        InputChannel::Crouch,
        InputChannel::Jump,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Default event name used for this channel.
    pub fn default_name(self) -> &'static str {
        match self {
            InputChannel::Forward => "Forward",
            InputChannel::Back => "Back",
            InputChannel::Left => "Left",
            InputChannel::Right => "Right",
            InputChannel::Yaw => "Rotate Yaw",
            InputChannel::Pitch => "Rotate Pitch",
            InputChannel::Sprint => "Sprint",
            InputChannel::Crouch => "Crouch",
            InputChannel::Jump => "Jump",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct InputEntry {
    pub name: String,
    pub value: f32,
}

/// Fixed table of channel entries, indexed by [`InputChannel`].
///
/// Sprint carries two extra latches: the acceleration value captured on press
/// (`value * sprint_accel_scale`) and the previous tick's sprint value, which the
/// hold path consults while airborne.
#[derive(Clone, Debug)]
pub struct InputTable {
    entries: [InputEntry; InputChannel::COUNT],
    sprint_accel_value: f32,
    sprint_prev_value: f32,
}

impl Default for InputTable {
    fn default() -> Self {
        Self {
            entries: InputChannel::ALL.map(|c| InputEntry {
                name: c.default_name().to_string(),
                value: 0.0,
            }),
            sprint_accel_value: 0.0,
            sprint_prev_value: 0.0,
        }
    }
}

impl InputTable {
    #[inline]
    pub fn value(&self, channel: InputChannel) -> f32 {
        self.entries[channel.index()].value
    }

    #[inline]
    pub fn set_value(&mut self, channel: InputChannel, value: f32) {
        self.entries[channel.index()].value = value;
    }

    pub fn name(&self, channel: InputChannel) -> &str {
        &self.entries[channel.index()].name
    }

    pub fn set_name(&mut self, channel: InputChannel, name: impl Into<String>) {
        self.entries[channel.index()].name = name.into();
    }

    /// Look up a channel by the name it is currently registered under.
    pub fn channel_by_name(&self, name: &str) -> Option<InputChannel> {
        InputChannel::ALL
            .into_iter()
            .find(|c| self.entries[c.index()].name == name)
    }

    #[inline]
    pub fn sprint_accel_value(&self) -> f32 {
        self.sprint_accel_value
    }

    #[inline]
    pub fn set_sprint_accel_value(&mut self, value: f32) {
        self.sprint_accel_value = value;
    }

    #[inline]
    pub fn sprint_prev_value(&self) -> f32 {
        self.sprint_prev_value
    }

    #[inline]
    pub fn set_sprint_prev_value(&mut self, value: f32) {
        self.sprint_prev_value = value;
    }

    /// A channel went down this frame.
    ///
    /// Sprint only latches while grounded; airborne presses clear it.
    pub fn press(&mut self, channel: InputChannel, value: f32, grounded: bool, sprint_accel_scale: f32) {
        if channel == InputChannel::Sprint {
            self.latch_sprint(value, grounded, sprint_accel_scale);
            return;
        }
        self.set_value(channel, value);
    }

    /// A channel is still held this frame.
    ///
    /// Only the rotation channels and sprint update on hold. Sprint keeps latching
    /// while airborne unless it was already fully engaged on the previous tick.
    pub fn hold(&mut self, channel: InputChannel, value: f32, grounded: bool, sprint_accel_scale: f32) {
        match channel {
            InputChannel::Yaw | InputChannel::Pitch => self.set_value(channel, value),
            InputChannel::Sprint => {
                let airborne_latch = self.sprint_prev_value != 1.0;
                self.latch_sprint(value, grounded || airborne_latch, sprint_accel_scale);
            }
            _ => {}
        }
    }

    pub fn release(&mut self, channel: InputChannel) {
        self.set_value(channel, 0.0);
    }

    fn latch_sprint(&mut self, value: f32, allowed: bool, sprint_accel_scale: f32) {
        if allowed {
            self.set_value(InputChannel::Sprint, value);
            self.sprint_accel_value = value * sprint_accel_scale;
        } else {
            self.set_value(InputChannel::Sprint, 0.0);
        }
    }

    /// Route a press by registered name. Returns `false` if no channel has that name.
    pub fn press_named(&mut self, name: &str, value: f32, grounded: bool, sprint_accel_scale: f32) -> bool {
        match self.channel_by_name(name) {
            Some(channel) => {
                self.press(channel, value, grounded, sprint_accel_scale);
                true
            }
            None => false,
        }
    }
}
