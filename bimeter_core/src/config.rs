//! Typed reassembly options.
//!
//! These are the runtime option types held by each `DeviceState`. They are
//! separate from the TOML-deserialized config in `bimeter_config`; see
//! `conversions` for the mapping.

use crate::channel::Channel;
use crate::error::BuildError;
use crate::flow::FlowDirection;

/// Sequence step observed on the reference device (high byte of the counter).
pub const DEFAULT_SEQUENCE_INCREMENT: u16 = 256;

/// Which field completes a channel's cycle and triggers a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushTrigger {
    /// Power factor is the last per-channel field within a cycle.
    #[default]
    PowerFactor,
    /// Direction arrives one cycle late and closes the cycle instead.
    DelayedDirection,
}

/// How a channel's power and direction are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerSign {
    /// Magnitude plus a `consuming`/`producing` label.
    #[default]
    Unsigned,
    /// Signed value plus the fixed `sign` label.
    Signed,
}

/// What an incomplete flush publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingData {
    /// Publish nothing but the update counter.
    #[default]
    KeepAll,
    /// Publish only the fields that were buffered.
    KeepPresent,
    /// Publish all fields, missing ones as null.
    NullifyMissing,
    /// Publish all fields as null.
    NullifyAll,
}

/// Per-device-family meaning of the raw direction code.
///
/// Firmware variants disagree on whether `1` or `0` means reverse flow, so the
/// mapping is a calibration constant rather than a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionCalibration {
    /// Raw code meaning reverse flow (producing). Must be 0 or 1.
    pub reverse_code: i64,
}

impl Default for DirectionCalibration {
    fn default() -> Self {
        Self { reverse_code: 1 }
    }
}

impl DirectionCalibration {
    /// Decode a raw direction code. Anything outside {0, 1} is `Unknown`.
    pub fn decode(&self, code: i64) -> FlowDirection {
        match code {
            0 | 1 if code == self.reverse_code => FlowDirection::Producing,
            0 | 1 => FlowDirection::Consuming,
            other => FlowDirection::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelOptions {
    pub trigger: FlushTrigger,
    pub power_sign: PowerSign,
}

/// Options resolved once per device and passed into every flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceOptions {
    pub channel_a: ChannelOptions,
    pub channel_b: ChannelOptions,
    /// Nullify the first zero power/current reading after a nonzero one.
    pub single_zero_suppression: bool,
    /// Clear buffered fields of both channels on a sequence gap.
    pub missing_message_detection: bool,
    pub missing_data: MissingData,
    /// Expected step between consecutive sequence numbers.
    pub sequence_increment: u16,
    pub direction: DirectionCalibration,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            channel_a: ChannelOptions::default(),
            channel_b: ChannelOptions::default(),
            single_zero_suppression: false,
            missing_message_detection: true,
            missing_data: MissingData::default(),
            sequence_increment: DEFAULT_SEQUENCE_INCREMENT,
            direction: DirectionCalibration::default(),
        }
    }
}

impl DeviceOptions {
    pub fn channel(&self, ch: Channel) -> &ChannelOptions {
        match ch {
            Channel::A => &self.channel_a,
            Channel::B => &self.channel_b,
        }
    }

    pub fn channel_mut(&mut self, ch: Channel) -> &mut ChannelOptions {
        match ch {
            Channel::A => &mut self.channel_a,
            Channel::B => &mut self.channel_b,
        }
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        if self.sequence_increment == 0 {
            return Err(BuildError::InvalidConfig("sequence_increment must be >= 1"));
        }
        if !(0..=1).contains(&self.direction.reverse_code) {
            return Err(BuildError::InvalidConfig(
                "direction reverse_code must be 0 or 1",
            ));
        }
        Ok(())
    }
}
