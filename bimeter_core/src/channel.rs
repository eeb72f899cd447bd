//! Per-channel field buffer.
//!
//! Holds the latest value of each of the four per-cycle fields until a flush
//! consumes them. `take()` reads and clears in one step so no value can be
//! published twice.

use crate::flow::FlowDirection;

/// One of the two independent measurement lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    A,
    B,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::A, Channel::B];

    /// Suffix used in published field names (`power_a`, `update_b`, ...).
    pub fn suffix(self) -> &'static str {
        match self {
            Channel::A => "a",
            Channel::B => "b",
        }
    }

    pub fn other(self) -> Channel {
        match self {
            Channel::A => Channel::B,
            Channel::B => Channel::A,
        }
    }

    /// Published field name for `base` on this channel.
    pub fn field(self, base: &str) -> String {
        format!("{base}_{}", self.suffix())
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// The four per-cycle fields plus the power receipt time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldSet {
    pub sign: Option<FlowDirection>,
    pub power: Option<f64>,
    pub current: Option<f64>,
    pub power_factor: Option<f64>,
    /// Milliseconds since the UNIX epoch at which `power` was written.
    pub received_at: Option<u64>,
}

impl FieldSet {
    /// Device-defined "no flow" snapshot: forward, 0 W, 0 A, PF 100.
    pub fn canonical_zero(now_ms: u64) -> Self {
        Self {
            sign: Some(FlowDirection::Consuming),
            power: Some(0.0),
            current: Some(0.0),
            power_factor: Some(100.0),
            received_at: Some(now_ms),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.sign.is_some()
            && self.power.is_some()
            && self.current.is_some()
            && self.power_factor.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.sign.is_none()
            && self.power.is_none()
            && self.current.is_none()
            && self.power_factor.is_none()
    }
}

/// Fields subject to one-shot zero suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroField {
    Power,
    Current,
}

/// Wrapping 16-bit counter bumped on every flush attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateCounter(u16);

impl UpdateCounter {
    pub fn value(self) -> u16 {
        self.0
    }

    /// Advance and return the new value; 65535 wraps to 0.
    pub fn bump(&mut self) -> u16 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChannelBuffer {
    fields: FieldSet,
    /// Survives flushes and gaps; only the publication path writes it.
    last_emitted_signed_power: Option<f64>,
    zero_power_seen: bool,
    zero_current_seen: bool,
    counter: UpdateCounter,
}

impl ChannelBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn set_power(&mut self, value: f64, now_ms: u64) {
        self.fields.power = Some(value);
        self.fields.received_at = Some(now_ms);
    }

    pub fn set_current(&mut self, value: f64) {
        self.fields.current = Some(value);
    }

    pub fn set_power_factor(&mut self, value: f64) {
        self.fields.power_factor = Some(value);
    }

    pub fn set_sign(&mut self, direction: FlowDirection) {
        self.fields.sign = Some(direction);
    }

    /// Overwrite all four fields with the canonical zero snapshot.
    pub fn load_canonical_zero(&mut self, now_ms: u64) {
        self.fields = FieldSet::canonical_zero(now_ms);
    }

    /// Read all fields and leave the buffer empty.
    pub fn take(&mut self) -> FieldSet {
        std::mem::take(&mut self.fields)
    }

    /// Drop buffered fields without publishing them.
    pub fn clear(&mut self) {
        self.fields = FieldSet::default();
    }

    pub fn last_emitted_signed_power(&self) -> Option<f64> {
        self.last_emitted_signed_power
    }

    pub(crate) fn set_last_emitted_signed_power(&mut self, value: Option<f64>) {
        self.last_emitted_signed_power = value;
    }

    /// Record a zero reading for `field`; returns true if it is the first
    /// since the last nonzero reading of that field.
    pub fn mark_zero(&mut self, field: ZeroField) -> bool {
        let flag = self.zero_flag(field);
        let first = !*flag;
        *flag = true;
        first
    }

    pub fn clear_zero(&mut self, field: ZeroField) {
        *self.zero_flag(field) = false;
    }

    fn zero_flag(&mut self, field: ZeroField) -> &mut bool {
        match field {
            ZeroField::Power => &mut self.zero_power_seen,
            ZeroField::Current => &mut self.zero_current_seen,
        }
    }

    pub fn update_counter(&self) -> u16 {
        self.counter.value()
    }

    pub(crate) fn bump_counter(&mut self) -> u16 {
        self.counter.bump()
    }

    #[cfg(test)]
    pub(crate) fn set_counter(&mut self, value: u16) {
        self.counter = UpdateCounter(value);
    }
}
