//! Field entry points and the flush policy.
//!
//! A channel's fields are buffered as they arrive. The trigger field
//! (power factor, or the direction when it is known to arrive a cycle late)
//! attempts a flush; a zero power/current reading flushes the canonical
//! "no flow" snapshot immediately. Every flush consumes the buffer and bumps
//! the channel's update counter, whatever it ends up publishing.

use bimeter_traits::{FieldValue, Record};

use crate::channel::{Channel, FieldSet, ZeroField};
use crate::config::{ChannelOptions, FlushTrigger, MissingData, PowerSign};
use crate::flow::{self, FlowDirection, FlowLabel};
use crate::state::DeviceState;

/// What a flush attempt ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// All four fields were present and published.
    Complete,
    /// Some fields missing; published per `KeepPresent`/`NullifyMissing`.
    Partial,
    /// Some fields missing; nothing but the counter published (`KeepAll`).
    Withheld,
    /// All four fields published as null.
    Nullified,
}

/// Publication decision for a single field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Emit<T> {
    /// Leave the published value untouched.
    Skip,
    Value(T),
    Null,
}

impl<T> Emit<T> {
    fn from_option(v: Option<T>, nullify: bool) -> Self {
        match (v, nullify) {
            (Some(v), _) => Emit::Value(v),
            (None, true) => Emit::Null,
            (None, false) => Emit::Skip,
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Emit<U> {
        match self {
            Emit::Skip => Emit::Skip,
            Emit::Value(v) => Emit::Value(f(v)),
            Emit::Null => Emit::Null,
        }
    }
}

/// Everything one flush publishes for a channel, before the counter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emission {
    pub outcome: FlushOutcome,
    pub power: Emit<f64>,
    pub current: Emit<f64>,
    pub power_factor: Emit<f64>,
    pub label: Emit<FlowLabel>,
    pub timestamp: Option<u64>,
    /// Effect on the channel's last published signed power.
    pub signed_power: Emit<f64>,
}

impl Emission {
    fn withheld() -> Self {
        Self {
            outcome: FlushOutcome::Withheld,
            power: Emit::Skip,
            current: Emit::Skip,
            power_factor: Emit::Skip,
            label: Emit::Skip,
            timestamp: None,
            signed_power: Emit::Skip,
        }
    }

    /// All four fields null.
    ///
    /// The `NullifyAll` disposition passes `None`: nothing usable arrived, so
    /// no reception time is published. Zero-glitch suppression passes the
    /// time of the suppressed reading, since that flush stands in for a
    /// power value that was actually received.
    pub fn nullified(timestamp: Option<u64>) -> Self {
        Self {
            outcome: FlushOutcome::Nullified,
            power: Emit::Null,
            current: Emit::Null,
            power_factor: Emit::Null,
            label: Emit::Null,
            timestamp,
            signed_power: Emit::Null,
        }
    }
}

/// Decide what a flush of `fields` publishes.
pub fn decide(fields: FieldSet, options: &ChannelOptions, missing: MissingData) -> Emission {
    if let (Some(sign), Some(power), Some(current), Some(power_factor)) =
        (fields.sign, fields.power, fields.current, fields.power_factor)
    {
        let r = flow::resolve(sign, power, options.power_sign);
        return Emission {
            outcome: FlushOutcome::Complete,
            power: Emit::Value(r.power),
            current: Emit::Value(current),
            power_factor: Emit::Value(power_factor),
            label: Emit::Value(r.label),
            timestamp: fields.received_at,
            signed_power: r.signed.map_or(Emit::Null, Emit::Value),
        };
    }
    match missing {
        MissingData::KeepAll => Emission::withheld(),
        MissingData::NullifyAll => Emission::nullified(None),
        MissingData::KeepPresent => partial(fields, options.power_sign, false),
        MissingData::NullifyMissing => partial(fields, options.power_sign, true),
    }
}

fn partial(fields: FieldSet, mode: PowerSign, nullify: bool) -> Emission {
    let (power, label, signed) = match (fields.sign, fields.power) {
        (Some(dir), Some(mag)) => {
            let r = flow::resolve(dir, mag, mode);
            (
                Some(r.power),
                Some(r.label),
                r.signed.map_or(Emit::Null, Emit::Value),
            )
        }
        // Direction unknown: the magnitude can go out unsigned, but the
        // signed history no longer matches what is published.
        (None, Some(mag)) => match mode {
            PowerSign::Unsigned => (Some(mag), None, Emit::Null),
            PowerSign::Signed => (None, None, Emit::Skip),
        },
        (Some(dir), None) => (None, Some(dir.label_for(mode)), Emit::Skip),
        (None, None) => (None, None, Emit::Skip),
    };
    let power = Emit::from_option(power, nullify);
    let signed_power = if power == Emit::Null {
        Emit::Null
    } else {
        signed
    };
    let timestamp = match power {
        Emit::Value(_) => fields.received_at,
        _ => None,
    };
    Emission {
        outcome: FlushOutcome::Partial,
        power,
        current: Emit::from_option(fields.current, nullify),
        power_factor: Emit::from_option(fields.power_factor, nullify),
        label: Emit::from_option(label, nullify),
        timestamp,
        signed_power,
    }
}

fn put(record: &mut Record, name: String, value: Emit<FieldValue>) {
    match value {
        Emit::Skip => {}
        Emit::Value(v) => record.insert(name, v),
        Emit::Null => record.insert(name, FieldValue::Null),
    }
}

impl DeviceState {
    /// Buffer a power magnitude. Zero takes the zero shortcut.
    pub fn power(&mut self, ch: Channel, value: f64, now_ms: u64, record: &mut Record) {
        if value == 0.0 {
            self.zero_reading(ch, ZeroField::Power, now_ms, record);
            return;
        }
        let buf = self.channel_mut(ch);
        buf.clear_zero(ZeroField::Power);
        buf.set_power(value, now_ms);
    }

    /// Buffer a current magnitude. Zero takes the zero shortcut.
    pub fn current(&mut self, ch: Channel, value: f64, now_ms: u64, record: &mut Record) {
        if value == 0.0 {
            self.zero_reading(ch, ZeroField::Current, now_ms, record);
            return;
        }
        let buf = self.channel_mut(ch);
        buf.clear_zero(ZeroField::Current);
        buf.set_current(value);
    }

    /// Buffer a power factor; flushes unless the direction is the trigger.
    pub fn power_factor(&mut self, ch: Channel, value: f64, record: &mut Record) {
        self.channel_mut(ch).set_power_factor(value);
        if self.options.channel(ch).trigger == FlushTrigger::PowerFactor {
            self.flush(ch, record);
        }
    }

    /// Buffer a raw direction code; flushes when the direction is the trigger.
    pub fn energy_flow(&mut self, ch: Channel, code: i64, record: &mut Record) {
        let direction = self.options.direction.decode(code);
        if let FlowDirection::Unknown(code) = direction {
            tracing::warn!(channel = %ch, code, "unknown direction code");
        }
        self.channel_mut(ch).set_sign(direction);
        if self.options.channel(ch).trigger == FlushTrigger::DelayedDirection {
            self.flush(ch, record);
        }
    }

    /// Consume the channel's buffer and publish per policy.
    pub fn flush(&mut self, ch: Channel, record: &mut Record) -> FlushOutcome {
        let fields = self.channel_mut(ch).take();
        let emission = decide(fields, self.options.channel(ch), self.options.missing_data);
        self.publish(ch, emission, record)
    }

    fn zero_reading(&mut self, ch: Channel, field: ZeroField, now_ms: u64, record: &mut Record) {
        let suppress =
            self.options.single_zero_suppression && self.channel_mut(ch).mark_zero(field);
        if suppress {
            tracing::debug!(channel = %ch, ?field, "isolated zero reading nullified");
            self.channel_mut(ch).clear();
            self.publish(ch, Emission::nullified(Some(now_ms)), record);
        } else {
            self.channel_mut(ch).load_canonical_zero(now_ms);
            self.flush(ch, record);
        }
    }

    fn publish(&mut self, ch: Channel, e: Emission, record: &mut Record) -> FlushOutcome {
        put(record, ch.field("power"), e.power.map(FieldValue::Number));
        put(record, ch.field("current"), e.current.map(FieldValue::Number));
        put(
            record,
            ch.field("power_factor"),
            e.power_factor.map(FieldValue::Number),
        );
        put(
            record,
            ch.field("energy_flow"),
            e.label.map(|l| FieldValue::Label(l.as_str())),
        );
        if let Some(ts) = e.timestamp {
            record.insert(ch.field("timestamp"), FieldValue::Timestamp(ts));
        }
        let counter = self.channel_mut(ch).bump_counter();
        record.insert(ch.field("update"), FieldValue::Counter(counter));

        match e.signed_power {
            Emit::Value(v) => {
                self.channel_mut(ch).set_last_emitted_signed_power(Some(v));
                self.recompute_combined(record);
            }
            Emit::Null => self.channel_mut(ch).set_last_emitted_signed_power(None),
            Emit::Skip => {}
        }

        match e.outcome {
            FlushOutcome::Complete => self.stats.complete_flushes += 1,
            FlushOutcome::Partial => self.stats.partial_flushes += 1,
            FlushOutcome::Withheld => self.stats.withheld_flushes += 1,
            FlushOutcome::Nullified => self.stats.nullified_flushes += 1,
        }
        tracing::debug!(channel = %ch, outcome = ?e.outcome, counter, "flush");
        e.outcome
    }
}
