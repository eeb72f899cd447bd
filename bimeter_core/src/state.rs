//! Explicit per-device state store.
//!
//! Each device identity owns one `DeviceState`, created on first use and
//! mutated only while processing that device's messages. The store is passed
//! into `Reassembler::process`; there is no ambient table.

use std::collections::HashMap;

use crate::channel::{Channel, ChannelBuffer};
use crate::config::DeviceOptions;
use crate::datapoint::DEFAULT_POWER_SCALE;
use crate::sequence::{SequenceClass, SequenceTracker};

/// Per-device counters for operational visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub messages: u64,
    pub baselines: u64,
    pub in_order: u64,
    pub duplicates: u64,
    pub gaps: u64,
    pub control_advances: u64,
    pub unmapped: u64,
    pub discarded: u64,
    pub complete_flushes: u64,
    pub partial_flushes: u64,
    pub withheld_flushes: u64,
    pub nullified_flushes: u64,
}

#[derive(Debug, Clone)]
pub struct DeviceState {
    pub(crate) options: DeviceOptions,
    pub(crate) sequence: SequenceTracker,
    pub(crate) channel_a: ChannelBuffer,
    pub(crate) channel_b: ChannelBuffer,
    /// Integer grid for the combined total (units per 1.0).
    pub(crate) power_scale: i64,
    pub(crate) stats: DeviceStats,
}

impl DeviceState {
    pub fn new(options: DeviceOptions) -> Self {
        Self {
            sequence: SequenceTracker::new(options.sequence_increment),
            options,
            channel_a: ChannelBuffer::new(),
            channel_b: ChannelBuffer::new(),
            power_scale: DEFAULT_POWER_SCALE,
            stats: DeviceStats::default(),
        }
    }

    pub fn with_power_scale(mut self, scale: i64) -> Self {
        self.power_scale = scale.max(1);
        self
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    pub fn stats(&self) -> &DeviceStats {
        &self.stats
    }

    pub fn last_sequence(&self) -> Option<u16> {
        self.sequence.last()
    }

    pub fn channel(&self, ch: Channel) -> &ChannelBuffer {
        match ch {
            Channel::A => &self.channel_a,
            Channel::B => &self.channel_b,
        }
    }

    pub(crate) fn channel_mut(&mut self, ch: Channel) -> &mut ChannelBuffer {
        match ch {
            Channel::A => &mut self.channel_a,
            Channel::B => &mut self.channel_b,
        }
    }

    /// Update sequence tracking for one message.
    ///
    /// `None` is an unsequenced control message and advances the counter by
    /// one step without comparison. A gap clears the buffered fields of both
    /// channels when missing-message detection is enabled; published history
    /// (`last_emitted_signed_power`, counters) is kept.
    pub fn observe_sequence(&mut self, seq: Option<u16>) -> Option<SequenceClass> {
        self.stats.messages += 1;
        let Some(seq) = seq else {
            self.sequence.advance();
            self.stats.control_advances += 1;
            return None;
        };
        let class = self.sequence.observe(seq);
        match class {
            SequenceClass::Baseline => self.stats.baselines += 1,
            SequenceClass::InOrder => self.stats.in_order += 1,
            SequenceClass::Duplicate => {
                self.stats.duplicates += 1;
                tracing::debug!(seq, "duplicate sequence number");
            }
            SequenceClass::Gap { expected } => {
                self.stats.gaps += 1;
                if self.options.missing_message_detection {
                    tracing::warn!(seq, expected, "sequence gap; dropping buffered fields");
                    self.clear_buffers();
                } else {
                    tracing::debug!(seq, expected, "sequence gap ignored");
                }
            }
        }
        Some(class)
    }

    /// Drop every buffered per-cycle field on both channels.
    pub fn clear_buffers(&mut self) {
        self.channel_a.clear();
        self.channel_b.clear();
    }
}

/// Owned map from device identity to its state.
#[derive(Debug, Default)]
pub struct DeviceStore {
    devices: HashMap<String, DeviceState>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, device: &str) -> Option<&DeviceState> {
        self.devices.get(device)
    }

    /// State for `device`, created with `init` on first access.
    pub fn get_or_insert_with(
        &mut self,
        device: &str,
        init: impl FnOnce() -> DeviceState,
    ) -> &mut DeviceState {
        self.devices.entry(device.to_string()).or_insert_with(|| {
            tracing::debug!(device, "new device state");
            init()
        })
    }

    /// Forget a device; for the owner of the device registry.
    pub fn remove(&mut self, device: &str) -> Option<DeviceState> {
        self.devices.remove(device)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DeviceState)> {
        self.devices.iter().map(|(k, v)| (k.as_str(), v))
    }
}
