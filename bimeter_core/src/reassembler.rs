//! Dispatch adapter: raw message in, sparse record out.

use std::collections::HashMap;
use std::sync::Arc;

use bimeter_traits::clock::Clock;
use bimeter_traits::{FieldValue, RawMessage, Record};

use crate::builder::ReassemblerBuilder;
use crate::config::DeviceOptions;
use crate::datapoint::{ChannelField, DatapointKind, DatapointTable};
use crate::state::{DeviceState, DeviceStore};

/// Immutable processing context shared by all devices.
///
/// Device state lives in the `DeviceStore` the caller passes in, so one
/// reassembler can serve any number of stores (e.g. one per worker).
pub struct Reassembler {
    pub(crate) table: DatapointTable,
    pub(crate) defaults: DeviceOptions,
    pub(crate) overrides: HashMap<String, DeviceOptions>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for Reassembler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reassembler")
            .field("datapoints", &self.table.len())
            .field("defaults", &self.defaults)
            .field("overrides", &self.overrides.len())
            .finish()
    }
}

impl Reassembler {
    pub fn builder() -> ReassemblerBuilder {
        ReassemblerBuilder::default()
    }

    pub fn table(&self) -> &DatapointTable {
        &self.table
    }

    pub fn defaults(&self) -> &DeviceOptions {
        &self.defaults
    }

    /// Options a device gets on first contact.
    pub fn options_for(&self, device: &str) -> &DeviceOptions {
        self.overrides.get(device).unwrap_or(&self.defaults)
    }

    /// Fresh state for `device`, as the store would create it.
    pub fn new_state(&self, device: &str) -> DeviceState {
        DeviceState::new(*self.options_for(device)).with_power_scale(self.table.power_scale())
    }

    /// Process one message and return what it caused to be published.
    ///
    /// Never fails: unmapped datapoints, gaps and unknown codes are absorbed.
    pub fn process(&self, store: &mut DeviceStore, msg: &RawMessage) -> Record {
        let state = store.get_or_insert_with(&msg.device, || self.new_state(&msg.device));
        let mut record = Record::new(msg.device.as_str());

        let class = state.observe_sequence(msg.sequence);
        tracing::trace!(
            device = %msg.device,
            dp = msg.datapoint,
            value = msg.value,
            seq = ?msg.sequence,
            class = ?class,
            "message"
        );

        let Some(spec) = self.table.get(msg.datapoint) else {
            state.stats.unmapped += 1;
            tracing::trace!(device = %msg.device, dp = msg.datapoint, "unmapped datapoint ignored");
            return record;
        };

        match &spec.kind {
            DatapointKind::CombinedPower => {
                state.stats.discarded += 1;
                tracing::trace!(device = %msg.device, "device combined power discarded");
            }
            DatapointKind::Passthrough(name) => {
                record.insert(name.as_str(), FieldValue::Number(spec.scale(msg.value)));
            }
            DatapointKind::Channel(ch, field) => {
                let ch = *ch;
                match field {
                    ChannelField::Power => {
                        let now = self.clock.unix_ms();
                        state.power(ch, spec.scale(msg.value), now, &mut record);
                    }
                    ChannelField::Current => {
                        let now = self.clock.unix_ms();
                        state.current(ch, spec.scale(msg.value), now, &mut record);
                    }
                    ChannelField::PowerFactor => {
                        state.power_factor(ch, spec.scale(msg.value), &mut record);
                    }
                    ChannelField::EnergyFlow => {
                        state.energy_flow(ch, msg.value, &mut record);
                    }
                }
            }
        }
        record
    }
}
