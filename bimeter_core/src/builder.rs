//! Builder for `Reassembler`.
//!
//! Every setter is optional: the defaults are the reference datapoint table,
//! `DeviceOptions::default()` and the system clock. `build()` validates.

use std::collections::HashMap;
use std::sync::Arc;

use bimeter_traits::clock::{Clock, SystemClock};

use crate::config::DeviceOptions;
use crate::datapoint::DatapointTable;
use crate::error::{BuildError, Result};
use crate::reassembler::Reassembler;

#[derive(Default)]
pub struct ReassemblerBuilder {
    table: Option<DatapointTable>,
    defaults: Option<DeviceOptions>,
    overrides: HashMap<String, DeviceOptions>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl ReassemblerBuilder {
    pub fn with_table(mut self, table: DatapointTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_defaults(mut self, options: DeviceOptions) -> Self {
        self.defaults = Some(options);
        self
    }

    /// Options for one device identity, replacing the defaults for it.
    pub fn with_device_options(mut self, device: impl Into<String>, options: DeviceOptions) -> Self {
        self.overrides.insert(device.into(), options);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn build(self) -> Result<Reassembler> {
        validate_and_build(self.table, self.defaults, self.overrides, self.clock)
    }
}

/// Validate options and assemble the reassembler.
fn validate_and_build(
    table: Option<DatapointTable>,
    defaults: Option<DeviceOptions>,
    overrides: HashMap<String, DeviceOptions>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
) -> Result<Reassembler> {
    let table = table.unwrap_or_else(DatapointTable::bidirectional_meter);
    if table.is_empty() {
        return Err(eyre::Report::new(BuildError::EmptyTable));
    }
    let defaults = defaults.unwrap_or_default();
    defaults.validate().map_err(eyre::Report::new)?;
    for (device, opts) in &overrides {
        opts.validate().map_err(|e| {
            let reason = match e {
                BuildError::InvalidConfig(r) => r,
                _ => "invalid options",
            };
            eyre::Report::new(BuildError::InvalidDevice {
                device: device.clone(),
                reason,
            })
        })?;
    }
    let clock = clock.unwrap_or_else(|| Arc::new(SystemClock::new()));
    tracing::debug!(
        datapoints = table.len(),
        overrides = overrides.len(),
        "reassembler built"
    );
    Ok(Reassembler {
        table,
        defaults,
        overrides,
        clock,
    })
}


impl std::fmt::Debug for ReassemblerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReassemblerBuilder")
            .field("table", &self.table)
            .field("defaults", &self.defaults)
            .field("overrides", &self.overrides)
            .field("clock", &self.clock.as_ref().map(|_| "<dyn Clock>"))
            .finish()
    }
}
