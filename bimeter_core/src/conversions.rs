//! Conversions from `bimeter_config` types to the core's typed options.

use bimeter_config::{ChannelCfg, Config, DatapointRow, Defaults, DeviceOverride, MissingDataMode};

use crate::builder::ReassemblerBuilder;
use crate::config::{
    ChannelOptions, DeviceOptions, DirectionCalibration, FlushTrigger, MissingData, PowerSign,
};
use crate::datapoint::{DatapointKind, DatapointSpec, DatapointTable};
use crate::error::{BuildError, CoreError, Result};

impl From<MissingDataMode> for MissingData {
    fn from(m: MissingDataMode) -> Self {
        match m {
            MissingDataMode::KeepAll => MissingData::KeepAll,
            MissingDataMode::KeepPresent => MissingData::KeepPresent,
            MissingDataMode::NullifyMissing => MissingData::NullifyMissing,
            MissingDataMode::NullifyAll => MissingData::NullifyAll,
        }
    }
}

fn trigger(delay_direction: bool) -> FlushTrigger {
    if delay_direction {
        FlushTrigger::DelayedDirection
    } else {
        FlushTrigger::PowerFactor
    }
}

fn power_sign(signed: bool) -> PowerSign {
    if signed {
        PowerSign::Signed
    } else {
        PowerSign::Unsigned
    }
}

impl From<&ChannelCfg> for ChannelOptions {
    fn from(c: &ChannelCfg) -> Self {
        Self {
            trigger: trigger(c.delay_direction),
            power_sign: power_sign(c.signed_power),
        }
    }
}

fn increment(v: u32) -> std::result::Result<u16, BuildError> {
    u16::try_from(v)
        .map_err(|_| BuildError::InvalidConfig("sequence_increment must be in 1..=65535"))
}

impl TryFrom<&Defaults> for DeviceOptions {
    type Error = BuildError;

    fn try_from(d: &Defaults) -> std::result::Result<Self, Self::Error> {
        let opts = Self {
            channel_a: ChannelOptions::from(&d.channel_a),
            channel_b: ChannelOptions::from(&d.channel_b),
            single_zero_suppression: d.single_zero_suppression,
            missing_message_detection: d.missing_message_detection,
            missing_data: d.missing_data.into(),
            sequence_increment: increment(d.sequence_increment)?,
            direction: DirectionCalibration {
                reverse_code: d.direction_reverse_code,
            },
        };
        opts.validate()?;
        Ok(opts)
    }
}

impl DeviceOptions {
    /// These options with every field the override sets replaced.
    pub fn overridden_by(&self, o: &DeviceOverride) -> std::result::Result<Self, BuildError> {
        let mut opts = *self;
        if let Some(v) = o.sequence_increment {
            opts.sequence_increment = increment(v)?;
        }
        if let Some(v) = o.direction_reverse_code {
            opts.direction.reverse_code = v;
        }
        if let Some(v) = o.single_zero_suppression {
            opts.single_zero_suppression = v;
        }
        if let Some(v) = o.missing_message_detection {
            opts.missing_message_detection = v;
        }
        if let Some(v) = o.missing_data {
            opts.missing_data = v.into();
        }
        if let Some(v) = o.delay_direction_a {
            opts.channel_a.trigger = trigger(v);
        }
        if let Some(v) = o.delay_direction_b {
            opts.channel_b.trigger = trigger(v);
        }
        if let Some(v) = o.signed_power_a {
            opts.channel_a.power_sign = power_sign(v);
        }
        if let Some(v) = o.signed_power_b {
            opts.channel_b.power_sign = power_sign(v);
        }
        opts.validate()?;
        Ok(opts)
    }
}

impl From<&[DatapointRow]> for DatapointTable {
    fn from(rows: &[DatapointRow]) -> Self {
        let mut table = DatapointTable::new();
        for row in rows {
            let kind = DatapointKind::from_field_name(row.field.trim());
            table.insert(row.dp, DatapointSpec::new(kind, row.divisor));
        }
        table
    }
}

impl ReassemblerBuilder {
    /// Apply `[defaults]` and every `[devices."<id>"]` section of `cfg`.
    ///
    /// The datapoint table is left alone; load it separately since it lives
    /// in its own file.
    pub fn with_config(self, cfg: &Config) -> Result<Self> {
        let defaults = DeviceOptions::try_from(&cfg.defaults)
            .map_err(|e| eyre::Report::new(CoreError::Config(e.to_string())))?;
        let mut builder = self.with_defaults(defaults);
        for (device, o) in &cfg.devices {
            let opts = defaults.overridden_by(o).map_err(|e| {
                let reason = match e {
                    BuildError::InvalidConfig(r) => r,
                    _ => "invalid options",
                };
                eyre::Report::new(BuildError::InvalidDevice {
                    device: device.clone(),
                    reason,
                })
            })?;
            builder = builder.with_device_options(device.as_str(), opts);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::datapoint::ChannelField;

    #[test]
    fn defaults_map_to_default_options() {
        let opts = DeviceOptions::try_from(&Defaults::default()).unwrap();
        assert_eq!(opts, DeviceOptions::default());
    }

    #[test]
    fn override_replaces_only_named_fields() {
        let base = DeviceOptions::default();
        let o = DeviceOverride {
            signed_power_a: Some(true),
            delay_direction_b: Some(true),
            missing_data: Some(MissingDataMode::NullifyAll),
            ..DeviceOverride::default()
        };
        let opts = base.overridden_by(&o).unwrap();
        assert_eq!(opts.channel_a.power_sign, PowerSign::Signed);
        assert_eq!(opts.channel_a.trigger, FlushTrigger::PowerFactor);
        assert_eq!(opts.channel_b.trigger, FlushTrigger::DelayedDirection);
        assert_eq!(opts.channel_b.power_sign, PowerSign::Unsigned);
        assert_eq!(opts.missing_data, MissingData::NullifyAll);
        assert_eq!(opts.sequence_increment, base.sequence_increment);
    }

    #[test]
    fn oversized_increment_is_rejected() {
        let d = Defaults {
            sequence_increment: 70_000,
            ..Defaults::default()
        };
        assert!(DeviceOptions::try_from(&d).is_err());
    }

    #[test]
    fn rows_build_a_table() {
        let rows = vec![
            DatapointRow {
                dp: 7,
                field: "power_b".into(),
                divisor: 100,
            },
            DatapointRow {
                dp: 8,
                field: "power_ab".into(),
                divisor: 10,
            },
            DatapointRow {
                dp: 9,
                field: "temperature".into(),
                divisor: 10,
            },
        ];
        let table = DatapointTable::from(rows.as_slice());
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.get(7).unwrap().kind,
            DatapointKind::Channel(Channel::B, ChannelField::Power)
        );
        assert_eq!(table.get(8).unwrap().kind, DatapointKind::CombinedPower);
        assert_eq!(
            table.get(9).unwrap().kind,
            DatapointKind::Passthrough("temperature".into())
        );
        assert_eq!(table.power_scale(), 100);
    }

    #[test]
    fn with_config_registers_overrides() {
        let cfg = bimeter_config::load_toml(
            "[defaults]\nsingle_zero_suppression = true\n[devices.\"d1\"]\nsigned_power_b = true\n",
        )
        .unwrap();
        let r = ReassemblerBuilder::default().with_config(&cfg).unwrap().build().unwrap();
        assert!(r.options_for("d1").single_zero_suppression);
        assert_eq!(r.options_for("d1").channel_b.power_sign, PowerSign::Signed);
        assert_eq!(r.options_for("other").channel_b.power_sign, PowerSign::Unsigned);
    }

    #[test]
    fn with_config_names_bad_device() {
        let cfg =
            bimeter_config::load_toml("[devices.\"bad\"]\ndirection_reverse_code = 5\n").unwrap();
        let err = ReassemblerBuilder::default().with_config(&cfg).unwrap_err();
        assert!(format!("{err}").contains("bad"));
    }
}
