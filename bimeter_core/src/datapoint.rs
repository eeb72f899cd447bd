//! Static datapoint table: which identifier carries which field, and its scale.

use std::collections::BTreeMap;

use crate::channel::Channel;

/// Per-channel field carried by a datapoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelField {
    Power,
    Current,
    PowerFactor,
    /// Raw direction code; never scaled.
    EnergyFlow,
}

impl ChannelField {
    pub fn base_name(self) -> &'static str {
        match self {
            ChannelField::Power => "power",
            ChannelField::Current => "current",
            ChannelField::PowerFactor => "power_factor",
            ChannelField::EnergyFlow => "energy_flow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatapointKind {
    /// Routed into a channel buffer.
    Channel(Channel, ChannelField),
    /// The device's own A+B reading. Always discarded and recomputed.
    CombinedPower,
    /// Informational value published as-is under the given name.
    Passthrough(String),
}

impl DatapointKind {
    /// Parse a published field name (`power_a`, `power_ab`, `voltage`, ...).
    pub fn from_field_name(name: &str) -> Self {
        if name == "power_ab" {
            return DatapointKind::CombinedPower;
        }
        let fields = [
            ChannelField::Power,
            ChannelField::Current,
            ChannelField::PowerFactor,
            ChannelField::EnergyFlow,
        ];
        for ch in Channel::ALL {
            for f in fields {
                if name == ch.field(f.base_name()) {
                    return DatapointKind::Channel(ch, f);
                }
            }
        }
        DatapointKind::Passthrough(name.to_string())
    }

    pub fn field_name(&self) -> String {
        match self {
            DatapointKind::Channel(ch, f) => ch.field(f.base_name()),
            DatapointKind::CombinedPower => "power_ab".to_string(),
            DatapointKind::Passthrough(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatapointSpec {
    pub kind: DatapointKind,
    /// Raw value is divided by this to obtain engineering units.
    pub divisor: u32,
}

impl DatapointSpec {
    pub fn new(kind: DatapointKind, divisor: u32) -> Self {
        Self { kind, divisor }
    }

    #[inline]
    pub fn scale(&self, raw: i64) -> f64 {
        raw as f64 / f64::from(self.divisor.max(1))
    }
}

/// Resolution used for the combined total when the table has no power entries.
pub const DEFAULT_POWER_SCALE: i64 = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatapointTable {
    entries: BTreeMap<u32, DatapointSpec>,
}

impl DatapointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference table for the two-channel bidirectional clamp meter.
    pub fn bidirectional_meter() -> Self {
        use ChannelField::{Current, EnergyFlow, Power, PowerFactor};
        let pass = |n: &str| DatapointKind::Passthrough(n.to_string());
        let on = DatapointKind::Channel;
        let rows = [
            (1, pass("energy_a"), 100),
            (2, pass("energy_produced_a"), 100),
            (101, on(Channel::A, Power), 10),
            (102, on(Channel::A, EnergyFlow), 1),
            (103, pass("energy_b"), 100),
            (104, on(Channel::B, EnergyFlow), 1),
            (105, on(Channel::B, Power), 10),
            (106, pass("energy_produced_b"), 100),
            (110, on(Channel::A, PowerFactor), 1),
            (111, pass("ac_frequency"), 100),
            (112, pass("voltage"), 10),
            (113, on(Channel::A, Current), 1000),
            (114, on(Channel::B, Current), 1000),
            (115, DatapointKind::CombinedPower, 10),
            (121, on(Channel::B, PowerFactor), 1),
            (129, pass("update_frequency"), 1),
        ];
        let mut table = Self::new();
        for (dp, kind, divisor) in rows {
            table.entries.insert(dp, DatapointSpec::new(kind, divisor));
        }
        table
    }

    /// Insert a mapping, returning the previous one for `dp` if any.
    pub fn insert(&mut self, dp: u32, spec: DatapointSpec) -> Option<DatapointSpec> {
        self.entries.insert(dp, spec)
    }

    pub fn get(&self, dp: u32) -> Option<&DatapointSpec> {
        self.entries.get(&dp)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &DatapointSpec)> {
        self.entries.iter().map(|(dp, spec)| (*dp, spec))
    }

    /// Integer grid for the combined total: the finest channel power divisor.
    pub fn power_scale(&self) -> i64 {
        self.entries
            .values()
            .filter(|s| matches!(s.kind, DatapointKind::Channel(_, ChannelField::Power)))
            .map(|s| i64::from(s.divisor.max(1)))
            .max()
            .unwrap_or(DEFAULT_POWER_SCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("power_a", DatapointKind::Channel(Channel::A, ChannelField::Power))]
    #[case("current_b", DatapointKind::Channel(Channel::B, ChannelField::Current))]
    #[case("power_factor_a", DatapointKind::Channel(Channel::A, ChannelField::PowerFactor))]
    #[case("energy_flow_b", DatapointKind::Channel(Channel::B, ChannelField::EnergyFlow))]
    #[case("power_ab", DatapointKind::CombinedPower)]
    #[case("voltage", DatapointKind::Passthrough("voltage".into()))]
    fn field_names_round_trip(#[case] name: &str, #[case] kind: DatapointKind) {
        assert_eq!(DatapointKind::from_field_name(name), kind);
        assert_eq!(kind.field_name(), name);
    }

    #[test]
    fn reference_table_routes_both_channels() {
        let t = DatapointTable::bidirectional_meter();
        assert_eq!(
            t.get(101).map(|s| &s.kind),
            Some(&DatapointKind::Channel(Channel::A, ChannelField::Power))
        );
        assert_eq!(t.get(115).map(|s| &s.kind), Some(&DatapointKind::CombinedPower));
        assert!(t.get(200).is_none());
        assert_eq!(t.power_scale(), 10);
    }

    #[test]
    fn scale_divides_raw_value() {
        let spec = DatapointSpec::new(DatapointKind::Channel(Channel::A, ChannelField::Current), 1000);
        assert_eq!(spec.scale(1_234), 1.234);
        let zero_div = DatapointSpec::new(DatapointKind::Passthrough("x".into()), 0);
        assert_eq!(zero_div.scale(7), 7.0);
    }

    #[test]
    fn empty_table_falls_back_to_default_power_scale() {
        assert_eq!(DatapointTable::new().power_scale(), DEFAULT_POWER_SCALE);
    }
}
