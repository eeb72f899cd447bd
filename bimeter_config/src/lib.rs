#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and datapoint-table parsing for the meter reassembler.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The datapoint CSV loader enforces headers and rejects duplicate ids and
//!   zero divisors, reporting the offending row.
use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

/// Datapoint CSV schema.
///
/// Expected headers:
/// dp,field,divisor
///
/// Example:
/// dp,field,divisor
/// 101,power_a,10
/// 113,current_a,1000
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DatapointRow {
    pub dp: u32,
    pub field: String,
    pub divisor: u32,
}

/// What an incomplete flush publishes.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MissingDataMode {
    #[default]
    KeepAll,
    KeepPresent,
    NullifyMissing,
    NullifyAll,
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(default)]
pub struct ChannelCfg {
    /// Direction arrives one cycle late; flush on it instead of power factor.
    pub delay_direction: bool,
    /// Publish signed power with the fixed "sign" label.
    pub signed_power: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Defaults {
    pub sequence_increment: u32,
    /// Raw direction code meaning reverse flow (0 or 1)
    pub direction_reverse_code: i64,
    pub single_zero_suppression: bool,
    pub missing_message_detection: bool,
    pub missing_data: MissingDataMode,
    pub channel_a: ChannelCfg,
    pub channel_b: ChannelCfg,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            sequence_increment: 256,
            direction_reverse_code: 1,
            single_zero_suppression: false,
            missing_message_detection: true,
            missing_data: MissingDataMode::KeepAll,
            channel_a: ChannelCfg::default(),
            channel_b: ChannelCfg::default(),
        }
    }
}

/// Per-device overrides; any field left out falls back to `[defaults]`.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceOverride {
    pub sequence_increment: Option<u32>,
    pub direction_reverse_code: Option<i64>,
    pub single_zero_suppression: Option<bool>,
    pub missing_message_detection: Option<bool>,
    pub missing_data: Option<MissingDataMode>,
    pub delay_direction_a: Option<bool>,
    pub delay_direction_b: Option<bool>,
    pub signed_power_a: Option<bool>,
    pub signed_power_b: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Datapoints {
    /// Optional CSV replacing the built-in datapoint table.
    pub csv: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub defaults: Defaults,
    pub devices: BTreeMap<String, DeviceOverride>,
    pub datapoints: Datapoints,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn check_increment(scope: &str, v: u32) -> eyre::Result<()> {
    if v == 0 || v > u32::from(u16::MAX) {
        eyre::bail!("{scope}.sequence_increment must be in 1..=65535");
    }
    Ok(())
}

fn check_reverse_code(scope: &str, v: i64) -> eyre::Result<()> {
    if !(0..=1).contains(&v) {
        eyre::bail!("{scope}.direction_reverse_code must be 0 or 1");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        check_increment("defaults", self.defaults.sequence_increment)?;
        check_reverse_code("defaults", self.defaults.direction_reverse_code)?;

        for (id, dev) in &self.devices {
            if id.trim().is_empty() {
                eyre::bail!("devices: device id must not be empty");
            }
            let scope = format!("devices.\"{id}\"");
            if let Some(v) = dev.sequence_increment {
                check_increment(&scope, v)?;
            }
            if let Some(v) = dev.direction_reverse_code {
                check_reverse_code(&scope, v)?;
            }
        }

        if let Some(path) = &self.datapoints.csv
            && path.trim().is_empty()
        {
            eyre::bail!("datapoints.csv must not be empty when set");
        }

        if let Some(rot) = &self.logging.rotation
            && !matches!(rot.as_str(), "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        Ok(())
    }
}

/// Validate parsed datapoint rows: at least one row, unique ids, non-zero
/// divisors, non-empty field names.
pub fn check_datapoint_rows(rows: &[DatapointRow]) -> eyre::Result<()> {
    if rows.is_empty() {
        eyre::bail!("datapoint table must contain at least one row");
    }
    let mut seen = HashSet::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        // +2: header line and 1-based numbering
        let line = idx + 2;
        if !seen.insert(row.dp) {
            eyre::bail!("datapoint row {line}: duplicate dp {}", row.dp);
        }
        if row.divisor == 0 {
            eyre::bail!("datapoint row {line}: divisor for dp {} must be >= 1", row.dp);
        }
        if row.field.trim().is_empty() {
            eyre::bail!("datapoint row {line}: field name must not be empty");
        }
    }
    Ok(())
}

pub fn load_datapoints_csv(path: &std::path::Path) -> eyre::Result<Vec<DatapointRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open datapoint CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["dp", "field", "divisor"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "datapoint CSV must have headers 'dp,field,divisor', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<DatapointRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    check_datapoint_rows(&rows)?;
    Ok(rows)
}
