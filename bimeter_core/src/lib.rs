#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Measurement reassembly for a two-channel bidirectional energy meter.
//!
//! The device splits every measurement cycle into single-value datapoints
//! (power, current, power factor, flow direction per channel) that may be
//! dropped, duplicated or reordered, and on some firmware the direction
//! arrives one cycle late. This crate buffers those fields per device and
//! channel, decides when a snapshot may be published, and derives the
//! combined A+B power from what was actually published.
//!
//! ## Architecture
//!
//! - **Sequence**: wrapping 16-bit counter classification (`sequence` module)
//! - **Buffer**: per-channel optional fields with take-and-clear (`channel` module)
//! - **Flush policy**: completeness, zero shortcut, missing-data disposition (`flush` module)
//! - **Flow**: direction code to sign/label resolution (`flow` module)
//! - **Combined**: integer-scaled A+B recomputation (`combined` module)
//! - **Dispatch**: datapoint table lookup and routing (`datapoint`, `reassembler` modules)
//! - **State**: explicit per-device store (`state` module)
//!
//! Processing never fails: gaps, unknown codes and unmapped datapoints are
//! absorbed into state and logged with `tracing`.

pub mod builder;
pub mod channel;
pub mod combined;
pub mod config;
pub mod conversions;
pub mod datapoint;
pub mod error;
pub mod fixed_point;
pub mod flow;
pub mod flush;
pub mod mocks;
pub mod reassembler;
pub mod runner;
pub mod sequence;
pub mod state;

pub use builder::ReassemblerBuilder;
pub use channel::{Channel, ChannelBuffer, FieldSet};
pub use config::{ChannelOptions, DeviceOptions, DirectionCalibration, FlushTrigger, MissingData, PowerSign};
pub use datapoint::{ChannelField, DatapointKind, DatapointSpec, DatapointTable};
pub use flow::{FlowDirection, FlowLabel, ResolvedPower};
pub use flush::FlushOutcome;
pub use reassembler::Reassembler;
pub use sequence::{SequenceClass, SequenceTracker};
pub use state::{DeviceState, DeviceStats, DeviceStore};

pub use bimeter_traits::{FieldValue, RawMessage, Record};
