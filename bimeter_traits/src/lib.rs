//! Boundary types shared between the reassembly core and its collaborators.
//!
//! The transport delivers `RawMessage`s, the core turns them into sparse
//! `Record`s, and a `Publisher` forwards those to whoever consumes them.

pub mod clock;
pub mod record;

pub use clock::{Clock, SystemClock};
pub use record::{FieldValue, Record};

/// One datapoint as delivered by the transport/session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Opaque device identity.
    pub device: String,
    /// Device-defined datapoint identifier.
    pub datapoint: u32,
    /// Raw, unscaled scalar payload.
    pub value: i64,
    /// Wrapping 16-bit sequence number; `None` for control messages that
    /// carry no sequence but account for one counter step.
    pub sequence: Option<u16>,
}

pub trait Transport {
    /// Next delivered message, or `Ok(None)` at end of stream.
    fn receive(&mut self) -> Result<Option<RawMessage>, Box<dyn std::error::Error + Send + Sync>>;
}

pub trait Publisher {
    fn publish(&mut self, record: &Record) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
