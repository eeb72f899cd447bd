//! Test and helper doubles for the transport boundary.

use std::collections::VecDeque;

use bimeter_traits::{Publisher, RawMessage, Record, Transport};

/// Transport that replays a fixed list of messages, then reports end of stream.
#[derive(Debug, Default)]
pub struct VecTransport {
    queue: VecDeque<RawMessage>,
}

impl VecTransport {
    pub fn new(messages: impl IntoIterator<Item = RawMessage>) -> Self {
        Self {
            queue: messages.into_iter().collect(),
        }
    }
}

impl Transport for VecTransport {
    fn receive(
        &mut self,
    ) -> Result<Option<RawMessage>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.queue.pop_front())
    }
}

/// Publisher that keeps every record it is given.
#[derive(Debug, Default)]
pub struct CollectingPublisher {
    pub records: Vec<Record>,
}

impl Publisher for CollectingPublisher {
    fn publish(&mut self, record: &Record) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Build a sequenced message; shorthand for tests and benches.
pub fn msg(device: &str, datapoint: u32, value: i64, sequence: u16) -> RawMessage {
    RawMessage {
        device: device.to_string(),
        datapoint,
        value,
        sequence: Some(sequence),
    }
}
