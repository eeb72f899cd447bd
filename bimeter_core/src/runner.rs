//! Drive a `Transport` through the reassembler into a `Publisher`.

use std::sync::atomic::{AtomicBool, Ordering};

use bimeter_traits::{Publisher, Transport};
use eyre::WrapErr;

use crate::error::{CoreError, Result, map_transport_error};
use crate::reassembler::Reassembler;
use crate::state::DeviceStore;

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub messages: u64,
    pub records: u64,
    /// True when the run ended on the shutdown flag rather than end of stream.
    pub interrupted: bool,
}

/// Process messages until the transport reports end of stream or `shutdown`
/// is raised. Only non-empty records are published.
pub fn run<T, P>(
    transport: &mut T,
    publisher: &mut P,
    reassembler: &Reassembler,
    store: &mut DeviceStore,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    T: Transport + ?Sized,
    P: Publisher + ?Sized,
{
    let mut summary = RunSummary::default();
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!(messages = summary.messages, "run interrupted");
            summary.interrupted = true;
            return Ok(summary);
        }
        let msg = transport
            .receive()
            .map_err(|e| eyre::Report::new(map_transport_error(&*e)))
            .wrap_err_with(|| format!("receiving message {}", summary.messages + 1))?;
        let Some(msg) = msg else {
            tracing::debug!(
                messages = summary.messages,
                records = summary.records,
                "end of stream"
            );
            return Ok(summary);
        };
        summary.messages += 1;

        let record = reassembler.process(store, &msg);
        if record.is_empty() {
            continue;
        }
        publisher
            .publish(&record)
            .map_err(|e| eyre::Report::new(CoreError::Publish(e.to_string())))
            .wrap_err_with(|| format!("publishing record for {}", record.device()))?;
        summary.records += 1;
    }
}
