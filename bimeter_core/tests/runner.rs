use std::sync::atomic::AtomicBool;

use bimeter_core::mocks::{CollectingPublisher, VecTransport, msg};
use bimeter_core::runner::run;
use bimeter_core::{DeviceStore, RawMessage, Reassembler, Record};
use bimeter_traits::clock::ManualClock;
use bimeter_traits::{Publisher, Transport};

fn reassembler() -> Reassembler {
    Reassembler::builder()
        .with_clock(ManualClock::at_unix_ms(1))
        .build()
        .unwrap()
}

#[test]
fn publishes_only_non_empty_records() {
    let mut transport = VecTransport::new([
        msg("d", 101, 798, 0),
        msg("d", 113, 350, 256),
        msg("d", 102, 0, 512),
        msg("d", 110, 97, 768),
        msg("d", 112, 2301, 1024),
    ]);
    let mut publisher = CollectingPublisher::default();
    let mut store = DeviceStore::new();
    let stop = AtomicBool::new(false);
    let summary = run(&mut transport, &mut publisher, &reassembler(), &mut store, &stop).unwrap();
    assert_eq!(summary.messages, 5);
    assert_eq!(summary.records, 2);
    assert!(!summary.interrupted);
    assert_eq!(publisher.records[0].number("power_a"), Some(79.8));
    assert_eq!(publisher.records[1].number("voltage"), Some(230.1));
}

#[test]
fn shutdown_flag_stops_before_reading() {
    let mut transport = VecTransport::new([msg("d", 112, 2301, 0)]);
    let mut publisher = CollectingPublisher::default();
    let mut store = DeviceStore::new();
    let stop = AtomicBool::new(true);
    let summary = run(&mut transport, &mut publisher, &reassembler(), &mut store, &stop).unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.messages, 0);
    assert!(publisher.records.is_empty());
}

struct BrokenTransport;

impl Transport for BrokenTransport {
    fn receive(&mut self) -> Result<Option<RawMessage>, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "line 3: expected value",
        )))
    }
}

struct RejectingPublisher;

impl Publisher for RejectingPublisher {
    fn publish(&mut self, _record: &Record) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("broker unavailable".into())
    }
}

#[test]
fn transport_errors_carry_context() {
    let mut publisher = CollectingPublisher::default();
    let mut store = DeviceStore::new();
    let stop = AtomicBool::new(false);
    let err = run(&mut BrokenTransport, &mut publisher, &reassembler(), &mut store, &stop)
        .unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("receiving message 1"), "{chain}");
    assert!(chain.contains("invalid input"), "{chain}");
}

#[test]
fn publish_errors_abort_the_run() {
    let mut transport = VecTransport::new([msg("d", 112, 2301, 0)]);
    let mut store = DeviceStore::new();
    let stop = AtomicBool::new(false);
    let err = run(&mut transport, &mut RejectingPublisher, &reassembler(), &mut store, &stop)
        .unwrap_err();
    assert!(format!("{err:#}").contains("broker unavailable"));
}
