#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;

use bimeter_core::{
    Channel, DeviceOptions, DeviceStore, FlushTrigger, MissingData, PowerSign, RawMessage,
    Reassembler,
};

#[derive(Debug, Arbitrary)]
struct Msg {
    device: bool,
    datapoint: u32,
    value: i64,
    sequence: Option<u16>,
}

#[derive(Debug, Arbitrary)]
struct Input {
    missing: u8,
    flags: u8,
    increment: u16,
    msgs: Vec<Msg>,
}

fuzz_target!(|input: Input| {
    let mut opts = DeviceOptions {
        single_zero_suppression: input.flags & 1 != 0,
        missing_message_detection: input.flags & 2 != 0,
        missing_data: match input.missing % 4 {
            0 => MissingData::KeepAll,
            1 => MissingData::KeepPresent,
            2 => MissingData::NullifyMissing,
            _ => MissingData::NullifyAll,
        },
        sequence_increment: input.increment.max(1),
        ..DeviceOptions::default()
    };
    if input.flags & 4 != 0 {
        opts.channel_a.trigger = FlushTrigger::DelayedDirection;
    }
    if input.flags & 8 != 0 {
        opts.channel_b.power_sign = PowerSign::Signed;
    }
    let Ok(r) = Reassembler::builder().with_defaults(opts).build() else {
        return;
    };
    let mut store = DeviceStore::new();
    for m in input.msgs {
        let msg = RawMessage {
            device: if m.device { "a".into() } else { "b".into() },
            datapoint: m.datapoint,
            value: m.value,
            sequence: m.sequence,
        };
        let rec = r.process(&mut store, &msg);
        let state = store.get(&msg.device).expect("state exists after process");
        // A flush always leaves its channel's buffer empty.
        for ch in Channel::ALL {
            if rec.contains(&ch.field("update")) {
                assert!(state.channel(ch).fields().is_empty());
            }
        }
    }
});
