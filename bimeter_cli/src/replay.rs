//! JSON-lines transport and publisher, and the replay command.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bimeter_core::error::{CoreError, Result};
use bimeter_core::runner::{RunSummary, run};
use bimeter_core::{DeviceStats, DeviceStore, FieldValue, RawMessage, Reassembler, Record};
use bimeter_traits::{Publisher, Transport};
use eyre::WrapErr;
use serde::Deserialize;
use serde_json::{Map, Value, json};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One captured datapoint. A missing or null `seq` marks a control message.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputLine {
    device: String,
    dp: u32,
    value: i64,
    #[serde(default)]
    seq: Option<u16>,
}

/// Reads one `RawMessage` per non-blank line.
pub struct JsonlTransport<R> {
    reader: R,
    line_no: usize,
    buf: String,
}

impl<R: BufRead> JsonlTransport<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Transport for JsonlTransport<R> {
    fn receive(&mut self) -> std::result::Result<Option<RawMessage>, BoxError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }
            let parsed: InputLine = serde_json::from_str(line).map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("line {}: {e}", self.line_no),
                )
            })?;
            return Ok(Some(RawMessage {
                device: parsed.device,
                datapoint: parsed.dp,
                value: parsed.value,
                sequence: parsed.seq,
            }));
        }
    }
}

fn field_json(v: &FieldValue) -> Value {
    match v {
        FieldValue::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
        FieldValue::Label(s) => Value::from(*s),
        FieldValue::Counter(c) => Value::from(*c),
        FieldValue::Timestamp(ms) => Value::from(*ms),
        FieldValue::Null => Value::Null,
    }
}

pub fn record_json(record: &Record) -> Value {
    let fields: Map<String, Value> = record
        .iter()
        .map(|(k, v)| (k.to_string(), field_json(v)))
        .collect();
    json!({ "device": record.device(), "fields": fields })
}

/// Writes each record as one JSON line.
pub struct JsonlPublisher<W> {
    out: W,
}

impl<W: Write> JsonlPublisher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

impl<W: Write> Publisher for JsonlPublisher<W> {
    fn publish(&mut self, record: &Record) -> std::result::Result<(), BoxError> {
        serde_json::to_writer(&mut self.out, &record_json(record))?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

fn stats_json(device: &str, s: &DeviceStats) -> Value {
    json!({
        "device": device,
        "messages": s.messages,
        "baselines": s.baselines,
        "in_order": s.in_order,
        "duplicates": s.duplicates,
        "gaps": s.gaps,
        "control_advances": s.control_advances,
        "unmapped": s.unmapped,
        "discarded": s.discarded,
        "complete_flushes": s.complete_flushes,
        "partial_flushes": s.partial_flushes,
        "withheld_flushes": s.withheld_flushes,
        "nullified_flushes": s.nullified_flushes,
    })
}

fn print_stats(store: &DeviceStore, summary: &RunSummary, json_mode: bool) {
    let mut devices: Vec<_> = store.iter().collect();
    devices.sort_by_key(|(id, _)| *id);
    if json_mode {
        let per_device: Vec<Value> = devices
            .iter()
            .map(|(id, st)| stats_json(id, st.stats()))
            .collect();
        let obj = json!({
            "messages": summary.messages,
            "records": summary.records,
            "interrupted": summary.interrupted,
            "devices": per_device,
        });
        eprintln!("{obj}");
        return;
    }
    eprintln!(
        "messages={} records={} devices={}{}",
        summary.messages,
        summary.records,
        devices.len(),
        if summary.interrupted { " (interrupted)" } else { "" }
    );
    for (id, st) in devices {
        let s = st.stats();
        eprintln!(
            "  {id}: messages={} gaps={} duplicates={} control={} unmapped={} flushes complete={} partial={} withheld={} nullified={}",
            s.messages,
            s.gaps,
            s.duplicates,
            s.control_advances,
            s.unmapped,
            s.complete_flushes,
            s.partial_flushes,
            s.withheld_flushes,
            s.nullified_flushes,
        );
    }
}

fn install_ctrlc(shutdown: &Arc<AtomicBool>) {
    let flag = Arc::clone(shutdown);
    let res = ctrlc::set_handler(move || {
        // A read from stdin can block; a second Ctrl-C exits at once.
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
    });
    if let Err(e) = res {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
}

pub fn run_replay(
    reassembler: &Reassembler,
    input: &Path,
    stats: bool,
    json_mode: bool,
) -> Result<RunSummary> {
    let shutdown = Arc::new(AtomicBool::new(false));
    install_ctrlc(&shutdown);

    let stdout = std::io::stdout();
    let mut publisher = JsonlPublisher::new(std::io::BufWriter::new(stdout.lock()));
    let mut store = DeviceStore::new();

    let summary = if input.as_os_str() == "-" {
        let stdin = std::io::stdin();
        let mut transport = JsonlTransport::new(stdin.lock());
        run(&mut transport, &mut publisher, reassembler, &mut store, &shutdown)
    } else {
        let file = std::fs::File::open(input)
            .map_err(|e| eyre::Report::new(CoreError::Input(e.to_string())))
            .wrap_err_with(|| format!("open capture {}", input.display()))?;
        let mut transport = JsonlTransport::new(std::io::BufReader::new(file));
        run(&mut transport, &mut publisher, reassembler, &mut store, &shutdown)
    };
    // Publish what was produced even when the run failed part-way.
    publisher
        .flush()
        .map_err(|e| eyre::Report::new(CoreError::Publish(e.to_string())))?;
    let summary = summary?;

    tracing::info!(
        messages = summary.messages,
        records = summary.records,
        devices = store.len(),
        interrupted = summary.interrupted,
        "replay finished"
    );
    if stats {
        print_stats(&store, &summary, json_mode);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_sequenced_and_control_lines() {
        let input = "{\"device\":\"d\",\"dp\":101,\"value\":798,\"seq\":512}\n\n{\"device\":\"d\",\"dp\":129,\"value\":1}\n{\"device\":\"d\",\"dp\":1,\"value\":2,\"seq\":null}\n";
        let mut t = JsonlTransport::new(Cursor::new(input));
        let first = t.receive().unwrap().unwrap();
        assert_eq!(first.datapoint, 101);
        assert_eq!(first.sequence, Some(512));
        assert_eq!(t.receive().unwrap().unwrap().sequence, None);
        assert_eq!(t.receive().unwrap().unwrap().sequence, None);
        assert!(t.receive().unwrap().is_none());
    }

    #[test]
    fn datapoint_above_255_is_received_and_stream_continues() {
        let mut t = JsonlTransport::new(Cursor::new(
            "{\"device\":\"d\",\"dp\":300,\"value\":1}\n{\"device\":\"d\",\"dp\":1,\"value\":2}\n",
        ));
        assert_eq!(t.receive().unwrap().unwrap().datapoint, 300);
        assert_eq!(t.receive().unwrap().unwrap().datapoint, 1);
        assert!(t.receive().unwrap().is_none());
    }

    #[test]
    fn bad_line_is_invalid_data_with_line_number() {
        let mut t = JsonlTransport::new(Cursor::new("\n{\"device\":\"d\",\"dp\":\"x\",\"value\":1}\n"));
        let err = t.receive().unwrap_err();
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidData);
        assert!(io.to_string().starts_with("line 2:"));
    }

    #[test]
    fn record_serializes_each_field_kind() {
        let mut r = Record::new("d");
        r.insert("power_a", FieldValue::Number(79.8));
        r.insert("energy_flow_a", FieldValue::Label("producing"));
        r.insert("update_a", FieldValue::Counter(3));
        r.insert("timestamp_a", FieldValue::Timestamp(17));
        r.insert("current_a", FieldValue::Null);
        let v = record_json(&r);
        assert_eq!(v["device"], "d");
        assert_eq!(v["fields"]["power_a"], 79.8);
        assert_eq!(v["fields"]["energy_flow_a"], "producing");
        assert_eq!(v["fields"]["update_a"], 3);
        assert_eq!(v["fields"]["timestamp_a"], 17);
        assert!(v["fields"]["current_a"].is_null());
    }
}
