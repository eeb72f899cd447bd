mod cli;
mod error_fmt;
mod replay;
mod setup;

use clap::Parser;
use eyre::Result;
use serde_json::json;

use bimeter_config::Config;
use bimeter_core::{DeviceOptions, Reassembler};

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        tracing::debug!(error = ?err, "command failed");
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = setup::load_config(cli.config.as_deref())?;
    setup::init_tracing(cli.json, &cli.log_level, &cfg.logging)?;

    let csv = setup::datapoints_path(cli.datapoints.as_deref(), cli.config.as_deref(), &cfg);
    let table = setup::load_table(csv.as_deref())?;
    let reassembler = Reassembler::builder()
        .with_table(table)
        .with_config(&cfg)?
        .build()?;

    match cli.cmd {
        Commands::Replay { input, stats } => {
            replay::run_replay(&reassembler, &input, stats, cli.json)?;
        }
        Commands::CheckConfig => print_config(&reassembler, &cfg, cli.json),
        Commands::Datapoints => print_datapoints(&reassembler),
    }
    Ok(())
}

fn options_json(o: &DeviceOptions) -> serde_json::Value {
    json!({
        "sequence_increment": o.sequence_increment,
        "direction_reverse_code": o.direction.reverse_code,
        "single_zero_suppression": o.single_zero_suppression,
        "missing_message_detection": o.missing_message_detection,
        "missing_data": format!("{:?}", o.missing_data),
        "channel_a": {
            "trigger": format!("{:?}", o.channel_a.trigger),
            "power_sign": format!("{:?}", o.channel_a.power_sign),
        },
        "channel_b": {
            "trigger": format!("{:?}", o.channel_b.trigger),
            "power_sign": format!("{:?}", o.channel_b.power_sign),
        },
    })
}

fn print_config(r: &Reassembler, cfg: &Config, json_mode: bool) {
    let defaults = r.defaults();
    if json_mode {
        let devices: serde_json::Map<String, serde_json::Value> = cfg
            .devices
            .keys()
            .map(|id| (id.clone(), options_json(r.options_for(id))))
            .collect();
        let obj = json!({
            "status": "ok",
            "datapoints": r.table().len(),
            "defaults": options_json(defaults),
            "devices": devices,
        });
        println!("{obj}");
        return;
    }
    println!("config ok ({} datapoints)", r.table().len());
    println!("defaults: {defaults:?}");
    for id in cfg.devices.keys() {
        println!("device {id}: {:?}", r.options_for(id));
    }
}

fn print_datapoints(r: &Reassembler) {
    println!("dp,field,divisor");
    for (dp, spec) in r.table().iter() {
        println!("{dp},{},{}", spec.kind.field_name(), spec.divisor);
    }
}
