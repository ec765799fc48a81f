use mtrack_packet::{period_to_ms, DataMask, StreamConfig, Version, CHANNELS};
use serde::Serialize;
use tracing::warn;

use crate::cmd::{open_client, InfoArgs, LinkArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_json, print_masks, OutputFormat};

#[derive(Serialize)]
struct HistoryInfo {
    length: u8,
    time_bits: u8,
    resolution_ms: f64,
}

#[derive(Serialize)]
struct InfoOutput {
    version: Version,
    protocol_compatible: bool,
    masks: [DataMask; CHANNELS],
    stream: StreamConfig,
    stream_period: u16,
    stream_period_ms: f64,
    history: HistoryInfo,
}

pub fn run(_args: InfoArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = open_client(link)?;

    let version = client
        .get_version()
        .into_result()
        .map_err(|err| client_error("version query failed", err))?;
    if !version.is_protocol_compatible() {
        warn!(
            device = version.protocol,
            host = mtrack_packet::PROTOCOL_VERSION,
            "protocol version mismatch"
        );
    }

    client
        .sync_config()
        .into_result()
        .map_err(|err| client_error("configuration query failed", err))?;

    let state = client.state();
    let out = InfoOutput {
        version,
        protocol_compatible: version.is_protocol_compatible(),
        masks: state.masks,
        stream: state.stream,
        stream_period: state.stream_period,
        stream_period_ms: period_to_ms(state.stream_period),
        history: HistoryInfo {
            length: state.history.length(),
            time_bits: state.history.time_bits(),
            resolution_ms: state.history.resolution_ms(),
        },
    };

    print_info(&out, format);
    Ok(SUCCESS)
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Device Info:");
            println!("  Firmware:       {}", out.version);
            println!(
                "  Protocol:       {}",
                if out.protocol_compatible {
                    "compatible"
                } else {
                    "MISMATCH"
                }
            );
            let stream = if out.stream_period == 0 {
                "off".to_string()
            } else {
                format!("{} ticks ({:.4} ms)", out.stream_period, out.stream_period_ms)
            };
            println!("  Stream period:  {stream}");
            println!(
                "  Stream prefix:  timestamp={} elapsed={}",
                out.stream.timestamp, out.stream.elapsed_periods
            );
            println!(
                "  History:        {} samples x {} ms",
                out.history.length, out.history.resolution_ms
            );
            print_masks(&out.masks, format);
        }
    }
}
