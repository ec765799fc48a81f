use mtrack_packet::{ms_to_history_bits, HistoryDims};
use serde::Serialize;

use crate::cmd::{open_client, HistoryArgs, LinkArgs};
use crate::exit::{client_error, encode_error, CliError, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct HistoryOutput {
    length: u8,
    time_bits: u8,
    resolution_ms: f64,
    span_ms: f64,
}

impl From<HistoryDims> for HistoryOutput {
    fn from(dims: HistoryDims) -> Self {
        Self {
            length: dims.length(),
            time_bits: dims.time_bits(),
            resolution_ms: dims.resolution_ms(),
            span_ms: dims.resolution_ms() * f64::from(dims.length()),
        }
    }
}

pub fn run(args: HistoryArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = open_client(link)?;
    let current = client
        .get_history_dims()
        .into_result()
        .map_err(|err| client_error("history query failed", err))?;

    let time_bits = match (args.time_bits, args.resolution_ms) {
        (Some(bits), _) => Some(bits),
        (None, Some(ms)) if ms.is_finite() && ms > 0.0 => Some(ms_to_history_bits(ms)),
        (None, Some(ms)) => {
            return Err(CliError::usage(format!("invalid --resolution-ms: {ms}")));
        }
        (None, None) => None,
    };

    let dims = if args.length.is_some() || time_bits.is_some() {
        let dims = HistoryDims::new(
            args.length.unwrap_or(current.length()),
            time_bits.unwrap_or(current.time_bits()),
        )
        .map_err(|err| encode_error("invalid history dimensions", err))?;
        client
            .set_history_dims(dims)
            .into_result()
            .map_err(|err| client_error("history update failed", err))?;
        dims
    } else {
        current
    };

    let out = HistoryOutput::from(dims);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "history: {} samples, {} ms each (2^{} x 0.25 ms), {} ms total",
                out.length, out.resolution_ms, out.time_bits, out.span_ms
            );
        }
    }
    Ok(SUCCESS)
}
