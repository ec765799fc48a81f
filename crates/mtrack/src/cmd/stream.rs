use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mtrack_client::{SessionConfig, StopReason};
use mtrack_packet::{ms_to_period, period_to_ms, StreamConfig};
use serde::Serialize;
use tracing::{info, warn};

use crate::cmd::mask::prepare_masks;
use crate::cmd::{open_client, LinkArgs, StreamArgs};
use crate::exit::{client_error, stop_code, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_stream_sample, OutputFormat};

#[derive(Serialize)]
struct StreamSummary<'a> {
    delivered: u64,
    stop: &'a StopReason,
    limit_reached: bool,
}

pub fn run(args: StreamArgs, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    let period = resolve_period(&args)?;

    let mut client = open_client(link)?;
    prepare_masks(&mut client, &args.mask)?;
    client
        .set_stream_config(StreamConfig {
            timestamp: args.timestamp,
            elapsed_periods: args.elapsed,
        })
        .into_result()
        .map_err(|err| client_error("stream config update failed", err))?;
    if client.state().stream_sample_len() == 0 {
        return Err(CliError::usage(
            "every channel is disabled and no prefix field is on; enable a channel or pass --timestamp/--elapsed",
        ));
    }
    client
        .set_stream_period(period)
        .into_result()
        .map_err(|err| client_error("stream start failed", err))?;
    info!(period, period_ms = period_to_ms(period), "streaming");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let config = SessionConfig {
        staleness: Duration::from_millis(args.staleness_ms),
        ..SessionConfig::default()
    };
    let delivered = Cell::new(0u64);
    let limit_hit = || args.count.is_some_and(|limit| delivered.get() >= limit);

    let report = client.read_stream(
        &config,
        || !running.load(Ordering::SeqCst) || limit_hit(),
        |sample| {
            let seq = delivered.get() + 1;
            delivered.set(seq);
            print_stream_sample(seq, &sample, format);
        },
    );

    let stop_reply = client.set_stream_period(0);
    if !stop_reply.is_ok() {
        warn!(
            transport = %stop_reply.transport,
            packet = ?stop_reply.packet,
            "failed to stop streaming on device"
        );
    }

    let summary = StreamSummary {
        delivered: report.delivered,
        stop: &report.stop,
        limit_reached: limit_hit(),
    };
    // Samples own stdout; the summary goes to stderr.
    if matches!(format, OutputFormat::Json) {
        eprintln!(
            "{}",
            serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        info!(delivered = summary.delivered, stop = %summary.stop, "stream ended");
    }

    match stop_code(&report.stop) {
        SUCCESS => Ok(SUCCESS),
        code => Err(CliError::new(code, format!("stream stopped: {}", report.stop))),
    }
}

fn resolve_period(args: &StreamArgs) -> CliResult<u16> {
    let period = match args.period {
        Some(ticks) => ticks,
        None => {
            if !args.period_ms.is_finite() || args.period_ms <= 0.0 {
                return Err(CliError::new(
                    USAGE,
                    format!("invalid --period-ms: {}", args.period_ms),
                ));
            }
            ms_to_period(args.period_ms)
        }
    };
    if period == 0 {
        return Err(CliError::new(
            USAGE,
            "stream period rounds to zero ticks; use at least 1/16 ms",
        ));
    }
    Ok(period)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::MaskArgs;

    fn args(period: Option<u16>, period_ms: f64) -> StreamArgs {
        StreamArgs {
            mask: MaskArgs::default(),
            period,
            period_ms,
            timestamp: false,
            elapsed: false,
            count: None,
            staleness_ms: 1000,
        }
    }

    #[test]
    fn period_from_ticks_or_milliseconds() {
        assert_eq!(resolve_period(&args(Some(7), 10.0)).expect("ticks"), 7);
        assert_eq!(resolve_period(&args(None, 10.0)).expect("ms"), 160);
        assert_eq!(resolve_period(&args(None, 0.1)).expect("ms"), 1);
    }

    #[test]
    fn sub_tick_period_is_rejected() {
        let err = resolve_period(&args(None, 0.01)).expect_err("rounds to zero");
        assert_eq!(err.code, USAGE);
        assert!(resolve_period(&args(Some(0), 10.0)).is_err());
        assert!(resolve_period(&args(None, f64::NAN)).is_err());
    }
}
