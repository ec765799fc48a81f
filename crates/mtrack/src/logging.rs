use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Modules that log raw bus bytes at trace level.
const WIRE_TARGETS: [&str; 3] = ["mtrack_link", "mtrack_packet::codec", "mtrack_client::sim"];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// `level` everywhere; with `trace_wire`, byte dumps from the link and codec
/// regardless of `level`.
fn targets(level: LogLevel, trace_wire: bool) -> Targets {
    let mut targets = Targets::new().with_default(LevelFilter::from(level));
    if trace_wire {
        for target in WIRE_TARGETS {
            targets = targets.with_target(target, LevelFilter::TRACE);
        }
    }
    targets
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
pub fn init_logging(format: LogFormat, level: LogLevel, trace_wire: bool) {
    // Name the emitting crate once more than one of them is talking.
    let show_target = trace_wire || matches!(level, LogLevel::Debug | LogLevel::Trace);
    let filter = targets(level, trace_wire);
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(show_target);

    let _ = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(layer.json())
            .with(filter)
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn wire_tracing_only_raises_bus_targets() {
        let filter = targets(LogLevel::Warn, true);
        assert!(filter.would_enable("mtrack_packet::codec", &Level::TRACE));
        assert!(filter.would_enable("mtrack_link::hal", &Level::TRACE));
        assert!(!filter.would_enable("mtrack_client::stream", &Level::INFO));
        assert!(filter.would_enable("mtrack_client::stream", &Level::WARN));
    }

    #[test]
    fn level_applies_everywhere_without_wire_tracing() {
        let filter = targets(LogLevel::Info, false);
        assert!(!filter.would_enable("mtrack_packet::codec", &Level::TRACE));
        assert!(filter.would_enable("mtrack::cmd::stream", &Level::INFO));
        assert!(!filter.would_enable("mtrack::cmd::stream", &Level::DEBUG));
    }
}
