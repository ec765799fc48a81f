use std::fmt;
use std::io;

use mtrack_client::{ClientError, StopReason, StreamFault};
use mtrack_link::LinkError;
use mtrack_packet::{EncodeError, TransportResult};

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DEVICE_REJECTED: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Open { ref source, .. } | LinkError::Gpio { ref source, .. } => {
            let code = match source.kind() {
                io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
                _ => TRANSPORT_ERROR,
            };
            CliError::new(code, format!("{context}: {err}"))
        }
        LinkError::Io(source) => io_error(context, source),
        LinkError::Spi(_) | LinkError::Pin { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        LinkError::NoResetLine => CliError::usage(format!("{context}: {err}; pass --reset-gpio")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn transport_result(context: &str, result: TransportResult) -> CliError {
    let code = match result {
        TransportResult::Timeout => TIMEOUT,
        TransportResult::Ok => INTERNAL,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {result}"))
}

pub fn encode_error(context: &str, err: EncodeError) -> CliError {
    CliError::new(USAGE, format!("{context}: {err}"))
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(result) => transport_result(context, result),
        ClientError::Device(packet) => CliError::new(
            DEVICE_REJECTED,
            format!("{context}: device rejected command: {packet}"),
        ),
        ClientError::Decode(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        ClientError::Encode(err) => encode_error(context, err),
    }
}

/// Exit code for a finished stream session.
pub fn stop_code(stop: &StopReason) -> i32 {
    match stop {
        StopReason::Cancelled => SUCCESS,
        StopReason::Timeout => TIMEOUT,
        StopReason::NotStreaming => FAILURE,
        StopReason::EmptyLayout => USAGE,
        StopReason::Error(StreamFault::Transport(TransportResult::Timeout)) => TIMEOUT,
        StopReason::Error(StreamFault::Transport(_)) => TRANSPORT_ERROR,
        StopReason::Error(StreamFault::Device(_)) => DEVICE_REJECTED,
        StopReason::Error(StreamFault::Decode(_)) => DATA_INVALID,
    }
}

#[cfg(test)]
mod tests {
    use mtrack_client::DecodeError;
    use mtrack_packet::PacketResult;

    use super::*;

    #[test]
    fn client_errors_map_to_distinct_codes() {
        assert_eq!(
            client_error("x", ClientError::Transport(TransportResult::Timeout)).code,
            TIMEOUT
        );
        assert_eq!(
            client_error("x", ClientError::Transport(TransportResult::BusError)).code,
            TRANSPORT_ERROR
        );
        assert_eq!(
            client_error("x", ClientError::Device(PacketResult::Unsupported)).code,
            DEVICE_REJECTED
        );
        assert_eq!(
            client_error(
                "x",
                ClientError::Decode(DecodeError::Inconsistent {
                    expected: 1,
                    actual: 2
                })
            )
            .code,
            DATA_INVALID
        );
        assert_eq!(
            client_error("x", ClientError::Encode(EncodeError::EmptyEntries)).code,
            USAGE
        );
    }

    #[test]
    fn missing_device_is_transport_error() {
        let err = LinkError::Open {
            path: "/dev/spidev9.9".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        let cli = link_error("open failed", err);
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("open failed: "));
    }

    #[test]
    fn missing_reset_line_is_usage_error() {
        assert_eq!(link_error("reset failed", LinkError::NoResetLine).code, USAGE);
        let err = LinkError::Spi(mtrack_link::SpiErrorKind::Other);
        assert_eq!(link_error("x", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn cancelled_stream_is_success() {
        assert_eq!(stop_code(&StopReason::Cancelled), SUCCESS);
        assert_eq!(stop_code(&StopReason::Timeout), TIMEOUT);
        assert_eq!(stop_code(&StopReason::EmptyLayout), USAGE);
    }
}
