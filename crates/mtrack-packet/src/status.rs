//! The two independent result axes of every exchange.

use serde::Serialize;

/// Link-level outcome of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportResult {
    Ok,
    /// The ready line did not assert within the bounded wait.
    Timeout,
    /// The ready line was already asserted before select: an earlier response
    /// was never drained.
    NotReady,
    /// The link driver failed.
    BusError,
    /// The declared payload is larger than the caller's buffer.
    BufferTooSmall,
}

impl TransportResult {
    pub fn is_ok(self) -> bool {
        self == TransportResult::Ok
    }
}

impl std::fmt::Display for TransportResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransportResult::Ok => "ok",
            TransportResult::Timeout => "timeout",
            TransportResult::NotReady => "not ready",
            TransportResult::BusError => "bus error",
            TransportResult::BufferTooSmall => "buffer too small",
        };
        f.write_str(s)
    }
}

/// Device-reported outcome, carried in the response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketResult {
    Ok,
    InvalidCommand,
    InvalidParameter,
    Busy,
    Unsupported,
    Unknown(u8),
}

impl PacketResult {
    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            PacketResult::Ok => 0,
            PacketResult::InvalidCommand => 1,
            PacketResult::InvalidParameter => 2,
            PacketResult::Busy => 3,
            PacketResult::Unsupported => 4,
            PacketResult::Unknown(code) => code,
        }
    }

    pub fn is_ok(self) -> bool {
        self == PacketResult::Ok
    }
}

impl From<u8> for PacketResult {
    fn from(code: u8) -> Self {
        match code {
            0 => PacketResult::Ok,
            1 => PacketResult::InvalidCommand,
            2 => PacketResult::InvalidParameter,
            3 => PacketResult::Busy,
            4 => PacketResult::Unsupported,
            other => PacketResult::Unknown(other),
        }
    }
}

impl std::fmt::Display for PacketResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketResult::Ok => f.write_str("OK"),
            PacketResult::InvalidCommand => f.write_str("INVALID_COMMAND"),
            PacketResult::InvalidParameter => f.write_str("INVALID_PARAMETER"),
            PacketResult::Busy => f.write_str("BUSY"),
            PacketResult::Unsupported => f.write_str("UNSUPPORTED"),
            PacketResult::Unknown(code) => write!(f, "UNKNOWN(0x{code:02x})"),
        }
    }
}
