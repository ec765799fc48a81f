use mtrack_packet::{EncodeError, PacketResult, TransportResult};
use serde::Serialize;

/// A response payload that does not match the layout the client expects.
///
/// Local to the host: never sent back over the wire. The read may be retried,
/// but nothing decoded from the failing payload should be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeError {
    /// The payload ran out before every configured field was read.
    #[error("payload truncated: field needs {needed} bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },

    /// Bytes left over after every configured field was read.
    #[error("payload length mismatch: layout accounts for {expected} bytes, got {actual}")]
    Inconsistent { expected: usize, actual: usize },

    /// A field holds a value outside its defined range.
    #[error("invalid {field} value {value}")]
    InvalidField { field: &'static str, value: u32 },
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// One error for callers that prefer `?` over inspecting a `Reply`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// The link failed; no response was read.
    #[error("transport error: {0}")]
    Transport(TransportResult),

    /// The device answered and rejected the command.
    #[error("device rejected command: {0}")]
    Device(PacketResult),

    /// The device accepted the command but the payload did not decode.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Arguments could not be encoded.
    #[error("invalid argument: {0}")]
    Encode(#[from] EncodeError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
