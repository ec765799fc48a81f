//! Request encoding and response framing for the mtrack peripheral.
//!
//! Every transaction is one chip-select window:
//! - wait for ready, clock out `opcode + arguments`
//! - wait for ready, clock in a 3-byte header (length LE, packet result)
//! - clock in `length` payload bytes into the caller's buffer
//!
//! Transport outcome and device outcome are reported side by side, never
//! folded into one status.

pub mod codec;
pub mod command;
pub mod error;
pub mod opcode;
#[cfg(any(test, feature = "test-util"))]
pub mod script;
pub mod status;
pub mod types;
pub mod units;

pub use codec::{CodecConfig, Exchange, PacketCodec, MAX_RESPONSE_PAYLOAD, RESPONSE_HEADER_SIZE};
pub use command::{Command, MAX_REQUEST_LEN};
pub use error::{EncodeError, Result};
pub use opcode::Opcode;
#[cfg(any(test, feature = "test-util"))]
pub use script::{ScriptedLink, Step};
pub use status::{PacketResult, TransportResult};
pub use types::{
    ChannelSet, DataMask, Edge, Entries, HistoryDims, InputMode, InputModeSpec, MaskEntry,
    Polarity, PositionWidth, StreamConfig, Version, CHANNELS, INPUT_MODE_RECORD_LEN, MAX_ENTRIES,
    PROTOCOL_VERSION, STATUS_BYTES, VELOCITY_BYTES,
};
pub use units::{
    history_bits_to_ms, ms_to_history_bits, ms_to_period, period_to_ms, HISTORY_BASE_UNIT_MS,
    MAX_HISTORY_TIME_BITS, STREAM_TICKS_PER_MS,
};
