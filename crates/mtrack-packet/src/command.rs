use bytes::{BufMut, Bytes, BytesMut};

use crate::opcode::Opcode;
use crate::types::{
    Entries, HistoryDims, InputModeSpec, MaskEntry, StreamConfig, INPUT_MODE_RECORD_LEN,
};

/// Longest request any command produces.
pub const MAX_REQUEST_LEN: usize = 96;

/// An encoded request: opcode plus argument bytes.
///
/// Built per call and immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    args: Bytes,
}

impl Command {
    /// Create a command from raw argument bytes.
    pub fn new(opcode: Opcode, args: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            args: args.into(),
        }
    }

    fn bare(opcode: Opcode) -> Self {
        Self::new(opcode, Bytes::new())
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn args(&self) -> &[u8] {
        &self.args
    }

    /// Request size on the wire.
    pub fn wire_size(&self) -> usize {
        1 + self.args.len()
    }

    /// Append the request bytes to `dst`.
    ///
    /// ```text
    /// ┌──────────┬──────────────────────────────┐
    /// │ Opcode   │ Arguments                    │
    /// │ (1B)     │ (layout per opcode)          │
    /// └──────────┴──────────────────────────────┘
    /// ```
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_size());
        dst.put_u8(self.opcode.code());
        dst.put_slice(&self.args);
    }

    pub fn get_version() -> Self {
        Self::bare(Opcode::GetVersion)
    }

    /// `count` then one `(channel set, mask)` pair per entry, in order.
    pub fn set_data_mask(entries: &Entries<MaskEntry>) -> Self {
        let mut args = BytesMut::with_capacity(1 + entries.len() * 2);
        args.put_u8(entries.len() as u8);
        for entry in entries {
            args.put_u8(entry.channels.bits());
            args.put_u8(entry.mask.to_byte());
        }
        Self::new(Opcode::SetDataMask, args.freeze())
    }

    pub fn get_data_mask() -> Self {
        Self::bare(Opcode::GetDataMask)
    }

    pub fn get_motion_data() -> Self {
        Self::bare(Opcode::GetMotionData)
    }

    pub fn set_history_dims(dims: HistoryDims) -> Self {
        Self::new(Opcode::SetHistoryDims, dims.to_bytes().to_vec())
    }

    pub fn get_history_dims() -> Self {
        Self::bare(Opcode::GetHistoryDims)
    }

    pub fn set_stream_config(config: StreamConfig) -> Self {
        Self::new(Opcode::SetStreamConfig, vec![config.to_byte()])
    }

    pub fn get_stream_config() -> Self {
        Self::bare(Opcode::GetStreamConfig)
    }

    /// `count` then one fixed-size record per entry, order preserved.
    pub fn set_input_mode(entries: &Entries<InputModeSpec>) -> Self {
        let mut args = BytesMut::with_capacity(1 + entries.len() * INPUT_MODE_RECORD_LEN);
        args.put_u8(entries.len() as u8);
        for spec in entries {
            args.put_slice(&spec.to_record());
        }
        Self::new(Opcode::SetInputMode, args.freeze())
    }

    pub fn set_stream_period(period: u16) -> Self {
        Self::new(Opcode::SetStreamPeriod, period.to_le_bytes().to_vec())
    }

    pub fn get_stream_period() -> Self {
        Self::bare(Opcode::GetStreamPeriod)
    }

    pub fn read_stream() -> Self {
        Self::bare(Opcode::ReadStream)
    }
}
