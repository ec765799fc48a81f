//! Command opcodes.
//!
//! One opcode per command family. Getters return a payload, setters return an
//! empty one.

/// Request opcode, the first byte of every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    GetVersion = 0x01,
    SetDataMask = 0x02,
    GetDataMask = 0x03,
    GetMotionData = 0x04,
    SetHistoryDims = 0x05,
    GetHistoryDims = 0x06,
    SetStreamConfig = 0x07,
    GetStreamConfig = 0x08,
    SetInputMode = 0x09,
    SetStreamPeriod = 0x0A,
    GetStreamPeriod = 0x0B,
    ReadStream = 0x0C,
}

impl Opcode {
    /// Every opcode, in wire order.
    pub const ALL: [Opcode; 12] = [
        Opcode::GetVersion,
        Opcode::SetDataMask,
        Opcode::GetDataMask,
        Opcode::GetMotionData,
        Opcode::SetHistoryDims,
        Opcode::GetHistoryDims,
        Opcode::SetStreamConfig,
        Opcode::GetStreamConfig,
        Opcode::SetInputMode,
        Opcode::SetStreamPeriod,
        Opcode::GetStreamPeriod,
        Opcode::ReadStream,
    ];

    /// Wire byte.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::GetVersion => "GET_VERSION",
            Opcode::SetDataMask => "SET_DATA_MASK",
            Opcode::GetDataMask => "GET_DATA_MASK",
            Opcode::GetMotionData => "GET_MOTION_DATA",
            Opcode::SetHistoryDims => "SET_HISTORY_DIMS",
            Opcode::GetHistoryDims => "GET_HISTORY_DIMS",
            Opcode::SetStreamConfig => "SET_STREAM_CONFIG",
            Opcode::GetStreamConfig => "GET_STREAM_CONFIG",
            Opcode::SetInputMode => "SET_INPUT_MODE",
            Opcode::SetStreamPeriod => "SET_STREAM_PERIOD",
            Opcode::GetStreamPeriod => "GET_STREAM_PERIOD",
            Opcode::ReadStream => "READ_STREAM",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.code() == value)
            .ok_or(value)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
