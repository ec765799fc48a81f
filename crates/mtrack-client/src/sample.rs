use serde::Serialize;

const STATUS_GLITCH: u8 = 1 << 0;
const STATUS_OVERSPEED: u8 = 1 << 1;

/// Per-channel status flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MotionStatus {
    /// The sensor saw an invalid transition since the last read.
    pub glitch: bool,
    /// The input moved faster than the sensor can track.
    pub overspeed: bool,
}

impl MotionStatus {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            glitch: byte & STATUS_GLITCH != 0,
            overspeed: byte & STATUS_OVERSPEED != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        let mut byte = 0;
        if self.glitch {
            byte |= STATUS_GLITCH;
        }
        if self.overspeed {
            byte |= STATUS_OVERSPEED;
        }
        byte
    }
}

/// Decoded motion record of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotionSample {
    pub channel: usize,
    /// Position, sign-extended from the configured width.
    pub position: i32,
    /// `position` is a delta since the previous read.
    pub relative: bool,
    /// Present when the channel's mask enables velocity.
    pub velocity: Option<i16>,
    /// Present when the channel's mask enables status.
    pub status: Option<MotionStatus>,
}

/// One streaming record: optional prefix fields plus every active channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamSample {
    /// Device timestamp in microseconds.
    pub timestamp_us: Option<u32>,
    /// Stream periods elapsed since the previous sample.
    pub elapsed_periods: Option<u16>,
    pub channels: Vec<MotionSample>,
}
