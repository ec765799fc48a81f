//! Typed argument and result records, with their fixed wire encodings.
//!
//! Layouts that depend on negotiated configuration (motion data, stream
//! samples) are decoded in `mtrack-client`; everything here is fixed-size.

use serde::Serialize;

use crate::error::{EncodeError, Result};
use crate::units::MAX_HISTORY_TIME_BITS;

/// Number of motion channels on the peripheral.
pub const CHANNELS: usize = 4;

/// Maximum repeated records in one request.
pub const MAX_ENTRIES: usize = 8;

/// Protocol version this crate speaks.
pub const PROTOCOL_VERSION: u8 = 2;

/// Velocity field width in bytes.
pub const VELOCITY_BYTES: usize = 2;

/// Status field width in bytes.
pub const STATUS_BYTES: usize = 1;

/// Input-mode record width in bytes.
pub const INPUT_MODE_RECORD_LEN: usize = 9;

/// Non-empty bitmask of channels, bit `n` selecting channel `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelSet(u8);

impl ChannelSet {
    /// Every channel.
    pub const ALL: ChannelSet = ChannelSet(((1u16 << CHANNELS) - 1) as u8);

    pub fn new(bits: u8) -> Result<Self> {
        if bits == 0 || bits & !Self::ALL.0 != 0 {
            return Err(EncodeError::InvalidChannels(bits));
        }
        Ok(Self(bits))
    }

    pub fn single(channel: usize) -> Result<Self> {
        Self::from_channels(&[channel])
    }

    pub fn from_channels(channels: &[usize]) -> Result<Self> {
        let mut bits = 0u8;
        for &channel in channels {
            if channel >= CHANNELS {
                return Err(EncodeError::OutOfRange {
                    field: "channel",
                    value: channel as u32,
                });
            }
            bits |= 1 << channel;
        }
        Self::new(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, channel: usize) -> bool {
        channel < CHANNELS && self.0 & (1 << channel) != 0
    }

    /// Selected channels, ascending.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..CHANNELS).filter(move |&ch| self.contains(ch))
    }
}

/// Position field width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PositionWidth {
    Bits8,
    Bits16,
    Bits24,
    Bits32,
}

impl PositionWidth {
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            8 => Ok(PositionWidth::Bits8),
            16 => Ok(PositionWidth::Bits16),
            24 => Ok(PositionWidth::Bits24),
            32 => Ok(PositionWidth::Bits32),
            other => Err(EncodeError::OutOfRange {
                field: "position width",
                value: other,
            }),
        }
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }

    pub fn bytes(self) -> usize {
        self.code() as usize + 1
    }

    fn code(self) -> u8 {
        match self {
            PositionWidth::Bits8 => 0,
            PositionWidth::Bits16 => 1,
            PositionWidth::Bits24 => 2,
            PositionWidth::Bits32 => 3,
        }
    }

    fn from_code(code: u8) -> Self {
        match code & 0b11 {
            0 => PositionWidth::Bits8,
            1 => PositionWidth::Bits16,
            2 => PositionWidth::Bits24,
            _ => PositionWidth::Bits32,
        }
    }
}

const MASK_RELATIVE: u8 = 1 << 2;
const MASK_VELOCITY: u8 = 1 << 3;
const MASK_STATUS: u8 = 1 << 4;
const MASK_ENABLED: u8 = 1 << 7;

/// Which motion fields one channel reports, and how wide the position is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DataMask {
    pub enabled: bool,
    pub width: PositionWidth,
    pub relative: bool,
    pub velocity: bool,
    pub status: bool,
}

impl DataMask {
    /// A channel that reports nothing.
    pub const DISABLED: DataMask = DataMask {
        enabled: false,
        width: PositionWidth::Bits32,
        relative: false,
        velocity: false,
        status: false,
    };

    /// Enabled channel reporting an absolute position only.
    pub fn position(width: PositionWidth) -> Self {
        Self {
            enabled: true,
            width,
            relative: false,
            velocity: false,
            status: false,
        }
    }

    pub fn relative(mut self) -> Self {
        self.relative = true;
        self
    }

    pub fn with_velocity(mut self) -> Self {
        self.velocity = true;
        self
    }

    pub fn with_status(mut self) -> Self {
        self.status = true;
        self
    }

    pub fn to_byte(self) -> u8 {
        let mut byte = self.width.code();
        if self.relative {
            byte |= MASK_RELATIVE;
        }
        if self.velocity {
            byte |= MASK_VELOCITY;
        }
        if self.status {
            byte |= MASK_STATUS;
        }
        if self.enabled {
            byte |= MASK_ENABLED;
        }
        byte
    }

    /// Reserved bits 5-6 are ignored.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            enabled: byte & MASK_ENABLED != 0,
            width: PositionWidth::from_code(byte),
            relative: byte & MASK_RELATIVE != 0,
            velocity: byte & MASK_VELOCITY != 0,
            status: byte & MASK_STATUS != 0,
        }
    }

    /// Bytes one motion record for this channel occupies.
    pub fn record_len(self) -> usize {
        if !self.enabled {
            return 0;
        }
        let mut len = self.width.bytes();
        if self.velocity {
            len += VELOCITY_BYTES;
        }
        if self.status {
            len += STATUS_BYTES;
        }
        len
    }
}

impl Default for DataMask {
    /// Power-on setting: absolute 32-bit position only.
    fn default() -> Self {
        DataMask::position(PositionWidth::Bits32)
    }
}

/// One `SET_DATA_MASK` entry: apply `mask` to every channel in `channels`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaskEntry {
    pub channels: ChannelSet,
    pub mask: DataMask,
}

impl MaskEntry {
    pub fn new(channels: ChannelSet, mask: DataMask) -> Self {
        Self { channels, mask }
    }

    /// Broadcast `mask` to every channel.
    pub fn all(mask: DataMask) -> Self {
        Self::new(ChannelSet::ALL, mask)
    }
}

const STREAM_TIMESTAMP: u8 = 1 << 0;
const STREAM_ELAPSED: u8 = 1 << 1;

/// Optional prefix fields of each streaming sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct StreamConfig {
    pub timestamp: bool,
    pub elapsed_periods: bool,
}

impl StreamConfig {
    pub fn to_byte(self) -> u8 {
        let mut byte = 0;
        if self.timestamp {
            byte |= STREAM_TIMESTAMP;
        }
        if self.elapsed_periods {
            byte |= STREAM_ELAPSED;
        }
        byte
    }

    pub fn from_byte(byte: u8) -> Self {
        Self {
            timestamp: byte & STREAM_TIMESTAMP != 0,
            elapsed_periods: byte & STREAM_ELAPSED != 0,
        }
    }

    /// Bytes the prefix fields occupy.
    pub fn prefix_len(self) -> usize {
        let mut len = 0;
        if self.timestamp {
            len += 4;
        }
        if self.elapsed_periods {
            len += 2;
        }
        len
    }
}

/// History ring-buffer dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HistoryDims {
    length: u8,
    time_bits: u8,
}

impl HistoryDims {
    /// `length` must be nonzero and `time_bits` at most
    /// [`MAX_HISTORY_TIME_BITS`].
    pub fn new(length: u8, time_bits: u8) -> Result<Self> {
        if length == 0 {
            return Err(EncodeError::OutOfRange {
                field: "history length",
                value: 0,
            });
        }
        if time_bits > MAX_HISTORY_TIME_BITS {
            return Err(EncodeError::OutOfRange {
                field: "history time bits",
                value: u32::from(time_bits),
            });
        }
        Ok(Self { length, time_bits })
    }

    pub fn length(self) -> u8 {
        self.length
    }

    pub fn time_bits(self) -> u8 {
        self.time_bits
    }

    /// Time resolution of one history sample in milliseconds.
    pub fn resolution_ms(self) -> f64 {
        crate::units::history_bits_to_ms(self.time_bits)
    }

    pub fn to_bytes(self) -> [u8; 2] {
        [self.length, self.time_bits]
    }
}

impl Default for HistoryDims {
    fn default() -> Self {
        Self {
            length: 64,
            time_bits: 4,
        }
    }
}

/// Behaviour of a channel's input pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum InputMode {
    #[default]
    Disabled,
    /// Load `value` into the position on the first matching edge.
    SetOnce,
    /// Load `value` on every matching edge.
    SetEveryEdge,
    /// Load `value` on edges at least `spacing` counts apart.
    SetSpaced,
}

impl InputMode {
    pub fn code(self) -> u8 {
        match self {
            InputMode::Disabled => 0,
            InputMode::SetOnce => 1,
            InputMode::SetEveryEdge => 2,
            InputMode::SetSpaced => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(InputMode::Disabled),
            1 => Ok(InputMode::SetOnce),
            2 => Ok(InputMode::SetEveryEdge),
            3 => Ok(InputMode::SetSpaced),
            other => Err(EncodeError::OutOfRange {
                field: "input mode",
                value: u32::from(other),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Polarity {
    #[default]
    ActiveLow,
    ActiveHigh,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Edge {
    #[default]
    Rising,
    Falling,
    Both,
}

impl Edge {
    fn code(self) -> u8 {
        match self {
            Edge::Rising => 1,
            Edge::Falling => 2,
            Edge::Both => 3,
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Edge::Rising),
            2 => Ok(Edge::Falling),
            3 => Ok(Edge::Both),
            other => Err(EncodeError::OutOfRange {
                field: "edge",
                value: u32::from(other),
            }),
        }
    }
}

/// One `SET_INPUT_MODE` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InputModeSpec {
    pub channels: ChannelSet,
    pub mode: InputMode,
    pub polarity: Polarity,
    pub edge: Edge,
    /// Position loaded on a matching edge.
    pub value: i32,
    /// Minimum edge spacing, only used by [`InputMode::SetSpaced`].
    pub spacing: u16,
}

impl InputModeSpec {
    pub fn new(channels: ChannelSet, mode: InputMode) -> Self {
        Self {
            channels,
            mode,
            polarity: Polarity::default(),
            edge: Edge::default(),
            value: 0,
            spacing: 0,
        }
    }

    pub fn to_record(&self) -> [u8; INPUT_MODE_RECORD_LEN] {
        let mut flags = self.edge.code() << 1;
        if self.polarity == Polarity::ActiveHigh {
            flags |= 1;
        }
        let value = self.value.to_le_bytes();
        let spacing = self.spacing.to_le_bytes();
        [
            self.channels.bits(),
            self.mode.code(),
            flags,
            value[0],
            value[1],
            value[2],
            value[3],
            spacing[0],
            spacing[1],
        ]
    }

    pub fn from_record(record: &[u8; INPUT_MODE_RECORD_LEN]) -> Result<Self> {
        let flags = record[2];
        Ok(Self {
            channels: ChannelSet::new(record[0])?,
            mode: InputMode::from_code(record[1])?,
            polarity: if flags & 1 != 0 {
                Polarity::ActiveHigh
            } else {
                Polarity::ActiveLow
            },
            edge: Edge::from_code((flags >> 1) & 0b11)?,
            value: i32::from_le_bytes([record[3], record[4], record[5], record[6]]),
            spacing: u16::from_le_bytes([record[7], record[8]]),
        })
    }
}

/// Firmware and protocol version reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub protocol: u8,
}

impl Version {
    /// Whether the device speaks [`PROTOCOL_VERSION`]. Not enforced anywhere.
    pub fn is_protocol_compatible(&self) -> bool {
        self.protocol == PROTOCOL_VERSION
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} (protocol {})", self.major, self.minor, self.protocol)
    }
}

/// Ordered list of 1..=[`MAX_ENTRIES`] repeated records.
///
/// The device applies entries in order; overlapping channels take the last
/// entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entries<T>(Vec<T>);

impl<T> Entries<T> {
    pub fn new(items: Vec<T>) -> Result<Self> {
        if items.is_empty() {
            return Err(EncodeError::EmptyEntries);
        }
        if items.len() > MAX_ENTRIES {
            return Err(EncodeError::TooManyEntries {
                count: items.len(),
                max: MAX_ENTRIES,
            });
        }
        Ok(Self(items))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<T> for Entries<T> {
    fn from(item: T) -> Self {
        Self(vec![item])
    }
}

impl<T> TryFrom<Vec<T>> for Entries<T> {
    type Error = EncodeError;

    fn try_from(items: Vec<T>) -> Result<Self> {
        Self::new(items)
    }
}

impl<'a, T> IntoIterator for &'a Entries<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
