/// Errors raised while building command arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A repeated-record command needs at least one entry.
    #[error("entry list is empty")]
    EmptyEntries,

    /// Too many repeated records for one request.
    #[error("too many entries ({count}, max {max})")]
    TooManyEntries { count: usize, max: usize },

    /// Channel bitmask is empty or names channels the device does not have.
    #[error("invalid channel set 0x{0:02x}")]
    InvalidChannels(u8),

    /// A field value is outside its encodable range.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: u32 },
}

pub type Result<T> = std::result::Result<T, EncodeError>;
