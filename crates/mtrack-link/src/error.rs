use std::path::PathBuf;

use embedded_hal::{digital, spi};

/// Errors that can occur while driving the serial link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Failed to open or configure the bus device node.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A GPIO line could not be requested from its chip.
    #[error("gpio line {line} failed: {source}")]
    Gpio { line: u32, source: std::io::Error },

    /// The SPI bus reported a failed transfer.
    #[error("spi transfer failed: {0:?}")]
    Spi(spi::ErrorKind),

    /// Reading or driving a claimed line failed.
    #[error("{line} line failed: {kind:?}")]
    Pin {
        line: &'static str,
        kind: digital::ErrorKind,
    },

    /// `reset_pulse` on a link wired without a reset line.
    #[error("no reset line configured")]
    NoResetLine,

    /// An I/O error occurred during a bus transfer.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transmit and receive buffers of one exchange differ in length.
    #[error("exchange length mismatch (tx {tx} bytes, rx {rx} bytes)")]
    LengthMismatch { tx: usize, rx: usize },

    /// The exchange is longer than a single bus transfer allows.
    #[error("transfer too long ({len} bytes, max {max})")]
    TransferTooLong { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, LinkError>;
