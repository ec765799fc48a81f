//! Chip-select gated serial link abstraction.
//!
//! The lowest layer of mtrack. Everything above talks to the peripheral
//! through the [`Link`] trait:
//! - `select` / `exchange` for the full-duplex byte transfer
//! - `is_ready` for the out-of-band ready line
//! - `reset_pulse` for the reset line
//!
//! [`HalLink`] implements it over any `embedded-hal` SPI bus and pins. On
//! Linux, [`SpidevLink`] binds that to `/dev/spidevX.Y` and GPIO character
//! device lines.

pub mod error;
pub mod hal;
pub mod traits;

#[cfg(target_os = "linux")]
pub mod spidev;

pub use embedded_hal::digital::ErrorKind as PinErrorKind;
pub use embedded_hal::spi::ErrorKind as SpiErrorKind;
pub use error::{LinkError, Result};
pub use hal::{HalConfig, HalLink, MAX_TRANSFER};
pub use traits::{check_lengths, Link};

#[cfg(target_os = "linux")]
pub use spidev::{open as open_spidev, SpidevConfig, SpidevLink};
