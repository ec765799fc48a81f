use std::io;
use std::path::PathBuf;
use std::time::Duration;

use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, Spidev, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevBus};
use tracing::info;

use crate::error::{LinkError, Result};
use crate::hal::{HalConfig, HalLink, MAX_TRANSFER};

/// Consumer label shown for claimed lines in `gpioinfo`.
const CONSUMER: &str = "mtrack";

/// Configuration for a [`SpidevLink`].
#[derive(Debug, Clone)]
pub struct SpidevConfig {
    /// spidev node, e.g. `/dev/spidev0.0`.
    pub device: PathBuf,
    /// Clock rate in Hz.
    pub speed_hz: u32,
    /// SPI mode (CPOL/CPHA bits).
    pub mode: u8,
    /// GPIO character device holding the lines below.
    pub gpio_chip: PathBuf,
    /// Line driving the active-low select. `None` leaves select to the
    /// controller, which toggles it per transfer.
    pub cs_line: Option<u32>,
    /// Line carrying the peripheral's ready signal.
    pub ready_line: u32,
    /// Ready line is asserted low.
    pub ready_active_low: bool,
    /// Line wired to the active-low reset input.
    pub reset_line: Option<u32>,
    /// How long reset is held active.
    pub reset_pulse: Duration,
    /// Boot time after reset is released.
    pub reset_settle: Duration,
}

impl Default for SpidevConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/spidev0.0"),
            speed_hz: 1_000_000,
            mode: 0,
            gpio_chip: PathBuf::from("/dev/gpiochip0"),
            cs_line: None,
            ready_line: 25,
            ready_active_low: false,
            reset_line: None,
            reset_pulse: Duration::from_millis(10),
            reset_settle: Duration::from_millis(100),
        }
    }
}

/// Linux spidev link with GPIO character-device select, ready and reset lines.
pub type SpidevLink = HalLink<SpidevBus, CdevPin, CdevPin, CdevPin, Delay>;

/// Open the spidev node and claim the configured lines.
pub fn open(config: &SpidevConfig) -> Result<SpidevLink> {
    let open_error = |source: io::Error| LinkError::Open {
        path: config.device.clone(),
        source,
    };

    let mut spi = Spidev::open(&config.device).map_err(open_error)?;
    let mut mode = SpiModeFlags::from_bits_truncate(u32::from(config.mode));
    if config.cs_line.is_some() {
        mode |= SpiModeFlags::SPI_NO_CS;
    }
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(config.speed_hz)
        .mode(mode)
        .build();
    spi.configure(&options).map_err(open_error)?;

    let mut chip = Chip::new(&config.gpio_chip).map_err(|err| LinkError::Open {
        path: config.gpio_chip.clone(),
        source: io::Error::other(err.to_string()),
    })?;
    let cs = config
        .cs_line
        .map(|line| request_line(&mut chip, line, LineRequestFlags::OUTPUT))
        .transpose()?;
    let ready = request_line(&mut chip, config.ready_line, LineRequestFlags::INPUT)?;
    let reset = config
        .reset_line
        .map(|line| request_line(&mut chip, line, LineRequestFlags::OUTPUT))
        .transpose()?;

    info!(
        device = %config.device.display(),
        gpio_chip = %config.gpio_chip.display(),
        speed_hz = config.speed_hz,
        mode = config.mode,
        "spidev link opened"
    );

    HalLink::new(
        SpidevBus(spi),
        cs,
        ready,
        reset,
        Delay,
        HalConfig {
            ready_active_low: config.ready_active_low,
            reset_pulse: config.reset_pulse,
            reset_settle: config.reset_settle,
            max_transfer: MAX_TRANSFER,
        },
    )
}

/// Outputs are requested high, the inactive level of the active-low lines.
fn request_line(chip: &mut Chip, line: u32, flags: LineRequestFlags) -> Result<CdevPin> {
    let initial = u8::from(flags.contains(LineRequestFlags::OUTPUT));
    let handle = chip
        .get_line(line)
        .and_then(|l| l.request(flags, initial, CONSUMER))
        .map_err(gpio_error(line))?;
    CdevPin::new(handle).map_err(gpio_error(line))
}

fn gpio_error<E: std::fmt::Display>(line: u32) -> impl FnOnce(E) -> LinkError {
    move |err| LinkError::Gpio {
        line,
        source: io::Error::other(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_device_reports_path() {
        let config = SpidevConfig {
            device: PathBuf::from("/nonexistent/spidev9.9"),
            ..SpidevConfig::default()
        };
        let err = open(&config).unwrap_err();
        assert!(matches!(err, LinkError::Open { ref path, .. } if path.ends_with("spidev9.9")));
    }
}
