//! [`Link`] over `embedded-hal` bus and pin traits.
//!
//! The select and reset lines are active low. Select is driven by hand
//! around a whole transaction rather than per transfer, so the bus must be
//! a raw [`SpiBus`], not an `SpiDevice`.

use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, SpiBus};
use tracing::{debug, trace};

use crate::error::{LinkError, Result};
use crate::traits::{check_lengths, Link};

/// Default spidev buffer size (`bufsiz` module parameter).
pub const MAX_TRANSFER: usize = 4096;

/// Line polarity and reset timing for a [`HalLink`].
#[derive(Debug, Clone)]
pub struct HalConfig {
    /// Ready line is asserted low.
    pub ready_active_low: bool,
    /// How long reset is held active.
    pub reset_pulse: Duration,
    /// Boot time after reset is released.
    pub reset_settle: Duration,
    /// Longest single bus transfer.
    pub max_transfer: usize,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            ready_active_low: false,
            reset_pulse: Duration::from_millis(10),
            reset_settle: Duration::from_millis(100),
            max_transfer: MAX_TRANSFER,
        }
    }
}

/// A select-gated SPI link with ready and reset lines.
///
/// `cs: None` leaves select to the bus controller, which then toggles it
/// per transfer.
pub struct HalLink<SPI, CS, READY, RESET, D> {
    spi: SPI,
    cs: Option<CS>,
    ready: READY,
    reset: Option<RESET>,
    delay: D,
    config: HalConfig,
}

impl<SPI, CS, READY, RESET, D> HalLink<SPI, CS, READY, RESET, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    READY: InputPin,
    RESET: OutputPin,
    D: DelayNs,
{
    /// Take ownership of the bus and lines. Select and reset start inactive.
    pub fn new(
        spi: SPI,
        mut cs: Option<CS>,
        ready: READY,
        mut reset: Option<RESET>,
        delay: D,
        config: HalConfig,
    ) -> Result<Self> {
        if let Some(pin) = cs.as_mut() {
            pin.set_high().map_err(pin_error("select"))?;
        }
        if let Some(pin) = reset.as_mut() {
            pin.set_high().map_err(pin_error("reset"))?;
        }
        Ok(Self {
            spi,
            cs,
            ready,
            reset,
            delay,
            config,
        })
    }

    pub fn config(&self) -> &HalConfig {
        &self.config
    }

    /// Give the bus and lines back.
    pub fn release(self) -> (SPI, Option<CS>, READY, Option<RESET>, D) {
        (self.spi, self.cs, self.ready, self.reset, self.delay)
    }
}

impl<SPI, CS, READY, RESET, D> Link for HalLink<SPI, CS, READY, RESET, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    READY: InputPin,
    RESET: OutputPin,
    D: DelayNs,
{
    fn select(&mut self, active: bool) -> Result<()> {
        let Some(pin) = self.cs.as_mut() else {
            return Ok(());
        };
        if active {
            pin.set_low().map_err(pin_error("select"))
        } else {
            self.spi.flush().map_err(spi_error)?;
            pin.set_high().map_err(pin_error("select"))
        }
    }

    fn is_ready(&mut self) -> Result<bool> {
        let high = self.ready.is_high().map_err(pin_error("ready"))?;
        Ok(high != self.config.ready_active_low)
    }

    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        check_lengths(tx, rx)?;
        if tx.len() > self.config.max_transfer {
            return Err(LinkError::TransferTooLong {
                len: tx.len(),
                max: self.config.max_transfer,
            });
        }
        if tx.is_empty() {
            return Ok(());
        }

        self.spi.transfer(rx, tx).map_err(spi_error)?;
        trace!(tx = ?tx, rx = ?&rx[..], "spi transfer");
        Ok(())
    }

    fn reset_pulse(&mut self) -> Result<()> {
        let Some(pin) = self.reset.as_mut() else {
            return Err(LinkError::NoResetLine);
        };

        debug!("pulsing reset");
        pin.set_low().map_err(pin_error("reset"))?;
        self.delay.delay_us(micros(self.config.reset_pulse));
        pin.set_high().map_err(pin_error("reset"))?;
        self.delay.delay_us(micros(self.config.reset_settle));
        Ok(())
    }
}

impl<SPI, CS, READY, RESET, D> std::fmt::Debug for HalLink<SPI, CS, READY, RESET, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HalLink")
            .field("gpio_select", &self.cs.is_some())
            .field("reset_line", &self.reset.is_some())
            .field("config", &self.config)
            .finish()
    }
}

fn micros(duration: Duration) -> u32 {
    u32::try_from(duration.as_micros()).unwrap_or(u32::MAX)
}

fn spi_error<E: spi::Error>(err: E) -> LinkError {
    LinkError::Spi(err.kind())
}

fn pin_error<E: digital::Error>(line: &'static str) -> impl FnOnce(E) -> LinkError {
    move |err| LinkError::Pin {
        line,
        kind: err.kind(),
    }
}
