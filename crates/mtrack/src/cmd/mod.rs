use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use mtrack_client::{Client, SimulatedDevice};
use mtrack_link::Link;
use mtrack_packet::{
    ChannelSet, CodecConfig, DataMask, Edge, Entries, InputMode, MaskEntry, Polarity,
    PositionWidth, CHANNELS,
};
use tracing::info;

use crate::exit::{encode_error, CliResult};
use crate::output::OutputFormat;

pub mod history;
pub mod info;
pub mod input;
pub mod mask;
pub mod motion;
pub mod reset;
pub mod stream;
pub mod version;

/// Per-channel velocities of the `--sim` device, so readouts move.
const SIM_VELOCITIES: [i16; CHANNELS] = [1, -3, 25, 0];

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show version information.
    Version(VersionArgs),
    /// Query firmware version and the device's current configuration.
    Info(InfoArgs),
    /// Show per-channel data masks, setting them first if options are given.
    Mask(MaskArgs),
    /// Read motion data.
    Motion(MotionArgs),
    /// Show or set history ring-buffer dimensions.
    History(HistoryArgs),
    /// Configure input-triggered position loading.
    Input(InputArgs),
    /// Stream telemetry until Ctrl-C, --count, or a stop condition.
    Stream(StreamArgs),
    /// Pulse the peripheral's reset line.
    Reset(ResetArgs),
}

pub fn run(command: Command, link: &LinkArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Version(args) => version::run(args),
        Command::Info(args) => info::run(args, link, format),
        Command::Mask(args) => mask::run(args, link, format),
        Command::Motion(args) => motion::run(args, link, format),
        Command::History(args) => history::run(args, link, format),
        Command::Input(args) => input::run(args, link, format),
        Command::Stream(args) => stream::run(args, link, format),
        Command::Reset(args) => reset::run(args, link),
    }
}

/// How to reach the peripheral. Shared by every device command.
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Talk to an in-process simulated device instead of hardware.
    #[arg(long, global = true)]
    pub sim: bool,
    /// spidev device node.
    #[arg(
        long,
        env = "MTRACK_SPI_DEVICE",
        default_value = "/dev/spidev0.0",
        global = true
    )]
    pub device: PathBuf,
    /// SPI clock rate in Hz.
    #[arg(long, env = "MTRACK_SPI_SPEED_HZ", default_value = "1000000", global = true)]
    pub speed_hz: u32,
    /// GPIO character device holding the select, ready and reset lines.
    #[arg(
        long,
        env = "MTRACK_GPIO_CHIP",
        default_value = "/dev/gpiochip0",
        global = true
    )]
    pub gpio_chip: PathBuf,
    /// Line offset for the select line. Default: controller-driven select.
    #[arg(long, env = "MTRACK_CS_GPIO", global = true)]
    pub cs_gpio: Option<u32>,
    /// Line offset carrying the ready signal.
    #[arg(long, env = "MTRACK_READY_GPIO", default_value = "25", global = true)]
    pub ready_gpio: u32,
    /// Ready line is asserted low.
    #[arg(long, global = true)]
    pub ready_active_low: bool,
    /// Line offset wired to the peripheral's reset input.
    #[arg(long, env = "MTRACK_RESET_GPIO", global = true)]
    pub reset_gpio: Option<u32>,
    /// Bound on each ready-line wait, in milliseconds.
    #[arg(long, default_value = "50", global = true)]
    pub ready_timeout_ms: u64,
}

pub type DynClient = Client<Box<dyn Link>>;

/// Open the configured link and wrap it in a client.
pub fn open_client(args: &LinkArgs) -> CliResult<DynClient> {
    let link: Box<dyn Link> = if args.sim {
        info!("using simulated device");
        Box::new(SimulatedDevice::new().with_velocities(SIM_VELOCITIES))
    } else {
        open_hardware(args)?
    };
    let config = CodecConfig {
        ready_timeout: Duration::from_millis(args.ready_timeout_ms),
        ..CodecConfig::default()
    };
    Ok(Client::with_config(link, config))
}

#[cfg(target_os = "linux")]
fn open_hardware(args: &LinkArgs) -> CliResult<Box<dyn Link>> {
    use mtrack_link::{open_spidev, SpidevConfig};

    let config = SpidevConfig {
        device: args.device.clone(),
        speed_hz: args.speed_hz,
        gpio_chip: args.gpio_chip.clone(),
        cs_line: args.cs_gpio,
        ready_line: args.ready_gpio,
        ready_active_low: args.ready_active_low,
        reset_line: args.reset_gpio,
        ..SpidevConfig::default()
    };
    let link =
        open_spidev(&config).map_err(|err| crate::exit::link_error("link open failed", err))?;
    Ok(Box::new(link))
}

#[cfg(not(target_os = "linux"))]
fn open_hardware(_args: &LinkArgs) -> CliResult<Box<dyn Link>> {
    Err(crate::exit::CliError::usage(
        "hardware links need Linux spidev; use --sim",
    ))
}

fn channel_set(channels: Option<&[usize]>) -> CliResult<ChannelSet> {
    match channels {
        None => Ok(ChannelSet::ALL),
        Some(list) => {
            ChannelSet::from_channels(list).map_err(|err| encode_error("invalid --channels", err))
        }
    }
}

/// Data-mask options. With none given the mask is left as it is.
#[derive(Args, Debug, Default, Clone)]
pub struct MaskArgs {
    /// Channels the mask applies to (comma-separated). Default: all.
    #[arg(long, value_delimiter = ',')]
    pub channels: Option<Vec<usize>>,
    /// Position width in bits: 8, 16, 24 or 32.
    #[arg(long, value_name = "BITS")]
    pub width: Option<u32>,
    /// Report position relative to the previous read.
    #[arg(long)]
    pub relative: bool,
    /// Include velocity.
    #[arg(long)]
    pub velocity: bool,
    /// Include glitch/overspeed status.
    #[arg(long)]
    pub status: bool,
    /// Stop reporting the selected channels.
    #[arg(long, conflicts_with_all = ["width", "relative", "velocity", "status"])]
    pub disable: bool,
}

impl MaskArgs {
    /// The mask entry these options describe, if any option was given.
    pub fn entries(&self) -> CliResult<Option<Entries<MaskEntry>>> {
        if !self.disable
            && self.width.is_none()
            && !self.relative
            && !self.velocity
            && !self.status
        {
            return Ok(None);
        }

        let channels = channel_set(self.channels.as_deref())?;
        let mask = if self.disable {
            DataMask::DISABLED
        } else {
            let width = PositionWidth::from_bits(self.width.unwrap_or(32))
                .map_err(|err| encode_error("invalid --width", err))?;
            let mut mask = DataMask::position(width);
            if self.relative {
                mask = mask.relative();
            }
            if self.velocity {
                mask = mask.with_velocity();
            }
            if self.status {
                mask = mask.with_status();
            }
            mask
        };
        Ok(Some(Entries::from(MaskEntry::new(channels, mask))))
    }
}

#[derive(Args, Debug)]
pub struct MotionArgs {
    #[command(flatten)]
    pub mask: MaskArgs,
    /// Number of reads.
    #[arg(long, default_value = "1")]
    pub count: u32,
    /// Pause between reads in milliseconds.
    #[arg(long, default_value = "100")]
    pub interval_ms: u64,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Ring-buffer length in samples (1-255).
    #[arg(long)]
    pub length: Option<u8>,
    /// Time resolution exponent: one sample spans 0.25 ms * 2^bits.
    #[arg(long, conflicts_with = "resolution_ms")]
    pub time_bits: Option<u8>,
    /// Time resolution in milliseconds, rounded down to a power-of-two step.
    #[arg(long)]
    pub resolution_ms: Option<f64>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum InputModeArg {
    Disabled,
    SetOnce,
    SetEveryEdge,
    SetSpaced,
}

impl From<InputModeArg> for InputMode {
    fn from(arg: InputModeArg) -> Self {
        match arg {
            InputModeArg::Disabled => InputMode::Disabled,
            InputModeArg::SetOnce => InputMode::SetOnce,
            InputModeArg::SetEveryEdge => InputMode::SetEveryEdge,
            InputModeArg::SetSpaced => InputMode::SetSpaced,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum PolarityArg {
    ActiveLow,
    ActiveHigh,
}

impl From<PolarityArg> for Polarity {
    fn from(arg: PolarityArg) -> Self {
        match arg {
            PolarityArg::ActiveLow => Polarity::ActiveLow,
            PolarityArg::ActiveHigh => Polarity::ActiveHigh,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum EdgeArg {
    Rising,
    Falling,
    Both,
}

impl From<EdgeArg> for Edge {
    fn from(arg: EdgeArg) -> Self {
        match arg {
            EdgeArg::Rising => Edge::Rising,
            EdgeArg::Falling => Edge::Falling,
            EdgeArg::Both => Edge::Both,
        }
    }
}

#[derive(Args, Debug)]
pub struct InputArgs {
    /// Channels to configure (comma-separated). Default: all.
    #[arg(long, value_delimiter = ',')]
    pub channels: Option<Vec<usize>>,
    /// What a matching input edge does.
    #[arg(long, value_enum)]
    pub mode: InputModeArg,
    #[arg(long, value_enum, default_value = "active-low")]
    pub polarity: PolarityArg,
    #[arg(long, value_enum, default_value = "rising")]
    pub edge: EdgeArg,
    /// Position loaded on a matching edge.
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub value: i32,
    /// Minimum edge spacing for set-spaced mode.
    #[arg(long, default_value = "0")]
    pub spacing: u16,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    #[command(flatten)]
    pub mask: MaskArgs,
    /// Stream period in raw ticks of 1/16 ms.
    #[arg(long, conflicts_with = "period_ms")]
    pub period: Option<u16>,
    /// Stream period in milliseconds, truncated to the tick grid.
    #[arg(long, default_value = "10")]
    pub period_ms: f64,
    /// Prefix each sample with the device timestamp.
    #[arg(long)]
    pub timestamp: bool,
    /// Prefix each sample with the elapsed-periods counter.
    #[arg(long)]
    pub elapsed: bool,
    /// Stop after N samples.
    #[arg(long)]
    pub count: Option<u64>,
    /// Stop when no sample arrives for this many milliseconds.
    #[arg(long, default_value = "1000")]
    pub staleness_ms: u64,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct InfoArgs {}

#[derive(Args, Debug, Default)]
pub struct ResetArgs {}
