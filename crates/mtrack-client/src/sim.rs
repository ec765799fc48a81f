//! A simulated peripheral that speaks the device side of the protocol.
//!
//! Drives the same [`Link`] surface a real board does, so the client, the
//! stream session and the CLI can run end to end without hardware. Positions
//! advance by each channel's velocity on every motion snapshot; stream
//! samples fall due on wall-clock time at the configured period.

use std::time::{Duration, Instant};

use bytes::{BufMut, BytesMut};
use mtrack_link::{check_lengths, Link, LinkError};
use mtrack_packet::{
    ChannelSet, DataMask, HistoryDims, InputModeSpec, Opcode, PacketResult, StreamConfig, Version,
    CHANNELS, INPUT_MODE_RECORD_LEN, MAX_ENTRIES, PROTOCOL_VERSION, RESPONSE_HEADER_SIZE,
    STREAM_TICKS_PER_MS,
};
use tracing::{debug, trace};

use crate::sample::MotionStatus;

/// Firmware version the simulator reports by default.
pub const SIM_VERSION: Version = Version {
    major: 1,
    minor: 4,
    protocol: PROTOCOL_VERSION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Command,
    Header,
    Payload,
    Done,
}

#[derive(Debug)]
struct Registers {
    masks: [DataMask; CHANNELS],
    stream: StreamConfig,
    period: u16,
    history: HistoryDims,
    input_modes: [Option<InputModeSpec>; CHANNELS],
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            masks: [DataMask::default(); CHANNELS],
            stream: StreamConfig::default(),
            period: 0,
            history: HistoryDims::default(),
            input_modes: [None; CHANNELS],
        }
    }
}

/// In-process stand-in for the peripheral.
#[derive(Debug)]
pub struct SimulatedDevice {
    version: Version,
    regs: Registers,
    positions: [i32; CHANNELS],
    reported: [i32; CHANNELS],
    velocities: [i16; CHANNELS],
    status: [MotionStatus; CHANNELS],
    epoch: Instant,
    next_due: Option<Instant>,
    reject_next: Option<PacketResult>,
    silent: bool,
    selected: bool,
    phase: Phase,
    response: (PacketResult, Vec<u8>),
    resets: usize,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    /// A device at its power-on configuration with every channel at rest.
    pub fn new() -> Self {
        Self {
            version: SIM_VERSION,
            regs: Registers::default(),
            positions: [0; CHANNELS],
            reported: [0; CHANNELS],
            velocities: [0; CHANNELS],
            status: [MotionStatus::default(); CHANNELS],
            epoch: Instant::now(),
            next_due: None,
            reject_next: None,
            silent: false,
            selected: false,
            phase: Phase::Idle,
            response: (PacketResult::Ok, Vec::new()),
            resets: 0,
        }
    }

    /// Per-channel position change applied on every motion snapshot.
    pub fn with_velocities(mut self, velocities: [i16; CHANNELS]) -> Self {
        self.velocities = velocities;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Answer the next command with `result` and no payload, without acting
    /// on it.
    pub fn reject_next(&mut self, result: PacketResult) {
        self.reject_next = Some(result);
    }

    /// A silent device never asserts ready.
    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    /// Latch status flags reported on the next snapshot of `channel`.
    pub fn raise_status(&mut self, channel: usize, status: MotionStatus) {
        if let Some(slot) = self.status.get_mut(channel) {
            *slot = status;
        }
    }

    pub fn positions(&self) -> [i32; CHANNELS] {
        self.positions
    }

    pub fn stream_period(&self) -> u16 {
        self.regs.period
    }

    pub fn input_modes(&self) -> &[Option<InputModeSpec>; CHANNELS] {
        &self.regs.input_modes
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    fn period_duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.regs.period) / STREAM_TICKS_PER_MS / 1000.0)
    }

    fn handle(&mut self, request: &[u8]) -> (PacketResult, Vec<u8>) {
        let Some((&code, args)) = request.split_first() else {
            return (PacketResult::InvalidCommand, Vec::new());
        };
        let Ok(opcode) = Opcode::try_from(code) else {
            debug!(code, "simulator: unknown opcode");
            return (PacketResult::InvalidCommand, Vec::new());
        };
        if let Some(result) = self.reject_next.take() {
            debug!(%opcode, %result, "simulator: rejecting command");
            return (result, Vec::new());
        }

        let outcome = match opcode {
            Opcode::GetVersion => no_args(args).map(|()| {
                vec![self.version.major, self.version.minor, self.version.protocol]
            }),
            Opcode::SetDataMask => self.set_data_mask(args),
            Opcode::GetDataMask => {
                no_args(args).map(|()| self.regs.masks.iter().map(|m| m.to_byte()).collect())
            }
            Opcode::GetMotionData => no_args(args).map(|()| {
                let mut out = BytesMut::new();
                self.snapshot(&mut out);
                out.to_vec()
            }),
            Opcode::SetHistoryDims => match args {
                [length, time_bits] => HistoryDims::new(*length, *time_bits)
                    .map(|dims| {
                        self.regs.history = dims;
                        Vec::new()
                    })
                    .map_err(|_| PacketResult::InvalidParameter),
                _ => Err(PacketResult::InvalidParameter),
            },
            Opcode::GetHistoryDims => no_args(args).map(|()| self.regs.history.to_bytes().to_vec()),
            Opcode::SetStreamConfig => match args {
                [control] => {
                    self.regs.stream = StreamConfig::from_byte(*control);
                    Ok(Vec::new())
                }
                _ => Err(PacketResult::InvalidParameter),
            },
            Opcode::GetStreamConfig => no_args(args).map(|()| vec![self.regs.stream.to_byte()]),
            Opcode::SetInputMode => self.set_input_mode(args),
            Opcode::SetStreamPeriod => match args {
                [lo, hi] => {
                    self.regs.period = u16::from_le_bytes([*lo, *hi]);
                    self.next_due = (self.regs.period != 0)
                        .then(|| Instant::now() + self.period_duration());
                    Ok(Vec::new())
                }
                _ => Err(PacketResult::InvalidParameter),
            },
            Opcode::GetStreamPeriod => no_args(args).map(|()| self.regs.period.to_le_bytes().to_vec()),
            Opcode::ReadStream => no_args(args).and_then(|()| self.read_stream()),
        };

        match outcome {
            Ok(payload) => (PacketResult::Ok, payload),
            Err(result) => {
                debug!(%opcode, %result, "simulator: command failed");
                (result, Vec::new())
            }
        }
    }

    fn set_data_mask(&mut self, args: &[u8]) -> Result<Vec<u8>, PacketResult> {
        let entries = counted(args, 2)?;
        let mut masks = self.regs.masks;
        for entry in entries.chunks_exact(2) {
            let channels = ChannelSet::new(entry[0]).map_err(|_| PacketResult::InvalidParameter)?;
            let mask = DataMask::from_byte(entry[1]);
            for channel in channels.iter() {
                masks[channel] = mask;
            }
        }
        self.regs.masks = masks;
        Ok(Vec::new())
    }

    fn set_input_mode(&mut self, args: &[u8]) -> Result<Vec<u8>, PacketResult> {
        let records = counted(args, INPUT_MODE_RECORD_LEN)?;
        let mut modes = self.regs.input_modes;
        for record in records.chunks_exact(INPUT_MODE_RECORD_LEN) {
            let record: &[u8; INPUT_MODE_RECORD_LEN] =
                record.try_into().map_err(|_| PacketResult::InvalidParameter)?;
            let spec =
                InputModeSpec::from_record(record).map_err(|_| PacketResult::InvalidParameter)?;
            for channel in spec.channels.iter() {
                modes[channel] = Some(spec);
            }
        }
        self.regs.input_modes = modes;
        Ok(Vec::new())
    }

    fn read_stream(&mut self) -> Result<Vec<u8>, PacketResult> {
        let Some(due) = self.next_due else {
            return Err(PacketResult::InvalidCommand);
        };
        let now = Instant::now();
        if now < due {
            return Ok(Vec::new());
        }

        let period = self.period_duration();
        let missed = (now - due).as_nanos() / period.as_nanos().max(1);
        let elapsed = missed.saturating_add(1);
        self.next_due = Some(due + period * (elapsed.min(u128::from(u32::MAX)) as u32));

        let mut out = BytesMut::new();
        if self.regs.stream.timestamp {
            out.put_u32_le(now.duration_since(self.epoch).as_micros() as u32);
        }
        if self.regs.stream.elapsed_periods {
            out.put_u16_le(elapsed.min(u128::from(u16::MAX)) as u16);
        }
        self.snapshot(&mut out);
        Ok(out.to_vec())
    }

    /// Advance every channel and write its motion record.
    fn snapshot(&mut self, out: &mut BytesMut) {
        for channel in 0..CHANNELS {
            self.positions[channel] =
                self.positions[channel].wrapping_add(i32::from(self.velocities[channel]));

            let mask = self.regs.masks[channel];
            if !mask.enabled {
                continue;
            }
            let value = if mask.relative {
                self.positions[channel].wrapping_sub(self.reported[channel])
            } else {
                self.positions[channel]
            };
            self.reported[channel] = self.positions[channel];

            let bytes = value.to_le_bytes();
            out.put_slice(&bytes[..mask.width.bytes()]);
            if mask.velocity {
                out.put_i16_le(self.velocities[channel]);
            }
            if mask.status {
                out.put_u8(self.status[channel].to_byte());
                self.status[channel] = MotionStatus::default();
            }
        }
    }
}

fn no_args(args: &[u8]) -> Result<(), PacketResult> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(PacketResult::InvalidParameter)
    }
}

/// Split `count, record × count`, checking the count and total length.
fn counted(args: &[u8], record_len: usize) -> Result<&[u8], PacketResult> {
    let Some((&count, records)) = args.split_first() else {
        return Err(PacketResult::InvalidParameter);
    };
    let count = usize::from(count);
    if count == 0 || count > MAX_ENTRIES || records.len() != count * record_len {
        return Err(PacketResult::InvalidParameter);
    }
    Ok(records)
}

impl Link for SimulatedDevice {
    fn select(&mut self, active: bool) -> mtrack_link::Result<()> {
        self.selected = active;
        self.phase = if active { Phase::Command } else { Phase::Idle };
        Ok(())
    }

    fn is_ready(&mut self) -> mtrack_link::Result<bool> {
        if !self.selected || self.silent {
            return Ok(false);
        }
        Ok(matches!(
            self.phase,
            Phase::Command | Phase::Header | Phase::Payload
        ))
    }

    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> mtrack_link::Result<()> {
        check_lengths(tx, rx)?;
        if !self.selected {
            return Err(LinkError::Io(std::io::Error::other(
                "exchange while deselected",
            )));
        }

        match self.phase {
            Phase::Command => {
                trace!(request = ?tx, "simulator: request");
                self.response = self.handle(tx);
                rx.fill(0);
                self.phase = Phase::Header;
            }
            Phase::Header => {
                let (result, payload) = &self.response;
                let mut header = [0u8; RESPONSE_HEADER_SIZE];
                header[..2].copy_from_slice(&(payload.len() as u16).to_le_bytes());
                header[2] = result.code();
                let n = rx.len().min(RESPONSE_HEADER_SIZE);
                rx[..n].copy_from_slice(&header[..n]);
                rx[n..].fill(0);
                self.phase = if payload.is_empty() {
                    Phase::Done
                } else {
                    Phase::Payload
                };
            }
            Phase::Payload => {
                let payload = &self.response.1;
                let n = rx.len().min(payload.len());
                rx[..n].copy_from_slice(&payload[..n]);
                rx[n..].fill(0);
                self.phase = Phase::Done;
            }
            Phase::Idle | Phase::Done => rx.fill(0),
        }
        Ok(())
    }

    fn reset_pulse(&mut self) -> mtrack_link::Result<()> {
        self.regs = Registers::default();
        self.next_due = None;
        self.reject_next = None;
        self.reported = self.positions;
        self.status = [MotionStatus::default(); CHANNELS];
        self.phase = Phase::Idle;
        self.resets += 1;
        debug!("simulator: reset");
        Ok(())
    }
}
