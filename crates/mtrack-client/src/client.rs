use mtrack_link::Link;
use mtrack_packet::{
    CodecConfig, Command, DataMask, Entries, HistoryDims, InputModeSpec, MaskEntry, PacketCodec,
    StreamConfig, TransportResult, Version, CHANNELS, MAX_RESPONSE_PAYLOAD,
};
use tracing::{debug, info};

use crate::decode;
use crate::error::DecodeResult;
use crate::reply::Reply;
use crate::sample::{MotionSample, StreamSample};
use crate::state::ConfigState;
use crate::stream::StreamState;

/// Protocol client for one peripheral.
///
/// Owns the codec (and through it the link) plus the configuration state the
/// decoders depend on. Every operation is one blocking request/response.
/// State changes only after a reply whose transport and packet results are
/// both `Ok`.
pub struct Client<L> {
    pub(crate) codec: PacketCodec<L>,
    pub(crate) state: ConfigState,
    pub(crate) stream: StreamState,
    rx: [u8; MAX_RESPONSE_PAYLOAD],
}

impl<L: Link> Client<L> {
    /// Create a client assuming the device is at its power-on configuration.
    pub fn new(link: L) -> Self {
        Self::with_config(link, CodecConfig::default())
    }

    pub fn with_config(link: L, config: CodecConfig) -> Self {
        Self {
            codec: PacketCodec::with_config(link, config),
            state: ConfigState::default(),
            stream: StreamState::Idle,
            rx: [0u8; MAX_RESPONSE_PAYLOAD],
        }
    }

    /// Configuration the decoders currently assume.
    pub fn state(&self) -> &ConfigState {
        &self.state
    }

    pub fn stream_state(&self) -> &StreamState {
        &self.stream
    }

    pub fn link(&self) -> &L {
        self.codec.get_ref()
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.codec.get_mut()
    }

    pub fn into_link(self) -> L {
        self.codec.into_inner()
    }

    fn execute<T>(
        &mut self,
        command: Command,
        decode: impl FnOnce(&[u8], &ConfigState) -> DecodeResult<T>,
    ) -> Reply<T> {
        let exchange = self.codec.execute(&command, &mut self.rx);
        let state = &self.state;
        Reply::from_exchange(exchange, &self.rx, |payload| decode(payload, state))
    }

    fn execute_setter(&mut self, command: Command) -> Reply<()> {
        self.execute(command, |payload, _| decode::decode_empty(payload))
    }

    pub fn get_version(&mut self) -> Reply<Version> {
        self.execute(Command::get_version(), |payload, _| {
            decode::decode_version(payload)
        })
    }

    /// Apply mask entries in order. On success the client's masks follow,
    /// last entry winning where channels overlap.
    pub fn set_data_mask(&mut self, entries: &Entries<MaskEntry>) -> Reply<()> {
        let reply = self.execute_setter(Command::set_data_mask(entries));
        if reply.is_ok() {
            self.state.apply_masks(entries);
            debug!(masks = ?self.state.masks, "data masks updated");
        }
        reply
    }

    /// Query the device's masks and adopt them.
    pub fn get_data_mask(&mut self) -> Reply<[DataMask; CHANNELS]> {
        let reply = self.execute(Command::get_data_mask(), |payload, _| {
            decode::decode_data_masks(payload)
        });
        if let Some(masks) = reply.value() {
            self.state.masks = *masks;
        }
        reply
    }

    /// One motion record per enabled channel, laid out by the current masks.
    pub fn get_motion_data(&mut self) -> Reply<Vec<MotionSample>> {
        self.execute(Command::get_motion_data(), decode::decode_motion)
    }

    pub fn set_history_dims(&mut self, dims: HistoryDims) -> Reply<()> {
        let reply = self.execute_setter(Command::set_history_dims(dims));
        if reply.is_ok() {
            self.state.history = dims;
        }
        reply
    }

    pub fn get_history_dims(&mut self) -> Reply<HistoryDims> {
        let reply = self.execute(Command::get_history_dims(), |payload, _| {
            decode::decode_history_dims(payload)
        });
        if let Some(dims) = reply.value() {
            self.state.history = *dims;
        }
        reply
    }

    pub fn set_stream_config(&mut self, config: StreamConfig) -> Reply<()> {
        let reply = self.execute_setter(Command::set_stream_config(config));
        if reply.is_ok() {
            self.state.stream = config;
        }
        reply
    }

    pub fn get_stream_config(&mut self) -> Reply<StreamConfig> {
        let reply = self.execute(Command::get_stream_config(), |payload, _| {
            decode::decode_stream_config(payload)
        });
        if let Some(config) = reply.value() {
            self.state.stream = *config;
        }
        reply
    }

    /// Records are sent as given, in order; nothing is merged.
    pub fn set_input_mode(&mut self, entries: &Entries<InputModeSpec>) -> Reply<()> {
        let reply = self.execute_setter(Command::set_input_mode(entries));
        if reply.is_ok() {
            self.state.apply_input_modes(entries);
        }
        reply
    }

    /// Nonzero starts streaming, zero stops it.
    pub fn set_stream_period(&mut self, period: u16) -> Reply<()> {
        let reply = self.execute_setter(Command::set_stream_period(period));
        if reply.is_ok() {
            self.state.stream_period = period;
            self.stream = if period == 0 {
                StreamState::Idle
            } else {
                StreamState::Streaming
            };
            info!(period, streaming = period != 0, "stream period set");
        }
        reply
    }

    pub fn get_stream_period(&mut self) -> Reply<u16> {
        let reply = self.execute(Command::get_stream_period(), |payload, _| {
            decode::decode_stream_period(payload)
        });
        if let Some(&period) = reply.value() {
            self.state.stream_period = period;
            if period == 0 {
                self.stream = StreamState::Idle;
            } else if self.stream == StreamState::Idle {
                self.stream = StreamState::Streaming;
            }
        }
        reply
    }

    /// One `ReadStream` exchange. `Ok(None)` means no sample was due.
    pub fn fetch_stream_sample(&mut self) -> Reply<Option<StreamSample>> {
        self.execute(Command::read_stream(), decode::decode_stream_sample)
    }

    /// Pulse the reset line. On success the client returns to the power-on
    /// configuration.
    pub fn reset(&mut self) -> TransportResult {
        let result = self.codec.reset();
        if result.is_ok() {
            self.state = ConfigState::default();
            self.stream = StreamState::Idle;
            info!("device reset, configuration restored to power-on defaults");
        }
        result
    }

    /// Query masks, stream config, stream period and history dims so the
    /// client mirrors the device. Stops at the first reply that is not fully
    /// `Ok` and returns it.
    pub fn sync_config(&mut self) -> Reply<()> {
        let reply = self.get_data_mask().discard();
        if !reply.is_ok() {
            return reply;
        }
        let reply = self.get_stream_config().discard();
        if !reply.is_ok() {
            return reply;
        }
        let reply = self.get_stream_period().discard();
        if !reply.is_ok() {
            return reply;
        }
        let reply = self.get_history_dims().discard();
        if reply.is_ok() {
            debug!(state = ?self.state, "configuration synced");
        }
        reply
    }
}
