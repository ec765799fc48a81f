use std::time::{Duration, Instant};

use bytes::BytesMut;
use mtrack_link::Link;
use tracing::{debug, trace, warn};

use crate::command::{Command, MAX_REQUEST_LEN};
use crate::status::{PacketResult, TransportResult};

/// Response header: length (2, LE) + packet result (1) = 3 bytes.
pub const RESPONSE_HEADER_SIZE: usize = 3;

/// Largest payload any response of this protocol carries.
pub const MAX_RESPONSE_PAYLOAD: usize = 256;

/// Configuration for the packet codec.
#[derive(Debug, Clone)]
pub struct CodecConfig {
    /// Bound on each wait for the ready line. Default: 50 ms.
    pub ready_timeout: Duration,
    /// Pause between ready polls. Zero spins.
    pub poll_interval: Duration,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_millis(50),
            poll_interval: Duration::ZERO,
        }
    }
}

/// Outcome of one request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    /// Link-level outcome.
    pub transport: TransportResult,
    /// Device-reported outcome; `None` when no header was received.
    pub packet: Option<PacketResult>,
    /// Declared payload length. When `transport` is `Ok` the payload sits in
    /// `rx[..len]`.
    pub len: usize,
}

impl Exchange {
    fn failed(transport: TransportResult) -> Self {
        Self {
            transport,
            packet: None,
            len: 0,
        }
    }
}

/// Runs the select / ready / exchange sequence for one command at a time.
///
/// The codec owns its link: there is exactly one transaction in flight.
pub struct PacketCodec<L> {
    link: L,
    config: CodecConfig,
    tx: BytesMut,
    scratch: Vec<u8>,
}

impl<L: Link> PacketCodec<L> {
    /// Create a codec with default configuration.
    pub fn new(link: L) -> Self {
        Self::with_config(link, CodecConfig::default())
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(link: L, config: CodecConfig) -> Self {
        Self {
            link,
            config,
            tx: BytesMut::with_capacity(MAX_REQUEST_LEN),
            scratch: Vec::with_capacity(MAX_RESPONSE_PAYLOAD),
        }
    }

    /// Send `command` and read its response payload into `rx`.
    ///
    /// Never writes past `rx`: a declared payload longer than `rx` fails with
    /// [`TransportResult::BufferTooSmall`] and leaves `rx` untouched. No
    /// retries.
    pub fn execute(&mut self, command: &Command, rx: &mut [u8]) -> Exchange {
        match self.link.is_ready() {
            Ok(false) => {}
            Ok(true) => {
                warn!(opcode = %command.opcode(), "ready asserted before select");
                return Exchange::failed(TransportResult::NotReady);
            }
            Err(err) => {
                warn!(error = %err, "ready line read failed");
                return Exchange::failed(TransportResult::BusError);
            }
        }

        if let Err(err) = self.link.select(true) {
            warn!(error = %err, "select failed");
            return Exchange::failed(TransportResult::BusError);
        }

        let mut outcome = self.transact(command, rx);

        if let Err(err) = self.link.select(false) {
            warn!(error = %err, "deselect failed");
            if outcome.transport.is_ok() {
                outcome = Exchange::failed(TransportResult::BusError);
            }
        }

        debug!(
            opcode = %command.opcode(),
            transport = %outcome.transport,
            packet = ?outcome.packet,
            len = outcome.len,
            "exchange complete"
        );
        outcome
    }

    fn transact(&mut self, command: &Command, rx: &mut [u8]) -> Exchange {
        if let Err(transport) = self.wait_ready() {
            return Exchange::failed(transport);
        }

        self.tx.clear();
        command.encode(&mut self.tx);
        self.scratch.clear();
        self.scratch.resize(self.tx.len(), 0);
        if let Err(err) = self.link.exchange(&self.tx, &mut self.scratch) {
            warn!(error = %err, "command exchange failed");
            return Exchange::failed(TransportResult::BusError);
        }
        trace!(tx = ?&self.tx[..], "request sent");

        if let Err(transport) = self.wait_ready() {
            return Exchange::failed(transport);
        }

        let mut header = [0u8; RESPONSE_HEADER_SIZE];
        if let Err(err) = self.link.exchange(&[0u8; RESPONSE_HEADER_SIZE], &mut header) {
            warn!(error = %err, "header exchange failed");
            return Exchange::failed(TransportResult::BusError);
        }
        let len = usize::from(u16::from_le_bytes([header[0], header[1]]));
        let packet = PacketResult::from(header[2]);

        if len > rx.len() {
            warn!(
                opcode = %command.opcode(),
                len,
                capacity = rx.len(),
                "response payload exceeds buffer"
            );
            return Exchange {
                transport: TransportResult::BufferTooSmall,
                packet: Some(packet),
                len,
            };
        }

        if len > 0 {
            self.scratch.clear();
            self.scratch.resize(len, 0);
            if let Err(err) = self.link.exchange(&self.scratch, &mut rx[..len]) {
                warn!(error = %err, "payload exchange failed");
                return Exchange::failed(TransportResult::BusError);
            }
            trace!(rx = ?&rx[..len], "payload received");
        }

        Exchange {
            transport: TransportResult::Ok,
            packet: Some(packet),
            len,
        }
    }

    fn wait_ready(&mut self) -> Result<(), TransportResult> {
        let deadline = Instant::now() + self.config.ready_timeout;
        loop {
            match self.link.is_ready() {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(err) => {
                    warn!(error = %err, "ready line read failed");
                    return Err(TransportResult::BusError);
                }
            }
            if Instant::now() >= deadline {
                return Err(TransportResult::Timeout);
            }
            if self.config.poll_interval.is_zero() {
                std::hint::spin_loop();
            } else {
                std::thread::sleep(self.config.poll_interval);
            }
        }
    }

    /// Pulse the peripheral's reset line.
    pub fn reset(&mut self) -> TransportResult {
        match self.link.reset_pulse() {
            Ok(()) => TransportResult::Ok,
            Err(err) => {
                warn!(error = %err, "reset pulse failed");
                TransportResult::BusError
            }
        }
    }

    /// Borrow the underlying link.
    pub fn get_ref(&self) -> &L {
        &self.link
    }

    /// Mutably borrow the underlying link.
    pub fn get_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Consume the codec and return the link.
    pub fn into_inner(self) -> L {
        self.link
    }

    /// Current codec configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{ScriptedLink, Step};

    fn fast() -> CodecConfig {
        CodecConfig {
            ready_timeout: Duration::from_millis(5),
            poll_interval: Duration::ZERO,
        }
    }

    #[test]
    fn execute_returns_payload_and_packet_result() {
        let link = ScriptedLink::new().ok(vec![1, 4, 2]);
        let mut codec = PacketCodec::with_config(link, fast());
        let mut rx = [0u8; 16];

        let ex = codec.execute(&Command::get_version(), &mut rx);

        assert_eq!(ex.transport, TransportResult::Ok);
        assert_eq!(ex.packet, Some(PacketResult::Ok));
        assert_eq!(&rx[..ex.len], &[1, 4, 2]);
        assert_eq!(codec.get_ref().requests(), &[vec![0x01]]);
        assert_eq!(codec.get_ref().selects(), &[true, false]);
    }

    #[test]
    fn device_rejection_is_separate_from_transport() {
        let link = ScriptedLink::new().reply(2, Vec::new());
        let mut codec = PacketCodec::with_config(link, fast());
        let mut rx = [0u8; 4];

        let ex = codec.execute(&Command::set_stream_period(5), &mut rx);

        assert_eq!(ex.transport, TransportResult::Ok);
        assert_eq!(ex.packet, Some(PacketResult::InvalidParameter));
        assert_eq!(ex.len, 0);
    }

    #[test]
    fn silent_device_times_out_and_releases_select() {
        let link = ScriptedLink::new().silent();
        let mut codec = PacketCodec::with_config(link, fast());
        let mut rx = [0u8; 4];

        let ex = codec.execute(&Command::get_version(), &mut rx);

        assert_eq!(ex.transport, TransportResult::Timeout);
        assert_eq!(ex.packet, None);
        assert_eq!(codec.get_ref().selects(), &[true, false]);
        assert!(codec.get_ref().requests().is_empty());
    }

    #[test]
    fn pending_response_reports_not_ready_without_selecting() {
        let link = ScriptedLink::new().busy().ok(vec![1, 0, 2]);
        let mut codec = PacketCodec::with_config(link, fast());
        let mut rx = [0u8; 4];

        let ex = codec.execute(&Command::get_version(), &mut rx);
        assert_eq!(ex.transport, TransportResult::NotReady);
        assert!(codec.get_ref().selects().is_empty());

        let ex = codec.execute(&Command::get_version(), &mut rx);
        assert_eq!(ex.transport, TransportResult::Ok);
    }

    #[test]
    fn bus_fault_maps_to_bus_error() {
        let link = ScriptedLink::new().fault();
        let mut codec = PacketCodec::with_config(link, fast());
        let mut rx = [0u8; 4];

        let ex = codec.execute(&Command::get_data_mask(), &mut rx);

        assert_eq!(ex.transport, TransportResult::BusError);
        assert_eq!(codec.get_ref().selects(), &[true, false]);
    }

    #[test]
    fn oversized_payload_never_touches_buffer() {
        let link = ScriptedLink::new().ok(vec![0xAA; 8]);
        let mut codec = PacketCodec::with_config(link, fast());
        let mut rx = [0x55u8; 4];

        let ex = codec.execute(&Command::get_motion_data(), &mut rx);

        assert_eq!(ex.transport, TransportResult::BufferTooSmall);
        assert_eq!(ex.len, 8);
        assert_eq!(rx, [0x55; 4]);
    }

    #[test]
    fn payload_exactly_filling_buffer_is_accepted() {
        let link = ScriptedLink::new().ok(vec![9; 4]);
        let mut codec = PacketCodec::with_config(link, fast());
        let mut rx = [0u8; 4];

        let ex = codec.execute(&Command::get_data_mask(), &mut rx);

        assert_eq!(ex.transport, TransportResult::Ok);
        assert_eq!(rx, [9; 4]);
    }

    #[test]
    fn no_automatic_retry_after_failure() {
        let link = ScriptedLink::new()
            .silent()
            .ok(vec![1, 0, 2])
            .when_empty(Step::Silent);
        let mut codec = PacketCodec::with_config(link, fast());
        let mut rx = [0u8; 4];

        let ex = codec.execute(&Command::get_version(), &mut rx);
        assert_eq!(ex.transport, TransportResult::Timeout);
        assert_eq!(codec.get_ref().remaining(), 1);
    }

    #[test]
    fn reset_pulses_link() {
        let mut codec = PacketCodec::new(ScriptedLink::new());
        assert_eq!(codec.reset(), TransportResult::Ok);
        assert_eq!(codec.into_inner().resets(), 1);
    }
}
