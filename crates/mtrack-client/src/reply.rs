use mtrack_packet::{Exchange, PacketResult, TransportResult};
use serde::Serialize;

use crate::error::{ClientError, DecodeError, Result};

/// Result of one client operation, with every failure axis kept apart.
///
/// `data` is `Some` only when the transport succeeded and the device reported
/// [`PacketResult::Ok`]; it then holds the decode outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply<T> {
    pub transport: TransportResult,
    /// `None` when no response header was read.
    pub packet: Option<PacketResult>,
    pub data: Option<std::result::Result<T, DecodeError>>,
}

impl<T> Reply<T> {
    /// Build a reply from a codec exchange, running `decode` only when both
    /// result axes are `Ok`.
    pub fn from_exchange(
        exchange: Exchange,
        payload: &[u8],
        decode: impl FnOnce(&[u8]) -> std::result::Result<T, DecodeError>,
    ) -> Self {
        let data = match (exchange.transport, exchange.packet) {
            (TransportResult::Ok, Some(PacketResult::Ok)) => {
                Some(decode(&payload[..exchange.len]))
            }
            _ => None,
        };
        Self {
            transport: exchange.transport,
            packet: exchange.packet,
            data,
        }
    }

    /// Transport, device and decode all succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self.data, Some(Ok(_)))
    }

    /// The decoded value, if there is one.
    pub fn value(&self) -> Option<&T> {
        match &self.data {
            Some(Ok(value)) => Some(value),
            _ => None,
        }
    }

    /// Fold the three axes into one error, transport first.
    pub fn into_result(self) -> Result<T> {
        if !self.transport.is_ok() {
            return Err(ClientError::Transport(self.transport));
        }
        match self.packet {
            Some(PacketResult::Ok) => {}
            Some(packet) => return Err(ClientError::Device(packet)),
            None => return Err(ClientError::Transport(TransportResult::BusError)),
        }
        match self.data {
            Some(Ok(value)) => Ok(value),
            Some(Err(err)) => Err(ClientError::Decode(err)),
            None => Err(ClientError::Transport(TransportResult::BusError)),
        }
    }

    /// Same outcome with the value dropped.
    pub(crate) fn discard(&self) -> Reply<()> {
        Reply {
            transport: self.transport,
            packet: self.packet,
            data: self
                .data
                .as_ref()
                .map(|data| data.as_ref().map(|_| ()).map_err(Clone::clone)),
        }
    }
}
