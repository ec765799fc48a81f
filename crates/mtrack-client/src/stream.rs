//! Continuous streaming: fetch, decode and deliver samples until something
//! stops the session.

use std::time::{Duration, Instant};

use mtrack_link::Link;
use mtrack_packet::{PacketResult, TransportResult};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::DecodeError;
use crate::sample::StreamSample;

/// No delivered sample for this long ends the session with
/// [`StopReason::Timeout`].
pub const DEFAULT_STALENESS: Duration = Duration::from_millis(1000);

/// Pause after an empty `ReadStream` reply.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Configuration for one streaming session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub staleness: Duration,
    pub idle_backoff: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            staleness: DEFAULT_STALENESS,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }
}

/// Where the client's streaming lifecycle stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum StreamState {
    /// Stream period is zero.
    Idle,
    /// Stream period is nonzero and no session has stopped since.
    Streaming,
    /// The last session ended.
    Stopped(StopReason),
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "fault", rename_all = "snake_case")]
pub enum StopReason {
    Error(StreamFault),
    Cancelled,
    /// No sample arrived within the staleness bound.
    Timeout,
    /// Streaming was never started; nothing was sent.
    NotStreaming,
    /// Every channel is disabled and no prefix field is on, so a sample has
    /// no bytes and cannot be told apart from "none due". Nothing was sent.
    EmptyLayout,
}

/// The failure that ended a session, on whichever axis it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamFault {
    Transport(TransportResult),
    Device(PacketResult),
    Decode(DecodeError),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Error(StreamFault::Transport(t)) => write!(f, "transport error: {t}"),
            StopReason::Error(StreamFault::Device(p)) => write!(f, "device rejected read: {p}"),
            StopReason::Error(StreamFault::Decode(e)) => write!(f, "decode error: {e}"),
            StopReason::Cancelled => f.write_str("cancelled"),
            StopReason::Timeout => f.write_str("no sample within staleness bound"),
            StopReason::NotStreaming => f.write_str("streaming not started"),
            StopReason::EmptyLayout => f.write_str("stream samples carry no fields"),
        }
    }
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamReport {
    pub delivered: u64,
    pub stop: StopReason,
}

enum Fetched {
    Sample(StreamSample),
    Empty,
    Fault(StreamFault),
}

impl<L: Link> Client<L> {
    /// Read samples until cancelled, stale, or failed.
    ///
    /// `cancel` is polled once per iteration before each fetch. Samples reach
    /// `on_sample` in arrival order. Returns immediately with
    /// [`StopReason::NotStreaming`] when the stream period is zero, and with
    /// [`StopReason::EmptyLayout`] when a sample would be empty. After a
    /// stop, calling this again resumes reading as long as the period is
    /// still nonzero.
    pub fn read_stream(
        &mut self,
        config: &SessionConfig,
        mut cancel: impl FnMut() -> bool,
        mut on_sample: impl FnMut(StreamSample),
    ) -> StreamReport {
        if self.state.stream_period == 0 {
            debug!("read_stream called while idle");
            return StreamReport {
                delivered: 0,
                stop: StopReason::NotStreaming,
            };
        }
        if self.state.stream_sample_len() == 0 {
            warn!("read_stream called with every sample field disabled");
            return StreamReport {
                delivered: 0,
                stop: StopReason::EmptyLayout,
            };
        }

        self.stream = StreamState::Streaming;
        info!(
            period = self.state.stream_period,
            staleness_ms = config.staleness.as_millis() as u64,
            "stream session started"
        );

        let mut delivered = 0u64;
        let mut last_sample = Instant::now();
        let stop = loop {
            if cancel() {
                break StopReason::Cancelled;
            }

            match self.fetch() {
                Fetched::Sample(sample) => {
                    on_sample(sample);
                    delivered += 1;
                    last_sample = Instant::now();
                }
                Fetched::Empty => {
                    if last_sample.elapsed() > config.staleness {
                        break StopReason::Timeout;
                    }
                    if !config.idle_backoff.is_zero() {
                        std::thread::sleep(config.idle_backoff);
                    }
                }
                Fetched::Fault(fault) => {
                    warn!(?fault, delivered, "stream read failed");
                    break StopReason::Error(fault);
                }
            }
        };

        info!(delivered, stop = %stop, "stream session stopped");
        self.stream = StreamState::Stopped(stop.clone());
        StreamReport { delivered, stop }
    }

    fn fetch(&mut self) -> Fetched {
        let reply = self.fetch_stream_sample();
        if !reply.transport.is_ok() {
            return Fetched::Fault(StreamFault::Transport(reply.transport));
        }
        match (reply.packet, reply.data) {
            (Some(PacketResult::Ok), Some(Ok(Some(sample)))) => Fetched::Sample(sample),
            (Some(PacketResult::Ok), Some(Ok(None))) => Fetched::Empty,
            (_, Some(Err(err))) => Fetched::Fault(StreamFault::Decode(err)),
            (Some(packet), _) => Fetched::Fault(StreamFault::Device(packet)),
            (None, _) => Fetched::Fault(StreamFault::Transport(TransportResult::BusError)),
        }
    }
}

#[cfg(test)]
mod tests {
    use mtrack_packet::{ChannelSet, CodecConfig, DataMask, MaskEntry, ScriptedLink, Step};

    use super::*;

    fn fast() -> CodecConfig {
        CodecConfig {
            ready_timeout: Duration::from_millis(5),
            poll_interval: Duration::ZERO,
        }
    }

    /// `link` must answer `SetStreamPeriod` first.
    fn streaming_client(link: ScriptedLink) -> Client<ScriptedLink> {
        let mut client = Client::with_config(link, fast());
        client
            .set_stream_period(16)
            .into_result()
            .expect("period should be accepted");
        client
    }

    #[test]
    fn idle_client_sends_nothing() {
        let mut client = Client::with_config(ScriptedLink::new(), fast());
        let report = client.read_stream(&SessionConfig::default(), || false, |_| {});
        assert_eq!(report.stop, StopReason::NotStreaming);
        assert_eq!(report.delivered, 0);
        assert!(client.link().requests().is_empty());
        assert_eq!(client.stream_state(), &StreamState::Idle);
    }

    #[test]
    fn device_rejection_stops_with_error() {
        let link = ScriptedLink::new()
            .ok(vec![])
            .reply(PacketResult::Busy.code(), vec![]);
        let mut client = streaming_client(link);

        let report = client.read_stream(&SessionConfig::default(), || false, |_| {});

        let expected = StopReason::Error(StreamFault::Device(PacketResult::Busy));
        assert_eq!(report.stop, expected);
        assert_eq!(report.delivered, 0);
        assert_eq!(client.stream_state(), &StreamState::Stopped(expected));
    }

    #[test]
    fn cancel_is_checked_before_each_fetch() {
        let link = ScriptedLink::new().ok(vec![]).when_empty(Step::Reply {
            result: 0,
            payload: vec![0u8; 16],
        });
        let mut client = streaming_client(link);

        let mut polls = 0;
        let report = client.read_stream(
            &SessionConfig::default(),
            || {
                polls += 1;
                polls > 3
            },
            |_| {},
        );

        assert_eq!(report.stop, StopReason::Cancelled);
        assert_eq!(report.delivered, 3);
        // One SetStreamPeriod plus three reads.
        assert_eq!(client.link().requests().len(), 4);
    }

    #[test]
    fn empty_sample_layout_sends_nothing() {
        let link = ScriptedLink::new().ok(vec![]).ok(vec![]);
        let mut client = streaming_client(link);
        client
            .set_data_mask(&MaskEntry::new(ChannelSet::ALL, DataMask::DISABLED).into())
            .into_result()
            .expect("mask should be accepted");

        let report = client.read_stream(&SessionConfig::default(), || false, |_| {});

        assert_eq!(report.stop, StopReason::EmptyLayout);
        assert_eq!(report.delivered, 0);
        // SetStreamPeriod and SetDataMask only.
        assert_eq!(client.link().requests().len(), 2);
        assert_eq!(client.stream_state(), &StreamState::Streaming);
    }

    #[test]
    fn report_json_shape() {
        let report = StreamReport {
            delivered: 7,
            stop: StopReason::Error(StreamFault::Decode(DecodeError::Truncated {
                needed: 4,
                remaining: 1,
            })),
        };
        assert_eq!(
            serde_json::to_value(&report).expect("report serializes"),
            serde_json::json!({
                "delivered": 7,
                "stop": {
                    "kind": "error",
                    "fault": {"decode": {"kind": "truncated", "needed": 4, "remaining": 1}}
                }
            })
        );

        let stopped = StreamState::Stopped(StopReason::Timeout);
        assert_eq!(
            serde_json::to_value(&stopped).expect("state serializes"),
            serde_json::json!({"state": "stopped", "reason": {"kind": "timeout"}})
        );
        assert_eq!(
            serde_json::to_value(&StreamState::Idle).expect("state serializes"),
            serde_json::json!({"state": "idle"})
        );
    }

    #[test]
    fn stop_reason_display() {
        assert_eq!(
            StopReason::Error(StreamFault::Transport(TransportResult::Timeout)).to_string(),
            "transport error: timeout"
        );
        assert_eq!(StopReason::Cancelled.to_string(), "cancelled");
    }
}
