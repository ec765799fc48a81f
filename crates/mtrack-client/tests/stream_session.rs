use std::time::{Duration, Instant};

use mtrack_client::{
    Client, DecodeError, SessionConfig, StopReason, StreamFault, StreamSample, StreamState,
};
use mtrack_packet::{CodecConfig, ScriptedLink, Step, TransportResult, CHANNELS};

fn fast() -> CodecConfig {
    CodecConfig {
        ready_timeout: Duration::from_millis(5),
        poll_interval: Duration::ZERO,
    }
}

/// Power-on layout: every channel enabled, 32-bit absolute position.
fn sample_payload(base: i32) -> Vec<u8> {
    (0..CHANNELS as i32)
        .flat_map(|channel| (base * 10 + channel).to_le_bytes())
        .collect()
}

fn start(link: ScriptedLink) -> Client<ScriptedLink> {
    let mut client = Client::with_config(link, fast());
    client
        .set_stream_period(16)
        .into_result()
        .expect("period should be accepted");
    assert_eq!(client.stream_state(), &StreamState::Streaming);
    client
}

#[test]
fn delivers_every_sample_in_order_then_stops_on_transport_timeout() {
    const N: i32 = 5;
    let mut link = ScriptedLink::new().ok(vec![]);
    for i in 0..N {
        link = link.ok(sample_payload(i));
    }
    // Exhausted script goes silent: the next read times out on ready.
    let mut client = start(link);

    let mut samples: Vec<StreamSample> = Vec::new();
    let report = client.read_stream(&SessionConfig::default(), || false, |s| samples.push(s));

    assert_eq!(
        report.stop,
        StopReason::Error(StreamFault::Transport(TransportResult::Timeout))
    );
    assert_eq!(report.delivered, N as u64);
    assert_eq!(samples.len(), N as usize);
    for (i, sample) in samples.iter().enumerate() {
        assert_eq!(sample.timestamp_us, None);
        assert_eq!(sample.elapsed_periods, None);
        assert_eq!(sample.channels.len(), CHANNELS);
        for (channel, motion) in sample.channels.iter().enumerate() {
            assert_eq!(motion.position, i as i32 * 10 + channel as i32);
        }
    }
    assert!(matches!(
        client.stream_state(),
        StreamState::Stopped(StopReason::Error(_))
    ));
}

#[test]
fn no_data_past_staleness_bound_times_out() {
    let link = ScriptedLink::new().ok(vec![]).when_empty(Step::Reply {
        result: 0,
        payload: vec![],
    });
    let mut client = start(link);
    let config = SessionConfig {
        staleness: Duration::from_millis(30),
        idle_backoff: Duration::from_millis(1),
    };

    let started = Instant::now();
    let report = client.read_stream(&config, || false, |_| {});

    assert_eq!(report.stop, StopReason::Timeout);
    assert_eq!(report.delivered, 0);
    assert!(started.elapsed() >= config.staleness);
    assert_eq!(client.stream_state(), &StreamState::Stopped(StopReason::Timeout));
}

#[test]
fn staleness_resets_on_each_delivered_sample() {
    let link = ScriptedLink::new()
        .ok(vec![])
        .ok(vec![])
        .ok(sample_payload(1))
        .ok(vec![])
        .ok(sample_payload(2))
        .when_empty(Step::Reply {
            result: 0,
            payload: vec![],
        });
    let mut client = start(link);
    let config = SessionConfig {
        staleness: Duration::from_millis(20),
        idle_backoff: Duration::from_millis(1),
    };

    let report = client.read_stream(&config, || false, |_| {});

    assert_eq!(report.stop, StopReason::Timeout);
    assert_eq!(report.delivered, 2);
}

#[test]
fn short_sample_stops_with_decode_error() {
    let mut payload = sample_payload(0);
    payload.pop();
    let link = ScriptedLink::new()
        .ok(vec![])
        .ok(sample_payload(0))
        .ok(payload);
    let mut client = start(link);

    let report = client.read_stream(&SessionConfig::default(), || false, |_| {});

    assert_eq!(report.delivered, 1);
    assert!(matches!(
        report.stop,
        StopReason::Error(StreamFault::Decode(DecodeError::Truncated { .. }))
    ));
}

#[test]
fn session_can_resume_after_stop() {
    let link = ScriptedLink::new()
        .ok(vec![])
        .ok(sample_payload(1))
        .silent()
        .ok(sample_payload(2));
    let mut client = start(link);

    let first = client.read_stream(&SessionConfig::default(), || false, |_| {});
    assert_eq!(first.delivered, 1);

    let mut resumed = Vec::new();
    let second = client.read_stream(&SessionConfig::default(), || false, |s| resumed.push(s));
    assert_eq!(second.delivered, 1);
    assert_eq!(resumed[0].channels[0].position, 20);
    assert_eq!(
        second.stop,
        StopReason::Error(StreamFault::Transport(TransportResult::Timeout))
    );
}

#[test]
fn stopping_period_returns_to_idle() {
    let link = ScriptedLink::new().ok(vec![]).ok(vec![]);
    let mut client = start(link);
    client
        .set_stream_period(0)
        .into_result()
        .expect("period should be accepted");

    let report = client.read_stream(&SessionConfig::default(), || false, |_| {});

    assert_eq!(report.stop, StopReason::NotStreaming);
    assert_eq!(client.link().requests().len(), 2);
}
