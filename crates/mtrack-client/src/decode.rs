//! Response payload decoders, one per command family.
//!
//! All pure functions of `(payload, &ConfigState)`. Variable layouts are
//! walked field by field with a [`PayloadCursor`] in the order the masks
//! declare; there is no precomputed offset table.

use mtrack_packet::{
    DataMask, HistoryDims, StreamConfig, Version, CHANNELS, MAX_HISTORY_TIME_BITS,
};

use crate::cursor::PayloadCursor;
use crate::error::{DecodeError, DecodeResult};
use crate::sample::{MotionSample, MotionStatus, StreamSample};
use crate::state::ConfigState;

/// Setters answer with an empty payload.
pub fn decode_empty(payload: &[u8]) -> DecodeResult<()> {
    PayloadCursor::new(payload).finish()
}

pub fn decode_version(payload: &[u8]) -> DecodeResult<Version> {
    let mut cur = PayloadCursor::new(payload);
    let version = Version {
        major: cur.u8()?,
        minor: cur.u8()?,
        protocol: cur.u8()?,
    };
    cur.finish()?;
    Ok(version)
}

/// One mask byte per channel, channel-ascending.
pub fn decode_data_masks(payload: &[u8]) -> DecodeResult<[DataMask; CHANNELS]> {
    let mut cur = PayloadCursor::new(payload);
    let mut masks = [DataMask::DISABLED; CHANNELS];
    for mask in &mut masks {
        *mask = DataMask::from_byte(cur.u8()?);
    }
    cur.finish()?;
    Ok(masks)
}

pub fn decode_motion(payload: &[u8], state: &ConfigState) -> DecodeResult<Vec<MotionSample>> {
    let mut cur = PayloadCursor::new(payload);
    let samples = read_motion(&mut cur, state)?;
    cur.finish()?;
    Ok(samples)
}

/// Walk position, then velocity, then status for each enabled channel.
fn read_motion(cur: &mut PayloadCursor<'_>, state: &ConfigState) -> DecodeResult<Vec<MotionSample>> {
    let mut samples = Vec::with_capacity(CHANNELS);
    for channel in state.active_channels() {
        let mask = state.masks[channel];
        let position = cur.signed_le(mask.width.bytes())?;
        let velocity = if mask.velocity {
            Some(cur.i16_le()?)
        } else {
            None
        };
        let status = if mask.status {
            Some(MotionStatus::from_byte(cur.u8()?))
        } else {
            None
        };
        samples.push(MotionSample {
            channel,
            position,
            relative: mask.relative,
            velocity,
            status,
        });
    }
    Ok(samples)
}

pub fn decode_history_dims(payload: &[u8]) -> DecodeResult<HistoryDims> {
    let mut cur = PayloadCursor::new(payload);
    let length = cur.u8()?;
    let time_bits = cur.u8()?;
    cur.finish()?;

    if time_bits > MAX_HISTORY_TIME_BITS {
        return Err(DecodeError::InvalidField {
            field: "history time bits",
            value: u32::from(time_bits),
        });
    }
    HistoryDims::new(length, time_bits).map_err(|_| DecodeError::InvalidField {
        field: "history length",
        value: u32::from(length),
    })
}

pub fn decode_stream_config(payload: &[u8]) -> DecodeResult<StreamConfig> {
    let mut cur = PayloadCursor::new(payload);
    let config = StreamConfig::from_byte(cur.u8()?);
    cur.finish()?;
    Ok(config)
}

pub fn decode_stream_period(payload: &[u8]) -> DecodeResult<u16> {
    let mut cur = PayloadCursor::new(payload);
    let period = cur.u16_le()?;
    cur.finish()?;
    Ok(period)
}

/// An empty payload means no sample was due yet.
pub fn decode_stream_sample(
    payload: &[u8],
    state: &ConfigState,
) -> DecodeResult<Option<StreamSample>> {
    if payload.is_empty() {
        return Ok(None);
    }

    let mut cur = PayloadCursor::new(payload);
    let timestamp_us = if state.stream.timestamp {
        Some(cur.u32_le()?)
    } else {
        None
    };
    let elapsed_periods = if state.stream.elapsed_periods {
        Some(cur.u16_le()?)
    } else {
        None
    };
    let channels = read_motion(&mut cur, state)?;
    cur.finish()?;

    Ok(Some(StreamSample {
        timestamp_us,
        elapsed_periods,
        channels,
    }))
}

#[cfg(test)]
mod tests {
    use mtrack_packet::{
        ChannelSet, Command, Entries, MaskEntry, PositionWidth, VELOCITY_BYTES,
    };

    use super::*;

    fn state_with(mask: DataMask) -> ConfigState {
        let mut state = ConfigState::default();
        state.apply_masks(&Entries::from(MaskEntry::all(mask)));
        state
    }

    fn full_mask() -> DataMask {
        DataMask::position(PositionWidth::Bits32)
            .with_velocity()
            .with_status()
    }

    #[test]
    fn version_is_three_fixed_bytes() {
        assert_eq!(
            decode_version(&[1, 7, 2]).unwrap(),
            Version {
                major: 1,
                minor: 7,
                protocol: 2
            }
        );
        assert!(matches!(
            decode_version(&[1, 7]),
            Err(DecodeError::Truncated { .. })
        ));
        assert!(matches!(
            decode_version(&[1, 7, 2, 0]),
            Err(DecodeError::Inconsistent { .. })
        ));
    }

    #[test]
    fn all_zero_payload_with_full_masks_decodes_to_zeroes() {
        let state = state_with(full_mask());
        let payload = vec![0u8; state.motion_payload_len()];
        assert_eq!(payload.len(), CHANNELS * 7);

        let samples = decode_motion(&payload, &state).unwrap();

        assert_eq!(samples.len(), CHANNELS);
        for (channel, sample) in samples.iter().enumerate() {
            assert_eq!(sample.channel, channel);
            assert_eq!(sample.position, 0);
            assert!(!sample.relative);
            assert_eq!(sample.velocity, Some(0));
            assert_eq!(
                sample.status,
                Some(MotionStatus {
                    glitch: false,
                    overspeed: false
                })
            );
        }
    }

    #[test]
    fn full_mask_fields_match_scripted_bytes() {
        let state = state_with(full_mask());
        let mut payload = Vec::new();
        for channel in 0..CHANNELS as i32 {
            payload.extend_from_slice(&(-1000 * (channel + 1)).to_le_bytes());
            payload.extend_from_slice(&(channel as i16 * 3).to_le_bytes());
            payload.push(channel as u8 & 0b11);
        }

        let samples = decode_motion(&payload, &state).unwrap();

        for (channel, sample) in samples.iter().enumerate() {
            let c = channel as i32;
            assert_eq!(sample.position, -1000 * (c + 1));
            assert_eq!(sample.velocity, Some(c as i16 * 3));
            let status = sample.status.unwrap();
            assert_eq!(status.glitch, channel & 1 != 0);
            assert_eq!(status.overspeed, channel & 2 != 0);
        }
    }

    #[test]
    fn disabling_velocity_shrinks_walk_by_field_width() {
        let with_velocity = state_with(full_mask());
        let without_velocity = state_with(
            DataMask::position(PositionWidth::Bits32).with_status(),
        );
        let full_len = with_velocity.motion_payload_len();
        let reduced_len = without_velocity.motion_payload_len();
        assert_eq!(full_len - reduced_len, CHANNELS * VELOCITY_BYTES);

        let mut payload = Vec::new();
        for channel in 0..CHANNELS as i32 {
            payload.extend_from_slice(&(channel + 10).to_le_bytes());
            payload.push(0b10);
        }
        assert_eq!(payload.len(), reduced_len);

        let samples = decode_motion(&payload, &without_velocity).unwrap();
        for (channel, sample) in samples.iter().enumerate() {
            assert_eq!(sample.position, channel as i32 + 10);
            assert_eq!(sample.velocity, None);
            assert!(sample.status.unwrap().overspeed);
        }

        // The reduced payload is short for the velocity-enabled layout.
        assert!(matches!(
            decode_motion(&payload, &with_velocity),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn narrow_positions_are_sign_extended() {
        let mut state = ConfigState::default();
        state.apply_masks(
            &Entries::new(vec![
                MaskEntry::new(
                    ChannelSet::single(0).unwrap(),
                    DataMask::position(PositionWidth::Bits8),
                ),
                MaskEntry::new(
                    ChannelSet::single(1).unwrap(),
                    DataMask::position(PositionWidth::Bits16).relative(),
                ),
                MaskEntry::new(
                    ChannelSet::single(2).unwrap(),
                    DataMask::position(PositionWidth::Bits24),
                ),
                MaskEntry::new(ChannelSet::single(3).unwrap(), DataMask::DISABLED),
            ])
            .unwrap(),
        );

        let payload = [0xFF, 0x00, 0x80, 0xFE, 0xFF, 0x7F];
        let samples = decode_motion(&payload, &state).unwrap();

        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].position, -1);
        assert_eq!(samples[1].position, -32768);
        assert!(samples[1].relative);
        assert_eq!(samples[2].position, 0x7F_FFFE);
    }

    #[test]
    fn one_byte_short_is_truncated_for_every_layout() {
        let layouts = [
            full_mask(),
            DataMask::position(PositionWidth::Bits8),
            DataMask::position(PositionWidth::Bits24).with_status(),
            DataMask::position(PositionWidth::Bits16).with_velocity(),
        ];
        for mask in layouts {
            let state = state_with(mask);
            let payload = vec![0u8; state.motion_payload_len() - 1];
            assert!(
                matches!(
                    decode_motion(&payload, &state),
                    Err(DecodeError::Truncated { .. })
                ),
                "mask {mask:?}"
            );
        }
    }

    #[test]
    fn extra_bytes_are_inconsistent() {
        let state = ConfigState::default();
        let payload = vec![0u8; state.motion_payload_len() + 2];
        assert_eq!(
            decode_motion(&payload, &state),
            Err(DecodeError::Inconsistent {
                expected: state.motion_payload_len(),
                actual: state.motion_payload_len() + 2,
            })
        );
    }

    #[test]
    fn data_masks_decode_channel_ascending() {
        let masks = [
            full_mask(),
            DataMask::DISABLED,
            DataMask::position(PositionWidth::Bits16),
            DataMask::position(PositionWidth::Bits8).relative(),
        ];
        let payload: Vec<u8> = masks.iter().map(|m| m.to_byte()).collect();
        assert_eq!(decode_data_masks(&payload).unwrap(), masks);
        assert!(matches!(
            decode_data_masks(&payload[..CHANNELS - 1]),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn every_history_dims_value_survives_the_wire() {
        for length in 1..=u8::MAX {
            for time_bits in 0..=MAX_HISTORY_TIME_BITS {
                let dims = HistoryDims::new(length, time_bits).unwrap();
                let sent = Command::set_history_dims(dims);
                assert_eq!(decode_history_dims(sent.args()), Ok(dims));
            }
        }
    }

    #[test]
    fn every_stream_period_survives_the_wire() {
        for period in 0..=u16::MAX {
            let sent = Command::set_stream_period(period);
            assert_eq!(decode_stream_period(sent.args()), Ok(period));
        }
    }

    #[test]
    fn every_stream_config_survives_the_wire() {
        for timestamp in [false, true] {
            for elapsed_periods in [false, true] {
                let config = StreamConfig {
                    timestamp,
                    elapsed_periods,
                };
                let sent = Command::set_stream_config(config);
                assert_eq!(decode_stream_config(sent.args()), Ok(config));
            }
        }
    }

    #[test]
    fn history_dims_reject_out_of_range_bits() {
        let dims = decode_history_dims(&[200, 9]).unwrap();
        assert_eq!((dims.length(), dims.time_bits()), (200, 9));
        assert_eq!(
            decode_history_dims(&[10, MAX_HISTORY_TIME_BITS + 1]),
            Err(DecodeError::InvalidField {
                field: "history time bits",
                value: u32::from(MAX_HISTORY_TIME_BITS + 1),
            })
        );
        assert!(matches!(
            decode_history_dims(&[0, 1]),
            Err(DecodeError::InvalidField { field: "history length", .. })
        ));
    }

    #[test]
    fn stream_period_and_config() {
        assert_eq!(decode_stream_period(&[0x40, 0x01]).unwrap(), 320);
        assert!(decode_stream_period(&[0x40]).is_err());
        let cfg = decode_stream_config(&[0b10]).unwrap();
        assert!(!cfg.timestamp);
        assert!(cfg.elapsed_periods);
    }

    #[test]
    fn stream_sample_reads_prefix_before_motion() {
        let mut state = state_with(DataMask::position(PositionWidth::Bits16).with_velocity());
        state.stream = StreamConfig {
            timestamp: true,
            elapsed_periods: true,
        };

        let mut payload = Vec::new();
        payload.extend_from_slice(&123_456u32.to_le_bytes());
        payload.extend_from_slice(&3u16.to_le_bytes());
        for channel in 0..CHANNELS as i16 {
            payload.extend_from_slice(&(channel - 2).to_le_bytes());
            payload.extend_from_slice(&(channel * 100).to_le_bytes());
        }
        assert_eq!(payload.len(), state.stream_sample_len());

        let sample = decode_stream_sample(&payload, &state).unwrap().unwrap();
        assert_eq!(sample.timestamp_us, Some(123_456));
        assert_eq!(sample.elapsed_periods, Some(3));
        assert_eq!(sample.channels.len(), CHANNELS);
        assert_eq!(sample.channels[0].position, -2);
        assert_eq!(sample.channels[3].velocity, Some(300));

        assert!(matches!(
            decode_stream_sample(&payload[..payload.len() - 1], &state),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn empty_stream_payload_means_no_sample() {
        assert_eq!(
            decode_stream_sample(&[], &ConfigState::default()),
            Ok(None)
        );
    }

    #[test]
    fn setters_expect_empty_payload() {
        decode_empty(&[]).unwrap();
        assert_eq!(
            decode_empty(&[1]),
            Err(DecodeError::Inconsistent {
                expected: 0,
                actual: 1
            })
        );
    }
}
