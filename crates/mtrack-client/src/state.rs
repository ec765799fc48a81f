use mtrack_packet::{
    DataMask, Entries, HistoryDims, InputModeSpec, MaskEntry, StreamConfig, CHANNELS,
};
use serde::Serialize;

/// The client's record of what it negotiated with the device.
///
/// Variable-layout responses are not self-describing: the decoders read their
/// field layout from here. It is updated only by successful `set_*` replies
/// and by queries, so it mirrors the device as long as nothing else talks to
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigState {
    pub masks: [DataMask; CHANNELS],
    pub stream: StreamConfig,
    /// Raw stream period in ticks; 0 = streaming off.
    pub stream_period: u16,
    pub history: HistoryDims,
    /// Last input-mode record that named each channel.
    pub input_modes: [Option<InputModeSpec>; CHANNELS],
}

impl Default for ConfigState {
    /// Device power-on configuration.
    fn default() -> Self {
        Self {
            masks: [DataMask::default(); CHANNELS],
            stream: StreamConfig::default(),
            stream_period: 0,
            history: HistoryDims::default(),
            input_modes: [None; CHANNELS],
        }
    }
}

impl ConfigState {
    /// Apply mask entries in order; a later entry overrides an earlier one on
    /// the channels they share.
    pub fn apply_masks(&mut self, entries: &Entries<MaskEntry>) {
        for entry in entries {
            for channel in entry.channels.iter() {
                self.masks[channel] = entry.mask;
            }
        }
    }

    /// Record input-mode entries in order, last entry wins per channel.
    pub fn apply_input_modes(&mut self, entries: &Entries<InputModeSpec>) {
        for spec in entries {
            for channel in spec.channels.iter() {
                self.input_modes[channel] = Some(*spec);
            }
        }
    }

    /// Channels whose mask is enabled, ascending.
    pub fn active_channels(&self) -> impl Iterator<Item = usize> + '_ {
        (0..CHANNELS).filter(|&ch| self.masks[ch].enabled)
    }

    /// Payload size of a motion-data response under the current masks.
    pub fn motion_payload_len(&self) -> usize {
        self.masks.iter().map(|mask| mask.record_len()).sum()
    }

    /// Payload size of one stream sample under the current configuration.
    pub fn stream_sample_len(&self) -> usize {
        self.stream.prefix_len() + self.motion_payload_len()
    }
}

#[cfg(test)]
mod tests {
    use mtrack_packet::{ChannelSet, InputMode, PositionWidth};

    use super::*;

    #[test]
    fn power_on_state_reads_32_bit_positions() {
        let state = ConfigState::default();
        assert_eq!(state.active_channels().count(), CHANNELS);
        assert_eq!(state.motion_payload_len(), 4 * CHANNELS);
        assert_eq!(state.stream_sample_len(), 4 * CHANNELS);
    }

    #[test]
    fn later_mask_entry_wins_on_overlap() {
        let wide = DataMask::position(PositionWidth::Bits32).with_velocity();
        let narrow = DataMask::position(PositionWidth::Bits8);
        let entries = Entries::new(vec![
            MaskEntry::all(wide),
            MaskEntry::new(ChannelSet::from_channels(&[1, 2]).unwrap(), narrow),
        ])
        .unwrap();

        let mut state = ConfigState::default();
        state.apply_masks(&entries);

        assert_eq!(state.masks, [wide, narrow, narrow, wide]);
        assert_eq!(state.motion_payload_len(), 6 + 1 + 1 + 6);
    }

    #[test]
    fn disabled_channels_are_skipped() {
        let mut state = ConfigState::default();
        state.apply_masks(&Entries::from(MaskEntry::new(
            ChannelSet::from_channels(&[0, 3]).unwrap(),
            DataMask::DISABLED,
        )));
        assert_eq!(state.active_channels().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(state.motion_payload_len(), 8);
    }

    #[test]
    fn later_input_mode_wins_on_overlap() {
        let first = InputModeSpec::new(ChannelSet::ALL, InputMode::SetOnce);
        let second = InputModeSpec::new(ChannelSet::single(3).unwrap(), InputMode::Disabled);
        let mut state = ConfigState::default();
        state.apply_input_modes(&Entries::new(vec![first, second]).unwrap());

        assert_eq!(state.input_modes[0], Some(first));
        assert_eq!(state.input_modes[3], Some(second));
    }
}
