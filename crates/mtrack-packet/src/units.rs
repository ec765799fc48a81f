//! Raw wire units to milliseconds and back.
//!
//! Both scales are powers of two, so every representable raw value maps to
//! an exact `f64` and the conversions invert each other without drift.

/// Stream period ticks per millisecond (one tick = 62.5 µs).
pub const STREAM_TICKS_PER_MS: f64 = 16.0;

/// History resolution at zero time bits, in milliseconds.
pub const HISTORY_BASE_UNIT_MS: f64 = 0.25;

/// Largest history time-resolution exponent the device accepts.
pub const MAX_HISTORY_TIME_BITS: u8 = 15;

/// Stream period in milliseconds. Period 0 means streaming is off.
pub fn period_to_ms(period: u16) -> f64 {
    f64::from(period) / STREAM_TICKS_PER_MS
}

/// Stream period for `ms`, truncated toward zero.
///
/// Negative and NaN inputs give 0; anything past the range saturates at
/// `u16::MAX`.
pub fn ms_to_period(ms: f64) -> u16 {
    if ms.is_nan() || ms <= 0.0 {
        return 0;
    }
    let ticks = (ms * STREAM_TICKS_PER_MS).trunc();
    if ticks >= f64::from(u16::MAX) {
        u16::MAX
    } else {
        ticks as u16
    }
}

/// Duration of one history sample: `0.25 ms * 2^bits`.
pub fn history_bits_to_ms(bits: u8) -> f64 {
    HISTORY_BASE_UNIT_MS * 2f64.powi(i32::from(bits))
}

/// Largest time-bits value whose resolution does not exceed `ms`, clamped to
/// `0..=MAX_HISTORY_TIME_BITS`.
pub fn ms_to_history_bits(ms: f64) -> u8 {
    let mut bits = 0;
    while bits < MAX_HISTORY_TIME_BITS && history_bits_to_ms(bits + 1) <= ms {
        bits += 1;
    }
    bits
}
