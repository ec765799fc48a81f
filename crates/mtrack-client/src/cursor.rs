use bytes::Buf;

use crate::error::{DecodeError, DecodeResult};

/// Forward-only reader over a response payload.
///
/// Every read checks the remaining length first, so a short payload turns
/// into [`DecodeError::Truncated`] rather than an out-of-bounds read.
#[derive(Debug)]
pub struct PayloadCursor<'a> {
    buf: &'a [u8],
    consumed: usize,
}

impl<'a> PayloadCursor<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            buf: payload,
            consumed: 0,
        }
    }

    /// Bytes read so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes not read yet.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&mut self, needed: usize) -> DecodeResult<()> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::Truncated {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        self.consumed += needed;
        Ok(())
    }

    pub fn u8(&mut self) -> DecodeResult<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16_le(&mut self) -> DecodeResult<u16> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn i16_le(&mut self) -> DecodeResult<i16> {
        self.need(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn u32_le(&mut self) -> DecodeResult<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    /// Little-endian two's complement integer of `bytes` bytes (1..=4),
    /// sign-extended to `i32`.
    pub fn signed_le(&mut self, bytes: usize) -> DecodeResult<i32> {
        debug_assert!((1..=4).contains(&bytes));
        self.need(bytes)?;
        let raw = self.buf.get_uint_le(bytes);
        let shift = 64 - 8 * bytes as u32;
        Ok(((raw << shift) as i64 >> shift) as i32)
    }

    /// Require that the whole payload was consumed.
    pub fn finish(self) -> DecodeResult<()> {
        if self.buf.has_remaining() {
            return Err(DecodeError::Inconsistent {
                expected: self.consumed,
                actual: self.consumed + self.buf.remaining(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_fields_in_order() {
        let payload = [0x01, 0x34, 0x12, 0xFE, 0xFF, 0x78, 0x56, 0x34, 0x12];
        let mut cur = PayloadCursor::new(&payload);
        assert_eq!(cur.u8().unwrap(), 0x01);
        assert_eq!(cur.u16_le().unwrap(), 0x1234);
        assert_eq!(cur.i16_le().unwrap(), -2);
        assert_eq!(cur.u32_le().unwrap(), 0x1234_5678);
        assert_eq!(cur.consumed(), payload.len());
        cur.finish().unwrap();
    }

    #[test]
    fn signed_fields_sign_extend_from_their_width() {
        let mut cur = PayloadCursor::new(&[0x80]);
        assert_eq!(cur.signed_le(1).unwrap(), -128);

        let mut cur = PayloadCursor::new(&[0xFF, 0x7F]);
        assert_eq!(cur.signed_le(2).unwrap(), 0x7FFF);

        let mut cur = PayloadCursor::new(&[0xFF, 0xFF, 0xFF]);
        assert_eq!(cur.signed_le(3).unwrap(), -1);

        let mut cur = PayloadCursor::new(&[0x00, 0x00, 0x80]);
        assert_eq!(cur.signed_le(3).unwrap(), -(1 << 23));

        let mut cur = PayloadCursor::new(&[0x00, 0x00, 0x00, 0x80]);
        assert_eq!(cur.signed_le(4).unwrap(), i32::MIN);
    }

    #[test]
    fn short_read_is_truncated_and_consumes_nothing() {
        let mut cur = PayloadCursor::new(&[0x01]);
        assert_eq!(
            cur.u16_le(),
            Err(DecodeError::Truncated {
                needed: 2,
                remaining: 1
            })
        );
        assert_eq!(cur.consumed(), 0);
        assert_eq!(cur.remaining(), 1);
    }

    #[test]
    fn leftover_bytes_are_inconsistent() {
        let mut cur = PayloadCursor::new(&[1, 2, 3]);
        cur.u8().unwrap();
        assert_eq!(
            cur.finish(),
            Err(DecodeError::Inconsistent {
                expected: 1,
                actual: 3
            })
        );
    }
}
