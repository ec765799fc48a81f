use crate::error::{LinkError, Result};

/// A chip-select gated, full-duplex serial link with a "device ready" line.
///
/// This is the only surface the protocol layers touch. Implementations do raw
/// I/O and nothing else: no framing, no retries, no pin policy.
pub trait Link {
    /// Drive the active-low select line. `true` selects the peripheral.
    fn select(&mut self, active: bool) -> Result<()>;

    /// Sample the ready line. `true` means the peripheral asserts it.
    fn is_ready(&mut self) -> Result<bool>;

    /// Clock `tx.len()` bytes out while clocking the same number into `rx`.
    ///
    /// Callers must pass buffers of equal length.
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()>;

    /// Pulse the peripheral's reset line and wait for it to come back up.
    fn reset_pulse(&mut self) -> Result<()>;
}

impl<L: Link + ?Sized> Link for &mut L {
    fn select(&mut self, active: bool) -> Result<()> {
        (**self).select(active)
    }

    fn is_ready(&mut self) -> Result<bool> {
        (**self).is_ready()
    }

    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        (**self).exchange(tx, rx)
    }

    fn reset_pulse(&mut self) -> Result<()> {
        (**self).reset_pulse()
    }
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn select(&mut self, active: bool) -> Result<()> {
        (**self).select(active)
    }

    fn is_ready(&mut self) -> Result<bool> {
        (**self).is_ready()
    }

    fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
        (**self).exchange(tx, rx)
    }

    fn reset_pulse(&mut self) -> Result<()> {
        (**self).reset_pulse()
    }
}

/// Reject exchanges whose buffers differ in length.
pub fn check_lengths(tx: &[u8], rx: &[u8]) -> Result<()> {
    if tx.len() != rx.len() {
        return Err(LinkError::LengthMismatch {
            tx: tx.len(),
            rx: rx.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingLink {
        selects: Vec<bool>,
        exchanges: usize,
        resets: usize,
    }

    impl Link for CountingLink {
        fn select(&mut self, active: bool) -> Result<()> {
            self.selects.push(active);
            Ok(())
        }

        fn is_ready(&mut self) -> Result<bool> {
            Ok(self.selects.last().copied().unwrap_or(false))
        }

        fn exchange(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<()> {
            check_lengths(tx, rx)?;
            rx.copy_from_slice(tx);
            self.exchanges += 1;
            Ok(())
        }

        fn reset_pulse(&mut self) -> Result<()> {
            self.resets += 1;
            Ok(())
        }
    }

    fn drive<L: Link>(mut link: L) {
        link.select(true).unwrap();
        assert!(link.is_ready().unwrap());
        let mut rx = [0u8; 3];
        link.exchange(&[1, 2, 3], &mut rx).unwrap();
        assert_eq!(rx, [1, 2, 3]);
        link.select(false).unwrap();
        link.reset_pulse().unwrap();
    }

    #[test]
    fn mut_ref_forwards_to_inner() {
        let mut inner = CountingLink::default();
        drive(&mut inner);
        assert_eq!(inner.selects, vec![true, false]);
        assert_eq!(inner.exchanges, 1);
        assert_eq!(inner.resets, 1);
    }

    #[test]
    fn boxed_dyn_link_forwards_to_inner() {
        let boxed: Box<dyn Link> = Box::new(CountingLink::default());
        drive(boxed);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = check_lengths(&[0; 4], &[0; 2]).unwrap_err();
        assert!(matches!(err, LinkError::LengthMismatch { tx: 4, rx: 2 }));
    }
}
