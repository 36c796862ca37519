//! Per-element keep/drop decisions for the SPI slave companion bytes.
//!
//! Bit 0 belongs to the byte the hardware shifts next. Foreground code appends
//! at `pending`; the transfer-complete interrupt consumes bit 0 and shifts the
//! rest down.

use bitvec::prelude::*;

use crate::ring_buffer::Error;

/// Keep/drop decisions for up to `N` queued bytes plus the staged one.
pub struct SkipFlags<const N: usize> {
    // 8N bits, at least N + 1 for any N >= 1.
    bits: BitArray<[u8; N], Lsb0>,
    pending: usize,
}

impl<const N: usize> SkipFlags<N> {
    pub const fn new() -> Self {
        assert!(N > 0, "skip flags capacity must be at least 1");

        Self {
            bits: BitArray::ZERO,
            pending: 0,
        }
    }

    /// Record whether the companion of the element being enqueued is kept.
    pub fn record_decision(&mut self, keep: bool) -> Result<(), Error> {
        if self.pending > N {
            return Err(Error::BufferFull);
        }

        self.bits.set(self.pending, keep);
        self.pending += 1;
        Ok(())
    }

    /// Take the decision for the element that just finished shifting.
    ///
    /// With nothing pending the master clocked a byte in while the slave had
    /// nothing of its own staged; that byte is always kept.
    pub fn consume_next(&mut self) -> bool {
        if self.pending == 0 {
            return true;
        }

        let keep = self.bits[0];
        self.bits[..self.pending].shift_left(1);
        self.pending -= 1;
        keep
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn reset(&mut self) {
        self.bits.fill(false);
        self.pending = 0;
    }
}

impl<const N: usize> Default for SkipFlags<N> {
    fn default() -> Self {
        Self::new()
    }
}
