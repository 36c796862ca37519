//! Fixed-capacity FIFO shared between foreground code and one interrupt handler.
//!
//! Every channel (SPI TX/RX, UART TX/RX) owns one of these. The occupancy
//! counter is explicit so all `N` slots are usable; callers serialize access
//! with a critical section since both ends mutate `count`.

/// Queue errors surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No room left; the value was not stored.
    BufferFull,
    /// Nothing has been queued yet.
    BufferEmpty,
}

impl embedded_io_async::Error for Error {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Error::BufferFull => embedded_io_async::ErrorKind::OutOfMemory,
            Error::BufferEmpty => embedded_io_async::ErrorKind::Other,
        }
    }
}

pub(crate) mod sealed {
    pub trait Word {}
}

/// Element that can live in a [`RingBuffer`].
///
/// Implemented for the one-byte and two-byte data units the serial
/// peripherals move, and for the per-frame UART error record.
pub trait Word: sealed::Word + Copy {
    /// Value used to fill unused slots.
    const ZERO: Self;
}

impl sealed::Word for u8 {}
impl Word for u8 {
    const ZERO: Self = 0;
}

impl sealed::Word for u16 {}
impl Word for u16 {
    const ZERO: Self = 0;
}

/// FIFO of `N` words with every slot usable.
pub struct RingBuffer<T: Word, const N: usize> {
    buffer: [T; N],
    read_idx: usize,
    write_idx: usize,
    count: usize,
}

impl<T: Word, const N: usize> RingBuffer<T, N> {
    pub const fn new() -> Self {
        assert!(N > 0, "ring buffer capacity must be at least 1");

        Self {
            buffer: [T::ZERO; N],
            read_idx: 0,
            write_idx: 0,
            count: 0,
        }
    }

    /// Append `value` at the write end.
    pub fn push(&mut self, value: T) -> Result<(), Error> {
        if self.is_full() {
            return Err(Error::BufferFull);
        }

        self.buffer[self.write_idx] = value;
        self.write_idx = Self::advance(self.write_idx);
        self.count += 1;
        Ok(())
    }

    /// Remove the oldest value.
    pub fn pop(&mut self) -> Result<T, Error> {
        if self.is_empty() {
            return Err(Error::BufferEmpty);
        }

        let value = self.buffer[self.read_idx];
        self.read_idx = Self::advance(self.read_idx);
        self.count -= 1;
        Ok(value)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == N
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Drop everything queued and rewind both indices.
    pub fn reset(&mut self) {
        self.read_idx = 0;
        self.write_idx = 0;
        self.count = 0;
    }

    #[inline]
    const fn advance(idx: usize) -> usize {
        let next = idx + 1;
        if next == N {
            0
        } else {
            next
        }
    }
}

impl<T: Word, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
