#![cfg_attr(not(test), no_std)]

//! Interrupt-driven serial queues for ATmega32-class parts.
//!
//! Each channel keeps its queues in a [`spi::State`] or [`uart::State`] the
//! application owns (usually a `static`). The driver borrows that state for
//! foreground operations and the interrupt vector hands the same state to its
//! `on_*` entry point. Register access goes through [`spi::SpiRegisters`] and
//! [`uart::UartRegisters`]; the `avr` module implements them for real
//! hardware.

pub mod hook;
pub mod ring_buffer;
pub mod skip_flags;
pub mod spi;
pub mod uart;

#[cfg(target_arch = "avr")]
pub mod avr;

pub use hook::Hook;
pub use ring_buffer::{Error, RingBuffer, Word};
pub use skip_flags::SkipFlags;

/// Where a channel stands between foreground code and its exchange-complete
/// interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExchangeState {
    /// Nothing staged; the shift register is free.
    Idle,
    /// One element staged in the shift register, queue empty.
    Loaded,
    /// Elements queued behind the staged one.
    Draining,
}
