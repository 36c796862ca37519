//! SPI master (polled) and SPI slave (interrupt-driven, queued).
//!
//! In slave mode every byte the slave shifts out is paired with the byte the
//! master shifts in at the same time. When enqueuing a byte the caller decides
//! with [`Companion`] whether that incoming byte is worth keeping; the decision
//! rides in a [`SkipFlags`] vector kept in lock-step with the TX queue.

use core::cell::RefCell;
use core::convert::Infallible;
use core::future::poll_fn;
use core::task::Poll;

use critical_section::Mutex;
use embassy_sync::waitqueue::AtomicWaker;
use portable_atomic::{AtomicBool, Ordering};

use crate::hook::Hook;
use crate::ring_buffer::{Error, RingBuffer};
use crate::skip_flags::SkipFlags;
use crate::ExchangeState;

/// TX and RX capacity used when none is given.
pub const DEFAULT_CAPACITY: usize = 7;

/// Byte a master sends when it only wants to clock data out of a slave.
pub const DUMMY_PACKET: u8 = 0xC3;

/// Bit order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Data is transferred most significant bit first (default).
    #[default]
    Msb,
    /// Data is transferred least significant bit first.
    Lsb,
}

/// Clock level while idle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    #[default]
    IdleLow,
    IdleHigh,
}

/// Clock edge on which data is sampled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    #[default]
    CaptureOnFirstTransition,
    CaptureOnSecondTransition,
}

/// Master clock divider. Ignored in slave mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockDivider {
    Div4,
    Div16,
    #[default]
    Div64,
    Div128,
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub bit_order: BitOrder,
    pub polarity: Polarity,
    pub phase: Phase,
    pub divider: ClockDivider,
    /// Double the master clock.
    pub double_speed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bit_order: BitOrder::Msb,
            polarity: Polarity::IdleLow,
            phase: Phase::CaptureOnFirstTransition,
            divider: ClockDivider::Div64,
            double_speed: false,
        }
    }
}

/// What happens to the byte the master shifts in while an enqueued byte is
/// shifted out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Companion {
    /// Store it in the RX queue.
    Keep,
    /// Discard it, e.g. when the master is known to send a dummy byte.
    Drop,
}

impl Companion {
    #[inline]
    fn is_keep(self) -> bool {
        matches!(self, Companion::Keep)
    }
}

/// Access to the SPI data register and its control bits.
///
/// Methods take `&self`: the registers are memory mapped and the interrupt
/// handler touches them while a driver exists.
#[auto_impl::auto_impl(&)]
pub trait SpiRegisters {
    /// Enable the peripheral as a slave with the transfer-complete interrupt
    /// armed.
    fn enable_slave(&self, config: &Config);

    /// Enable the peripheral as a polled master.
    fn enable_master(&self, config: &Config);

    /// Disable the peripheral and its interrupt.
    fn disable(&self);

    /// Read the byte shifted in by the last exchange.
    fn read_data(&self) -> u8;

    /// Stage `byte` in the shift register for the next exchange.
    fn write_data(&self, byte: u8);

    /// Transfer-complete flag, polled in master mode.
    fn transfer_complete(&self) -> bool;

    /// Drive the slave-select line, `true` selecting the slave.
    fn select(&self, active: bool);
}

struct Queues<const N: usize> {
    tx: RingBuffer<u8, N>,
    rx: RingBuffer<u8, N>,
    skip: SkipFlags<N>,
}

impl<const N: usize> Queues<N> {
    const fn new() -> Self {
        Self {
            tx: RingBuffer::new(),
            rx: RingBuffer::new(),
            skip: SkipFlags::new(),
        }
    }

    fn reset(&mut self) {
        self.tx.reset();
        self.rx.reset();
        self.skip.reset();
    }
}

/// Queues and flags of one SPI slave, shared by the driver and the
/// transfer-complete interrupt.
pub struct State<const N: usize = DEFAULT_CAPACITY> {
    queues: Mutex<RefCell<Queues<N>>>,
    // Cleared while a byte sits in the shift register waiting for the master.
    slot_free: AtomicBool,
    rx_waker: AtomicWaker,
    hook: Hook,
}

impl<const N: usize> State<N> {
    pub const fn new() -> Self {
        Self {
            queues: Mutex::new(RefCell::new(Queues::new())),
            slot_free: AtomicBool::new(true),
            rx_waker: AtomicWaker::new(),
            hook: Hook::new(),
        }
    }

    /// Callback run at the end of every transfer-complete interrupt.
    pub fn hook(&self) -> &Hook {
        &self.hook
    }

    /// Transfer-complete interrupt entry point.
    ///
    /// Harvests the byte the master just shifted in according to the decision
    /// recorded for the byte that went out with it, then stages the next
    /// queued byte. The staged byte's own decision is consumed on the next
    /// call. A kept byte that finds the RX queue full is lost.
    pub fn on_transfer_complete<R: SpiRegisters>(&self, regs: &R) {
        let stored = critical_section::with(|cs| {
            let mut queues = self.queues.borrow_ref_mut(cs);

            let incoming = regs.read_data();
            let stored = queues.skip.consume_next() && queues.rx.push(incoming).is_ok();

            match queues.tx.pop() {
                Ok(next) => {
                    regs.write_data(next);
                    self.slot_free.store(false, Ordering::Relaxed);
                }
                Err(_) => self.slot_free.store(true, Ordering::Relaxed),
            }

            stored
        });

        if stored {
            self.rx_waker.wake();
        }

        self.hook.call();
    }

    /// Queue `byte` for the master to clock out.
    ///
    /// When the shift register is free and nothing is queued the byte is
    /// staged directly so the very next exchange carries it.
    pub fn enqueue<R: SpiRegisters>(&self, regs: &R, byte: u8, companion: Companion) -> Result<(), Error> {
        critical_section::with(|cs| {
            let mut queues = self.queues.borrow_ref_mut(cs);

            if queues.tx.is_full() {
                return Err(Error::BufferFull);
            }

            queues.skip.record_decision(companion.is_keep())?;

            if queues.tx.is_empty() && self.slot_free.load(Ordering::Relaxed) {
                self.slot_free.store(false, Ordering::Relaxed);
                regs.write_data(byte);
                Ok(())
            } else {
                queues.tx.push(byte)
            }
        })
    }

    /// Pop the oldest kept byte.
    pub fn dequeue(&self) -> Result<u8, Error> {
        critical_section::with(|cs| self.queues.borrow_ref_mut(cs).rx.pop())
    }

    /// Discard queued TX bytes, received bytes and pending decisions.
    pub fn reset(&self) {
        critical_section::with(|cs| {
            self.queues.borrow_ref_mut(cs).reset();
            self.slot_free.store(true, Ordering::Relaxed);
        });
    }

    pub fn exchange_state(&self) -> ExchangeState {
        critical_section::with(|cs| {
            let queues = self.queues.borrow_ref(cs);
            if self.slot_free.load(Ordering::Relaxed) {
                ExchangeState::Idle
            } else if queues.tx.is_empty() {
                ExchangeState::Loaded
            } else {
                ExchangeState::Draining
            }
        })
    }

    pub fn is_tx_empty(&self) -> bool {
        critical_section::with(|cs| self.queues.borrow_ref(cs).tx.is_empty())
    }

    pub fn is_tx_full(&self) -> bool {
        critical_section::with(|cs| self.queues.borrow_ref(cs).tx.is_full())
    }

    pub fn is_rx_empty(&self) -> bool {
        critical_section::with(|cs| self.queues.borrow_ref(cs).rx.is_empty())
    }

    pub fn is_rx_full(&self) -> bool {
        critical_section::with(|cs| self.queues.borrow_ref(cs).rx.is_full())
    }

    /// Bytes queued behind the shift register.
    pub fn tx_len(&self) -> usize {
        critical_section::with(|cs| self.queues.borrow_ref(cs).tx.len())
    }

    pub fn rx_len(&self) -> usize {
        critical_section::with(|cs| self.queues.borrow_ref(cs).rx.len())
    }

    /// Decisions recorded for bytes not yet shifted out, the staged one
    /// included.
    pub fn pending_decisions(&self) -> usize {
        critical_section::with(|cs| self.queues.borrow_ref(cs).skip.pending())
    }
}

impl<const N: usize> Default for State<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Interrupt-driven SPI slave.
pub struct SpiSlave<'d, R: SpiRegisters, const N: usize = DEFAULT_CAPACITY> {
    regs: R,
    state: &'d State<N>,
    config: Config,
}

impl<'d, R: SpiRegisters, const N: usize> SpiSlave<'d, R, N> {
    /// Take over `state`, empty it and enable the peripheral.
    ///
    /// The transfer-complete vector must forward to
    /// [`State::on_transfer_complete`] with the same `state`.
    pub fn new(regs: R, state: &'d State<N>, config: Config) -> Self {
        state.reset();
        regs.enable_slave(&config);

        #[cfg(feature = "defmt")]
        defmt::debug!("spi slave enabled, capacity {=usize}", N);

        Self { regs, state, config }
    }

    /// Queue `byte` for transmission; see [`State::enqueue`].
    pub fn send(&mut self, byte: u8, companion: Companion) -> Result<(), Error> {
        self.state.enqueue(&self.regs, byte, companion)
    }

    /// Pop a received byte without waiting.
    pub fn try_read(&mut self) -> Result<u8, Error> {
        self.state.dequeue()
    }

    /// Wait for a received byte.
    pub async fn receive(&mut self) -> u8 {
        poll_fn(|cx| {
            self.state.rx_waker.register(cx.waker());

            match self.state.dequeue() {
                Ok(byte) => Poll::Ready(byte),
                Err(_) => Poll::Pending,
            }
        })
        .await
    }

    /// Disable the peripheral and drop everything queued in either direction.
    pub fn stop(&mut self) {
        self.regs.disable();
        self.state.reset();

        #[cfg(feature = "defmt")]
        defmt::debug!("spi slave stopped");
    }

    /// Re-enable after [`stop`](Self::stop) with the configuration given to `new`.
    pub fn reenable(&mut self) {
        self.regs.enable_slave(&self.config);

        #[cfg(feature = "defmt")]
        defmt::debug!("spi slave re-enabled");
    }

    pub fn exchange_state(&self) -> ExchangeState {
        self.state.exchange_state()
    }

    pub fn is_tx_empty(&self) -> bool {
        self.state.is_tx_empty()
    }

    pub fn is_tx_full(&self) -> bool {
        self.state.is_tx_full()
    }

    pub fn is_rx_empty(&self) -> bool {
        self.state.is_rx_empty()
    }

    pub fn is_rx_full(&self) -> bool {
        self.state.is_rx_full()
    }

    pub fn state(&self) -> &'d State<N> {
        self.state
    }

    /// Disable the peripheral and hand back the registers.
    pub fn release(mut self) -> R {
        self.stop();
        self.regs
    }
}

impl<'d, R: SpiRegisters, const N: usize> embedded_io_async::ErrorType for SpiSlave<'d, R, N> {
    type Error = Error;
}

impl<'d, R: SpiRegisters, const N: usize> embedded_io_async::Read for SpiSlave<'d, R, N> {
    /// Wait for at least one byte, then take whatever else is already queued.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        buf[0] = self.receive().await;

        let mut count = 1;
        for slot in &mut buf[1..] {
            match self.state.dequeue() {
                Ok(byte) => {
                    *slot = byte;
                    count += 1;
                }
                Err(_) => break,
            }
        }

        Ok(count)
    }
}

/// Polled SPI master.
pub struct SpiMaster<R: SpiRegisters> {
    regs: R,
}

impl<R: SpiRegisters> SpiMaster<R> {
    pub fn new(regs: R, config: Config) -> Self {
        regs.enable_master(&config);
        regs.select(false);

        #[cfg(feature = "defmt")]
        defmt::debug!("spi master enabled");

        Self { regs }
    }

    /// Exchange one byte with the selected slave.
    pub fn transfer(&mut self, byte: u8) -> u8 {
        self.regs.select(true);
        self.regs.write_data(byte);
        while !self.regs.transfer_complete() {}
        self.regs.select(false);
        self.regs.read_data()
    }

    pub fn blocking_write(&mut self, data: &[u8]) {
        for &byte in data {
            self.transfer(byte);
        }
    }

    /// Clock [`DUMMY_PACKET`] out to read `data.len()` bytes.
    pub fn blocking_read(&mut self, data: &mut [u8]) {
        for byte in data {
            *byte = self.transfer(DUMMY_PACKET);
        }
    }

    pub fn blocking_transfer_in_place(&mut self, data: &mut [u8]) {
        for byte in data {
            *byte = self.transfer(*byte);
        }
    }

    pub fn blocking_transfer(&mut self, read: &mut [u8], write: &[u8]) {
        let len = read.len().max(write.len());
        for i in 0..len {
            let wb = write.get(i).copied().unwrap_or(DUMMY_PACKET);
            let rb = self.transfer(wb);
            if let Some(r) = read.get_mut(i) {
                *r = rb;
            }
        }
    }

    pub fn release(self) -> R {
        self.regs.disable();
        self.regs
    }
}

impl<R: SpiRegisters> embedded_hal_1::spi::ErrorType for SpiMaster<R> {
    type Error = Infallible;
}

impl<R: SpiRegisters> embedded_hal_1::spi::SpiBus<u8> for SpiMaster<R> {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.blocking_read(words);
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.blocking_write(words);
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.blocking_transfer(read, write);
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.blocking_transfer_in_place(words);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
