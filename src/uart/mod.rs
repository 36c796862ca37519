//! Interrupt-driven USART with queued transmit and receive.
//!
//! The receive-complete interrupt moves each frame, together with the error
//! flags latched for it, into the RX queue. The data-register-empty interrupt
//! feeds the TX queue to the hardware and switches itself off once the queue
//! runs dry; the next enqueue writes straight to the data register and turns
//! it back on.

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use bitflags::bitflags;
use critical_section::Mutex;
use embassy_sync::waitqueue::AtomicWaker;
use embedded_hal_nb::nb;
use portable_atomic::{AtomicBool, Ordering};

use crate::hook::Hook;
use crate::ring_buffer::{self, sealed, RingBuffer, Word};
use crate::ExchangeState;

/// TX and RX capacity used when none is given.
pub const DEFAULT_CAPACITY: usize = 10;

bitflags! {
    /// Error flags latched by the receiver for one frame.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct FrameErrors: u8 {
        const PARITY = 1 << 0;
        const DATA_OVERRUN = 1 << 1;
        const FRAME = 1 << 2;
    }
}

impl FrameErrors {
    /// The most severe error in the set, if any.
    pub fn error(self) -> Option<Error> {
        if self.contains(FrameErrors::DATA_OVERRUN) {
            Some(Error::Overrun)
        } else if self.contains(FrameErrors::FRAME) {
            Some(Error::Framing)
        } else if self.contains(FrameErrors::PARITY) {
            Some(Error::Parity)
        } else {
            None
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FrameErrors {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "FrameErrors({=u8:#x})", self.bits())
    }
}

impl sealed::Word for FrameErrors {}
impl Word for FrameErrors {
    const ZERO: Self = FrameErrors::empty();
}

/// Data unit of one frame.
///
/// `u8` carries 5 to 8 data bits. `u16` carries 9-bit frames with the ninth
/// bit in bit 8.
pub trait Frame: Word {
    fn from_parts(low: u8, ninth: bool) -> Self;
    fn into_parts(self) -> (u8, bool);
}

impl Frame for u8 {
    #[inline]
    fn from_parts(low: u8, _ninth: bool) -> Self {
        low
    }

    #[inline]
    fn into_parts(self) -> (u8, bool) {
        (self, false)
    }
}

impl Frame for u16 {
    #[inline]
    fn from_parts(low: u8, ninth: bool) -> Self {
        (u16::from(ninth) << 8) | u16::from(low)
    }

    #[inline]
    fn into_parts(self) -> (u8, bool) {
        (self as u8, self & 0x100 != 0)
    }
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    Overrun,
    Parity,
    Framing,
    /// TX queue full.
    BufferFull,
    /// RX queue empty.
    BufferEmpty,
}

impl From<ring_buffer::Error> for Error {
    fn from(err: ring_buffer::Error) -> Self {
        match err {
            ring_buffer::Error::BufferFull => Error::BufferFull,
            ring_buffer::Error::BufferEmpty => Error::BufferEmpty,
        }
    }
}

impl embedded_hal_nb::serial::Error for Error {
    fn kind(&self) -> embedded_hal_nb::serial::ErrorKind {
        use embedded_hal_nb::serial::ErrorKind;

        match self {
            Error::Overrun => ErrorKind::Overrun,
            Error::Parity => ErrorKind::Parity,
            Error::Framing => ErrorKind::FrameFormat,
            Error::BufferFull | Error::BufferEmpty => ErrorKind::Other,
        }
    }
}

impl embedded_io_async::Error for Error {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        use embedded_io_async::ErrorKind;

        match self {
            Error::Parity | Error::Framing => ErrorKind::InvalidData,
            Error::BufferFull => ErrorKind::OutOfMemory,
            Error::Overrun | Error::BufferEmpty => ErrorKind::Other,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    DataBits5,
    DataBits6,
    DataBits7,
    DataBits8,
    /// Needs a `u16` [`Frame`].
    DataBits9,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    #[doc = "1 stop bit"]
    STOP1 = 0,
    #[doc = "2 stop bits"]
    STOP2 = 1,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    ParityNone,
    ParityEven,
    ParityOdd,
}

/// Clock edges used in synchronous mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockPolarity {
    /// TX changes on the rising edge, RX samples on the falling edge.
    TxRisingRxFalling,
    /// TX changes on the falling edge, RX samples on the rising edge.
    TxFallingRxRising,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Asynchronous,
    AsynchronousDoubleSpeed,
    /// XCK is an output.
    SynchronousMaster(ClockPolarity),
    /// XCK is an input.
    SynchronousSlave(ClockPolarity),
}

#[non_exhaustive]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Raw baud rate register value (12 bits).
    pub ubrr: u16,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub mode: Mode,
    /// Enable the transmitter on construction.
    pub transmit: bool,
    /// Enable the receiver on construction.
    pub receive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // 9600 baud from an 8 MHz clock in normal asynchronous mode.
            ubrr: 51,
            data_bits: DataBits::DataBits8,
            stop_bits: StopBits::STOP1,
            parity: Parity::ParityNone,
            mode: Mode::Asynchronous,
            transmit: true,
            receive: true,
        }
    }
}

/// Access to the USART data and control registers.
#[auto_impl::auto_impl(&)]
pub trait UartRegisters {
    /// Program baud rate, frame format and mode. Leaves both directions
    /// disabled.
    fn configure(&self, config: &Config);

    /// Enable or disable the transmitter.
    fn set_transmitter(&self, enabled: bool);

    /// Enable or disable the receiver together with its receive-complete
    /// interrupt.
    fn set_receiver(&self, enabled: bool);

    fn set_data_register_empty_interrupt(&self, enabled: bool);

    /// Error flags of the frame at the head of the receive FIFO. Must be read
    /// before [`read_data`](Self::read_data).
    fn read_errors(&self) -> FrameErrors;

    /// Pop the received frame: low eight bits and the ninth bit.
    fn read_data(&self) -> (u8, bool);

    /// Load a frame into the transmit data register.
    fn write_data(&self, low: u8, ninth: bool);
}

struct Queues<W: Frame, const N: usize> {
    tx: RingBuffer<W, N>,
    rx: RingBuffer<W, N>,
    // Slot-for-slot companion of `rx`.
    rx_errors: RingBuffer<FrameErrors, N>,
}

impl<W: Frame, const N: usize> Queues<W, N> {
    const fn new() -> Self {
        Self {
            tx: RingBuffer::new(),
            rx: RingBuffer::new(),
            rx_errors: RingBuffer::new(),
        }
    }

    fn reset_rx(&mut self) {
        self.rx.reset();
        self.rx_errors.reset();
    }
}

/// Queues and flags of one USART, shared by the driver and both interrupts.
pub struct State<W: Frame = u8, const N: usize = DEFAULT_CAPACITY> {
    queues: Mutex<RefCell<Queues<W, N>>>,
    // Set while the data register is empty and its interrupt is off.
    tx_idle: AtomicBool,
    tx_enabled: AtomicBool,
    tx_waker: AtomicWaker,
    rx_waker: AtomicWaker,
    tx_hook: Hook,
    rx_hook: Hook,
}

impl<W: Frame, const N: usize> State<W, N> {
    pub const fn new() -> Self {
        Self {
            queues: Mutex::new(RefCell::new(Queues::new())),
            tx_idle: AtomicBool::new(true),
            tx_enabled: AtomicBool::new(false),
            tx_waker: AtomicWaker::new(),
            rx_waker: AtomicWaker::new(),
            tx_hook: Hook::new(),
            rx_hook: Hook::new(),
        }
    }

    /// Callback run at the end of every data-register-empty interrupt.
    pub fn tx_hook(&self) -> &Hook {
        &self.tx_hook
    }

    /// Callback run at the end of every receive-complete interrupt.
    pub fn rx_hook(&self) -> &Hook {
        &self.rx_hook
    }

    /// Receive-complete interrupt entry point.
    ///
    /// A frame that finds the RX queue full is lost along with its error
    /// flags.
    pub fn on_receive_complete<R: UartRegisters>(&self, regs: &R) {
        let stored = critical_section::with(|cs| {
            let mut queues = self.queues.borrow_ref_mut(cs);

            let errors = regs.read_errors();
            let (low, ninth) = regs.read_data();

            queues.rx.push(W::from_parts(low, ninth)).is_ok() && queues.rx_errors.push(errors).is_ok()
        });

        if stored {
            self.rx_waker.wake();
        }

        self.rx_hook.call();
    }

    /// Data-register-empty interrupt entry point.
    pub fn on_data_register_empty<R: UartRegisters>(&self, regs: &R) {
        critical_section::with(|cs| match self.queues.borrow_ref_mut(cs).tx.pop() {
            Ok(word) => {
                let (low, ninth) = word.into_parts();
                regs.write_data(low, ninth);
            }
            Err(_) => {
                regs.set_data_register_empty_interrupt(false);
                self.tx_idle.store(true, Ordering::Relaxed);
            }
        });

        self.tx_waker.wake();
        self.tx_hook.call();
    }

    /// Queue `word` for transmission, writing it to the data register
    /// directly when the transmitter is enabled and idle.
    ///
    /// While the transmitter is disabled words only queue up; they go out once
    /// it is re-enabled.
    pub fn enqueue<R: UartRegisters>(&self, regs: &R, word: W) -> Result<(), ring_buffer::Error> {
        critical_section::with(|cs| {
            let mut queues = self.queues.borrow_ref_mut(cs);

            let writable = self.tx_enabled.load(Ordering::Relaxed) && self.tx_idle.load(Ordering::Relaxed);

            if writable && queues.tx.is_empty() {
                self.tx_idle.store(false, Ordering::Relaxed);
                let (low, ninth) = word.into_parts();
                regs.write_data(low, ninth);
                regs.set_data_register_empty_interrupt(true);
                Ok(())
            } else {
                queues.tx.push(word)
            }
        })
    }

    /// Pop the oldest received frame and the errors latched for it.
    pub fn dequeue(&self) -> Result<(W, FrameErrors), ring_buffer::Error> {
        critical_section::with(|cs| {
            let mut queues = self.queues.borrow_ref_mut(cs);
            let word = queues.rx.pop()?;
            let errors = queues.rx_errors.pop().unwrap_or_default();
            Ok((word, errors))
        })
    }

    /// Discard everything queued in both directions and mark the transmitter
    /// disabled.
    pub fn reset(&self) {
        critical_section::with(|cs| {
            let mut queues = self.queues.borrow_ref_mut(cs);
            queues.tx.reset();
            queues.reset_rx();
            self.tx_enabled.store(false, Ordering::Relaxed);
            self.tx_idle.store(true, Ordering::Relaxed);
        });
    }

    fn disable_tx(&self) {
        critical_section::with(|cs| {
            self.queues.borrow_ref_mut(cs).tx.reset();
            self.tx_enabled.store(false, Ordering::Relaxed);
            self.tx_idle.store(true, Ordering::Relaxed);
        });
    }

    // Arms the data-register-empty interrupt if words queued up while disabled.
    fn enable_tx<R: UartRegisters>(&self, regs: &R) {
        critical_section::with(|cs| {
            self.tx_enabled.store(true, Ordering::Relaxed);

            if !self.queues.borrow_ref(cs).tx.is_empty() && self.tx_idle.load(Ordering::Relaxed) {
                self.tx_idle.store(false, Ordering::Relaxed);
                regs.set_data_register_empty_interrupt(true);
            }
        });
    }

    // Everything queued has been handed to the data register.
    fn tx_drained(&self) -> bool {
        critical_section::with(|cs| {
            self.tx_idle.load(Ordering::Relaxed) && self.queues.borrow_ref(cs).tx.is_empty()
        })
    }

    fn reset_rx(&self) {
        critical_section::with(|cs| self.queues.borrow_ref_mut(cs).reset_rx());
    }

    /// Transmit side of the exchange.
    pub fn exchange_state(&self) -> ExchangeState {
        critical_section::with(|cs| {
            let queues = self.queues.borrow_ref(cs);
            if self.tx_idle.load(Ordering::Relaxed) {
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

    pub fn tx_len(&self) -> usize {
        critical_section::with(|cs| self.queues.borrow_ref(cs).tx.len())
    }

    pub fn rx_len(&self) -> usize {
        critical_section::with(|cs| self.queues.borrow_ref(cs).rx.len())
    }
}

impl<W: Frame, const N: usize> Default for State<W, N> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct UartTx<'d, R: UartRegisters, W: Frame = u8, const N: usize = DEFAULT_CAPACITY> {
    regs: R,
    state: &'d State<W, N>,
}

impl<'d, R: UartRegisters, W: Frame, const N: usize> UartTx<'d, R, W, N> {
    /// Queue one frame; see [`State::enqueue`].
    pub fn send(&mut self, word: W) -> Result<(), ring_buffer::Error> {
        self.state.enqueue(&self.regs, word)
    }

    /// Disable the transmitter and discard unsent frames.
    pub fn stop(&mut self) {
        self.regs.set_data_register_empty_interrupt(false);
        self.regs.set_transmitter(false);
        self.state.disable_tx();

        #[cfg(feature = "defmt")]
        defmt::debug!("uart transmitter stopped");
    }

    pub fn reenable(&mut self) {
        self.regs.set_transmitter(true);
        self.state.enable_tx(&self.regs);

        #[cfg(feature = "defmt")]
        defmt::debug!("uart transmitter re-enabled");
    }

    pub fn exchange_state(&self) -> ExchangeState {
        self.state.exchange_state()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_tx_empty()
    }

    pub fn is_full(&self) -> bool {
        self.state.is_tx_full()
    }

    /// Wait for room in the TX queue and queue `word`.
    pub async fn transmit(&mut self, word: W) {
        poll_fn(|cx| {
            self.state.tx_waker.register(cx.waker());

            match self.state.enqueue(&self.regs, word) {
                Ok(()) => Poll::Ready(()),
                Err(_) => Poll::Pending,
            }
        })
        .await
    }

    /// Wait until every queued frame has been handed to the hardware.
    pub async fn flush(&mut self) {
        poll_fn(|cx| {
            self.state.tx_waker.register(cx.waker());

            if self.state.tx_drained() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
        .await
    }
}

pub struct UartRx<'d, R: UartRegisters, W: Frame = u8, const N: usize = DEFAULT_CAPACITY> {
    regs: R,
    state: &'d State<W, N>,
    // Error of a frame dropped in the middle of a multi-byte read.
    pending_error: Option<Error>,
}

impl<'d, R: UartRegisters, W: Frame, const N: usize> UartRx<'d, R, W, N> {
    /// Pop a received frame without waiting; see [`State::dequeue`].
    pub fn try_read(&mut self) -> Result<(W, FrameErrors), ring_buffer::Error> {
        self.state.dequeue()
    }

    /// Wait for a received frame.
    pub async fn receive(&mut self) -> (W, FrameErrors) {
        poll_fn(|cx| {
            self.state.rx_waker.register(cx.waker());

            match self.state.dequeue() {
                Ok(frame) => Poll::Ready(frame),
                Err(_) => Poll::Pending,
            }
        })
        .await
    }

    /// Disable the receiver and discard unread frames.
    pub fn stop(&mut self) {
        self.regs.set_receiver(false);
        self.state.reset_rx();
        self.pending_error = None;

        #[cfg(feature = "defmt")]
        defmt::debug!("uart receiver stopped");
    }

    pub fn reenable(&mut self) {
        self.regs.set_receiver(true);

        #[cfg(feature = "defmt")]
        defmt::debug!("uart receiver re-enabled");
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_rx_empty()
    }

    pub fn is_full(&self) -> bool {
        self.state.is_rx_full()
    }

    pub fn len(&self) -> usize {
        self.state.rx_len()
    }
}

impl<'d, R: UartRegisters, const N: usize> UartRx<'d, R, u8, N> {
    /// Wait for at least one byte, then take whatever else is already queued.
    ///
    /// An errored frame ends the read. If it is the first frame its error is
    /// returned; otherwise the bytes read so far are returned and the error
    /// is reported by the next call.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if let Some(err) = self.pending_error.take() {
            return Err(err);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let (byte, errors) = self.receive().await;
        if let Some(err) = errors.error() {
            return Err(err);
        }
        buf[0] = byte;

        let mut count = 1;
        for slot in &mut buf[1..] {
            let Ok((byte, errors)) = self.state.dequeue() else {
                break;
            };
            if let Some(err) = errors.error() {
                self.pending_error = Some(err);
                break;
            }
            *slot = byte;
            count += 1;
        }

        Ok(count)
    }
}

impl<'d, R: UartRegisters, const N: usize> UartTx<'d, R, u8, N> {
    /// Queue all of `buf`, waiting for room as needed.
    pub async fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        for &byte in buf {
            self.transmit(byte).await;
        }
        Ok(())
    }
}

/// Both directions of one USART.
pub struct Uart<'d, R: UartRegisters + Clone, W: Frame = u8, const N: usize = DEFAULT_CAPACITY> {
    tx: UartTx<'d, R, W, N>,
    rx: UartRx<'d, R, W, N>,
}

impl<'d, R: UartRegisters + Clone, W: Frame, const N: usize> Uart<'d, R, W, N> {
    /// Take over `state`, empty it, configure the peripheral and enable the
    /// directions `config` asks for.
    ///
    /// The receive-complete and data-register-empty vectors must forward to
    /// [`State::on_receive_complete`] and [`State::on_data_register_empty`]
    /// with the same `state`.
    pub fn new(regs: R, state: &'d State<W, N>, config: Config) -> Self {
        state.reset();
        regs.set_data_register_empty_interrupt(false);
        regs.configure(&config);
        regs.set_transmitter(config.transmit);
        regs.set_receiver(config.receive);
        if config.transmit {
            state.enable_tx(&regs);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("uart enabled: {}, capacity {=usize}", config, N);

        Self {
            tx: UartTx {
                regs: regs.clone(),
                state,
            },
            rx: UartRx {
                regs,
                state,
                pending_error: None,
            },
        }
    }

    pub fn send(&mut self, word: W) -> Result<(), ring_buffer::Error> {
        self.tx.send(word)
    }

    pub fn try_read(&mut self) -> Result<(W, FrameErrors), ring_buffer::Error> {
        self.rx.try_read()
    }

    pub fn tx(&mut self) -> &mut UartTx<'d, R, W, N> {
        &mut self.tx
    }

    pub fn rx(&mut self) -> &mut UartRx<'d, R, W, N> {
        &mut self.rx
    }

    pub fn split(self) -> (UartTx<'d, R, W, N>, UartRx<'d, R, W, N>) {
        (self.tx, self.rx)
    }
}

impl<'d, R: UartRegisters, W: Frame, const N: usize> embedded_hal_nb::serial::ErrorType for UartTx<'d, R, W, N> {
    type Error = Error;
}

impl<'d, R: UartRegisters, W: Frame, const N: usize> embedded_hal_nb::serial::ErrorType for UartRx<'d, R, W, N> {
    type Error = Error;
}

impl<'d, R: UartRegisters + Clone, W: Frame, const N: usize> embedded_hal_nb::serial::ErrorType for Uart<'d, R, W, N> {
    type Error = Error;
}

impl<'d, R: UartRegisters, W: Frame, const N: usize> embedded_hal_nb::serial::Write<W> for UartTx<'d, R, W, N> {
    fn write(&mut self, word: W) -> nb::Result<(), Error> {
        self.send(word).map_err(|_| nb::Error::WouldBlock)
    }

    fn flush(&mut self) -> nb::Result<(), Error> {
        if self.state.tx_drained() {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl<'d, R: UartRegisters, W: Frame, const N: usize> embedded_hal_nb::serial::Read<W> for UartRx<'d, R, W, N> {
    fn read(&mut self) -> nb::Result<W, Error> {
        let (word, errors) = self.try_read().map_err(|_| nb::Error::WouldBlock)?;

        match errors.error() {
            Some(err) => Err(nb::Error::Other(err)),
            None => Ok(word),
        }
    }
}

impl<'d, R: UartRegisters + Clone, W: Frame, const N: usize> embedded_hal_nb::serial::Write<W> for Uart<'d, R, W, N> {
    fn write(&mut self, word: W) -> nb::Result<(), Error> {
        embedded_hal_nb::serial::Write::write(&mut self.tx, word)
    }

    fn flush(&mut self) -> nb::Result<(), Error> {
        embedded_hal_nb::serial::Write::flush(&mut self.tx)
    }
}

impl<'d, R: UartRegisters + Clone, W: Frame, const N: usize> embedded_hal_nb::serial::Read<W> for Uart<'d, R, W, N> {
    fn read(&mut self) -> nb::Result<W, Error> {
        embedded_hal_nb::serial::Read::read(&mut self.rx)
    }
}

impl<'d, R: UartRegisters, const N: usize> embedded_io_async::ErrorType for UartTx<'d, R, u8, N> {
    type Error = Error;
}

impl<'d, R: UartRegisters, const N: usize> embedded_io_async::ErrorType for UartRx<'d, R, u8, N> {
    type Error = Error;
}

impl<'d, R: UartRegisters + Clone, const N: usize> embedded_io_async::ErrorType for Uart<'d, R, u8, N> {
    type Error = Error;
}

impl<'d, R: UartRegisters, const N: usize> embedded_io_async::Read for UartRx<'d, R, u8, N> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        Self::read(self, buf).await
    }
}

impl<'d, R: UartRegisters, const N: usize> embedded_io_async::Write for UartTx<'d, R, u8, N> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        Self::write(self, buf).await?;
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Error> {
        Self::flush(self).await;
        Ok(())
    }
}

impl<'d, R: UartRegisters + Clone, const N: usize> embedded_io_async::Read for Uart<'d, R, u8, N> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        UartRx::read(&mut self.rx, buf).await
    }
}

impl<'d, R: UartRegisters + Clone, const N: usize> embedded_io_async::Write for Uart<'d, R, u8, N> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        UartTx::write(&mut self.tx, buf).await?;
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Error> {
        UartTx::flush(&mut self.tx).await;
        Ok(())
    }
}
