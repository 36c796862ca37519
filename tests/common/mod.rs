#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use atmega_serial::spi::{self, SpiRegisters};
use atmega_serial::uart::{self, Frame, FrameErrors, UartRegisters};

/// SPI block seen from the slave side. The test plays the master.
#[derive(Default)]
pub struct SpiWire {
    pub staged: Cell<Option<u8>>,
    pub incoming: Cell<u8>,
    pub enabled: Cell<bool>,
    pub slave: Cell<bool>,
    pub selected: Cell<bool>,
}

impl SpiRegisters for SpiWire {
    fn enable_slave(&self, _config: &spi::Config) {
        self.enabled.set(true);
        self.slave.set(true);
    }

    fn enable_master(&self, _config: &spi::Config) {
        self.enabled.set(true);
        self.slave.set(false);
    }

    fn disable(&self) {
        self.enabled.set(false);
    }

    fn read_data(&self) -> u8 {
        self.incoming.get()
    }

    fn write_data(&self, byte: u8) {
        self.staged.set(Some(byte));
    }

    fn transfer_complete(&self) -> bool {
        true
    }

    fn select(&self, active: bool) {
        self.selected.set(active);
    }
}

impl SpiWire {
    /// Clock one byte in from the master and run the transfer-complete
    /// interrupt. Returns the byte the slave had staged, if any.
    pub fn exchange<const N: usize>(&self, state: &spi::State<N>, master: u8) -> Option<u8> {
        let out = self.staged.take();
        self.incoming.set(master);
        state.on_transfer_complete(self);
        out
    }
}

/// USART block with the line looped back to the test.
#[derive(Default)]
pub struct UsartWire {
    pub config: Cell<Option<uart::Config>>,
    pub transmitter: Cell<bool>,
    pub receiver: Cell<bool>,
    pub udre_interrupt: Cell<bool>,
    pub sent: RefCell<Vec<(u8, bool)>>,
    pub rx_frame: Cell<(u8, bool)>,
    pub rx_errors: Cell<FrameErrors>,
}

impl UartRegisters for UsartWire {
    fn configure(&self, config: &uart::Config) {
        self.config.set(Some(*config));
    }

    fn set_transmitter(&self, enabled: bool) {
        self.transmitter.set(enabled);
    }

    fn set_receiver(&self, enabled: bool) {
        self.receiver.set(enabled);
    }

    fn set_data_register_empty_interrupt(&self, enabled: bool) {
        self.udre_interrupt.set(enabled);
    }

    fn read_errors(&self) -> FrameErrors {
        self.rx_errors.get()
    }

    fn read_data(&self) -> (u8, bool) {
        self.rx_frame.get()
    }

    fn write_data(&self, low: u8, ninth: bool) {
        self.sent.borrow_mut().push((low, ninth));
    }
}

impl UsartWire {
    /// A frame arrives on the line.
    pub fn receive<W: Frame, const N: usize>(&self, state: &uart::State<W, N>, word: W, errors: FrameErrors) {
        self.rx_frame.set(word.into_parts());
        self.rx_errors.set(errors);
        state.on_receive_complete(self);
    }

    /// Run the data-register-empty interrupt until the driver switches it
    /// off. Returns how many times it fired.
    pub fn drain<W: Frame, const N: usize>(&self, state: &uart::State<W, N>) -> usize {
        let mut fired = 0;
        while self.udre_interrupt.get() {
            state.on_data_register_empty(self);
            fired += 1;
        }
        fired
    }

    pub fn sent_bytes(&self) -> Vec<u8> {
        self.sent.borrow().iter().map(|&(low, _)| low).collect()
    }
}

/// Waker that counts how often an interrupt handler woke it.
#[derive(Default)]
pub struct WakeCounter(AtomicUsize);

impl Wake for WakeCounter {
    fn wake(self: Arc<Self>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl WakeCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn counting_waker() -> (Arc<WakeCounter>, Waker) {
    let counter = Arc::new(WakeCounter::default());
    let waker = Waker::from(counter.clone());
    (counter, waker)
}

/// Poll `future` once with `waker`.
pub fn poll_once<F: Future>(future: Pin<&mut F>, waker: &Waker) -> Poll<F::Output> {
    future.poll(&mut Context::from_waker(waker))
}
