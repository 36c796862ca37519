mod common;

use std::pin::pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::Poll;

use atmega_serial::spi::{Companion, Config, SpiMaster, SpiSlave, State, DEFAULT_CAPACITY, DUMMY_PACKET};
use atmega_serial::{Error, ExchangeState};
use common::{counting_waker, poll_once, SpiWire};
use embassy_futures::block_on;

#[test]
fn dropped_companion_never_reaches_rx() {
    let wire = SpiWire::default();
    let state = State::<2>::new();
    let mut spi = SpiSlave::new(&wire, &state, Config::default());
    assert!(wire.enabled.get() && wire.slave.get());

    spi.send(0xAA, Companion::Keep).unwrap();
    spi.send(0xBB, Companion::Drop).unwrap();

    wire.exchange(&state, 0x01);
    wire.exchange(&state, 0x02);

    assert_eq!(spi.try_read(), Ok(0x01));
    assert_eq!(spi.try_read(), Err(Error::BufferEmpty));
}

#[test]
fn command_response_exchange() {
    let wire = SpiWire::default();
    let state = State::<DEFAULT_CAPACITY>::new();
    let mut spi = SpiSlave::new(&wire, &state, Config::default());

    // Reply header plus two payload bytes; only the master's command byte,
    // clocked with the header, is wanted.
    spi.send(0x7E, Companion::Keep).unwrap();
    spi.send(0x10, Companion::Drop).unwrap();
    spi.send(0x20, Companion::Drop).unwrap();
    assert_eq!(spi.exchange_state(), ExchangeState::Draining);

    let mut seen = Vec::new();
    for master in [0x42, DUMMY_PACKET, DUMMY_PACKET] {
        seen.push(wire.exchange(&state, master));
    }

    assert_eq!(seen, [Some(0x7E), Some(0x10), Some(0x20)]);
    assert_eq!(spi.try_read(), Ok(0x42));
    assert!(spi.is_rx_empty());
    assert_eq!(spi.exchange_state(), ExchangeState::Idle);
    assert_eq!(state.pending_decisions(), 0);
}

#[test]
fn full_rx_loses_kept_bytes() {
    let wire = SpiWire::default();
    let state = State::<2>::new();
    let mut spi = SpiSlave::new(&wire, &state, Config::default());

    for master in [1, 2, 3] {
        wire.exchange(&state, master);
    }
    assert!(spi.is_rx_full());

    assert_eq!(spi.try_read(), Ok(1));
    assert_eq!(spi.try_read(), Ok(2));
    assert_eq!(spi.try_read(), Err(Error::BufferEmpty));
}

#[test]
fn queued_byte_waits_for_staged_one() {
    let wire = SpiWire::default();
    let state = State::<3>::new();
    let mut spi = SpiSlave::new(&wire, &state, Config::default());

    spi.send(0xA1, Companion::Drop).unwrap();
    assert_eq!(wire.staged.get(), Some(0xA1));

    // Slot busy: must not overwrite the staged byte.
    spi.send(0xA2, Companion::Drop).unwrap();
    assert_eq!(wire.staged.get(), Some(0xA1));

    assert_eq!(wire.exchange(&state, 0), Some(0xA1));
    assert_eq!(wire.staged.get(), Some(0xA2));
    assert_eq!(spi.exchange_state(), ExchangeState::Loaded);

    spi.send(0xA3, Companion::Drop).unwrap();
    assert_eq!(wire.staged.get(), Some(0xA2));
    assert_eq!(wire.exchange(&state, 0), Some(0xA2));
    assert_eq!(wire.exchange(&state, 0), Some(0xA3));
    assert_eq!(wire.exchange(&state, 0x99), None);
    assert_eq!(spi.try_read(), Ok(0x99));
}

#[test]
fn stop_discards_and_reenable_restores() {
    let wire = SpiWire::default();
    let state = State::<4>::new();
    let mut spi = SpiSlave::new(&wire, &state, Config::default());

    spi.send(1, Companion::Keep).unwrap();
    spi.send(2, Companion::Keep).unwrap();
    wire.exchange(&state, 0x55);

    spi.stop();
    assert!(!wire.enabled.get());
    assert!(spi.is_tx_empty() && spi.is_rx_empty());
    assert_eq!(state.pending_decisions(), 0);

    spi.reenable();
    assert!(wire.enabled.get());

    spi.send(3, Companion::Drop).unwrap();
    assert_eq!(wire.exchange(&state, 0x66), Some(3));
    assert!(spi.is_rx_empty());
}

static HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

fn count_hook() {
    HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn hook_runs_once_per_exchange() {
    let wire = SpiWire::default();
    let state = State::<2>::new();
    let _spi = SpiSlave::new(&wire, &state, Config::default());

    state.hook().register(count_hook);
    wire.exchange(&state, 0);
    wire.exchange(&state, 0);
    state.hook().unregister();
    wire.exchange(&state, 0);

    assert_eq!(HOOK_CALLS.load(Ordering::SeqCst), 2);
}

#[test]
fn async_read_takes_what_is_queued() {
    let wire = SpiWire::default();
    let state = State::<4>::new();
    let mut spi = SpiSlave::new(&wire, &state, Config::default());

    for master in [0x0A, 0x0B, 0x0C] {
        wire.exchange(&state, master);
    }

    assert_eq!(block_on(spi.receive()), 0x0A);

    let mut buf = [0u8; 4];
    let n = block_on(embedded_io_async::Read::read(&mut spi, &mut buf)).unwrap();
    assert_eq!(&buf[..n], &[0x0B, 0x0C]);
}

#[test]
fn master_transfer_selects_slave() {
    let wire = SpiWire::default();
    let mut master = SpiMaster::new(&wire, Config::default());
    assert!(!wire.slave.get());
    assert!(!wire.selected.get());

    wire.incoming.set(0x3C);
    assert_eq!(master.transfer(0x81), 0x3C);
    assert_eq!(wire.staged.get(), Some(0x81));
    assert!(!wire.selected.get());

    let mut read = [0u8; 3];
    embedded_hal_1::spi::SpiBus::transfer(&mut master, &mut read, &[1]).unwrap();
    assert_eq!(read, [0x3C; 3]);
    assert_eq!(wire.staged.get(), Some(DUMMY_PACKET));

    master.release();
    assert!(!wire.enabled.get());
}

#[test]
fn receive_parks_until_a_kept_byte_arrives() {
    let wire = SpiWire::default();
    let state = State::<2>::new();
    let mut spi = SpiSlave::new(&wire, &state, Config::default());
    spi.send(0x10, Companion::Drop).unwrap();

    let (wakes, waker) = counting_waker();
    let mut receive = pin!(spi.receive());
    assert_eq!(poll_once(receive.as_mut(), &waker), Poll::Pending);

    // The companion of 0x10 is dropped: nothing stored, nobody woken.
    assert_eq!(wire.exchange(&state, 0xEE), Some(0x10));
    assert_eq!(wakes.count(), 0);
    assert_eq!(poll_once(receive.as_mut(), &waker), Poll::Pending);

    wire.exchange(&state, 0x33);
    assert_eq!(wakes.count(), 1);
    assert_eq!(poll_once(receive.as_mut(), &waker), Poll::Ready(0x33));
}

#[test]
fn capacity_beyond_a_machine_word() {
    let wire = SpiWire::default();
    let state = State::<65>::new();
    let mut spi = SpiSlave::new(&wire, &state, Config::default());

    // One staged plus 65 queued; only the last companion is kept.
    for byte in 0..66u8 {
        let companion = if byte == 65 { Companion::Keep } else { Companion::Drop };
        spi.send(byte, companion).unwrap();
    }
    assert!(spi.is_tx_full());
    assert_eq!(state.pending_decisions(), 66);

    for byte in 0..66u8 {
        assert_eq!(wire.exchange(&state, byte ^ 0xFF), Some(byte));
    }
    assert_eq!(spi.try_read(), Ok(65 ^ 0xFF));
    assert_eq!(spi.try_read(), Err(Error::BufferEmpty));
}
