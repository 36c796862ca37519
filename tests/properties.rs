mod common;

use std::collections::VecDeque;

use atmega_serial::spi::{self, Companion, SpiSlave};
use atmega_serial::{Error, RingBuffer, SkipFlags};
use common::SpiWire;
use proptest::prelude::*;

const CAPACITY: usize = 5;

#[derive(Debug, Clone)]
enum QueueOp {
    Push(u8),
    Pop,
    Reset,
}

fn queue_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        4 => any::<u8>().prop_map(QueueOp::Push),
        4 => Just(QueueOp::Pop),
        1 => Just(QueueOp::Reset),
    ]
}

#[derive(Debug, Clone)]
enum SlaveOp {
    Send(u8, bool),
    Read,
    Exchange(u8),
}

fn slave_op() -> impl Strategy<Value = SlaveOp> {
    prop_oneof![
        (any::<u8>(), any::<bool>()).prop_map(|(byte, keep)| SlaveOp::Send(byte, keep)),
        Just(SlaveOp::Read),
        any::<u8>().prop_map(SlaveOp::Exchange),
    ]
}

proptest! {
    #[test]
    fn ring_buffer_is_a_bounded_fifo(ops in prop::collection::vec(queue_op(), 0..200)) {
        let mut buffer = RingBuffer::<u8, CAPACITY>::new();
        let mut model = VecDeque::new();

        for op in ops {
            match op {
                QueueOp::Push(byte) => {
                    if model.len() == CAPACITY {
                        prop_assert_eq!(buffer.push(byte), Err(Error::BufferFull));
                    } else {
                        prop_assert_eq!(buffer.push(byte), Ok(()));
                        model.push_back(byte);
                    }
                }
                QueueOp::Pop => {
                    prop_assert_eq!(buffer.pop(), model.pop_front().ok_or(Error::BufferEmpty));
                }
                QueueOp::Reset => {
                    buffer.reset();
                    model.clear();
                    prop_assert!(buffer.is_empty());
                }
            }
            prop_assert_eq!(buffer.len(), model.len());
            prop_assert_eq!(buffer.is_full(), model.len() == CAPACITY);
        }
    }

    #[test]
    fn skip_flags_replay_decisions(decisions in prop::collection::vec(any::<bool>(), 1..=CAPACITY + 1)) {
        let mut flags = SkipFlags::<CAPACITY>::new();
        for &keep in &decisions {
            flags.record_decision(keep).unwrap();
        }
        for &keep in &decisions {
            prop_assert_eq!(flags.consume_next(), keep);
        }
        prop_assert_eq!(flags.pending(), 0);
    }

    /// Transfer-complete interrupts land between arbitrary foreground calls.
    #[test]
    fn slave_matches_model_under_interleaving(ops in prop::collection::vec(slave_op(), 0..300)) {
        let wire = SpiWire::default();
        let state = spi::State::<CAPACITY>::new();
        let mut spi = SpiSlave::new(&wire, &state, spi::Config::default());

        let mut staged: Option<(u8, bool)> = None;
        let mut tx = VecDeque::new();
        let mut rx = VecDeque::new();

        for op in ops {
            match op {
                SlaveOp::Send(byte, keep) => {
                    let companion = if keep { Companion::Keep } else { Companion::Drop };
                    if tx.len() == CAPACITY {
                        prop_assert_eq!(spi.send(byte, companion), Err(Error::BufferFull));
                    } else {
                        prop_assert_eq!(spi.send(byte, companion), Ok(()));
                        if staged.is_none() && tx.is_empty() {
                            staged = Some((byte, keep));
                        } else {
                            tx.push_back((byte, keep));
                        }
                    }
                }
                SlaveOp::Read => {
                    prop_assert_eq!(spi.try_read(), rx.pop_front().ok_or(Error::BufferEmpty));
                }
                SlaveOp::Exchange(master) => {
                    let out = wire.exchange(&state, master);
                    prop_assert_eq!(out, staged.map(|(byte, _)| byte));

                    let keep = staged.map_or(true, |(_, keep)| keep);
                    if keep && rx.len() < CAPACITY {
                        rx.push_back(master);
                    }
                    staged = tx.pop_front();
                }
            }

            prop_assert!(state.tx_len() <= CAPACITY);
            prop_assert!(state.rx_len() <= CAPACITY);
            prop_assert_eq!(state.tx_len(), tx.len());
            prop_assert_eq!(state.rx_len(), rx.len());
            prop_assert_eq!(state.pending_decisions(), tx.len() + usize::from(staged.is_some()));
        }
    }
}
