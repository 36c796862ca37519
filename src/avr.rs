//! ATmega32(A) register backend.
//!
//! [`Spi`] and [`Usart`] are zero-sized handles onto the on-chip SPI and USART
//! blocks. Interrupt vectors are bound with [`bind_interrupts!`](crate::bind_interrupts),
//! which needs the application to depend on `avr-device` with the `atmega32a`
//! and `rt` features.

use avr_device::atmega32a::{self, PORTB, SPI, USART};

#[cfg(feature = "rt")]
#[doc(hidden)]
pub use avr_device::interrupt;

use crate::spi::{self, BitOrder, ClockDivider, Phase, Polarity, SpiRegisters};
use crate::uart::{self, ClockPolarity, DataBits, FrameErrors, Mode, StopBits, UartRegisters};

// SPCR
const SPIE: u8 = 1 << 7;
const SPE: u8 = 1 << 6;
const DORD: u8 = 1 << 5;
const MSTR: u8 = 1 << 4;
const CPOL: u8 = 1 << 3;
const CPHA: u8 = 1 << 2;
// SPSR
const SPIF: u8 = 1 << 7;
const SPI2X: u8 = 1 << 0;

// Port B pins used by the SPI block.
const PB_SS: u8 = 1 << 4;
const PB_MOSI: u8 = 1 << 5;
const PB_MISO: u8 = 1 << 6;
const PB_SCK: u8 = 1 << 7;
const PB_XCK: u8 = 1 << 0;

// UCSRA
const FE: u8 = 1 << 4;
const DOR: u8 = 1 << 3;
const PE: u8 = 1 << 2;
const U2X: u8 = 1 << 1;
// UCSRB
const RXCIE: u8 = 1 << 7;
const UDRIE: u8 = 1 << 5;
const RXEN: u8 = 1 << 4;
const TXEN: u8 = 1 << 3;
const UCSZ2: u8 = 1 << 2;
const RXB8: u8 = 1 << 1;
const TXB8: u8 = 1 << 0;
// UCSRC, shared with UBRRH
const URSEL: u8 = 1 << 7;
const UMSEL: u8 = 1 << 6;
const UPM1: u8 = 1 << 5;
const UPM0: u8 = 1 << 4;
const USBS: u8 = 1 << 3;
const UCSZ1: u8 = 1 << 2;
const UCSZ0: u8 = 1 << 1;
const UCPOL: u8 = 1 << 0;

#[inline(always)]
fn spi_regs() -> &'static atmega32a::spi::RegisterBlock {
    unsafe { &*SPI::ptr() }
}

#[inline(always)]
fn usart_regs() -> &'static atmega32a::usart::RegisterBlock {
    unsafe { &*USART::ptr() }
}

#[inline(always)]
fn portb_regs() -> &'static atmega32a::portb::RegisterBlock {
    unsafe { &*PORTB::ptr() }
}

fn set_ddrb(mask: u8, output: bool) {
    portb_regs().ddrb.modify(|r, w| unsafe {
        if output {
            w.bits(r.bits() | mask)
        } else {
            w.bits(r.bits() & !mask)
        }
    });
}

/// SPI block. The master drives PB4 as slave select.
#[derive(Clone, Copy)]
pub struct Spi {
    _private: (),
}

impl Spi {
    pub fn new(_spi: SPI) -> Self {
        Self { _private: () }
    }

    /// # Safety
    /// Only for interrupt handlers, which share the block with the driver.
    pub unsafe fn steal() -> Self {
        Self { _private: () }
    }

    fn control_bits(config: &spi::Config) -> u8 {
        let mut spcr = SPE;
        if config.bit_order == BitOrder::Lsb {
            spcr |= DORD;
        }
        if config.polarity == Polarity::IdleHigh {
            spcr |= CPOL;
        }
        if config.phase == Phase::CaptureOnSecondTransition {
            spcr |= CPHA;
        }
        spcr
    }
}

impl SpiRegisters for Spi {
    fn enable_slave(&self, config: &spi::Config) {
        set_ddrb(PB_MISO, true);
        set_ddrb(PB_SS | PB_MOSI | PB_SCK, false);
        let spcr = Self::control_bits(config) | SPIE;
        spi_regs().spcr.write(|w| unsafe { w.bits(spcr) });
    }

    fn enable_master(&self, config: &spi::Config) {
        set_ddrb(PB_SS | PB_MOSI | PB_SCK, true);
        set_ddrb(PB_MISO, false);

        let rate = match config.divider {
            ClockDivider::Div4 => 0b00,
            ClockDivider::Div16 => 0b01,
            ClockDivider::Div64 => 0b10,
            ClockDivider::Div128 => 0b11,
        };
        let spcr = Self::control_bits(config) | MSTR | rate;
        spi_regs().spcr.write(|w| unsafe { w.bits(spcr) });

        let spsr = if config.double_speed { SPI2X } else { 0 };
        spi_regs().spsr.write(|w| unsafe { w.bits(spsr) });
    }

    fn disable(&self) {
        spi_regs().spcr.write(|w| unsafe { w.bits(0) });
    }

    fn read_data(&self) -> u8 {
        spi_regs().spdr.read().bits()
    }

    fn write_data(&self, byte: u8) {
        spi_regs().spdr.write(|w| unsafe { w.bits(byte) });
    }

    fn transfer_complete(&self) -> bool {
        spi_regs().spsr.read().bits() & SPIF != 0
    }

    fn select(&self, active: bool) {
        // Active low.
        portb_regs().portb.modify(|r, w| unsafe {
            if active {
                w.bits(r.bits() & !PB_SS)
            } else {
                w.bits(r.bits() | PB_SS)
            }
        });
    }
}

/// USART block.
#[derive(Clone, Copy)]
pub struct Usart {
    _private: (),
}

impl Usart {
    pub fn new(_usart: USART) -> Self {
        Self { _private: () }
    }

    /// # Safety
    /// Only for interrupt handlers, which share the block with the driver.
    pub unsafe fn steal() -> Self {
        Self { _private: () }
    }

    fn modify_ucsrb(set: u8, clear: u8) {
        usart_regs()
            .ucsrb
            .modify(|r, w| unsafe { w.bits((r.bits() & !clear) | set) });
    }
}

impl UartRegisters for Usart {
    fn configure(&self, config: &uart::Config) {
        let regs = usart_regs();

        let ubrr = config.ubrr & 0x0FFF;
        regs.ubrrl.write(|w| unsafe { w.bits(ubrr as u8) });
        // URSEL clear selects UBRRH.
        regs.ucsrc.write(|w| unsafe { w.bits((ubrr >> 8) as u8) });

        let mut ucsrc = URSEL;
        let mut ucsra = 0;

        match config.mode {
            Mode::Asynchronous => {}
            Mode::AsynchronousDoubleSpeed => ucsra |= U2X,
            Mode::SynchronousMaster(polarity) | Mode::SynchronousSlave(polarity) => {
                ucsrc |= UMSEL;
                if polarity == ClockPolarity::TxFallingRxRising {
                    ucsrc |= UCPOL;
                }
                set_ddrb(PB_XCK, matches!(config.mode, Mode::SynchronousMaster(_)));
            }
        }

        if config.stop_bits == StopBits::STOP2 {
            ucsrc |= USBS;
        }

        match config.parity {
            uart::Parity::ParityNone => {}
            uart::Parity::ParityEven => ucsrc |= UPM1,
            uart::Parity::ParityOdd => ucsrc |= UPM1 | UPM0,
        }

        let ucsz2 = match config.data_bits {
            DataBits::DataBits5 => false,
            DataBits::DataBits6 => {
                ucsrc |= UCSZ0;
                false
            }
            DataBits::DataBits7 => {
                ucsrc |= UCSZ1;
                false
            }
            DataBits::DataBits8 => {
                ucsrc |= UCSZ1 | UCSZ0;
                false
            }
            DataBits::DataBits9 => {
                ucsrc |= UCSZ1 | UCSZ0;
                true
            }
        };

        regs.ucsra.write(|w| unsafe { w.bits(ucsra) });
        regs.ucsrc.write(|w| unsafe { w.bits(ucsrc) });
        if ucsz2 {
            Self::modify_ucsrb(UCSZ2, 0);
        } else {
            Self::modify_ucsrb(0, UCSZ2);
        }
    }

    fn set_transmitter(&self, enabled: bool) {
        if enabled {
            Self::modify_ucsrb(TXEN, 0);
        } else {
            Self::modify_ucsrb(0, TXEN);
        }
    }

    fn set_receiver(&self, enabled: bool) {
        if enabled {
            Self::modify_ucsrb(RXEN | RXCIE, 0);
        } else {
            Self::modify_ucsrb(0, RXEN | RXCIE);
        }
    }

    fn set_data_register_empty_interrupt(&self, enabled: bool) {
        if enabled {
            Self::modify_ucsrb(UDRIE, 0);
        } else {
            Self::modify_ucsrb(0, UDRIE);
        }
    }

    fn read_errors(&self) -> FrameErrors {
        let ucsra = usart_regs().ucsra.read().bits();

        let mut errors = FrameErrors::empty();
        errors.set(FrameErrors::PARITY, ucsra & PE != 0);
        errors.set(FrameErrors::DATA_OVERRUN, ucsra & DOR != 0);
        errors.set(FrameErrors::FRAME, ucsra & FE != 0);
        errors
    }

    fn read_data(&self) -> (u8, bool) {
        let regs = usart_regs();
        // RXB8 is only valid until UDR is read.
        let ninth = regs.ucsrb.read().bits() & RXB8 != 0;
        (regs.udr.read().bits(), ninth)
    }

    fn write_data(&self, low: u8, ninth: bool) {
        if ninth {
            Self::modify_ucsrb(TXB8, 0);
        } else {
            Self::modify_ucsrb(0, TXB8);
        }
        usart_regs().udr.write(|w| unsafe { w.bits(low) });
    }
}

/// Bind the SPI and USART vectors to the `State` statics that drive them.
///
/// ```ignore
/// static SPI_STATE: spi::State = spi::State::new();
/// static UART_STATE: uart::State = uart::State::new();
///
/// atmega_serial::bind_interrupts!({
///     SPI_STC => SPI_STATE;
///     USART_RXC => UART_STATE;
///     USART_UDRE => UART_STATE;
/// });
/// ```
#[cfg(feature = "rt")]
#[macro_export]
macro_rules! bind_interrupts {
    ({ $($irq:ident => $state:path;)* }) => {
        $(
            #[$crate::avr::interrupt(atmega32a)]
            fn $irq() {
                $crate::bind_interrupts!(@dispatch $irq, $state);
            }
        )*
    };
    (@dispatch SPI_STC, $state:path) => {
        $state.on_transfer_complete(&unsafe { $crate::avr::Spi::steal() })
    };
    (@dispatch USART_RXC, $state:path) => {
        $state.on_receive_complete(&unsafe { $crate::avr::Usart::steal() })
    };
    (@dispatch USART_UDRE, $state:path) => {
        $state.on_data_register_empty(&unsafe { $crate::avr::Usart::steal() })
    };
}
