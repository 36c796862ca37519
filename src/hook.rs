//! User code run at the tail of an interrupt handler.

use core::cell::Cell;

use critical_section::Mutex;

/// Optional zero-argument callback mounted on an interrupt.
///
/// An empty hook is a no-op. `register` and `unregister` are the only
/// mutators; the interrupt handler only reads it.
pub struct Hook {
    handler: Mutex<Cell<Option<fn()>>>,
}

impl Hook {
    pub const fn new() -> Self {
        Self {
            handler: Mutex::new(Cell::new(None)),
        }
    }

    /// Mount `handler`, replacing any previous one.
    pub fn register(&self, handler: fn()) {
        critical_section::with(|cs| self.handler.borrow(cs).set(Some(handler)));

        #[cfg(feature = "defmt")]
        defmt::debug!("interrupt hook registered");
    }

    pub fn unregister(&self) {
        critical_section::with(|cs| self.handler.borrow(cs).set(None));

        #[cfg(feature = "defmt")]
        defmt::debug!("interrupt hook removed");
    }

    pub fn is_registered(&self) -> bool {
        critical_section::with(|cs| self.handler.borrow(cs).get().is_some())
    }

    /// Run the mounted handler, if any. The handler runs outside the
    /// critical section.
    pub(crate) fn call(&self) {
        let handler = critical_section::with(|cs| self.handler.borrow(cs).get());
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl Default for Hook {
    fn default() -> Self {
        Self::new()
    }
}
