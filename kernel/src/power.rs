//! Modules for system power operations.
//!
//! The hosted machine cannot really turn itself off. Powering off latches a
//! flag that the owner of the [`System`](crate::System) observes; after that
//! no user process runs again.
use core::sync::atomic::{AtomicBool, Ordering};

/// The power switch of the machine.
#[derive(Default)]
pub struct PowerControl {
    halted: AtomicBool,
}

impl PowerControl {
    /// Creates a switch in the powered-on position.
    pub const fn new() -> Self {
        Self {
            halted: AtomicBool::new(false),
        }
    }

    /// Shutdown the machine.
    pub fn power_off(&self) {
        self.halted.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once the machine has been shut down.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }
}
