//! The machine and its configuration.
use crate::{
    fs::{FileSystem, traits},
    mm::{FramePool, swap::SwapTable},
    power::PowerControl,
    teletype::{Console, Teletype},
};
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

/// Every device of the hosted machine.
///
/// A [`System`] is shared by all processes that run on the machine.
pub struct System {
    fs: FileSystem,
    console: Arc<dyn Teletype>,
    frames: FramePool,
    swap: SwapTable,
    power: PowerControl,
    next_pid: AtomicU32,
}

impl System {
    /// The mounted file system.
    pub fn file_system(&self) -> &FileSystem {
        &self.fs
    }

    /// The console.
    pub fn console(&self) -> &dyn Teletype {
        &*self.console
    }

    /// Physical memory.
    pub fn frames(&self) -> &FramePool {
        &self.frames
    }

    /// The swap area.
    pub fn swap(&self) -> &SwapTable {
        &self.swap
    }

    /// Shutdown the machine.
    pub fn power_off(&self) {
        crate::info!("Powering off.");
        self.power.power_off();
    }

    /// Returns `true` once the machine has been shut down.
    pub fn is_halted(&self) -> bool {
        self.power.is_halted()
    }

    /// Allocates a fresh process identifier.
    pub fn allocate_pid(&self) -> u32 {
        self.next_pid.fetch_add(1, Ordering::SeqCst)
    }
}

/// A builder for the [`System`].
///
/// # Example
/// ```ignore
/// let system = SystemConfigurationBuilder::new(MemFs::new())
///     .physical_frames(16)
///     .swap_slots(64)
///     .build();
/// ```
pub struct SystemConfigurationBuilder {
    fs: FileSystem,
    console: Option<Arc<dyn Teletype>>,
    frames: usize,
    swap_slots: usize,
}

impl SystemConfigurationBuilder {
    /// Number of physical frames when not configured.
    pub const DEFAULT_FRAMES: usize = 256;
    /// Number of swap slots when not configured.
    pub const DEFAULT_SWAP_SLOTS: usize = 1024;

    /// Starts the configuration of a machine whose backing store is `fs`.
    pub fn new(fs: impl traits::FileSystem + 'static) -> Self {
        Self {
            fs: FileSystem::new(fs),
            console: None,
            frames: Self::DEFAULT_FRAMES,
            swap_slots: Self::DEFAULT_SWAP_SLOTS,
        }
    }

    /// Sets the number of physical frames.
    pub fn physical_frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    /// Sets the number of page-sized swap slots.
    pub fn swap_slots(mut self, slots: usize) -> Self {
        self.swap_slots = slots;
        self
    }

    /// Attaches `console` as the console. A [`Console`] is attached otherwise.
    pub fn console(mut self, console: Arc<dyn Teletype>) -> Self {
        self.console = Some(console);
        self
    }

    /// Builds the machine.
    pub fn build(self) -> Arc<System> {
        crate::info!(
            "Booting with {} frames and {} swap slots.",
            self.frames,
            self.swap_slots
        );
        Arc::new(System {
            fs: self.fs,
            console: self.console.unwrap_or_else(|| Arc::new(Console::new())),
            frames: FramePool::new(self.frames),
            swap: SwapTable::new(self.swap_slots),
            power: PowerControl::new(),
            next_pid: AtomicU32::new(1),
        })
    }
}
