//! Task trait for interact with user process.
use crate::{KernelError, addressing::Va, syscall::Registers};
use core::ops::Range;

bitflags::bitflags! {
    /// Error code pushed by the processor on a page fault.
    pub struct PFErrorCode: u64 {
        /// The fault was caused by a protection violation on a present page.
        /// If clear, the page was not present.
        const PRESENT = 1 << 0;
        /// The faulting access was a write.
        const WRITE_ACCESS = 1 << 1;
        /// The faulting access happened in user mode.
        const USER = 1 << 2;
    }
}

/// Represents a **task** executed by a thread.
///
/// This trait defines core functionalities required for handling event
/// triggered by user process, such as **system calls**, **page faults**, and
/// the kernel's accesses to the memory of the process.
pub trait Task
where
    Self: Send + Sync,
{
    /// Handles a **system call** triggered by the user program.
    ///
    /// - The `registers` parameter contains the state of the CPU registers at
    ///   the time of the system call.
    /// - Implementations of this function should parse the system call
    ///   arguments, execute the corresponding operation, and store the result
    ///   back in `registers`.
    fn syscall(&self, registers: &mut Registers);

    /// Handles a **page fault** raised at `cr2`.
    ///
    /// - The `ec` parameter provides information about the cause of the page
    ///   fault.
    ///
    /// A fault that cannot be resolved terminates the task.
    fn page_fault(&self, ec: PFErrorCode, cr2: Va);

    /// Validates a given **memory address range** before use.
    ///
    /// - `addr`: The range of virtual addresses being accessed.
    /// - `is_write`: Indicates whether the memory is being **read** (`false`)
    ///   or **written to** (`true`).
    /// - Returns `true` if the whole range is mapped with the required
    ///   permission. This does not trigger demand paging.
    fn access_ok(&self, addr: Range<Va>, is_write: bool) -> bool;

    /// Copies `buf.len()` bytes of user memory at `addr` into `buf`.
    ///
    /// Pages that are not resident are faulted in.
    fn copy_from_user(&self, addr: Va, buf: &mut [u8]) -> Result<(), KernelError>;

    /// Copies `buf` into user memory at `addr`.
    ///
    /// Pages that are not resident are faulted in and marked dirty.
    fn copy_to_user(&self, addr: Va, buf: &[u8]) -> Result<(), KernelError>;
}
