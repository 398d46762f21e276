//! # User processes and their system calls.
//!
//! This crate is the boundary between a user program and the kernel. A
//! [`Process`] owns the two per-process tables, the file descriptor table
//! ([`file_struct::FileStruct`]) and the address space
//! ([`lazyos_vm::MmStruct`]), and implements [`lazyos::task::Task`], the
//! entry point of system calls and page faults.
//!
//! A system call goes through four steps:
//!
//! 1. **Dispatch**: the number in `%rax` is decoded into a [`SyscallNumber`].
//! 2. **Validate**: every user pointer is checked before it is dereferenced.
//!    A null or kernel pointer, or a buffer that is not mapped with the
//!    required permission, terminates the process with status -1.
//! 3. **Execute**: the handler runs.
//! 4. **Return**: the result goes back in `%rax`, -1 on failure.
//!
//! Unknown system call numbers terminate the process.
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

extern crate alloc;

pub mod file_struct;
pub mod process;
pub mod syscall;

pub use process::Process;

use num_enum::TryFromPrimitive;

/// System call numbers.
///
/// The numeric values align with the system call table of the user library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(usize)]
pub enum SyscallNumber {
    /// Shuts the machine down.
    Halt = 0,
    /// Terminates the current process.
    Exit = 1,
    /// Clones the current process. Reserved.
    Fork = 2,
    /// Replaces the current program. Reserved.
    Exec = 3,
    /// Waits for a child process. Reserved.
    Wait = 4,
    /// Creates a file.
    Create = 5,
    /// Removes a file.
    Remove = 6,
    /// Opens a file and returns a file descriptor.
    Open = 7,
    /// Returns the size of an open file.
    Filesize = 8,
    /// Reads data from a file descriptor.
    Read = 9,
    /// Writes data to a file descriptor.
    Write = 10,
    /// Moves the file offset of an open file.
    Seek = 11,
    /// Retrieves the current file offset.
    Tell = 12,
    /// Closes an open file descriptor.
    Close = 13,
    /// Maps an open file into memory.
    Mmap = 14,
    /// Removes a file mapping.
    Munmap = 15,
}
