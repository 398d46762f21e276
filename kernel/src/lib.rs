//! # lazyos: a hosted demand-paging kernel
//!
//! `lazyos` is the machine layer of a small teaching kernel whose virtual
//! memory subsystem populates pages lazily, backs file mappings with real
//! files, and evicts pages to secondary storage under memory pressure.
//!
//! The kernel runs **hosted**: every piece of hardware the memory subsystem
//! talks to is modelled by an ordinary data structure in this crate, so that
//! page faults, dirty bits and eviction are observable from a test:
//!
//! - [`addressing`]: virtual and physical address newtypes.
//! - [`mm`]: physical frames ([`mm::Frame`], [`mm::FramePool`]), the per-process
//!   [`mm::page_table::PageTable`] and the [`mm::swap::SwapTable`].
//! - [`fs`]: the gateway to the backing store (the file system), consumed as
//!   a set of opaque operations.
//! - [`teletype`]: the console that receives `write(1, ..)`.
//! - [`task`] and [`syscall`]: the contract between the trap layer and a user
//!   process, and safe access to user memory.
//!
//! A [`System`] ties these together and is created through a
//! [`SystemConfigurationBuilder`].
//!
//! ## Logging
//!
//! The kernel reports through the [`log`] facade with the [`info!`],
//! [`warning!`] and [`debug!`] macros. The host decides where records go.
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

extern crate alloc;

/// Prints an informational record to the kernel log.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => ($crate::__log::info!($($arg)*));
}

/// Prints a warning record to the kernel log.
#[macro_export]
macro_rules! warning {
    ($($arg:tt)*) => ($crate::__log::warn!($($arg)*));
}

/// Prints a debugging record to the kernel log.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => ($crate::__log::debug!($($arg)*));
}

#[doc(hidden)]
pub use log as __log;

pub mod addressing;
pub mod fs;
pub mod mm;
pub mod power;
pub mod sync;
pub mod syscall;
pub mod task;
pub mod teletype;

mod system;

pub use system::{System, SystemConfigurationBuilder};

/// Represents errors that can occur in the kernel.
///
/// Each variant corresponds to an errno of a UNIX-like kernel. System calls
/// report them to the user through [`KernelError::into_usize`] or through the
/// convention of the system call table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Operation is not permitted. (EPERM)
    OperationNotPermitted,
    /// No such file or directory. (ENOENT)
    NoSuchEntry,
    /// IO Error. (EIO)
    IOError,
    /// BAD file descriptor. (EBADF)
    BadFileDescriptor,
    /// Out of memory. (ENOMEM)
    NoMemory,
    /// Permission denied. (EACCES)
    InvalidAccess,
    /// Bad address. (EFAULT)
    BadAddress,
    /// Device or resource busy. (EBUSY)
    Busy,
    /// File exists. (EEXIST)
    FileExist,
    /// Invalid arguement. (EINVAL)
    InvalidArgument,
    /// Too many open files. (EMFILE)
    TooManyOpenFile,
    /// No space left on device. (ENOSPC)
    NoSpace,
    /// File name too long. (ENAMETOOLONG)
    NameTooLong,
    /// Invalid system call number. (ENOSYS)
    NoSuchSyscall,
    /// Operation is not supported. (ENOTSUPP)
    NotSupportedOperation,
}

impl KernelError {
    /// Converts the [`KernelError`] enum into a corresponding `usize` error
    /// code. The result is cast to `usize` for use as a return value in
    /// system calls.
    pub fn into_usize(self) -> usize {
        (match self {
            KernelError::OperationNotPermitted => -1isize,
            KernelError::NoSuchEntry => -2,
            KernelError::IOError => -5,
            KernelError::BadFileDescriptor => -9,
            KernelError::NoMemory => -12,
            KernelError::InvalidAccess => -13,
            KernelError::BadAddress => -14,
            KernelError::Busy => -16,
            KernelError::FileExist => -17,
            KernelError::InvalidArgument => -22,
            KernelError::TooManyOpenFile => -24,
            KernelError::NoSpace => -28,
            KernelError::NameTooLong => -36,
            KernelError::NoSuchSyscall => -38,
            KernelError::NotSupportedOperation => -524,
        }) as usize
    }
}

/// The given `isize` does not indicate an [`KernelError`].
#[derive(Debug, Eq, PartialEq)]
pub struct TryFromError {
    e: isize,
}

impl TryFrom<isize> for KernelError {
    type Error = TryFromError;

    fn try_from(value: isize) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::OperationNotPermitted),
            -2 => Ok(Self::NoSuchEntry),
            -5 => Ok(Self::IOError),
            -9 => Ok(Self::BadFileDescriptor),
            -12 => Ok(Self::NoMemory),
            -13 => Ok(Self::InvalidAccess),
            -14 => Ok(Self::BadAddress),
            -16 => Ok(Self::Busy),
            -17 => Ok(Self::FileExist),
            -22 => Ok(Self::InvalidArgument),
            -24 => Ok(Self::TooManyOpenFile),
            -28 => Ok(Self::NoSpace),
            -36 => Ok(Self::NameTooLong),
            -38 => Ok(Self::NoSuchSyscall),
            -524 => Ok(Self::NotSupportedOperation),
            e => Err(TryFromError { e }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_roundtrip() {
        for e in [
            KernelError::NoSuchEntry,
            KernelError::BadAddress,
            KernelError::TooManyOpenFile,
            KernelError::NotSupportedOperation,
        ] {
            assert_eq!(KernelError::try_from(e.into_usize() as isize), Ok(e));
        }
        assert_eq!(KernelError::try_from(-3), Err(TryFromError { e: -3 }));
    }
}
