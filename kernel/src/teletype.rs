//! A teletype (TTY) interface for character-based I/O.
//!
//! This module provides a trait [`Teletype`] that defines an interface for
//! reading from and writing to a teletype device. The [`Console`] struct
//! implements this interface by recording everything written to it, which
//! is how the hosted kernel exposes standard output.
use crate::{KernelError, sync::SpinLock};
use alloc::{string::String, vec::Vec};

/// The `Teletype` trait represents a generic character-based input/output
/// device.
///
/// Implementations of this trait define methods for:
/// - Writing data to the teletype (`write`)
/// - Reading data from the teletype (`read`)
pub trait Teletype
where
    Self: Send + Sync,
{
    /// Writes data to the teletype.
    ///
    /// # Returns
    /// - `Ok(usize)`: The number of bytes successfully written.
    /// - `Err(KernelError)`: If the write operation failed.
    fn write(&self, data: &[u8]) -> Result<usize, KernelError>;

    /// Reads data from the teletype.
    ///
    /// # Returns
    /// - `Ok(usize)`: The number of bytes successfully read.
    /// - `Err(KernelError)`: If the read operation failed.
    fn read(&self, data: &mut [u8]) -> Result<usize, KernelError>;
}

/// A console that keeps a transcript of its output.
///
/// Each complete line is also forwarded to the kernel log.
#[derive(Default)]
pub struct Console {
    output: SpinLock<Vec<u8>>,
}

impl Console {
    /// Creates an empty console.
    pub const fn new() -> Self {
        Self {
            output: SpinLock::new(Vec::new()),
        }
    }

    /// Returns everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        let output = self.output.lock();
        let s = String::from_utf8_lossy(&output).into_owned();
        output.unlock();
        s
    }
}

impl Teletype for Console {
    fn write(&self, data: &[u8]) -> Result<usize, KernelError> {
        let mut output = self.output.lock();
        output.extend_from_slice(data);
        output.unlock();
        for line in data.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
            crate::debug!("[console] {}", String::from_utf8_lossy(line));
        }
        Ok(data.len())
    }

    /// The console has no keyboard attached.
    fn read(&self, _data: &mut [u8]) -> Result<usize, KernelError> {
        Err(KernelError::NotSupportedOperation)
    }
}
