//! The `uaccess` module provides abstractions for interacting with user-space
//! memory in a kernel context.
//!
//! The types provided by this module include:
//!
//! - [`UserU8SliceRO`]: A one-time, read-only pointer to a slice of `u8` in
//!   user-space.
//! - [`UserU8SliceWO`]: A one-time, write-only pointer to a slice of `u8` in
//!   user-space.
//! - [`UserCString`]: A utility to handle C-style null-terminated strings from
//!   user-space.
//!
//! Every access first checks the range with [`Task::access_ok`] and then
//! copies through [`Task::copy_from_user`] / [`Task::copy_to_user`]. A range
//! that is null, wraps around, leaves user space, or is not mapped with the
//! required permission fails with [`KernelError::BadAddress`] before any
//! byte is touched.
use crate::{KernelError, addressing::Va, task::Task};
use alloc::{string::String, vec, vec::Vec};
use core::ops::Range;

/// Longest string [`UserCString::read`] accepts, including the terminator.
pub const MAX_CSTRING: usize = 4096;

fn user_range(addr: usize, len: usize) -> Result<Range<Va>, KernelError> {
    let end = addr.checked_add(len).ok_or(KernelError::BadAddress)?;
    let start = Va::new(addr).ok_or(KernelError::BadAddress)?;
    let end = Va::user_end(end).ok_or(KernelError::BadAddress)?;
    if start.is_null() || !start.is_user() {
        return Err(KernelError::BadAddress);
    }
    Ok(start..end)
}

/// A one-time, read-only pointer to a slice of `u8` in user-space.
///
/// This struct allows the kernel to safely read from a user-space buffer while
/// preventing TOCTOU attacks by taking ownership of the pointer during
/// operations.
#[derive(PartialEq, PartialOrd, Eq, Ord, Debug)]
pub struct UserU8SliceRO {
    addr: usize,
    len: usize,
}

impl UserU8SliceRO {
    /// Creates a new `UserU8SliceRO` instance with the given user-space address
    /// and length.
    pub fn new(addr: usize, len: usize) -> Self {
        UserU8SliceRO { addr, len }
    }

    /// Reads data from the user-space buffer into a `Vec<u8>`.
    ///
    /// Takes ownership of `self` to prevent TOCTOU attacks.
    ///
    /// Returns `Ok(Vec<u8>)` containing the data if successful, otherwise
    /// `Err(KernelError::BadAddress)`.
    pub fn get(self, task: &(impl Task + ?Sized)) -> Result<Vec<u8>, KernelError> {
        let access_range = user_range(self.addr, self.len)?;
        if !task.access_ok(access_range.clone(), false) {
            return Err(KernelError::BadAddress);
        }
        let mut result = vec![0; self.len];
        task.copy_from_user(access_range.start, &mut result)?;
        Ok(result)
    }
}

/// A one-time, write-only pointer to a slice of `u8` in user-space.
///
/// This struct allows the kernel to safely write to a user-space buffer while
/// preventing TOCTOU attacks by taking ownership of the pointer during
/// operations.
#[derive(PartialEq, PartialOrd, Eq, Ord, Debug)]
pub struct UserU8SliceWO {
    addr: usize,
    len: usize,
}

impl UserU8SliceWO {
    /// Creates a new `UserU8SliceWO` instance with the given user-space address
    /// and length.
    pub fn new(addr: usize, len: usize) -> Self {
        UserU8SliceWO { addr, len }
    }

    /// Writes data from a slice to the user-space buffer.
    ///
    /// Takes ownership of `self` to prevent TOCTOU attacks.
    ///
    /// Returns `Ok(usize)` indicating the number of bytes written, or
    /// `Err(KernelError::BadAddress)` on failure.
    pub fn put(self, task: &(impl Task + ?Sized), other: &[u8]) -> Result<usize, KernelError> {
        let size = self.len.min(other.len());
        let access_range = user_range(self.addr, self.len)?;
        if !task.access_ok(access_range.clone(), true) {
            return Err(KernelError::BadAddress);
        }
        task.copy_to_user(access_range.start, &other[..size])?;
        Ok(size)
    }
}

/// A pointer to a null-terminated C-style string in user-space.
///
/// This struct provides a safe abstraction for reading strings from user-space.
/// It iterates over the bytes until a null-terminator (`0x00`) is encountered,
/// converting the byte sequence into a valid UTF-8 `String`.
#[derive(PartialEq, PartialOrd, Eq, Ord, Debug)]
pub struct UserCString {
    addr: usize,
}

impl UserCString {
    /// Creates a new `UserCString` instance with the given user-space address.
    pub fn new(addr: usize) -> Self {
        Self { addr }
    }

    /// Reads a null-terminated string from the user-space address.
    ///
    /// Returns `Err(KernelError::BadAddress)` if any byte up to the terminator
    /// is not readable, and `Err(KernelError::InvalidArgument)` if the string
    /// is not UTF-8 or longer than [`MAX_CSTRING`].
    pub fn read(self, task: &(impl Task + ?Sized)) -> Result<String, KernelError> {
        let mut ptr = self.addr;
        let mut result = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            let access_range = user_range(ptr, 1)?;
            if !task.access_ok(access_range.clone(), false) {
                return Err(KernelError::BadAddress);
            }
            task.copy_from_user(access_range.start, &mut byte)?;
            match byte[0] {
                0 => {
                    return String::from_utf8(result).map_err(|_| KernelError::InvalidArgument);
                }
                v if result.len() + 1 < MAX_CSTRING => {
                    ptr += 1;
                    result.push(v);
                }
                _ => return Err(KernelError::InvalidArgument),
            }
        }
    }
}
