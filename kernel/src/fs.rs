//! Filesystem abstraction.
//!
//! The kernel treats the file system as the backing store of file-mapped
//! memory and of the file system calls. It only consumes the operations
//! defined in [`traits`]; the on-disk layout is up to the implementation.
//!
//! Three handle types are layered on top of the traits:
//! - [`FileSystem`]: the mounted file system (`open`, `create`, `remove`).
//! - [`RegularFile`]: a reference-counted handle to a file's inode with
//!   positionless, byte-granular `read`/`write`.
//! - [`File`]: an *open file description*. It owns a position, and every
//!   [`File`] is closed exactly once, when it is dropped.
use crate::{KernelError, addressing::PAGE_SIZE};
use alloc::{boxed::Box, sync::Arc};
use core::num::NonZeroU32;

/// Defines traits for file system operations.
pub mod traits {
    use super::{FileBlockNumber, InodeNumber};
    use crate::{KernelError, addressing::PAGE_SIZE};

    /// Trait representing a filesystem.
    ///
    /// Files live in a single flat namespace.
    pub trait FileSystem
    where
        Self: Sync + Send,
    {
        /// Looks up the file called `name`.
        ///
        /// # Returns
        /// - `Ok(RegularFile)`: A handle to the file's inode.
        /// - `Err(KernelError::NoSuchEntry)`: If no such file exists.
        fn open(&self, name: &str) -> Result<super::RegularFile, KernelError>;

        /// Creates a file called `name` of `size` zero bytes.
        fn create(&self, name: &str, size: usize) -> Result<(), KernelError>;

        /// Removes the file called `name`.
        ///
        /// Open handles to a removed file stay usable.
        fn remove(&self, name: &str) -> Result<(), KernelError>;
    }

    /// Trait representing a regular file in the filesystem.
    ///
    /// A regular file contains user data and supports basic read and write
    /// operations in units of 4096-byte blocks.
    pub trait RegularFile
    where
        Self: Send + Sync,
    {
        /// Returns the inode number of the file.
        fn ino(&self) -> InodeNumber;

        /// Returns the size of the file in bytes.
        fn size(&self) -> usize;

        /// Reads the block `fba` of the file into `buf`.
        ///
        /// Bytes past the end of the file read as zero.
        fn read(&self, fba: FileBlockNumber, buf: &mut [u8; PAGE_SIZE]) -> Result<(), KernelError>;

        /// Writes a 4096-byte page of data into the specified file block.
        ///
        /// If the target block lies beyond the current end of the file, the
        /// file is extended up to `min_size` bytes to accommodate the write.
        fn write(
            &self,
            fba: FileBlockNumber,
            buf: &[u8; PAGE_SIZE],
            min_size: usize,
        ) -> Result<(), KernelError>;

        /// Notifies the file that a new open file description refers to it.
        fn open(&self) -> Result<(), KernelError> {
            Ok(())
        }

        /// Notifies the file that an open file description referring to it
        /// was closed.
        fn close(&self) {}
    }
}

/// The mounted file system.
#[derive(Clone)]
pub struct FileSystem(Arc<dyn traits::FileSystem>);

impl FileSystem {
    /// Mounts `fs`.
    pub fn new(fs: impl traits::FileSystem + 'static) -> Self {
        Self(Arc::new(fs))
    }

    /// Opens the file called `name`, returning a new open file description
    /// positioned at the start of the file.
    pub fn open(&self, name: &str) -> Result<File, KernelError> {
        File::open(self.0.open(name)?)
    }

    /// Creates a file called `name` with `size` zero bytes.
    pub fn create(&self, name: &str, size: usize) -> Result<(), KernelError> {
        self.0.create(name, size)
    }

    /// Removes the file called `name`.
    pub fn remove(&self, name: &str) -> Result<(), KernelError> {
        self.0.remove(name)
    }
}

/// A handle to a regular file.
///
/// This struct provides a reference-counted handle to a file that supports
/// reading and writing operations at the kernel level.
#[derive(Clone)]
pub struct RegularFile(pub Arc<dyn traits::RegularFile>);

impl RegularFile {
    /// Creates a new [`RegularFile`] handle from a given implementation of
    /// [`traits::RegularFile`].
    pub fn new(r: impl traits::RegularFile + 'static) -> Self {
        Self(Arc::new(r))
    }

    /// Inode number of the file.
    pub fn ino(&self) -> InodeNumber {
        self.0.ino()
    }

    /// Returns the size of the file in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.0.size()
    }

    /// Reads data from the file at `position` into the provided buffer.
    ///
    /// # Returns
    /// - `Ok(usize)`: The number of bytes read. This is short only when the
    ///   end of the file is reached, and 0 when `position` is at or past it.
    /// - `Err(Error)`: An error if the read operation fails.
    pub fn read(&self, mut position: usize, buf: &mut [u8]) -> Result<usize, KernelError> {
        let max_read = self
            .size()
            .min(position.saturating_add(buf.len()))
            .saturating_sub(position);
        if max_read == 0 {
            return Ok(0);
        }
        let mut bounce_buffer = Box::new([0; PAGE_SIZE]);
        let mut read_bytes = 0;
        let first_segment = position % PAGE_SIZE;
        if first_segment != 0 && max_read != 0 {
            self.0.read(
                FileBlockNumber::from_offset(position),
                &mut bounce_buffer,
            )?;
            read_bytes += (PAGE_SIZE - first_segment).min(max_read);
            buf[..read_bytes]
                .copy_from_slice(&bounce_buffer[first_segment..first_segment + read_bytes]);
            position += read_bytes;
        }

        for i in (read_bytes..max_read).step_by(PAGE_SIZE) {
            self.0
                .read(FileBlockNumber::from_offset(position), &mut bounce_buffer)?;
            let remainder = (max_read - i).min(PAGE_SIZE);
            buf[i..i + remainder].copy_from_slice(&bounce_buffer[..remainder]);
            position += remainder;
            read_bytes += remainder;
        }
        Ok(read_bytes)
    }

    /// Writes data from the buffer into the file at `position`.
    ///
    /// If the write position is beyond the current file size, file will be
    /// extended to minimum size required to reflect the update.
    ///
    /// # Returns
    /// - `Ok(usize)`: The number of bytes written.
    /// - `Err(KernelError::InvalidArgument)`: If the write would end past
    ///   `usize::MAX`.
    /// - `Err(Error)`: An error if the write operation fails.
    pub fn write(&self, mut position: usize, buf: &[u8]) -> Result<usize, KernelError> {
        position
            .checked_add(buf.len())
            .ok_or(KernelError::InvalidArgument)?;
        let mut bounce_buffer = Box::new([0; PAGE_SIZE]);
        let mut write_bytes = 0;
        while write_bytes < buf.len() {
            let fba = FileBlockNumber::from_offset(position);
            let in_block = position % PAGE_SIZE;
            let chunk = (PAGE_SIZE - in_block).min(buf.len() - write_bytes);
            if chunk != PAGE_SIZE {
                // Partial block; merge with what is already there.
                self.0.read(fba, &mut bounce_buffer)?;
            }
            bounce_buffer[in_block..in_block + chunk]
                .copy_from_slice(&buf[write_bytes..write_bytes + chunk]);
            self.0.write(fba, &bounce_buffer, position + chunk)?;
            position += chunk;
            write_bytes += chunk;
        }
        Ok(write_bytes)
    }
}

/// An open file description.
///
/// A [`File`] couples a [`RegularFile`] with a position. Independent opens of
/// the same file have independent positions. The description is closed when
/// the [`File`] is dropped, so it is closed exactly once.
pub struct File {
    file: RegularFile,
    position: usize,
}

impl File {
    /// Opens a new description of `file`, positioned at offset 0.
    pub fn open(file: RegularFile) -> Result<Self, KernelError> {
        file.0.open()?;
        Ok(Self { file, position: 0 })
    }

    /// Opens a new, independent description of the same file.
    ///
    /// The returned [`File`] starts at offset 0 and must be closed
    /// separately.
    pub fn reopen(&self) -> Result<Self, KernelError> {
        Self::open(self.file.clone())
    }

    /// Closes the description.
    pub fn close(self) {
        crate::debug!("close ino {}", self.file.ino().into_u32());
    }

    /// Inode number of the file.
    pub fn ino(&self) -> InodeNumber {
        self.file.ino()
    }

    /// Returns the length of the file in bytes.
    pub fn length(&self) -> usize {
        self.file.size()
    }

    /// Reads from the current position and advances it by the number of
    /// bytes read.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, KernelError> {
        let read_bytes = self.file.read(self.position, buf)?;
        self.position += read_bytes;
        Ok(read_bytes)
    }

    /// Writes at the current position and advances it by the number of
    /// bytes written.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, KernelError> {
        let write_bytes = self.file.write(self.position, buf)?;
        self.position += write_bytes;
        Ok(write_bytes)
    }

    /// Reads at `position` without touching the current position.
    pub fn read_at(&self, position: usize, buf: &mut [u8]) -> Result<usize, KernelError> {
        self.file.read(position, buf)
    }

    /// Writes at `position` without touching the current position.
    pub fn write_at(&self, position: usize, buf: &[u8]) -> Result<usize, KernelError> {
        self.file.write(position, buf)
    }

    /// Moves the current position to `position`.
    ///
    /// Seeking past the end of the file is allowed; a later read returns 0
    /// bytes and a later write extends the file.
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Returns the current position.
    pub fn tell(&self) -> usize {
        self.position
    }
}

impl Drop for File {
    fn drop(&mut self) {
        self.file.0.close();
    }
}

/// Represents a unique identifier for an inode in the filesystem.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct InodeNumber(NonZeroU32);

impl InodeNumber {
    /// Creates a [`InodeNumber`] if the given value is not zero.
    pub const fn new(n: u32) -> Option<Self> {
        if let Some(v) = NonZeroU32::new(n) {
            Some(Self(v))
        } else {
            None
        }
    }

    /// Returns the contained value as a u32.
    #[inline]
    pub fn into_u32(&self) -> u32 {
        self.0.get()
    }
}

/// Represents a file block number within a file.
///
/// Each block contains 4096 bytes of contents.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct FileBlockNumber(pub usize);

impl FileBlockNumber {
    /// Returns the block that contains the byte at `offset`.
    #[inline]
    pub const fn from_offset(offset: usize) -> Self {
        Self(offset / PAGE_SIZE)
    }

    /// Returns the byte offset of the first byte of this block.
    #[inline]
    pub const fn into_offset(self) -> usize {
        self.0 * PAGE_SIZE
    }
}
