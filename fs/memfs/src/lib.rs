//! # In-memory file system.
//!
//! `memfs` keeps every file in memory in a single flat directory. It
//! implements the [`lazyos::fs::traits`] gateway and keeps counters of the
//! traffic it sees (opens, closes, block reads and block writes), which makes
//! it the reference backing store for exercising the virtual memory
//! subsystem.
//!
//! I/O failures can be injected with [`MemFs::set_io_error`].
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use lazyos::{
    KernelError,
    addressing::PAGE_SIZE,
    fs::{FileBlockNumber, InodeNumber, RegularFile, traits},
    sync::SpinLock,
};

/// Maximum length of a file name.
pub const NAME_MAX: usize = 14;

/// Largest file the file system holds, in bytes.
///
/// Creating a larger file, or writing past this size, fails with
/// [`KernelError::NoSpace`].
pub const MAX_FILE_SIZE: usize = 8 << 20;

#[derive(Default)]
struct Shared {
    opens: AtomicUsize,
    closes: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
    io_error: AtomicBool,
}

impl Shared {
    fn check_io(&self) -> Result<(), KernelError> {
        if self.io_error.load(Ordering::SeqCst) {
            Err(KernelError::IOError)
        } else {
            Ok(())
        }
    }
}

struct Inode {
    ino: InodeNumber,
    data: SpinLock<Vec<u8>>,
    shared: Arc<Shared>,
}

impl traits::RegularFile for Inode {
    fn ino(&self) -> InodeNumber {
        self.ino
    }

    fn size(&self) -> usize {
        let data = self.data.lock();
        let size = data.len();
        data.unlock();
        size
    }

    fn read(&self, fba: FileBlockNumber, buf: &mut [u8; PAGE_SIZE]) -> Result<(), KernelError> {
        self.shared.check_io()?;
        self.shared.reads.fetch_add(1, Ordering::SeqCst);
        let data = self.data.lock();
        let start = fba.into_offset().min(data.len());
        let end = (start + PAGE_SIZE).min(data.len());
        buf[..end - start].copy_from_slice(&data[start..end]);
        buf[end - start..].fill(0);
        data.unlock();
        Ok(())
    }

    fn write(
        &self,
        fba: FileBlockNumber,
        buf: &[u8; PAGE_SIZE],
        min_size: usize,
    ) -> Result<(), KernelError> {
        if min_size > MAX_FILE_SIZE {
            return Err(KernelError::NoSpace);
        }
        self.shared.check_io()?;
        self.shared.writes.fetch_add(1, Ordering::SeqCst);
        let mut data = self.data.lock();
        if data.len() < min_size {
            data.resize(min_size, 0);
        }
        let start = fba.into_offset();
        if start < data.len() {
            let end = (start + PAGE_SIZE).min(data.len());
            data[start..end].copy_from_slice(&buf[..end - start]);
        }
        data.unlock();
        Ok(())
    }

    fn open(&self) -> Result<(), KernelError> {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// An in-memory file system.
///
/// Cloning a [`MemFs`] yields another handle to the same files, so a test can
/// keep one handle after mounting another.
#[derive(Clone, Default)]
pub struct MemFs {
    files: Arc<SpinLock<BTreeMap<String, Arc<Inode>>>>,
    next_ino: Arc<AtomicU32>,
    shared: Arc<Shared>,
}

impl MemFs {
    /// Creates an empty file system.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_name(name: &str) -> Result<(), KernelError> {
        if name.is_empty() {
            Err(KernelError::NoSuchEntry)
        } else if name.len() > NAME_MAX {
            Err(KernelError::NameTooLong)
        } else {
            Ok(())
        }
    }

    /// Creates a file called `name` holding `contents`.
    pub fn insert(&self, name: &str, contents: &[u8]) -> Result<(), KernelError> {
        Self::check_name(name)?;
        let mut files = self.files.lock();
        let result = if files.contains_key(name) {
            Err(KernelError::FileExist)
        } else {
            let ino = InodeNumber::new(self.next_ino.fetch_add(1, Ordering::SeqCst) + 1)
                .ok_or(KernelError::NoSpace)?;
            files.insert(
                name.to_string(),
                Arc::new(Inode {
                    ino,
                    data: SpinLock::new(contents.to_vec()),
                    shared: self.shared.clone(),
                }),
            );
            Ok(())
        };
        files.unlock();
        result
    }

    /// Returns a copy of the contents of the file called `name`.
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        let files = self.files.lock();
        let contents = files.get(name).map(|inode| {
            let data = inode.data.lock();
            let v = data.clone();
            data.unlock();
            v
        });
        files.unlock();
        contents
    }

    /// Makes every following block read and write fail with
    /// [`KernelError::IOError`] while `on` holds.
    pub fn set_io_error(&self, on: bool) {
        self.shared.io_error.store(on, Ordering::SeqCst);
    }

    /// Number of open file descriptions created so far.
    pub fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// Number of open file descriptions closed so far.
    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// Number of block reads served so far.
    pub fn reads(&self) -> usize {
        self.shared.reads.load(Ordering::SeqCst)
    }

    /// Number of block writes served so far.
    pub fn writes(&self) -> usize {
        self.shared.writes.load(Ordering::SeqCst)
    }
}

impl traits::FileSystem for MemFs {
    fn open(&self, name: &str) -> Result<RegularFile, KernelError> {
        Self::check_name(name)?;
        let files = self.files.lock();
        let file = files
            .get(name)
            .map(|inode| RegularFile(inode.clone()))
            .ok_or(KernelError::NoSuchEntry);
        files.unlock();
        file
    }

    fn create(&self, name: &str, size: usize) -> Result<(), KernelError> {
        if size > MAX_FILE_SIZE {
            return Err(KernelError::NoSpace);
        }
        self.insert(name, &alloc::vec![0; size])
    }

    fn remove(&self, name: &str) -> Result<(), KernelError> {
        Self::check_name(name)?;
        let mut files = self.files.lock();
        let result = files.remove(name).map(|_| ()).ok_or(KernelError::NoSuchEntry);
        files.unlock();
        result
    }
}
