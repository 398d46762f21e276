//! The file descriptor table.
//!
//! Each process keeps a table that maps file descriptors to open files.
//! Descriptors 0 and 1 are the standard input and output; they are handled
//! by the system call layer and never stored in the table. Files opened by
//! the process get descriptors starting at 2.
//!
//! Descriptors are issued in increasing order and are never reused, even
//! after the file is closed. A process can be issued at most [`MAX_FD`]
//! descriptors over its lifetime.
use alloc::collections::BTreeMap;
use lazyos::{
    KernelError,
    fs::{File, FileSystem},
};

/// Upper bound (exclusive) of the descriptors a process can be issued.
pub const MAX_FD: i32 = 128;

/// The file descriptor.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct FileDescriptor(pub i32);

impl FileDescriptor {
    /// Standard input.
    pub const STDIN: FileDescriptor = FileDescriptor(0);
    /// Standard output.
    pub const STDOUT: FileDescriptor = FileDescriptor(1);

    /// Converts a system call argument into a descriptor.
    ///
    /// Arguments that do not fit in an `i32` are kept as an invalid
    /// (negative) descriptor.
    pub fn from_arg(arg: usize) -> Self {
        Self(i32::try_from(arg as isize).unwrap_or(-1))
    }

    /// Returns `true` for the standard input and output.
    pub fn is_stdio(self) -> bool {
        self == Self::STDIN || self == Self::STDOUT
    }
}

/// The file descriptor table of a process.
pub struct FileStruct {
    files: BTreeMap<FileDescriptor, File>,
    next_fd: i32,
}

impl Default for FileStruct {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStruct {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            next_fd: 2,
        }
    }

    /// Installs `file` under a fresh descriptor.
    ///
    /// # Returns
    /// - `Ok(FileDescriptor)`: The descriptor of the file.
    /// - `Err(KernelError::TooManyOpenFile)`: The process ran out of
    ///   descriptors. `file` is closed.
    pub fn install_file(&mut self, file: File) -> Result<FileDescriptor, KernelError> {
        if self.next_fd >= MAX_FD {
            file.close();
            return Err(KernelError::TooManyOpenFile);
        }
        let fd = FileDescriptor(self.next_fd);
        self.next_fd += 1;
        self.files.insert(fd, file);
        Ok(fd)
    }

    /// The open file behind `fd`.
    pub fn get(&self, fd: FileDescriptor) -> Result<&File, KernelError> {
        self.files.get(&fd).ok_or(KernelError::BadFileDescriptor)
    }

    /// The open file behind `fd`.
    pub fn get_mut(&mut self, fd: FileDescriptor) -> Result<&mut File, KernelError> {
        self.files.get_mut(&fd).ok_or(KernelError::BadFileDescriptor)
    }

    /// Opens the file called `name` on `fs`.
    pub fn open(&mut self, fs: &FileSystem, name: &str) -> Result<FileDescriptor, KernelError> {
        let file = fs.open(name)?;
        self.install_file(file)
    }

    /// Size in bytes of the file behind `fd`.
    pub fn filesize(&self, fd: FileDescriptor) -> Result<usize, KernelError> {
        self.get(fd).map(File::length)
    }

    /// Reads from the file behind `fd` at its position.
    pub fn read(&mut self, fd: FileDescriptor, buf: &mut [u8]) -> Result<usize, KernelError> {
        self.get_mut(fd)?.read(buf)
    }

    /// Writes to the file behind `fd` at its position.
    pub fn write(&mut self, fd: FileDescriptor, buf: &[u8]) -> Result<usize, KernelError> {
        self.get_mut(fd)?.write(buf)
    }

    /// Moves the position of `fd`. Does nothing if `fd` is not open.
    pub fn seek(&mut self, fd: FileDescriptor, position: usize) {
        match self.get_mut(fd) {
            Ok(file) => file.seek(position),
            Err(_) => lazyos::debug!("seek on unopened {:?}", fd),
        }
    }

    /// The position of `fd`.
    pub fn tell(&self, fd: FileDescriptor) -> Result<usize, KernelError> {
        self.get(fd).map(File::tell)
    }

    /// Closes `fd`. Does nothing if `fd` is not open.
    pub fn close(&mut self, fd: FileDescriptor) {
        match self.files.remove(&fd) {
            Some(file) => file.close(),
            None => lazyos::debug!("close on unopened {:?}", fd),
        }
    }

    /// Closes every open file.
    pub fn close_all(&mut self) {
        while let Some((_, file)) = self.files.pop_first() {
            file.close();
        }
    }

    /// Number of open files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no file is open.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
