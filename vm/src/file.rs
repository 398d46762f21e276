//! Memory-backed file pages.
//!
//! A file-backed page mirrors `read_bytes` bytes of a file at offset `ofs`;
//! the remaining `zero_bytes` of the page read as zero and are never written
//! back. The open file is shared by every page of one mapping and is closed
//! by the mapping, not by the pages.
use crate::{
    Pid,
    page::{PageOperations, PageState},
};
use alloc::sync::Arc;
use lazyos::{
    KernelError,
    addressing::{PAGE_SIZE, Va},
    fs::File,
    mm::{Frame, swap::SwapTable},
};

/// Everything the first fault of a lazily loaded page needs to know.
///
/// A transmitter is created for one page, moved into that page when it is
/// registered, and consumed by the page's initializer. It is never copied.
pub struct Transmitter {
    /// The file to read from.
    pub file: Arc<File>,
    /// Offset in the file of the first byte of the page.
    pub ofs: usize,
    /// Bytes to read from the file.
    pub read_bytes: usize,
    /// Bytes to fill with zero after the read bytes.
    pub zero_bytes: usize,
    /// Start of the mapping the page belongs to.
    pub start_addr: Va,
    /// Bytes of the file covered by the mapping.
    pub size: usize,
    /// The process that created the mapping.
    pub owner: Pid,
}

/// The backing state of a file-backed page.
pub struct FilePage {
    file: Arc<File>,
    ofs: usize,
    read_bytes: usize,
    zero_bytes: usize,
    start_addr: Va,
    size: usize,
    owner: Pid,
}

impl FilePage {
    /// The mapped file.
    pub fn file(&self) -> &Arc<File> {
        &self.file
    }

    /// Offset in the file of the first byte of the page.
    pub fn ofs(&self) -> usize {
        self.ofs
    }

    /// Bytes of the page that come from the file.
    pub fn read_bytes(&self) -> usize {
        self.read_bytes
    }

    /// Bytes of the page that are zero-filled.
    pub fn zero_bytes(&self) -> usize {
        self.zero_bytes
    }

    /// Start of the mapping the page belongs to.
    pub fn start_addr(&self) -> Va {
        self.start_addr
    }

    /// Bytes of the file covered by the mapping.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The process that created the mapping.
    pub fn owner(&self) -> Pid {
        self.owner
    }
}

/// Initializes a file-backed page from its transmitter.
pub fn file_backed_initializer(aux: Option<Transmitter>) -> Result<PageState, KernelError> {
    let aux = aux.ok_or(KernelError::InvalidArgument)?;
    debug_assert_eq!(aux.read_bytes + aux.zero_bytes, PAGE_SIZE);
    Ok(PageState::File(FilePage {
        file: aux.file,
        ofs: aux.ofs,
        read_bytes: aux.read_bytes,
        zero_bytes: aux.zero_bytes,
        start_addr: aux.start_addr,
        size: aux.size,
        owner: aux.owner,
    }))
}

/// Loads a page of a file segment: `read_bytes` bytes of the file at `ofs`,
/// followed by `zero_bytes` zeros.
pub fn lazy_load_segment(frame: &mut Frame, aux: Option<&Transmitter>) -> Result<(), KernelError> {
    let aux = aux.ok_or(KernelError::InvalidArgument)?;
    read_segment(frame, &aux.file, aux.ofs, aux.read_bytes)
}

fn read_segment(
    frame: &mut Frame,
    file: &File,
    ofs: usize,
    read_bytes: usize,
) -> Result<(), KernelError> {
    let page = frame.inner_mut();
    if file.read_at(ofs, &mut page[..read_bytes])? != read_bytes {
        // The file shrank under the mapping.
        return Err(KernelError::IOError);
    }
    page[read_bytes..].fill(0);
    Ok(())
}

impl PageOperations for FilePage {
    fn swap_in(&mut self, _va: Va, frame: &mut Frame, _swap: &SwapTable) -> Result<(), KernelError> {
        read_segment(frame, &self.file, self.ofs, self.read_bytes)
    }

    fn swap_out(
        &mut self,
        va: Va,
        frame: &Frame,
        dirty: bool,
        _swap: &SwapTable,
    ) -> Result<(), KernelError> {
        if dirty {
            lazyos::debug!("{:?} written back at offset {:#x}", va, self.ofs);
            let written = self
                .file
                .write_at(self.ofs, &frame.inner()[..self.read_bytes])?;
            if written != self.read_bytes {
                return Err(KernelError::IOError);
            }
        }
        Ok(())
    }

    /// The file itself stays open; it belongs to the mapping.
    fn destroy(&mut self, _swap: &SwapTable) {}
}
