//! Memory-mapped files.
//!
//! [`MmStruct::do_mmap`] splits a file region into page-sized chunks and
//! registers one lazily loaded file page per chunk. With
//! `read_size = min(length, file_length - offset)`, chunk `i` reads
//! `min(PAGE_SIZE, read_size - i * PAGE_SIZE)` bytes of the file and is
//! zero-filled past them, so the bytes of the file show up at
//! `[addr, addr + read_size)` and `[addr + read_size, addr + length)` reads
//! as zero.
//!
//! Every page of a mapping shares the open file of the mapping. The mapping
//! closes it once, in [`MmStruct::do_munmap`].
use crate::{
    MmStruct, Page, VmType,
    file::{Transmitter, lazy_load_segment},
    uninit::UninitPage,
};
use alloc::sync::Arc;
use lazyos::{
    KernelError,
    addressing::{PAGE_SIZE, USER_TOP, Va},
    fs::File,
    mm::page_table::Pte,
};

/// A file mapping.
pub struct Mapping {
    start: Va,
    length: usize,
    page_count: usize,
    writable: bool,
    file: Arc<File>,
}

impl Mapping {
    /// The first address of the mapping.
    pub fn start(&self) -> Va {
        self.start
    }

    /// Requested length in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Number of pages of the mapping.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Returns `true` if the mapping may be written.
    pub fn writable(&self) -> bool {
        self.writable
    }

    /// The open file shared by the pages of the mapping.
    pub fn file(&self) -> &Arc<File> {
        &self.file
    }
}

impl MmStruct {
    /// Maps `length` bytes of `file`, starting at `offset`, at `addr`.
    ///
    /// The mapping takes ownership of `file` and closes it when it is
    /// unmapped; if the mapping cannot be created, `file` is closed before
    /// returning.
    ///
    /// # Returns
    /// - `Ok(addr)`: Every page is registered. Nothing is read yet.
    /// - `Err(KernelError::InvalidArgument)`: `addr` is null or not
    ///   page-aligned, `length` is zero, `offset` is not page-aligned, or the
    ///   range leaves user space.
    /// - `Err(KernelError::Busy)`: A page of the range is already in use.
    ///   Pages registered by this call are removed again.
    pub fn do_mmap(
        &mut self,
        addr: Va,
        length: usize,
        writable: bool,
        file: File,
        offset: usize,
    ) -> Result<Va, KernelError> {
        if addr.is_null() || !addr.is_page_aligned() || length == 0 || offset % PAGE_SIZE != 0 {
            return Err(KernelError::InvalidArgument);
        }
        match addr.into_usize().checked_add(length) {
            Some(end) if end <= USER_TOP => {}
            _ => return Err(KernelError::InvalidArgument),
        }

        let file = Arc::new(file);
        let read_size = length.min(file.length().saturating_sub(offset));
        let page_count = length.div_ceil(PAGE_SIZE);
        let mut remain = read_size;
        let mut ofs = offset;
        for i in 0..page_count {
            let read_bytes = remain.min(PAGE_SIZE);
            let aux = Transmitter {
                file: file.clone(),
                ofs,
                read_bytes,
                zero_bytes: PAGE_SIZE - read_bytes,
                start_addr: addr,
                size: read_size,
                owner: self.owner,
            };
            let page = Page::new(
                addr + i * PAGE_SIZE,
                writable,
                UninitPage::new(VmType::File, Some(lazy_load_segment), Some(aux)),
            );
            if let Err(page) = self.spt_insert_page(page) {
                lazyos::debug!("mmap at {:?} overlaps {:?}", addr, page.va());
                page.destroy(self.system.swap());
                for j in 0..i {
                    if let Some(page) = self.spt.remove(addr + j * PAGE_SIZE) {
                        page.destroy(self.system.swap());
                    }
                }
                if let Some(file) = Arc::into_inner(file) {
                    file.close();
                }
                return Err(KernelError::Busy);
            }
            ofs += read_bytes;
            remain -= read_bytes;
        }

        lazyos::debug!(
            "mmap {:?}: {} pages, {} bytes from offset {:#x}",
            addr,
            page_count,
            read_size,
            offset
        );
        self.mappings.insert(
            addr,
            Mapping {
                start: addr,
                length,
                page_count,
                writable,
                file,
            },
        );
        Ok(addr)
    }

    /// Unmaps the mapping that starts at `addr`.
    ///
    /// Resident pages that were written are written back to the file; then
    /// every page is destroyed and unmapped, and the file of the mapping is
    /// closed. A page whose write-back fails is still destroyed; the first
    /// such error is returned once the whole mapping is gone.
    ///
    /// # Returns
    /// - `Err(KernelError::InvalidArgument)`: No mapping starts at `addr`.
    ///   Nothing is changed.
    pub fn do_munmap(&mut self, addr: Va) -> Result<(), KernelError> {
        let mapping = self
            .mappings
            .remove(&addr)
            .ok_or(KernelError::InvalidArgument)?;
        let mut result = Ok(());
        for i in 0..mapping.page_count {
            let va = addr + i * PAGE_SIZE;
            let belongs = self
                .spt
                .find(va)
                .and_then(Page::file_mapping)
                .is_some_and(|(start, owner)| start == addr && owner == self.owner);
            if !belongs {
                continue;
            }
            let dirty = self.page_table.walk(va).is_some_and(Pte::is_dirty);
            let Some(mut page) = self.spt.remove(va) else {
                continue;
            };
            if page.is_resident() && page.writable() && dirty {
                if let Err(e) = page.swap_out(true, self.system.swap()) {
                    lazyos::warning!("write-back of {:?} failed: {:?}", va, e);
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
            self.page_table.unmap(va).ok();
            page.destroy(self.system.swap());
        }
        let end = addr + mapping.page_count * PAGE_SIZE;
        self.resident.retain(|va| !(addr..end).contains(va));

        match Arc::into_inner(mapping.file) {
            Some(file) => file.close(),
            None => lazyos::warning!("file of the mapping at {:?} is still shared", addr),
        }
        lazyos::debug!("munmap {:?}", addr);
        result
    }
}
