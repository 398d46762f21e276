//! Memory State of a process.
//!
//! An [`MmStruct`] is the address space of one process: its page table, the
//! supplemental page table that knows every registered page, the file
//! mappings, and the order in which pages became resident (the eviction
//! queue).
//!
//! User memory is reached only through [`MmStruct::copy_from_user`] and
//! [`MmStruct::copy_to_user`], which behave like the MMU: a translation sets
//! the accessed bit, a store sets the dirty bit, and a missing translation
//! raises a page fault that is resolved before the access completes.
use crate::{
    Page, Pid, VmType,
    fault::PageFaultReason,
    file::Transmitter,
    mmap::Mapping,
    spt::SupplementalPageTable,
    uninit::{LazyLoad, UninitPage},
};
use alloc::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
    vec::Vec,
};
use core::ops::Range;
use lazyos::{
    KernelError, System,
    addressing::{PAGE_SIZE, Va},
    mm::{
        Frame,
        page_table::{PageTable, Permission, Pte},
    },
};

/// The address space of a process.
pub struct MmStruct {
    pub(crate) system: Arc<System>,
    pub(crate) owner: Pid,
    pub(crate) page_table: PageTable,
    pub(crate) spt: SupplementalPageTable,
    pub(crate) mappings: BTreeMap<Va, Mapping>,
    pub(crate) resident: VecDeque<Va>,
}

impl MmStruct {
    /// Creates an empty address space for process `owner`.
    pub fn new(system: Arc<System>, owner: Pid) -> Self {
        Self {
            system,
            owner,
            page_table: PageTable::new(),
            spt: SupplementalPageTable::new(),
            mappings: BTreeMap::new(),
            resident: VecDeque::new(),
        }
    }

    /// The process that owns this address space.
    pub fn owner(&self) -> Pid {
        self.owner
    }

    /// The machine.
    pub fn system(&self) -> &Arc<System> {
        &self.system
    }

    /// The page table.
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    /// The supplemental page table.
    pub fn spt(&self) -> &SupplementalPageTable {
        &self.spt
    }

    /// The file mapping that starts at `addr`.
    pub fn mapping(&self, addr: Va) -> Option<&Mapping> {
        self.mappings.get(&addr)
    }

    /// Number of resident pages.
    pub fn resident_pages(&self) -> usize {
        self.spt.iter().filter(|page| page.is_resident()).count()
    }

    /// Inserts a page that was built by the caller.
    ///
    /// If the address is taken the page is handed back.
    pub(crate) fn spt_insert_page(&mut self, page: Page) -> Result<(), Page> {
        self.spt.insert(page)
    }

    /// Registers a pending page of type `ty` at `va`.
    ///
    /// Nothing is loaded and no frame is allocated: on the first fault,
    /// `init` fills the page (or it starts zero-filled) and the page becomes
    /// `ty`. If the page cannot be registered, the transmitter is released
    /// before returning.
    pub fn vm_alloc_page_with_initializer(
        &mut self,
        ty: VmType,
        va: Va,
        writable: bool,
        init: Option<LazyLoad>,
        aux: Option<Transmitter>,
    ) -> Result<(), KernelError> {
        if va.is_null() || !va.is_user() || !va.is_page_aligned() {
            return Err(KernelError::InvalidArgument);
        }
        if ty == VmType::File && aux.is_none() {
            return Err(KernelError::InvalidArgument);
        }
        let page = Page::new(va, writable, UninitPage::new(ty, init, aux));
        self.spt_insert_page(page).map_err(|page| {
            page.destroy(self.system.swap());
            KernelError::Busy
        })
    }

    /// Registers a zero-filled anonymous page at `va`.
    pub fn vm_alloc_page(&mut self, ty: VmType, va: Va, writable: bool) -> Result<(), KernelError> {
        self.vm_alloc_page_with_initializer(ty, va, writable, None, None)
    }

    /// Registers the anonymous pages that cover `[addr, addr + len)`.
    ///
    /// Either every page is registered or none is.
    pub fn map_anon(&mut self, addr: Va, len: usize, writable: bool) -> Result<(), KernelError> {
        let start = addr.page_down();
        let end = (addr + len).page_up();
        let mut va = start;
        while va < end {
            if let Err(e) = self.vm_alloc_page(VmType::Anon, va, writable) {
                let mut undo = start;
                while undo < va {
                    if let Some(page) = self.spt.remove(undo) {
                        page.destroy(self.system.swap());
                    }
                    undo += PAGE_SIZE;
                }
                return Err(e);
            }
            va += PAGE_SIZE;
        }
        Ok(())
    }

    /// Makes the page that contains `va` resident and maps it.
    ///
    /// Evicts a page of this address space when no frame is free.
    pub fn claim_page(&mut self, va: Va) -> Result<(), KernelError> {
        let va = va.page_down();
        match self.spt.find(va) {
            None => return Err(KernelError::BadAddress),
            Some(page) if page.is_resident() => return Ok(()),
            Some(_) => {}
        }
        let frame = self.get_frame()?;
        let page = self.spt.find_mut(va).ok_or(KernelError::BadAddress)?;
        page.swap_in(frame, self.system.swap())?;

        let mut perm = Permission::READ | Permission::USER;
        if page.writable() {
            perm |= Permission::WRITE;
        }
        let pa = page.frame().map(Frame::pa).ok_or(KernelError::NoMemory)?;
        self.page_table.map(va, pa, perm)?;
        self.resident.push_back(va);
        lazyos::debug!("{:?} is now resident at {:?}", va, pa);
        Ok(())
    }

    /// Allocates a frame, evicting the oldest resident page when physical
    /// memory is exhausted.
    fn get_frame(&mut self) -> Result<Frame, KernelError> {
        loop {
            if let Some(frame) = self.system.frames().alloc() {
                return Ok(frame);
            }
            self.evict_one()?;
        }
    }

    fn evict_one(&mut self) -> Result<(), KernelError> {
        while let Some(&va) = self.resident.front() {
            if self.spt.find(va).is_some_and(Page::is_resident) {
                return self.evict(va);
            }
            self.resident.pop_front();
        }
        Err(KernelError::NoMemory)
    }

    /// Evicts the page that contains `va`.
    ///
    /// The page is persisted through its `swap_out` (a dirty file page is
    /// written back, an anonymous page goes to swap), unmapped, and its frame
    /// is freed. Evicting a non-resident page does nothing.
    pub fn evict(&mut self, va: Va) -> Result<(), KernelError> {
        let va = va.page_down();
        let dirty = self.page_table.walk(va).is_some_and(Pte::is_dirty);
        let page = self.spt.find_mut(va).ok_or(KernelError::NoSuchEntry)?;
        if !page.is_resident() {
            return Ok(());
        }
        page.swap_out(dirty, self.system.swap())?;
        self.page_table.unmap(va)?;
        self.resident.retain(|v| *v != va);
        lazyos::debug!("{:?} evicted (dirty: {})", va, dirty);
        Ok(())
    }

    /// Returns `true` if every page of `range` is registered with the
    /// required permission. This does not bring any page in.
    pub fn access_ok(&self, range: Range<Va>, is_write: bool) -> bool {
        if range.start.is_null() || !range.start.is_user() {
            return false;
        }
        let mut va = range.start.page_down();
        while va < range.end {
            match self.spt.find(va) {
                Some(page) if !is_write || page.writable() => {}
                _ => return false,
            }
            va += PAGE_SIZE;
        }
        true
    }

    /// Translates an access to `va` into the frame that backs it, faulting
    /// the page in when it is not resident.
    fn translate(&mut self, va: Va, is_write: bool) -> Result<&mut Frame, KernelError> {
        let page_va = va.page_down();
        let fault = match self.page_table.walk(page_va) {
            Some(pte) if is_write && !pte.is_writable() => Some(true),
            Some(_) => None,
            None => Some(false),
        };
        if let Some(is_present) = fault {
            self.handle_page_fault(&PageFaultReason {
                fault_addr: va,
                is_write_access: is_write,
                is_present,
            })?;
        }
        self.page_table
            .walk_mut(page_va)
            .ok_or(KernelError::BadAddress)?
            .touch(is_write);
        self.spt
            .find_mut(page_va)
            .and_then(Page::frame_mut)
            .ok_or(KernelError::BadAddress)
    }

    /// Reads user memory at `va` into `buf`.
    pub fn copy_from_user(&mut self, va: Va, buf: &mut [u8]) -> Result<(), KernelError> {
        let mut copied = 0;
        while copied < buf.len() {
            let addr = va + copied;
            let ofs = addr.offset();
            let n = (PAGE_SIZE - ofs).min(buf.len() - copied);
            let frame = self.translate(addr, false)?;
            buf[copied..copied + n].copy_from_slice(&frame.inner()[ofs..ofs + n]);
            copied += n;
        }
        Ok(())
    }

    /// Writes `buf` into user memory at `va`.
    pub fn copy_to_user(&mut self, va: Va, buf: &[u8]) -> Result<(), KernelError> {
        let mut copied = 0;
        while copied < buf.len() {
            let addr = va + copied;
            let ofs = addr.offset();
            let n = (PAGE_SIZE - ofs).min(buf.len() - copied);
            let frame = self.translate(addr, true)?;
            frame.inner_mut()[ofs..ofs + n].copy_from_slice(&buf[copied..copied + n]);
            copied += n;
        }
        Ok(())
    }

    /// Tears the address space down.
    ///
    /// Every file mapping is unmapped (writing dirty pages back and closing
    /// the file), then every remaining page is destroyed. Calling it again is
    /// harmless.
    pub fn exit_mmap(&mut self) {
        let starts: Vec<Va> = self.mappings.keys().copied().collect();
        for start in starts {
            if let Err(e) = self.do_munmap(start) {
                lazyos::warning!("munmap of {:?} on exit failed: {:?}", start, e);
            }
        }
        for (va, page) in self.spt.take_all() {
            self.page_table.unmap(va).ok();
            page.destroy(self.system.swap());
        }
        self.resident.clear();
    }
}

impl Drop for MmStruct {
    fn drop(&mut self) {
        self.exit_mmap();
    }
}
