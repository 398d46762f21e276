//! Page table of a user process.
//!
//! The hosted MMU translates a page-aligned [`Va`] through a flat map of
//! [`Pte`]s. Like the x86_64 MMU it records accesses in the entry: every
//! translation sets [`PteFlags::A`] and every store sets [`PteFlags::D`],
//! which is what the eviction path consults to decide on write-back.
use crate::{
    KernelError,
    addressing::{Pa, Va},
};
use alloc::collections::BTreeMap;

bitflags::bitflags! {
    /// Flags for pte.
    pub struct PteFlags: usize {
        /// Present; must be 1 to map a 4-KByte page
        const P = 1 << 0;
        /// Read/write; if 0, writes may not be allowed to the 4-KByte page referenced by this entry
        const RW = 1 << 1;
        /// User/supervisor; if 0, user-mode accesses are not allowed to the 4-KByte page referenced by this entry
        const US = 1 << 2;
        /// Accessed; indicates whether software has accessed the 4-KByte page referenced by this entry
        const A = 1 << 5;
        /// Dirty; indicates whether software has written to the 4-KByte page referenced by this entry
        const D = 1 << 6;
    }
}

bitflags::bitflags! {
    /// Memory access permissions of a mapping.
    pub struct Permission: usize {
        /// Page is readable.
        const READ = 1 << 0;
        /// Page is writable.
        const WRITE = 1 << 1;
        /// Page is executable.
        const EXECUTABLE = 1 << 2;
        /// Page can be referred by user application.
        const USER = 1 << 3;
    }
}

impl From<Permission> for PteFlags {
    fn from(perm: Permission) -> Self {
        let mut flags = PteFlags::P;
        if perm.contains(Permission::WRITE) {
            flags |= PteFlags::RW;
        }
        if perm.contains(Permission::USER) {
            flags |= PteFlags::US;
        }
        flags
    }
}

/// A page table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pte {
    pa: Pa,
    flags: PteFlags,
}

impl Pte {
    /// Physical address of the mapped frame.
    #[inline]
    pub fn pa(&self) -> Pa {
        self.pa
    }

    /// Flags of this entry.
    #[inline]
    pub fn flags(&self) -> PteFlags {
        self.flags
    }

    /// Returns `true` if the page may be written.
    #[inline]
    pub fn is_writable(&self) -> bool {
        self.flags.contains(PteFlags::RW)
    }

    /// Returns `true` if the page was written since it was mapped.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.flags.contains(PteFlags::D)
    }

    /// Records an access through this entry.
    #[inline]
    pub fn touch(&mut self, is_write: bool) {
        self.flags |= PteFlags::A;
        if is_write {
            self.flags |= PteFlags::D;
        }
    }
}

/// A page table.
#[derive(Default)]
pub struct PageTable {
    entries: BTreeMap<Va, Pte>,
}

impl PageTable {
    /// Creates an empty page table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps the page at `va` to the frame at `pa` with permission `perm`.
    ///
    /// # Returns
    /// - `Err(KernelError::InvalidArgument)`: If `va` is not page-aligned.
    /// - `Err(KernelError::Busy)`: If `va` is already mapped.
    pub fn map(&mut self, va: Va, pa: Pa, perm: Permission) -> Result<(), KernelError> {
        if !va.is_page_aligned() {
            return Err(KernelError::InvalidArgument);
        }
        if self.entries.contains_key(&va) {
            return Err(KernelError::Busy);
        }
        self.entries.insert(
            va,
            Pte {
                pa,
                flags: perm.into(),
            },
        );
        Ok(())
    }

    /// Unmaps the page at `va`, returning its last entry.
    pub fn unmap(&mut self, va: Va) -> Result<Pte, KernelError> {
        self.entries
            .remove(&va.page_down())
            .ok_or(KernelError::NoSuchEntry)
    }

    /// Walks the page table and returns the entry that maps `va`.
    pub fn walk(&self, va: Va) -> Option<&Pte> {
        self.entries.get(&va.page_down())
    }

    /// Walks the page table and returns the mutable entry that maps `va`.
    pub fn walk_mut(&mut self, va: Va) -> Option<&mut Pte> {
        self.entries.get_mut(&va.page_down())
    }

    /// Number of present entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
