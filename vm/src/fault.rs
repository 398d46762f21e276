//! Page fault handling.
//!
//! A fault on a page that is registered in the supplemental page table but
//! not resident is a *demand paging* fault: the page is brought in and the
//! access is retried. Every other fault is a segmentation fault.
use crate::MmStruct;
use lazyos::{KernelError, addressing::Va, task::PFErrorCode};

/// Represents the reason for a page fault in a virtual memory system.
///
/// This struct is used to capture various details about a page fault, including
/// the faulting address, the type of access that caused the fault (read or
/// write).
#[derive(Debug, Clone, Copy)]
pub struct PageFaultReason {
    /// The address that caused the page fault.
    pub fault_addr: Va,

    /// Indicates whether the fault was due to a write access.
    pub is_write_access: bool,

    /// Indicates whether the page that caused the fault is present in memory.
    ///
    /// A value of `true` means that the fault occurred due to a protection
    /// violation. A value of `false` means the page is not present in memory.
    pub is_present: bool,
}

impl PageFaultReason {
    /// Probe the cause of page fault into a [`PageFaultReason`].
    ///
    /// This function decodes a hardware-provided [`PFErrorCode`] into a
    /// structured [`PageFaultReason`] that the kernel can interpret.
    pub fn new(ec: PFErrorCode, cr2: Va) -> Self {
        PageFaultReason {
            fault_addr: cr2,
            is_write_access: ec.contains(PFErrorCode::WRITE_ACCESS),
            is_present: ec.contains(PFErrorCode::PRESENT),
        }
    }

    /// Returns `true` if the fault is due to **demand paging**.
    #[inline]
    pub fn is_demand_paging_fault(&self) -> bool {
        !self.is_present
    }
}

impl MmStruct {
    /// Handles a **page fault** on this address space.
    ///
    /// # Returns
    /// - `Ok(())`: The page is now resident; the access can be retried.
    /// - `Err(KernelError::BadAddress)`: No page is registered at the faulting
    ///   address, or it is not a user address.
    /// - `Err(KernelError::InvalidAccess)`: A write to a read-only page, or a
    ///   protection violation on a present page.
    /// - Any error of bringing the page in (out of memory, I/O error).
    pub fn handle_page_fault(&mut self, reason: &PageFaultReason) -> Result<(), KernelError> {
        let va = reason.fault_addr;
        if va.is_null() || !va.is_user() {
            return Err(KernelError::BadAddress);
        }
        if !reason.is_demand_paging_fault() {
            return Err(KernelError::InvalidAccess);
        }
        let page = self.spt().find(va).ok_or(KernelError::BadAddress)?;
        if reason.is_write_access && !page.writable() {
            return Err(KernelError::InvalidAccess);
        }
        self.claim_page(va)
    }
}
