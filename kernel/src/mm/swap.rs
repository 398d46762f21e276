//! Swap area.
//!
//! The swap area is a disk partition divided into page-sized slots. An
//! anonymous page that is evicted is written into a free slot and the slot is
//! handed to the page as a [`SwapSlot`]; the page gives the slot back when it
//! is swapped in again or destroyed.
use crate::{KernelError, addressing::PAGE_SIZE, sync::SpinLock};
use alloc::{boxed::Box, vec::Vec};

/// Size of a disk sector in bytes.
pub const SECTOR_SIZE: usize = 512;

/// Number of sectors that hold one page.
pub const SECTORS_PER_PAGE: usize = PAGE_SIZE / SECTOR_SIZE;

/// A slot of the swap area that currently holds the content of one page.
///
/// A slot is owned by exactly one page, so this type is neither `Clone` nor
/// `Copy`.
#[derive(Debug, PartialEq, Eq)]
pub struct SwapSlot(usize);

impl SwapSlot {
    /// Index of the slot.
    pub fn index(&self) -> usize {
        self.0
    }

    /// First sector of the slot on the swap disk.
    pub fn first_sector(&self) -> usize {
        self.0 * SECTORS_PER_PAGE
    }
}

/// The swap area.
pub struct SwapTable {
    slots: SpinLock<Vec<Option<Box<[u8; PAGE_SIZE]>>>>,
}

impl SwapTable {
    /// Creates a swap area of `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots: SpinLock::new(slots),
        }
    }

    /// Writes `data` into a free slot.
    ///
    /// # Returns
    /// - `Ok(SwapSlot)`: The slot that now holds `data`.
    /// - `Err(KernelError::NoSpace)`: If the swap area is full.
    pub fn swap_out(&self, data: &[u8; PAGE_SIZE]) -> Result<SwapSlot, KernelError> {
        let mut slots = self.slots.lock();
        let result = match slots.iter().position(Option::is_none) {
            Some(index) => {
                slots[index] = Some(Box::new(*data));
                Ok(SwapSlot(index))
            }
            None => Err(KernelError::NoSpace),
        };
        slots.unlock();
        result
    }

    /// Reads the content of `slot` into `buf`.
    ///
    /// The slot stays allocated; it is released by [`SwapTable::free`].
    pub fn swap_in(&self, slot: &SwapSlot, buf: &mut [u8; PAGE_SIZE]) -> Result<(), KernelError> {
        let slots = self.slots.lock();
        let result = match slots.get(slot.0) {
            Some(Some(data)) => {
                buf.copy_from_slice(&data[..]);
                Ok(())
            }
            _ => Err(KernelError::IOError),
        };
        slots.unlock();
        result
    }

    /// Releases `slot`.
    pub fn free(&self, slot: SwapSlot) {
        let mut slots = self.slots.lock();
        if let Some(entry) = slots.get_mut(slot.0) {
            *entry = None;
        }
        slots.unlock();
    }

    /// Number of slots in use.
    pub fn used(&self) -> usize {
        let slots = self.slots.lock();
        let used = slots.iter().filter(|s| s.is_some()).count();
        slots.unlock();
        used
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        let slots = self.slots.lock();
        let capacity = slots.len();
        slots.unlock();
        capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_lifecycle() {
        let swap = SwapTable::new(2);
        let mut page = [0u8; PAGE_SIZE];
        page[..5].copy_from_slice(b"hello");
        let a = swap.swap_out(&page).unwrap();
        let b = swap.swap_out(&[1; PAGE_SIZE]).unwrap();
        assert_eq!(swap.swap_out(&page), Err(KernelError::NoSpace));
        assert_eq!(b.first_sector(), SECTORS_PER_PAGE);

        let mut buf = [0u8; PAGE_SIZE];
        swap.swap_in(&a, &mut buf).unwrap();
        assert_eq!(&buf[..5], b"hello");
        assert_eq!(swap.used(), 2);

        swap.free(a);
        assert_eq!(swap.used(), 1);
        assert_eq!(swap.swap_out(&page).map(|s| s.index()), Ok(0));
    }
}
