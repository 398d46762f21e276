//! Physical and Virtual Memory Addressing Schemes.
//!
//! This module provides abstractions for virtual address and physical
//! address. [`Va`] is an address in the virtual address space of a process,
//! and [`Pa`] names a physical frame handed out by the
//! [`FramePool`](crate::mm::FramePool).
//!
//! Both types support arithmetic operations (addition, subtraction, bitwise
//! operations) so that addresses can be manipulated without casting back and
//! forth to `usize`.
//!
//! ## Example Usage:
//!
//! ```
//! use lazyos::addressing::{Va, PAGE_SIZE};
//!
//! let va = Va::new(0x1000_0123).unwrap();
//! assert_eq!(va.page_down() + PAGE_SIZE, va.page_up());
//! ```

/// The size of a single page in memory, in bytes.
///
/// This constant represents the size of a memory page, which is 4 KiB. It is
/// used to divide memory into pages for allocation, paging, and address
/// translation, and it is the unit of every swap-in and swap-out.
pub const PAGE_SIZE: usize = 0x1000;

/// The shift amount to get the page index from a given address.
pub const PAGE_SHIFT: usize = 12; // 12 bits (log2 of 4 KB)

/// A mask for extracting the offset within a page from a given address.
pub const PAGE_MASK: usize = 0xfff;

/// The first address that does not belong to user space.
///
/// User space is the lower canonical half of the address space. Every
/// address at or above this boundary belongs to the kernel.
pub const USER_TOP: usize = 0x0000_8000_0000_0000;

/// Represents a physical address.
///
/// The `Pa` (Physical Address) struct is a wrapper around the `usize` type,
/// which represents the address of a physical frame.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Pa(usize);

impl Pa {
    /// The physical address `0`.
    pub const ZERO: Self = Self(0);

    /// Creates a new physical address if the address is valid.
    ///
    /// The address must be less than `0xffff_0000_0000_0000`, which ensures
    /// it falls within the valid physical address range.
    #[inline]
    pub const fn new(addr: usize) -> Option<Self> {
        if addr < 0xffff_0000_0000_0000 {
            Some(Self(addr))
        } else {
            None
        }
    }

    /// Returns the address of the page frame number `pfn`.
    #[inline]
    pub const fn from_pfn(pfn: usize) -> Self {
        Self(pfn << PAGE_SHIFT)
    }

    /// Cast the physical address into a raw `usize`.
    #[inline]
    pub const fn into_usize(self) -> usize {
        self.0
    }

    /// Align down the physical address to the page boundary.
    pub const fn page_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Extracts the page offset from the physical address.
    #[inline]
    pub const fn offset(self) -> usize {
        self.0 & PAGE_MASK
    }
}

/// Represents a virtual address.
///
/// The [`Va`] (Virtual Address) struct represents an address in the virtual
/// memory space of a process or of the kernel.
///
/// This abstraction provides utility methods for validation, alignment, and
/// address manipulation, ensuring safe and consistent handling of virtual
/// addresses.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct Va(usize);

impl Va {
    /// Creates a new virtual address if the address is canonical.
    ///
    /// # Returns
    /// - `Some(Va)`: If the address is within the valid virtual memory range.
    /// - `None`: If the address is not canonical.
    ///
    /// # Example
    /// ```
    /// use lazyos::addressing::Va;
    ///
    /// assert!(Va::new(0xFFFF_8000_1234_5678).is_some());
    /// assert!(Va::new(0xFFFF_7000_1234_5678).is_none());
    /// ```
    #[inline(always)]
    pub const fn new(addr: usize) -> Option<Self> {
        match addr & 0xffff_8000_0000_0000 {
            m if m == 0xffff_8000_0000_0000 || m == 0 => Some(Self(addr)),
            _ => None,
        }
    }

    /// Creates the exclusive end of a user range.
    ///
    /// Unlike [`Va::new`], this accepts [`USER_TOP`] itself, so a range can
    /// cover the last byte of user space. Returns `None` above [`USER_TOP`].
    #[inline]
    pub const fn user_end(addr: usize) -> Option<Self> {
        if addr <= USER_TOP {
            Some(Self(addr))
        } else {
            None
        }
    }

    /// Returns the raw `usize` representation of the virtual address.
    #[inline]
    pub const fn into_usize(self) -> usize {
        self.0
    }

    /// Aligns the virtual address down to the nearest page boundary.
    ///
    /// # Example
    /// ```
    /// use lazyos::addressing::Va;
    ///
    /// let va = Va::new(0x1234_5678).unwrap();
    /// assert_eq!(va.page_down().into_usize(), 0x1234_5000);
    /// ```
    #[inline]
    pub const fn page_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Aligns the virtual address up to the nearest page boundary.
    #[inline]
    pub const fn page_up(self) -> Self {
        Self((self.0 + PAGE_MASK) & !PAGE_MASK)
    }

    /// Extracts the offset within the memory page from the virtual address.
    #[inline]
    pub const fn offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Returns `true` if the address is the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the address lies in the user half of the address
    /// space.
    ///
    /// The null address is a user address; callers that treat null as
    /// invalid check [`Va::is_null`] as well.
    #[inline]
    pub const fn is_user(self) -> bool {
        self.0 < USER_TOP
    }

    /// Returns `true` if the address sits on a page boundary.
    #[inline]
    pub const fn is_page_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }
}

macro_rules! impl_arith {
    ($t: ty) => {
        impl core::ops::Add<usize> for $t {
            type Output = Self;

            fn add(self, other: usize) -> Self::Output {
                Self(self.0 + other)
            }
        }
        impl core::ops::AddAssign<usize> for $t {
            fn add_assign(&mut self, other: usize) {
                self.0 = self.0 + other
            }
        }
        impl core::ops::Sub<usize> for $t {
            type Output = Self;

            fn sub(self, other: usize) -> Self::Output {
                Self(self.0 - other)
            }
        }
        impl core::ops::Sub<Self> for $t {
            type Output = usize;

            fn sub(self, other: Self) -> Self::Output {
                self.0 - other.0
            }
        }
        impl core::ops::BitAnd<usize> for $t {
            type Output = Self;

            fn bitand(self, other: usize) -> Self {
                Self(self.0 & other)
            }
        }
    };
}

impl_arith!(Va);
impl_arith!(Pa);

impl core::fmt::Debug for Va {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Va(0x{:x})", self.0)
    }
}
impl core::fmt::Display for Va {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Va(0x{:x})", self.0)
    }
}
impl core::fmt::Debug for Pa {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Pa(0x{:x})", self.0)
    }
}
impl core::fmt::Display for Pa {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Pa(0x{:x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment() {
        let va = Va::new(0x4000_1234).unwrap();
        assert_eq!(va.page_down(), Va::new(0x4000_1000).unwrap());
        assert_eq!(va.page_up(), Va::new(0x4000_2000).unwrap());
        assert_eq!(va.offset(), 0x234);
        assert!(!va.is_page_aligned());
        assert!(va.page_down().is_page_aligned());
        assert_eq!(va.page_up() - va.page_down(), PAGE_SIZE);
    }

    #[test]
    fn user_boundary() {
        assert!(Va::new(0).unwrap().is_null());
        assert!(Va::new(USER_TOP - 1).unwrap().is_user());
        assert!(!Va::new(0xffff_8000_0000_0000).unwrap().is_user());
        assert!(Va::new(USER_TOP).is_none());
        assert_eq!(Va::user_end(USER_TOP).map(Va::into_usize), Some(USER_TOP));
        assert!(Va::user_end(USER_TOP + 1).is_none());
    }
}
