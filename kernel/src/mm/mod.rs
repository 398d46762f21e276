//! Memory Management.
//!
//! This module implements the physical side of memory management: the frames
//! that back resident user pages, the per-process [`page_table`], and the
//! [`swap`] area that holds evicted anonymous pages.
//!
//! Physical memory is a fixed number of page frames handed out by a
//! [`FramePool`]. A [`Frame`] is owned by exactly one virtual page at a time
//! and is returned to its pool when dropped, so a frame can never be freed
//! twice or leaked by an early return.
use crate::{
    addressing::{PAGE_SHIFT, PAGE_SIZE, Pa},
    sync::SpinLock,
};
use alloc::{boxed::Box, sync::Arc, vec, vec::Vec};

pub mod page_table;
pub mod swap;

/// Physical address of the first frame of the pool.
const FRAME_BASE: usize = 0x10_0000;

/// A physical page frame.
///
/// A [`Frame`] holds [`PAGE_SIZE`] bytes. Newly allocated frames are
/// zero-filled.
pub struct Frame {
    index: usize,
    data: Box<[u8; PAGE_SIZE]>,
    pool: Arc<SpinLock<Arena>>,
}

impl Frame {
    /// Get the physical address of this frame.
    #[inline]
    pub fn pa(&self) -> Pa {
        Pa::from_pfn((FRAME_BASE >> PAGE_SHIFT) + self.index)
    }

    /// Get a reference to the underlying slice of the frame.
    #[inline]
    pub fn inner(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    /// Get a mutable reference to the underlying slice of the frame.
    #[inline]
    pub fn inner_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        let mut arena = self.pool.lock();
        arena.dealloc(self.index);
        arena.unlock();
    }
}

impl core::fmt::Debug for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Frame").field("pa", &self.pa()).finish()
    }
}

// Frame allocator.
struct Arena {
    // 0: used, 1: unused
    bitmap: Vec<u64>,
    capacity: usize,
    free: usize,
}

impl Arena {
    fn new(capacity: usize) -> Self {
        let mut bitmap = vec![u64::MAX; capacity.div_ceil(64)];
        // Pad back.
        for i in capacity..bitmap.len() * 64 {
            bitmap[i / 64] &= !(1 << (i % 64));
        }
        Self {
            bitmap,
            capacity,
            free: capacity,
        }
    }

    fn alloc(&mut self) -> Option<usize> {
        let pos = self.bitmap.iter().position(|qword| *qword != 0)?;
        let ofs = self.bitmap[pos].trailing_zeros() as usize;
        debug_assert_ne!(self.bitmap[pos] & (1 << ofs), 0);
        self.bitmap[pos] &= !(1 << ofs);
        self.free -= 1;
        Some(pos * 64 + ofs)
    }

    fn dealloc(&mut self, index: usize) {
        let (pos, ofs) = (index / 64, index % 64);
        debug_assert_eq!(self.bitmap[pos] & (1 << ofs), 0);
        self.bitmap[pos] |= 1 << ofs;
        self.free += 1;
    }
}

/// The physical memory of the machine.
///
/// Cloning a [`FramePool`] yields another handle to the same memory.
#[derive(Clone)]
pub struct FramePool {
    inner: Arc<SpinLock<Arena>>,
}

impl FramePool {
    /// Creates a physical memory of `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(SpinLock::new(Arena::new(capacity))),
        }
    }

    /// Allocates a zero-filled frame.
    ///
    /// # Returns
    /// - `Some(Frame)`: If a frame is free.
    /// - `None`: If every frame is in use; the caller has to evict a page.
    pub fn alloc(&self) -> Option<Frame> {
        let mut arena = self.inner.lock();
        let index = arena.alloc();
        arena.unlock();
        index.map(|index| Frame {
            index,
            data: Box::new([0; PAGE_SIZE]),
            pool: self.inner.clone(),
        })
    }

    /// Total number of frames.
    pub fn capacity(&self) -> usize {
        let arena = self.inner.lock();
        let capacity = arena.capacity;
        arena.unlock();
        capacity
    }

    /// Number of frames currently not in use.
    pub fn free_frames(&self) -> usize {
        let arena = self.inner.lock();
        let free = arena.free;
        arena.unlock();
        free
    }
}
