//! # Demand-paged virtual memory.
//!
//! This crate implements the virtual memory of a user process on top of the
//! hosted machine of [`lazyos`]:
//!
//! - A [`Page`] is the unit of virtual memory. Its backing state is one of
//!   [`PageState::Uninit`], [`PageState::Anon`] or [`PageState::File`], and
//!   every page answers the same three operations: `swap_in`, `swap_out` and
//!   `destroy`.
//! - Pages are registered *uninitialized*. Nothing is read and no frame is
//!   allocated until the first access faults; the fault runs the page's
//!   lazy-load routine and converts the page to its final type.
//! - [`MmStruct::do_mmap`] maps a file region as one lazily-loaded page per
//!   4 KiB chunk, and [`MmStruct::do_munmap`] writes dirty pages back and
//!   closes the file.
//! - When physical memory runs out, the faulting address space evicts its
//!   oldest resident page through `swap_out`.
//!
//! All state of one address space lives in an [`MmStruct`]; callers
//! serialize access to it (the process keeps it behind a spinlock).
#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

extern crate alloc;

pub mod anon;
pub mod fault;
pub mod file;
pub mod mm_struct;
pub mod mmap;
pub mod page;
pub mod spt;
pub mod uninit;

pub use mm_struct::MmStruct;
pub use page::{Page, PageState};

/// Identifier of the process that owns an address space.
pub type Pid = u32;

/// The type a page takes once it is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmType {
    /// Memory that is not backed by a file; evicted to swap.
    Anon,
    /// Memory backed by a region of a file; evicted by writing back.
    File,
}
