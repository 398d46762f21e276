//! Supplemental page table.
//!
//! The hardware page table only knows resident pages. The supplemental page
//! table knows every page of the address space, resident or not, and is what
//! the fault handler consults to find out how to bring a page in.
use crate::Page;
use alloc::collections::BTreeMap;
use lazyos::addressing::Va;

/// Every page of an address space, keyed by page address.
#[derive(Default)]
pub struct SupplementalPageTable {
    pages: BTreeMap<Va, Page>,
}

impl SupplementalPageTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the page that contains `va`.
    pub fn find(&self, va: Va) -> Option<&Page> {
        self.pages.get(&va.page_down())
    }

    /// Finds the page that contains `va`.
    pub fn find_mut(&mut self, va: Va) -> Option<&mut Page> {
        self.pages.get_mut(&va.page_down())
    }

    /// Inserts `page`.
    ///
    /// If its address is taken, the page is handed back to the caller, which
    /// is responsible for releasing it.
    pub fn insert(&mut self, page: Page) -> Result<(), Page> {
        if self.pages.contains_key(&page.va()) {
            return Err(page);
        }
        self.pages.insert(page.va(), page);
        Ok(())
    }

    /// Removes the page that contains `va`.
    pub fn remove(&mut self, va: Va) -> Option<Page> {
        self.pages.remove(&va.page_down())
    }

    /// Removes every page.
    pub fn take_all(&mut self) -> BTreeMap<Va, Page> {
        core::mem::take(&mut self.pages)
    }

    /// Iterates over the pages in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    /// Number of pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` if the table holds no page.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
