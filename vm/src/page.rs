//! The virtual page object.
use crate::{Pid, VmType, anon::AnonPage, file::FilePage, uninit::UninitPage};
use lazyos::{
    KernelError,
    addressing::Va,
    mm::{Frame, swap::SwapTable},
};

/// The operations every initialized backing state provides.
///
/// `frame` is the physical frame that holds (or will hold) the content of the
/// page at `va`.
pub trait PageOperations {
    /// Fills `frame` with the content of the page.
    fn swap_in(&mut self, va: Va, frame: &mut Frame, swap: &SwapTable) -> Result<(), KernelError>;

    /// Persists the content of `frame` so that a later
    /// [`swap_in`](Self::swap_in) reproduces it. `dirty` tells whether the
    /// page was written since it was last loaded.
    fn swap_out(
        &mut self,
        va: Va,
        frame: &Frame,
        dirty: bool,
        swap: &SwapTable,
    ) -> Result<(), KernelError>;

    /// Releases the resources the backing state holds.
    fn destroy(&mut self, swap: &SwapTable);
}

/// The backing state of a page.
pub enum PageState {
    /// Registered but never accessed.
    Uninit(UninitPage),
    /// Anonymous memory.
    Anon(AnonPage),
    /// A page of a memory-mapped file.
    File(FilePage),
}

impl PageState {
    /// The type of the page, or the type it will take once initialized.
    pub fn vm_type(&self) -> VmType {
        match self {
            PageState::Uninit(uninit) => uninit.ty(),
            PageState::Anon(_) => VmType::Anon,
            PageState::File(_) => VmType::File,
        }
    }
}

/// A page of virtual memory.
///
/// A page is created [`PageState::Uninit`] and becomes [`PageState::Anon`] or
/// [`PageState::File`] on its first successful [`Page::swap_in`]. The
/// conversion happens once and is never undone.
pub struct Page {
    va: Va,
    writable: bool,
    frame: Option<Frame>,
    state: PageState,
}

impl Page {
    /// Creates a non-resident page at `va` in the uninitialized state.
    pub fn new(va: Va, writable: bool, uninit: UninitPage) -> Self {
        Self {
            va: va.page_down(),
            writable,
            frame: None,
            state: PageState::Uninit(uninit),
        }
    }

    /// The address of the page.
    #[inline]
    pub fn va(&self) -> Va {
        self.va
    }

    /// Returns `true` if user code may write the page.
    #[inline]
    pub fn writable(&self) -> bool {
        self.writable
    }

    /// Returns `true` if the page has a frame.
    #[inline]
    pub fn is_resident(&self) -> bool {
        self.frame.is_some()
    }

    /// The frame that holds the page, if resident.
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// The frame that holds the page, if resident.
    pub fn frame_mut(&mut self) -> Option<&mut Frame> {
        self.frame.as_mut()
    }

    /// The backing state.
    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// For a page of a file mapping, the mapping's start address and the
    /// process that created it.
    pub fn file_mapping(&self) -> Option<(Va, Pid)> {
        match &self.state {
            PageState::File(file) => Some((file.start_addr(), file.owner())),
            PageState::Uninit(uninit) if uninit.ty() == VmType::File => uninit
                .aux()
                .map(|aux| (aux.start_addr, aux.owner)),
            _ => None,
        }
    }

    /// Makes the page resident in `frame`.
    ///
    /// An uninitialized page runs its lazy-load routine and is converted to
    /// its final type. A page that is already resident is left untouched and
    /// `frame` is released.
    ///
    /// On failure `frame` is released and the page keeps its previous state,
    /// so the access can be retried.
    pub fn swap_in(&mut self, mut frame: Frame, swap: &SwapTable) -> Result<(), KernelError> {
        if self.frame.is_some() {
            return Ok(());
        }
        match &mut self.state {
            PageState::Uninit(uninit) => {
                let next = uninit.initialize(&mut frame)?;
                self.state = next;
            }
            PageState::Anon(anon) => anon.swap_in(self.va, &mut frame, swap)?,
            PageState::File(file) => file.swap_in(self.va, &mut frame, swap)?,
        }
        self.frame = Some(frame);
        Ok(())
    }

    /// Persists the page and releases its frame.
    ///
    /// Does nothing if the page is not resident. On failure the page stays
    /// resident.
    pub fn swap_out(&mut self, dirty: bool, swap: &SwapTable) -> Result<(), KernelError> {
        let Some(frame) = self.frame.as_ref() else {
            return Ok(());
        };
        match &mut self.state {
            // Never resident.
            PageState::Uninit(_) => return Err(KernelError::InvalidArgument),
            PageState::Anon(anon) => anon.swap_out(self.va, frame, dirty, swap)?,
            PageState::File(file) => file.swap_out(self.va, frame, dirty, swap)?,
        }
        self.frame = None;
        Ok(())
    }

    /// Destroys the page, releasing its frame and the resources of its
    /// backing state. Nothing is written back.
    pub fn destroy(mut self, swap: &SwapTable) {
        match &mut self.state {
            PageState::Uninit(uninit) => uninit.destroy(),
            PageState::Anon(anon) => anon.destroy(swap),
            PageState::File(file) => file.destroy(swap),
        }
    }
}

impl core::fmt::Debug for Page {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = match self.state {
            PageState::Uninit(_) => "Uninit",
            PageState::Anon(_) => "Anon",
            PageState::File(_) => "File",
        };
        f.debug_struct("Page")
            .field("va", &self.va)
            .field("writable", &self.writable)
            .field("frame", &self.frame)
            .field("state", &state)
            .finish()
    }
}
