//! Uninitialized pages.
//!
//! Every page starts its life uninitialized. An [`UninitPage`] remembers what
//! the page will become and how to produce its first content, and does so on
//! the first fault.
use crate::{VmType, anon, file, file::Transmitter, page::PageState};
use lazyos::{KernelError, mm::Frame};

/// Produces the first content of a page into a zero-filled frame.
pub type LazyLoad = fn(&mut Frame, Option<&Transmitter>) -> Result<(), KernelError>;

/// Builds the backing state of the initialized page from the transmitter.
pub type PageInitializer = fn(Option<Transmitter>) -> Result<PageState, KernelError>;

/// A page that has not been accessed yet.
pub struct UninitPage {
    ty: VmType,
    init: Option<LazyLoad>,
    aux: Option<Transmitter>,
    page_initializer: PageInitializer,
}

impl UninitPage {
    /// Creates a pending page of type `ty`.
    ///
    /// `init` fills the frame on the first fault. Without it the page starts
    /// zero-filled. `aux` is handed to `init` and then to the initializer of
    /// `ty`.
    pub fn new(ty: VmType, init: Option<LazyLoad>, aux: Option<Transmitter>) -> Self {
        let page_initializer: PageInitializer = match ty {
            VmType::Anon => anon::anon_initializer,
            VmType::File => file::file_backed_initializer,
        };
        Self {
            ty,
            init,
            aux,
            page_initializer,
        }
    }

    /// The type the page takes once initialized.
    pub fn ty(&self) -> VmType {
        self.ty
    }

    /// The pending transmitter.
    pub fn aux(&self) -> Option<&Transmitter> {
        self.aux.as_ref()
    }

    /// Runs the lazy-load routine into `frame` and builds the backing state
    /// of the initialized page.
    ///
    /// The transmitter is consumed only when the routine succeeds; on failure
    /// the page can be initialized again.
    pub fn initialize(&mut self, frame: &mut Frame) -> Result<PageState, KernelError> {
        if let Some(init) = self.init {
            init(frame, self.aux.as_ref())?;
        }
        (self.page_initializer)(self.aux.take())
    }

    /// Releases the pending transmitter.
    pub fn destroy(&mut self) {
        self.aux.take();
    }
}
