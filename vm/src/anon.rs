//! Anonymous pages.
//!
//! Anonymous memory has no file behind it. Its content lives in the frame
//! while resident and in a slot of the swap area while evicted.
use crate::{
    file::Transmitter,
    page::{PageOperations, PageState},
};
use lazyos::{
    KernelError,
    addressing::Va,
    mm::{
        Frame,
        swap::{SwapSlot, SwapTable},
    },
};

/// The backing state of an anonymous page.
#[derive(Debug, Default)]
pub struct AnonPage {
    slot: Option<SwapSlot>,
}

impl AnonPage {
    /// The swap slot that holds the page, if it is swapped out.
    pub fn slot(&self) -> Option<&SwapSlot> {
        self.slot.as_ref()
    }
}

/// Initializes an anonymous page. The content was already produced by the
/// lazy-load routine, so the transmitter is released.
pub fn anon_initializer(_aux: Option<Transmitter>) -> Result<PageState, KernelError> {
    Ok(PageState::Anon(AnonPage::default()))
}

impl PageOperations for AnonPage {
    fn swap_in(&mut self, _va: Va, frame: &mut Frame, swap: &SwapTable) -> Result<(), KernelError> {
        if let Some(slot) = self.slot.take() {
            if let Err(e) = swap.swap_in(&slot, frame.inner_mut()) {
                self.slot = Some(slot);
                return Err(e);
            }
            swap.free(slot);
        }
        Ok(())
    }

    fn swap_out(
        &mut self,
        va: Va,
        frame: &Frame,
        _dirty: bool,
        swap: &SwapTable,
    ) -> Result<(), KernelError> {
        let slot = swap.swap_out(frame.inner())?;
        lazyos::debug!("{:?} swapped out to slot {}", va, slot.index());
        self.slot = Some(slot);
        Ok(())
    }

    fn destroy(&mut self, swap: &SwapTable) {
        if let Some(slot) = self.slot.take() {
            swap.free(slot);
        }
    }
}
