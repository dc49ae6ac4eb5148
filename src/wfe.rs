//! Wait-for-event controller (WFE)
//!
//! Selects which interrupt sources wake the core from the WFE low-power
//! state as events. The source encoding packs the control register index
//! in the high byte and the bit mask in the low byte.

use crate::pac::{self, wfe};

/// Wake-up event sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Source {
    /// TIM2 update/trigger/break event.
    Tim2Ev0 = 0x0101,
    /// TIM2 capture/compare event.
    Tim2Ev1 = 0x0102,
    /// External interrupt event 0.
    ExtiEv0 = 0x0110,
    /// External interrupt event 1.
    ExtiEv1 = 0x0120,
    /// External interrupt event 2.
    ExtiEv2 = 0x0140,
    /// External interrupt event 3.
    ExtiEv3 = 0x0180,
    /// External interrupt event 4.
    ExtiEv4 = 0x0201,
    /// External interrupt event 5.
    ExtiEv5 = 0x0202,
    /// External interrupt event 6.
    ExtiEv6 = 0x0204,
    /// External interrupt event 7.
    ExtiEv7 = 0x0208,
    /// External interrupt event on port B.
    ExtiEvB = 0x0210,
    /// External interrupt event on port D.
    ExtiEvD = 0x0220,
}

/// Wait-for-event controller driver.
pub struct Wfe {
    rb: *const wfe::RegisterBlock,
}

unsafe impl Send for Wfe {}

impl Wfe {
    /// Takes ownership of the WFE controller.
    pub fn new(_wfe: pac::WFE) -> Self {
        Wfe { rb: pac::WFE::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const wfe::RegisterBlock) -> Self {
        Wfe { rb }
    }

    fn rb(&self) -> &wfe::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Writes both control registers back to their post-reset value.
    pub fn deinit(&mut self) {
        self.rb().cr1.write(wfe::CR1_RESET);
        self.rb().cr2.write(wfe::CR2_RESET);
    }

    /// Enables or disables a wake-up event source.
    pub fn wakeup_source_cmd(&mut self, source: Source, on: bool) {
        let index = (source as u16) >> 8;
        let mask = source as u16 as u8;
        let reg = match index {
            1 => &self.rb().cr1,
            _ => &self.rb().cr2,
        };
        if on {
            reg.set_bits(mask);
        } else {
            reg.clear_bits(mask);
        }
    }

    /// Returns `true` if the given source is enabled as a wake-up event.
    pub fn wakeup_source_status(&self, source: Source) -> bool {
        let index = (source as u16) >> 8;
        let mask = source as u16 as u8;
        match index {
            1 => self.rb().cr1.bits_set(mask),
            _ => self.rb().cr2.bits_set(mask),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake() -> (&'static wfe::RegisterBlock, Wfe) {
        let rb: &'static wfe::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let wfe = unsafe { Wfe::from_ptr(rb) };
        (rb, wfe)
    }

    #[test]
    fn sources_route_to_their_register() {
        let (rb, mut wfe) = fake();
        wfe.wakeup_source_cmd(Source::Tim2Ev1, true);
        assert_eq!(rb.cr1.read(), 0x02);
        assert_eq!(rb.cr2.read(), 0x00);
        wfe.wakeup_source_cmd(Source::ExtiEvD, true);
        assert_eq!(rb.cr2.read(), 0x20);
        assert!(wfe.wakeup_source_status(Source::Tim2Ev1));
        wfe.wakeup_source_cmd(Source::Tim2Ev1, false);
        assert!(!wfe.wakeup_source_status(Source::Tim2Ev1));
        assert_eq!(rb.cr2.read(), 0x20);
    }
}
