//! Reset controller (RST)

use crate::pac::{self, rst};

/// Reset source flags (write 1 to clear).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Flag {
    /// Power-on / power-down reset.
    PorPdr = 0x01,
    /// Independent watchdog reset.
    Iwdg = 0x02,
    /// Illegal opcode reset.
    Illop = 0x04,
    /// SWIM reset.
    Swim = 0x08,
}

/// Reset controller driver.
pub struct Rst {
    rb: *const rst::RegisterBlock,
}

unsafe impl Send for Rst {}

impl Rst {
    /// Takes ownership of the reset controller.
    pub fn new(_rst: pac::RST) -> Self {
        Rst { rb: pac::RST::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const rst::RegisterBlock) -> Self {
        Rst { rb }
    }

    fn rb(&self) -> &rst::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Returns `true` if the given reset source flag is set.
    pub fn flag_status(&self, flag: Flag) -> bool {
        self.rb().sr.bits_set(flag as u8)
    }

    /// Clears the given reset source flag.
    pub fn clear_flag(&mut self, flag: Flag) {
        self.rb().sr.write(flag as u8);
    }

    /// Reassigns the reset pad as a general purpose output.
    ///
    /// Irreversible until the next power-on reset.
    pub fn gp_output_enable(&mut self) {
        self.rb().cr.write(rst::CR_GPOUT_KEY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_writes_only_target_flag() {
        let rb: &'static rst::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let mut rst = unsafe { Rst::from_ptr(rb) };
        rb.sr.write(0x0F);
        assert!(rst.flag_status(Flag::Illop));
        rst.clear_flag(Flag::Illop);
        // rc_w1 semantics: the driver writes exactly the selected bit.
        assert_eq!(rb.sr.read(), 0x04);
    }

    #[test]
    fn gp_output_uses_documented_key() {
        let rb: &'static rst::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let mut rst = unsafe { Rst::from_ptr(rb) };
        rst.gp_output_enable();
        assert_eq!(rb.cr.read(), 0xD0);
    }
}
