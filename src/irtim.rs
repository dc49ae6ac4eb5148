//! Infrared interface (IRTIM)
//!
//! Gates the modulated timer outputs onto the IR pin and optionally
//! enables the high-sink open-drain buffer behind it.

use crate::pac::{self, irtim};

/// Infrared interface driver.
pub struct Irtim {
    rb: *const irtim::RegisterBlock,
}

unsafe impl Send for Irtim {}

impl Irtim {
    /// Takes ownership of the IR interface.
    pub fn new(_irtim: pac::IRTIM) -> Self {
        Irtim { rb: pac::IRTIM::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const irtim::RegisterBlock) -> Self {
        Irtim { rb }
    }

    fn rb(&self) -> &irtim::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Writes the control register back to its post-reset value.
    pub fn deinit(&mut self) {
        self.rb().cr.write(irtim::CR_RESET);
    }

    /// Enables the IR output.
    pub fn enable(&mut self) {
        self.rb().cr.set_bits(irtim::CR_EN);
    }

    /// Disables the IR output.
    pub fn disable(&mut self) {
        self.rb().cr.clear_bits(irtim::CR_EN);
    }

    /// Enables or disables the high-sink open-drain output buffer.
    pub fn high_sink_od_cmd(&mut self, on: bool) {
        if on {
            self.rb().cr.set_bits(irtim::CR_HSEN);
        } else {
            self.rb().cr.clear_bits(irtim::CR_HSEN);
        }
    }

    /// Returns `true` if the IR output is enabled.
    pub fn is_enabled(&self) -> bool {
        self.rb().cr.bits_set(irtim::CR_EN)
    }

    /// Returns `true` if the high-sink open-drain buffer is enabled.
    pub fn is_high_sink_od_enabled(&self) -> bool {
        self.rb().cr.bits_set(irtim::CR_HSEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_bits_round_trip() {
        let rb: &'static irtim::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let mut ir = unsafe { Irtim::from_ptr(rb) };
        ir.enable();
        ir.high_sink_od_cmd(true);
        assert_eq!(rb.cr.read(), 0x03);
        assert!(ir.is_enabled());
        assert!(ir.is_high_sink_od_enabled());
        ir.high_sink_od_cmd(false);
        ir.disable();
        assert_eq!(rb.cr.read(), 0x00);
    }
}
