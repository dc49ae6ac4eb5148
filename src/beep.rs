//! Beeper (BEEP)
//!
//! Square wave output derived from the LSI through a calibrated divider.

use crate::awu::{LSI_FREQUENCY_MAX, LSI_FREQUENCY_MIN};
use crate::pac::{self, beep};

/// Beeper output frequency selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Frequency {
    /// 1 kHz output.
    F1kHz = 0x00,
    /// 2 kHz output.
    F2kHz = 0x40,
    /// 4 kHz output.
    F4kHz = 0x80,
}

/// Beeper driver.
pub struct Beep {
    rb: *const beep::RegisterBlock,
}

unsafe impl Send for Beep {}

impl Beep {
    /// Takes ownership of the beeper.
    pub fn new(_beep: pac::BEEP) -> Self {
        Beep { rb: pac::BEEP::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const beep::RegisterBlock) -> Self {
        Beep { rb }
    }

    fn rb(&self) -> &beep::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Writes the control register back to its post-reset value.
    pub fn deinit(&mut self) {
        self.rb().csr.write(beep::CSR_RESET);
    }

    /// Selects the output frequency.
    pub fn init(&mut self, frequency: Frequency) {
        self.rb().csr.clear_bits(beep::CSR_BEEPSEL);
        self.rb().csr.set_bits(frequency as u8);
    }

    /// Switches the beeper output on.
    pub fn enable(&mut self) {
        self.rb().csr.set_bits(beep::CSR_BEEPEN);
    }

    /// Switches the beeper output off.
    pub fn disable(&mut self) {
        self.rb().csr.clear_bits(beep::CSR_BEEPEN);
    }

    /// Loads the divider from the measured LSI frequency.
    ///
    /// The divider is `A - 2` or `A - 1` with `A = lsi_khz / 8`, picking
    /// whichever lands closer to an 8 kHz beeper clock.
    pub fn lsi_calibration_config(&mut self, lsi_freq_hz: u32) {
        debug_assert!(
            (LSI_FREQUENCY_MIN..=LSI_FREQUENCY_MAX).contains(&lsi_freq_hz),
            "LSI frequency out of the calibration window"
        );

        let lsi_freq_khz = lsi_freq_hz / 1_000;
        let a = lsi_freq_khz >> 3;
        let div = if 8 * a >= (lsi_freq_khz - 8 * a) * (1 + 2 * a) {
            (a - 2) as u8
        } else {
            (a - 1) as u8
        };
        self.rb().csr.clear_bits(beep::CSR_BEEPDIV);
        self.rb().csr.set_bits(div);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake() -> (&'static beep::RegisterBlock, Beep) {
        let rb: &'static beep::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let beep = unsafe { Beep::from_ptr(rb) };
        (rb, beep)
    }

    #[test]
    fn frequency_field_only() {
        let (rb, mut beep) = fake();
        rb.csr.write(beep::CSR_RESET);
        beep.init(Frequency::F4kHz);
        assert_eq!(rb.csr.read(), 0x9F);
        beep.enable();
        assert_eq!(rb.csr.read(), 0xBF);
        beep.disable();
        assert_eq!(rb.csr.read(), 0x9F);
    }

    #[test]
    fn calibration_for_nominal_lsi() {
        let (rb, mut beep) = fake();
        rb.csr.write(beep::CSR_RESET);
        // 32 kHz -> A = 4, 8*A = 32 >= (32-32)*(1+8) -> divider = 2
        beep.lsi_calibration_config(32_000);
        assert_eq!(rb.csr.read() & beep::CSR_BEEPDIV, 0x02);
    }
}
