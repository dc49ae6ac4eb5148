//! Auto wake-up unit (AWU)
//!
//! Generates a wake-up interrupt from the LSI after a programmable time
//! base. The prescaler buffer is calibrated against the measured LSI
//! frequency (see [`tim::Tim2::compute_lsi_clock_freq`]).
//!
//! [`tim::Tim2::compute_lsi_clock_freq`]: crate::tim::Tim2::compute_lsi_clock_freq

use crate::pac::{self, awu};

/// Lowest LSI frequency accepted for calibration.
pub const LSI_FREQUENCY_MIN: u32 = 25_000;
/// Highest LSI frequency accepted for calibration.
pub const LSI_FREQUENCY_MAX: u32 = 75_000;

/// Wake-up time bases (TBR field values).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Timebase {
    /// No interrupt.
    NoIt = 0,
    /// 250 us.
    T250us = 1,
    /// 500 us.
    T500us = 2,
    /// 1 ms.
    T1ms = 3,
    /// 2 ms.
    T2ms = 4,
    /// 4 ms.
    T4ms = 5,
    /// 8 ms.
    T8ms = 6,
    /// 16 ms.
    T16ms = 7,
    /// 32 ms.
    T32ms = 8,
    /// 64 ms.
    T64ms = 9,
    /// 128 ms.
    T128ms = 10,
    /// 256 ms.
    T256ms = 11,
    /// 512 ms.
    T512ms = 12,
    /// 1 s.
    T1s = 13,
    /// 2 s.
    T2s = 14,
    /// 12 s.
    T12s = 15,
    /// 30 s.
    T30s = 16,
}

/// Auto wake-up driver.
pub struct Awu {
    rb: *const awu::RegisterBlock,
}

unsafe impl Send for Awu {}

impl Awu {
    /// Takes ownership of the AWU.
    pub fn new(_awu: pac::AWU) -> Self {
        Awu { rb: pac::AWU::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const awu::RegisterBlock) -> Self {
        Awu { rb }
    }

    fn rb(&self) -> &awu::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Writes every AWU register back to its post-reset value.
    pub fn deinit(&mut self) {
        let rb = self.rb();
        rb.csr.write(awu::CSR_RESET);
        rb.apr.write(awu::APR_RESET);
        rb.tbr.write(awu::TBR_RESET);
    }

    /// Enables the unit and selects the wake-up time base.
    pub fn init(&mut self, timebase: Timebase) {
        let rb = self.rb();
        rb.csr.set_bits(awu::CSR_AWUEN);
        rb.tbr.clear_bits(awu::TBR_AWUTB);
        rb.tbr.set_bits(timebase as u8);
    }

    /// Enables the auto wake-up function.
    pub fn enable(&mut self) {
        self.rb().csr.set_bits(awu::CSR_AWUEN);
    }

    /// Disables the auto wake-up function.
    pub fn disable(&mut self) {
        self.rb().csr.clear_bits(awu::CSR_AWUEN);
    }

    /// Loads the prescaler buffer from the measured LSI frequency.
    ///
    /// `lsi_freq_hz` must lie in the 25..=75 kHz window guaranteed by the
    /// datasheet.
    pub fn lsi_calibration_config(&mut self, lsi_freq_hz: u32) {
        debug_assert!(
            (LSI_FREQUENCY_MIN..=LSI_FREQUENCY_MAX).contains(&lsi_freq_hz),
            "LSI frequency out of the calibration window"
        );

        let lsi_freq_khz = lsi_freq_hz / 1_000;
        let fa = ((lsi_freq_khz - 25) >> 1) as u8;
        self.rb().apr.clear_bits(awu::APR_APR);
        self.rb().apr.set_bits(fa);
    }

    /// Drops the unit into idle mode: wake-up disabled, no time base.
    pub fn idle_mode_enable(&mut self) {
        self.rb().csr.clear_bits(awu::CSR_AWUEN);
        self.rb().tbr.write(awu::TBR_RESET);
    }

    /// Returns `true` if a wake-up event occurred.
    ///
    /// On hardware the flag is cleared by this very read of CSR.
    pub fn flag_status(&self) -> bool {
        self.rb().csr.bits_set(awu::CSR_AWUF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake() -> (&'static awu::RegisterBlock, Awu) {
        let rb: &'static awu::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let awu = unsafe { Awu::from_ptr(rb) };
        (rb, awu)
    }

    #[test]
    fn init_enables_and_selects_timebase() {
        let (rb, mut awu) = fake();
        rb.tbr.write(0x0F);
        awu.init(Timebase::T2ms);
        assert_eq!(rb.csr.read(), 0x10);
        assert_eq!(rb.tbr.read(), 0x04);
    }

    #[test]
    fn calibration_formula() {
        let (rb, mut awu) = fake();
        rb.apr.write(0x3F);
        // 38 kHz -> (38 - 25) / 2 = 6
        awu.lsi_calibration_config(38_000);
        assert_eq!(rb.apr.read(), 0x06);
    }

    #[test]
    fn idle_mode_clears_enable_and_timebase() {
        let (rb, mut awu) = fake();
        awu.init(Timebase::T30s);
        awu.idle_mode_enable();
        assert_eq!(rb.csr.read(), 0x00);
        assert_eq!(rb.tbr.read(), 0x00);
    }

    #[test]
    fn deinit_restores_reset_values() {
        let (rb, mut awu) = fake();
        rb.csr.write(0x31);
        rb.apr.write(0x00);
        rb.tbr.write(0x0F);
        awu.deinit();
        assert_eq!(rb.csr.read(), 0x00);
        assert_eq!(rb.apr.read(), 0x3F);
        assert_eq!(rb.tbr.read(), 0x00);
    }
}
