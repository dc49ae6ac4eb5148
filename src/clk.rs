//! Clock controller (CLK)
//!
//! The STM8L101 runs from the 16 MHz HSI oscillator divided by a
//! configurable prescaler; every other peripheral clock is gated through
//! `PCKENR`. [`Clk::clock_freq`] is consumed by the I2C and USART drivers
//! to derive their timing divisors.

use crate::pac::{self, clk};
use crate::time::Hertz;

/// Typical HSI oscillator frequency.
pub const HSI_VALUE: Hertz = Hertz::from_raw(16_000_000);
/// Typical LSI oscillator frequency.
pub const LSI_VALUE: Hertz = Hertz::from_raw(32_000);

/// Peripherals with a gateable clock (one `PCKENR` bit each).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Peripheral {
    /// TIM2 clock.
    Tim2 = 0x01,
    /// TIM3 clock.
    Tim3 = 0x02,
    /// TIM4 clock.
    Tim4 = 0x04,
    /// I2C clock.
    I2c = 0x08,
    /// SPI clock.
    Spi = 0x10,
    /// USART clock.
    Usart = 0x20,
    /// AWU clock.
    Awu = 0x40,
}

/// Source selection for the configurable clock output pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CcoSource {
    /// Master clock.
    ClockMaster = 0x00,
    /// Master clock divided by 2.
    ClockMasterDiv2 = 0x02,
    /// Master clock divided by 4.
    ClockMasterDiv4 = 0x04,
    /// Master clock divided by 16.
    ClockMasterDiv16 = 0x06,
}

/// HSI prescaler feeding the master clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MasterPrescaler {
    /// HSI not divided.
    HsiDiv1 = 0x00,
    /// HSI divided by 2.
    HsiDiv2 = 0x01,
    /// HSI divided by 4.
    HsiDiv4 = 0x02,
    /// HSI divided by 8.
    HsiDiv8 = 0x03,
}

/// HSI divider factors indexed by the CKDIVR field.
const HSI_DIV_FACTOR: [u32; 4] = [1, 2, 4, 8];

/// Clock controller driver.
pub struct Clk {
    rb: *const clk::RegisterBlock,
}

unsafe impl Send for Clk {}

impl Clk {
    /// Takes ownership of the clock controller.
    pub fn new(_clk: pac::CLK) -> Self {
        Clk { rb: pac::CLK::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const clk::RegisterBlock) -> Self {
        Clk { rb }
    }

    fn rb(&self) -> &clk::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Writes every CLK register back to its post-reset value.
    pub fn deinit(&mut self) {
        let rb = self.rb();
        rb.ckdivr.write(clk::CKDIVR_RESET);
        rb.pckenr.write(clk::PCKENR_RESET);
        rb.ccor.write(clk::CCOR_RESET);
    }

    /// Enables or disables the configurable clock output.
    pub fn cco_cmd(&mut self, on: bool) {
        if on {
            self.rb().ccor.set_bits(clk::CCOR_CCOEN);
        } else {
            self.rb().ccor.clear_bits(clk::CCOR_CCOEN);
        }
    }

    /// Gates the clock of the given peripheral on or off.
    pub fn peripheral_clock_config(&mut self, peripheral: Peripheral, on: bool) {
        if on {
            self.rb().pckenr.set_bits(peripheral as u8);
        } else {
            self.rb().pckenr.clear_bits(peripheral as u8);
        }
    }

    /// Configures the HSI master clock divider.
    pub fn master_prescaler_config(&mut self, prescaler: MasterPrescaler) {
        self.rb().ckdivr.clear_bits(clk::CKDIVR_HSIDIV);
        self.rb().ckdivr.write(prescaler as u8);
    }

    /// Routes the selected clock to the CCO pin and enables the output.
    ///
    /// The I/O assigned to CCO must already be configured as a push-pull
    /// output.
    pub fn cco_config(&mut self, source: CcoSource) {
        let ccor = &self.rb().ccor;
        ccor.clear_bits(clk::CCOR_CCOSEL);
        ccor.set_bits(source as u8);
        ccor.set_bits(clk::CCOR_CCOEN);
    }

    /// Returns the master clock frequency.
    pub fn clock_freq(&self) -> Hertz {
        let div = (self.rb().ckdivr.read() & clk::CKDIVR_HSIDIV) as usize;
        Hertz::from_raw(HSI_VALUE.raw() / HSI_DIV_FACTOR[div])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake() -> (&'static clk::RegisterBlock, Clk) {
        let rb: &'static clk::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let clk = unsafe { Clk::from_ptr(rb) };
        (rb, clk)
    }

    #[test]
    fn deinit_restores_reset_values() {
        let (rb, mut clk) = fake();
        rb.ckdivr.write(0x01);
        rb.pckenr.write(0xFF);
        rb.ccor.write(0x07);
        clk.deinit();
        assert_eq!(rb.ckdivr.read(), 0x03);
        assert_eq!(rb.pckenr.read(), 0x00);
        assert_eq!(rb.ccor.read(), 0x00);
    }

    #[test]
    fn peripheral_gating_touches_only_requested_bit() {
        let (rb, mut clk) = fake();
        rb.pckenr.write(0x81);
        clk.peripheral_clock_config(Peripheral::Usart, true);
        assert_eq!(rb.pckenr.read(), 0xA1);
        clk.peripheral_clock_config(Peripheral::Usart, false);
        assert_eq!(rb.pckenr.read(), 0x81);
    }

    #[test]
    fn clock_freq_follows_divider() {
        let (rb, clk) = fake();
        rb.ckdivr.write(0x00);
        assert_eq!(clk.clock_freq().raw(), 16_000_000);
        rb.ckdivr.write(0x03);
        assert_eq!(clk.clock_freq().raw(), 2_000_000);
    }

    #[test]
    fn cco_config_selects_and_enables() {
        let (rb, mut clk) = fake();
        clk.cco_config(CcoSource::ClockMasterDiv16);
        assert_eq!(rb.ccor.read(), 0x07);
        clk.cco_cmd(false);
        assert_eq!(rb.ccor.read(), 0x06);
    }
}
