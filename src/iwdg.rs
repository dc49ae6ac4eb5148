//! Independent watchdog (IWDG)
//!
//! Clocked from the LSI. The key register carries the whole protocol:
//! 0xCC starts the watchdog, 0xAA reloads the downcounter, 0x55 unlocks
//! write access to the prescaler and reload registers.

use crate::hal::watchdog::Watchdog;
use crate::pac::{self, iwdg};

/// Write access keys for PR and RLR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WriteAccess {
    /// Lock PR and RLR.
    Disable = 0x00,
    /// Unlock PR and RLR.
    Enable = 0x55,
}

/// LSI division factor for the downcounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Prescaler {
    /// LSI / 4.
    Div4 = 0x00,
    /// LSI / 8.
    Div8 = 0x01,
    /// LSI / 16.
    Div16 = 0x02,
    /// LSI / 32.
    Div32 = 0x03,
    /// LSI / 64.
    Div64 = 0x04,
    /// LSI / 128.
    Div128 = 0x05,
    /// LSI / 256.
    Div256 = 0x06,
}

/// Independent watchdog driver.
pub struct Iwdg {
    rb: *const iwdg::RegisterBlock,
}

unsafe impl Send for Iwdg {}

impl Iwdg {
    /// Takes ownership of the watchdog.
    pub fn new(_iwdg: pac::IWDG) -> Self {
        Iwdg { rb: pac::IWDG::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const iwdg::RegisterBlock) -> Self {
        Iwdg { rb }
    }

    fn rb(&self) -> &iwdg::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Locks or unlocks write access to PR and RLR.
    pub fn write_access_cmd(&mut self, access: WriteAccess) {
        self.rb().kr.write(access as u8);
    }

    /// Selects the LSI prescaler (requires unlocked write access).
    pub fn set_prescaler(&mut self, prescaler: Prescaler) {
        self.rb().pr.write(prescaler as u8);
    }

    /// Sets the reload value (requires unlocked write access).
    pub fn set_reload(&mut self, reload: u8) {
        self.rb().rlr.write(reload);
    }

    /// Reloads the downcounter from RLR.
    pub fn reload_counter(&mut self) {
        self.rb().kr.write(iwdg::KEY_REFRESH);
    }

    /// Starts the watchdog. Once started it can only be stopped by reset.
    pub fn enable(&mut self) {
        self.rb().kr.write(iwdg::KEY_ENABLE);
    }
}

impl Watchdog for Iwdg {
    fn feed(&mut self) {
        self.reload_counter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_protocol() {
        let rb: &'static iwdg::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let mut wd = unsafe { Iwdg::from_ptr(rb) };
        wd.enable();
        assert_eq!(rb.kr.read(), 0xCC);
        wd.write_access_cmd(WriteAccess::Enable);
        assert_eq!(rb.kr.read(), 0x55);
        wd.set_prescaler(Prescaler::Div64);
        wd.set_reload(0xA0);
        assert_eq!(rb.pr.read(), 0x04);
        assert_eq!(rb.rlr.read(), 0xA0);
        wd.reload_counter();
        assert_eq!(rb.kr.read(), 0xAA);
    }

    #[test]
    fn feed_is_a_refresh() {
        use crate::hal::watchdog::Watchdog;
        let rb: &'static iwdg::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let mut wd = unsafe { Iwdg::from_ptr(rb) };
        wd.feed();
        assert_eq!(rb.kr.read(), 0xAA);
    }
}
