//! Reset controller register block.

use super::Reg;

/// RST registers.
#[repr(C)]
pub struct RegisterBlock {
    /// Reset pin configuration register.
    pub cr: Reg,
    /// Reset status register (rc_w1 flags).
    pub sr: Reg,
}

/// CR reset value.
pub const CR_RESET: u8 = 0x00;
/// SR reset value (power-on flag set out of reset).
pub const SR_RESET: u8 = 0x01;

/// SWIM reset flag.
pub const SR_SWIMF: u8 = 0x08;
/// Illegal opcode reset flag.
pub const SR_ILLOPF: u8 = 0x04;
/// Independent watchdog reset flag.
pub const SR_IWDGF: u8 = 0x02;
/// Power-on reset flag.
pub const SR_PORF: u8 = 0x01;

/// Key enabling the reset pad as a general purpose output.
pub const CR_GPOUT_KEY: u8 = 0xD0;
