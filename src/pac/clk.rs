//! Clock controller register block.

use super::Reg;

/// CLK registers.
#[repr(C)]
pub struct RegisterBlock {
    /// Clock divider register.
    pub ckdivr: Reg,
    _reserved0: [u8; 2],
    /// Peripheral clock gating register.
    pub pckenr: Reg,
    _reserved1: [u8; 1],
    /// Configurable clock output register.
    pub ccor: Reg,
}

/// CKDIVR reset value.
pub const CKDIVR_RESET: u8 = 0x03;
/// PCKENR reset value.
pub const PCKENR_RESET: u8 = 0x00;
/// CCOR reset value.
pub const CCOR_RESET: u8 = 0x00;

/// System clock prescaler field.
pub const CKDIVR_HSIDIV: u8 = 0x03;

/// Configurable clock output source selection field.
pub const CCOR_CCOSEL: u8 = 0x06;
/// Configurable clock output enable bit.
pub const CCOR_CCOEN: u8 = 0x01;
