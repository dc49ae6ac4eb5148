//! Wait-for-event controller register block.

use super::Reg;

/// WFE registers.
#[repr(C)]
pub struct RegisterBlock {
    /// Wake-up event control register 1.
    pub cr1: Reg,
    /// Wake-up event control register 2.
    pub cr2: Reg,
}

/// CR1 reset value.
pub const CR1_RESET: u8 = 0x00;
/// CR2 reset value.
pub const CR2_RESET: u8 = 0x00;
