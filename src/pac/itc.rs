//! Interrupt software-priority controller register block.

use super::Reg;

/// ITC registers. Each ISPR packs four 2-bit priority fields.
#[repr(C)]
pub struct RegisterBlock {
    /// Software priority registers 1..=8.
    pub ispr: [Reg; 8],
}

/// Reset value of every software priority register.
pub const ISPR_RESET: u8 = 0xFF;
