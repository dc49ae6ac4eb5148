//! GPIO port register block (ports A through D, 5-byte stride).

use super::Reg;

/// GPIO registers.
#[repr(C)]
pub struct RegisterBlock {
    /// Output data register.
    pub odr: Reg,
    /// Input data register.
    pub idr: Reg,
    /// Data direction register.
    pub ddr: Reg,
    /// Control register 1 (pull-up / push-pull selection).
    pub cr1: Reg,
    /// Control register 2 (interrupt enable / output speed).
    pub cr2: Reg,
}

/// ODR reset value.
pub const ODR_RESET: u8 = 0x00;
/// DDR reset value.
pub const DDR_RESET: u8 = 0x00;
/// CR1 reset value.
pub const CR1_RESET: u8 = 0x00;
/// CR2 reset value.
pub const CR2_RESET: u8 = 0x00;
