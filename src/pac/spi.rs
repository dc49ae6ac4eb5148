//! Serial peripheral interface register block.

use super::Reg;

/// SPI registers.
#[repr(C)]
pub struct RegisterBlock {
    /// Control register 1.
    pub cr1: Reg,
    /// Control register 2.
    pub cr2: Reg,
    /// Interrupt control register.
    pub icr: Reg,
    /// Status register.
    pub sr: Reg,
    /// Data register.
    pub dr: Reg,
}

/// CR1 reset value.
pub const CR1_RESET: u8 = 0x00;
/// CR2 reset value.
pub const CR2_RESET: u8 = 0x00;
/// ICR reset value.
pub const ICR_RESET: u8 = 0x00;
/// SR reset value (TXE set out of reset).
pub const SR_RESET: u8 = 0x02;
/// DR reset value.
pub const DR_RESET: u8 = 0x00;

/// Frame format bit.
pub const CR1_LSBFIRST: u8 = 0x80;
/// Peripheral enable bit.
pub const CR1_SPE: u8 = 0x40;
/// Baud rate control field.
pub const CR1_BR: u8 = 0x38;
/// Master selection bit.
pub const CR1_MSTR: u8 = 0x04;
/// Clock polarity bit.
pub const CR1_CPOL: u8 = 0x02;
/// Clock phase bit.
pub const CR1_CPHA: u8 = 0x01;

/// Bidirectional data mode enable bit.
pub const CR2_BDM: u8 = 0x80;
/// Output enable in bidirectional mode.
pub const CR2_BDOE: u8 = 0x40;
/// Receive-only bit.
pub const CR2_RXONLY: u8 = 0x04;
/// Software slave management bit.
pub const CR2_SSM: u8 = 0x02;
/// Internal slave select bit.
pub const CR2_SSI: u8 = 0x01;

/// TX buffer empty interrupt enable.
pub const ICR_TXIE: u8 = 0x80;
/// RX buffer not empty interrupt enable.
pub const ICR_RXIE: u8 = 0x40;
/// Error interrupt enable.
pub const ICR_ERRIE: u8 = 0x20;
/// Wake-up interrupt enable.
pub const ICR_WKIE: u8 = 0x10;

/// Busy flag.
pub const SR_BSY: u8 = 0x80;
/// Overrun flag.
pub const SR_OVR: u8 = 0x40;
/// Mode fault flag.
pub const SR_MODF: u8 = 0x20;
/// Wake-up flag.
pub const SR_WKUP: u8 = 0x08;
/// Transmit buffer empty flag.
pub const SR_TXE: u8 = 0x02;
/// Receive buffer not empty flag.
pub const SR_RXNE: u8 = 0x01;
