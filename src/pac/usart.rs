//! USART register block.

use super::Reg;

/// USART registers.
#[repr(C)]
pub struct RegisterBlock {
    /// Status register.
    pub sr: Reg,
    /// Data register.
    pub dr: Reg,
    /// Baud rate register 1 (mantissa [11:4]).
    pub brr1: Reg,
    /// Baud rate register 2 (mantissa [15:12], fraction [3:0]).
    pub brr2: Reg,
    /// Control register 1.
    pub cr1: Reg,
    /// Control register 2.
    pub cr2: Reg,
    /// Control register 3.
    pub cr3: Reg,
    /// Control register 4.
    pub cr4: Reg,
    /// Control register 5.
    pub cr5: Reg,
    /// Guard time register.
    pub gtr: Reg,
    /// Prescaler register.
    pub pscr: Reg,
}

/// SR reset value (TXE and TC set out of reset).
pub const SR_RESET: u8 = 0xC0;
/// BRR1 reset value.
pub const BRR1_RESET: u8 = 0x00;
/// BRR2 reset value.
pub const BRR2_RESET: u8 = 0x00;
/// CR1 reset value.
pub const CR1_RESET: u8 = 0x00;
/// CR2 reset value.
pub const CR2_RESET: u8 = 0x00;
/// CR3 reset value.
pub const CR3_RESET: u8 = 0x00;
/// CR4 reset value.
pub const CR4_RESET: u8 = 0x00;

/// Transmit data register empty flag.
pub const SR_TXE: u8 = 0x80;
/// Transmission complete flag.
pub const SR_TC: u8 = 0x40;
/// Read data register not empty flag.
pub const SR_RXNE: u8 = 0x20;
/// Idle line detected flag.
pub const SR_IDLE: u8 = 0x10;
/// Overrun error flag.
pub const SR_OR: u8 = 0x08;
/// Noise flag.
pub const SR_NF: u8 = 0x04;
/// Framing error flag.
pub const SR_FE: u8 = 0x02;
/// Parity error flag.
pub const SR_PE: u8 = 0x01;

/// Mantissa bits [7:0] in BRR1.
pub const BRR1_DIVM: u8 = 0xFF;
/// Mantissa bits [11:8] in BRR2.
pub const BRR2_DIVM: u8 = 0xF0;
/// Fraction bits [3:0] in BRR2.
pub const BRR2_DIVF: u8 = 0x0F;

/// Receive data bit 8.
pub const CR1_R8: u8 = 0x80;
/// Transmit data bit 8.
pub const CR1_T8: u8 = 0x40;
/// USART disable bit.
pub const CR1_USARTD: u8 = 0x20;
/// Word length bit.
pub const CR1_M: u8 = 0x10;
/// Wake-up method bit.
pub const CR1_WAKE: u8 = 0x08;
/// Parity control enable bit.
pub const CR1_PCEN: u8 = 0x04;
/// Parity selection bit.
pub const CR1_PS: u8 = 0x02;
/// Parity interrupt enable bit.
pub const CR1_PIEN: u8 = 0x01;

/// Transmitter interrupt enable bit.
pub const CR2_TIEN: u8 = 0x80;
/// Transmission complete interrupt enable bit.
pub const CR2_TCIEN: u8 = 0x40;
/// Receiver interrupt enable bit.
pub const CR2_RIEN: u8 = 0x20;
/// Idle line interrupt enable bit.
pub const CR2_ILIEN: u8 = 0x10;
/// Transmitter enable bit.
pub const CR2_TEN: u8 = 0x08;
/// Receiver enable bit.
pub const CR2_REN: u8 = 0x04;
/// Receiver wake-up bit.
pub const CR2_RWU: u8 = 0x02;
/// Send break bit.
pub const CR2_SBK: u8 = 0x01;

/// Stop bits field.
pub const CR3_STOP: u8 = 0x30;
/// Clock enable bit.
pub const CR3_CLKEN: u8 = 0x08;
/// Clock polarity bit.
pub const CR3_CPOL: u8 = 0x04;
/// Clock phase bit.
pub const CR3_CPHA: u8 = 0x02;
/// Last bit clock pulse bit.
pub const CR3_LBCL: u8 = 0x01;

/// Node address field.
pub const CR4_ADD: u8 = 0x0F;
