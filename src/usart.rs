//! Universal synchronous/asynchronous receiver transmitter (USART)
//!
//! Data transfers are single register accesses; the caller polls TXE/RXNE
//! (or uses the `embedded-hal` non-blocking wrappers at the bottom of the
//! module). The error flags PE/FE/NF/OR and IDLE clear through the
//! documented read sequence: a status register read followed by a data
//! register read. The status accessors here perform only the first half;
//! the caller's subsequent data access completes it.

use crate::clk::Clk;
use crate::hal;
use crate::pac::{self, usart};
use crate::time::Bps;
use void::Void;

/// Word length selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WordLength {
    /// 8 data bits.
    Bits8 = 0x00,
    /// 9 data bits.
    Bits9 = 0x10,
}

/// Stop bit selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StopBits {
    /// One stop bit.
    Stop1 = 0x00,
    /// Two stop bits.
    Stop2 = 0x20,
}

/// Parity selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Parity {
    /// No parity.
    No = 0x00,
    /// Even parity.
    Even = 0x04,
    /// Odd parity.
    Odd = 0x06,
}

/// Transmitter/receiver enablement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// Receiver only.
    Rx = 0x04,
    /// Transmitter only.
    Tx = 0x08,
    /// Both directions.
    RxTx = 0x0C,
}

/// Synchronous clock pin enablement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Clock {
    /// SCK disabled.
    Disable = 0x00,
    /// SCK enabled.
    Enable = 0x08,
}

/// Clock polarity in synchronous mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Cpol {
    /// SCK idles low.
    Low = 0x00,
    /// SCK idles high.
    High = 0x04,
}

/// Clock phase in synchronous mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Cpha {
    /// Capture on the first clock edge.
    Edge1 = 0x00,
    /// Capture on the second clock edge.
    Edge2 = 0x02,
}

/// Clock pulse on the last data bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LastBit {
    /// No clock pulse on the last bit.
    Disable = 0x00,
    /// Clock pulse output on the last bit.
    Enable = 0x01,
}

/// Receiver wake-up method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum WakeUp {
    /// Idle line detection.
    IdleLine = 0x00,
    /// Address mark detection.
    AddressMark = 0x08,
}

/// Status flags.
///
/// The high byte routes SBK to CR2 instead of SR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Flag {
    /// Transmit data register empty.
    Txe = 0x0080,
    /// Transmission complete.
    Tc = 0x0040,
    /// Read data register not empty.
    Rxne = 0x0020,
    /// Idle line detected.
    Idle = 0x0010,
    /// Overrun error.
    Or = 0x0008,
    /// Noise flag.
    Nf = 0x0004,
    /// Framing error.
    Fe = 0x0002,
    /// Parity error.
    Pe = 0x0001,
    /// Send break in progress.
    Sbk = 0x0101,
}

/// Interrupt selectors.
///
/// Encoding 0xZYX: Z routes to CR1 (1) or CR2 (2), Y is the flag-bit
/// position consumed by [`Usart::it_status`], X the enable-bit position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Interrupt {
    /// Transmit data register empty.
    Txe = 0x0277,
    /// Transmission complete.
    Tc = 0x0266,
    /// Receive data register not empty.
    Rxne = 0x0255,
    /// Idle line detected.
    Idle = 0x0244,
    /// Overrun error.
    Or = 0x0235,
    /// Parity error.
    Pe = 0x0100,
}

/// Receive errors surfaced through the `embedded-hal` reader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A new frame overwrote an unread one.
    Overrun,
    /// Stop bit sampled low.
    Framing,
    /// Noise detected on a sampled bit.
    Noise,
    /// Parity check failed.
    Parity,
}

/// USART driver.
pub struct Usart {
    rb: *const usart::RegisterBlock,
}

unsafe impl Send for Usart {}

impl Usart {
    /// Takes ownership of the USART.
    pub fn new(_usart: pac::USART) -> Self {
        Usart { rb: pac::USART::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const usart::RegisterBlock) -> Self {
        Usart { rb }
    }

    fn rb(&self) -> &usart::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Writes the USART back to its post-reset state.
    ///
    /// SR and DR are read first so that a pending TC/RXNE clear sequence
    /// completes instead of being lost.
    pub fn deinit(&mut self) {
        let rb = self.rb();
        let _ = rb.sr.read();
        let _ = rb.dr.read();
        rb.brr2.write(usart::BRR2_RESET);
        rb.brr1.write(usart::BRR1_RESET);
        rb.cr1.write(usart::CR1_RESET);
        rb.cr2.write(usart::CR2_RESET);
        rb.cr3.write(usart::CR3_RESET);
        rb.cr4.write(usart::CR4_RESET);
    }

    /// Configures frame format, baud rate and direction.
    ///
    /// The divider is `f_master / baud`; its mantissa and fraction nibbles
    /// are spread over BRR1/BRR2, BRR2 written first as the reference
    /// manual requires. Baud rates above 625 kbit/s are outside the
    /// documented domain.
    pub fn init(
        &mut self,
        baud: Bps,
        word_length: WordLength,
        stop_bits: StopBits,
        parity: Parity,
        mode: Mode,
        clk: &Clk,
    ) {
        debug_assert!(baud.0 <= 625_000, "baud rate out of range");

        let rb = self.rb();
        rb.cr1
            .clear_bits(usart::CR1_PCEN | usart::CR1_PS | usart::CR1_M);
        rb.cr1.set_bits(word_length as u8 | parity as u8);

        rb.cr3.clear_bits(usart::CR3_STOP);
        rb.cr3.set_bits(stop_bits as u8);

        rb.brr1.clear_bits(usart::BRR1_DIVM);
        rb.brr2.clear_bits(usart::BRR2_DIVM);
        rb.brr2.clear_bits(usart::BRR2_DIVF);

        let div = clk.clock_freq().raw() / baud.0;
        rb.brr2.write(((div >> 8) as u8) & 0xF0);
        rb.brr2.set_bits((div as u8) & 0x0F);
        rb.brr1.write((div >> 4) as u8);

        rb.cr2.clear_bits(usart::CR2_TEN | usart::CR2_REN);
        rb.cr2.set_bits(mode as u8);
    }

    /// Configures the synchronous clock output.
    pub fn clock_init(&mut self, clock: Clock, cpol: Cpol, cpha: Cpha, last_bit: LastBit) {
        let rb = self.rb();
        rb.cr3
            .clear_bits(usart::CR3_CPOL | usart::CR3_CPHA | usart::CR3_LBCL);
        rb.cr3.set_bits(cpol as u8 | cpha as u8 | last_bit as u8);
        if clock != Clock::Disable {
            rb.cr3.set_bits(usart::CR3_CLKEN);
        } else {
            rb.cr3.clear_bits(usart::CR3_CLKEN);
        }
    }

    /// Takes the USART out of its low-power disabled state.
    pub fn enable(&mut self) {
        self.rb().cr1.clear_bits(usart::CR1_USARTD);
    }

    /// Puts the USART into its low-power disabled state.
    pub fn disable(&mut self) {
        self.rb().cr1.set_bits(usart::CR1_USARTD);
    }

    /// Enables the selected interrupt.
    pub fn listen(&mut self, interrupt: Interrupt) {
        self.it_config(interrupt, true);
    }

    /// Disables the selected interrupt.
    pub fn unlisten(&mut self, interrupt: Interrupt) {
        self.it_config(interrupt, false);
    }

    fn it_config(&mut self, interrupt: Interrupt, on: bool) {
        let value = interrupt as u16;
        let reg_index = (value >> 8) as u8;
        let mask = 1u8 << ((value as u8) & 0x0F);
        let rb = self.rb();
        let reg = if reg_index == 0x01 { &rb.cr1 } else { &rb.cr2 };
        if on {
            reg.set_bits(mask);
        } else {
            reg.clear_bits(mask);
        }
    }

    /// Reads one received byte.
    pub fn receive_data8(&self) -> u8 {
        self.rb().dr.read()
    }

    /// Reads one received 9-bit word (bit 8 comes from CR1.R8).
    pub fn receive_data9(&self) -> u16 {
        let rb = self.rb();
        let bit8 = ((rb.cr1.read() & usart::CR1_R8) as u16) << 1;
        (rb.dr.read() as u16 | bit8) & 0x01FF
    }

    /// Wakes or mutes the receiver.
    pub fn receiver_wakeup_cmd(&mut self, mute: bool) {
        if mute {
            self.rb().cr2.set_bits(usart::CR2_RWU);
        } else {
            self.rb().cr2.clear_bits(usart::CR2_RWU);
        }
    }

    /// Transmits a break character.
    pub fn send_break(&mut self) {
        self.rb().cr2.set_bits(usart::CR2_SBK);
    }

    /// Writes one byte to the data register.
    ///
    /// No TXE check is performed; the caller polls first.
    pub fn send_data8(&mut self, data: u8) {
        self.rb().dr.write(data);
    }

    /// Writes one 9-bit word (bit 8 goes through CR1.T8).
    pub fn send_data9(&mut self, data: u16) {
        debug_assert!(data < 0x1FF, "9-bit data out of range");

        let rb = self.rb();
        rb.cr1.clear_bits(usart::CR1_T8);
        rb.cr1.set_bits(((data >> 2) as u8) & usart::CR1_T8);
        rb.dr.write(data as u8);
    }

    /// Assigns the node address used by address-mark wake-up.
    pub fn set_address(&mut self, address: u8) {
        debug_assert!(address < 16, "USART node address out of range");

        self.rb().cr4.clear_bits(usart::CR4_ADD);
        self.rb().cr4.set_bits(address);
    }

    /// Selects the receiver wake-up method.
    pub fn wakeup_config(&mut self, wakeup: WakeUp) {
        self.rb().cr1.clear_bits(usart::CR1_WAKE);
        self.rb().cr1.set_bits(wakeup as u8);
    }

    /// Returns `true` if the selected status flag is set.
    ///
    /// For the error/IDLE cluster this read is the first half of the
    /// documented clear sequence.
    pub fn flag_status(&self, flag: Flag) -> bool {
        if flag == Flag::Sbk {
            self.rb().cr2.bits_set(flag as u16 as u8)
        } else {
            self.rb().sr.bits_set(flag as u16 as u8)
        }
    }

    /// Clears the RXNE flag, the only directly software-clearable flag.
    pub fn clear_flag(&mut self) {
        self.rb().sr.write(!usart::SR_RXNE);
    }

    /// Returns `true` if the selected interrupt is pending and enabled.
    pub fn it_status(&self, interrupt: Interrupt) -> bool {
        let value = interrupt as u16;
        let flag = 1u8 << ((value as u8) & 0x0F);
        let enable = 1u8 << ((value as u8) >> 4);
        let rb = self.rb();
        let enabled = if interrupt == Interrupt::Pe {
            rb.cr1.bits_set(enable)
        } else {
            rb.cr2.bits_set(enable)
        };
        enabled && rb.sr.bits_set(flag)
    }

    /// Acknowledges the RXNE interrupt.
    pub fn clear_it_pending_bit(&mut self) {
        self.rb().sr.write(!usart::SR_RXNE);
    }
}

impl hal::serial::Read<u8> for Usart {
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Error> {
        let sr = self.rb().sr.read();
        if sr & usart::SR_PE != 0 {
            Err(nb::Error::Other(Error::Parity))
        } else if sr & usart::SR_FE != 0 {
            Err(nb::Error::Other(Error::Framing))
        } else if sr & usart::SR_NF != 0 {
            Err(nb::Error::Other(Error::Noise))
        } else if sr & usart::SR_OR != 0 {
            Err(nb::Error::Other(Error::Overrun))
        } else if sr & usart::SR_RXNE != 0 {
            Ok(self.rb().dr.read())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl hal::serial::Write<u8> for Usart {
    type Error = Void;

    fn write(&mut self, byte: u8) -> nb::Result<(), Void> {
        if self.rb().sr.bits_set(usart::SR_TXE) {
            self.rb().dr.write(byte);
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn flush(&mut self) -> nb::Result<(), Void> {
        if self.rb().sr.bits_set(usart::SR_TC) {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pac::clk;
    use crate::time::U32Ext;

    fn fake() -> (&'static usart::RegisterBlock, Usart, Clk) {
        let rb: &'static usart::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let clk_rb: &'static clk::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        // CKDIVR = 0 -> 16 MHz master clock.
        let usart = unsafe { Usart::from_ptr(rb) };
        let clk = unsafe { Clk::from_ptr(clk_rb) };
        (rb, usart, clk)
    }

    #[test]
    fn init_9600_at_16mhz() {
        let (rb, mut usart, clk) = fake();
        usart.init(
            9600.bps(),
            WordLength::Bits8,
            StopBits::Stop1,
            Parity::No,
            Mode::RxTx,
            &clk,
        );
        // 16e6 / 9600 = 1666 = 0x682
        assert_eq!(rb.brr1.read(), 0x68);
        assert_eq!(rb.brr2.read(), 0x02);
        assert_eq!(rb.cr2.read(), 0x0C);
        assert_eq!(rb.cr1.read(), 0x00);
    }

    #[test]
    fn init_with_parity_and_9bit_words() {
        let (rb, mut usart, clk) = fake();
        rb.cr1.write(0x81);
        usart.init(
            115_200.bps(),
            WordLength::Bits9,
            StopBits::Stop2,
            Parity::Odd,
            Mode::Tx,
            &clk,
        );
        // Foreign CR1 bits survive the clear-then-set.
        assert_eq!(rb.cr1.read(), 0x81 | 0x10 | 0x06);
        assert_eq!(rb.cr3.read(), 0x20);
        // 16e6 / 115200 = 138 = 0x8A
        assert_eq!(rb.brr1.read(), 0x08);
        assert_eq!(rb.brr2.read(), 0x0A);
        assert_eq!(rb.cr2.read(), 0x08);
    }

    #[test]
    fn enable_is_inverted_usartd() {
        let (rb, mut usart, _clk) = fake();
        usart.disable();
        assert_eq!(rb.cr1.read(), 0x20);
        usart.enable();
        assert_eq!(rb.cr1.read(), 0x00);
    }

    #[test]
    fn nine_bit_data_path() {
        let (rb, mut usart, _clk) = fake();
        usart.send_data9(0x1A5);
        assert_eq!(rb.cr1.read() & usart::CR1_T8, 0x40);
        assert_eq!(rb.dr.read(), 0xA5);

        rb.cr1.write(usart::CR1_R8);
        rb.dr.write(0x34);
        assert_eq!(usart.receive_data9(), 0x134);
    }

    #[test]
    fn interrupt_routing_pe_uses_cr1() {
        let (rb, mut usart, _clk) = fake();
        usart.listen(Interrupt::Pe);
        assert_eq!(rb.cr1.read(), 0x01);
        assert_eq!(rb.cr2.read(), 0x00);
        usart.listen(Interrupt::Rxne);
        assert_eq!(rb.cr2.read(), 0x20);
        usart.unlisten(Interrupt::Pe);
        assert_eq!(rb.cr1.read(), 0x00);
    }

    #[test]
    fn it_status_is_enable_gated() {
        let (rb, usart, _clk) = fake();
        rb.sr.write(usart::SR_RXNE);
        assert!(usart.flag_status(Flag::Rxne));
        assert!(!usart.it_status(Interrupt::Rxne));
        rb.cr2.write(usart::CR2_RIEN);
        assert!(usart.it_status(Interrupt::Rxne));
    }

    #[test]
    fn sbk_flag_reads_cr2() {
        let (rb, mut usart, _clk) = fake();
        usart.send_break();
        assert!(usart.flag_status(Flag::Sbk));
        assert!(!usart.flag_status(Flag::Pe));
    }

    #[test]
    fn serial_read_reports_errors_before_data() {
        use crate::hal::serial::Read;
        let (rb, mut usart, _clk) = fake();
        rb.sr.write(usart::SR_RXNE | usart::SR_OR);
        assert!(matches!(
            Read::read(&mut usart),
            Err(nb::Error::Other(Error::Overrun))
        ));
        rb.sr.write(usart::SR_RXNE);
        rb.dr.write(0x42);
        assert_eq!(Read::read(&mut usart).unwrap(), 0x42);
    }
}
