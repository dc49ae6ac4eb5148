//! Serial peripheral interface (SPI)
//!
//! Data transfers are single register accesses with no buffering or
//! readiness checks; polling TXE/RXNE first is the caller's job. The
//! interrupt selector packs the ICR enable-bit position in its low nibble
//! and the SR flag-bit position in its high nibble.

use crate::hal::spi::FullDuplex;
use crate::pac::{self, spi};

/// Data transfer direction configuration (CR2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DirectionMode {
    /// Two lines, full duplex.
    TwoLinesFullDuplex = 0x00,
    /// Two lines, receive only.
    TwoLinesRxOnly = 0x04,
    /// Single bidirectional line, receive.
    OneLineRx = 0x80,
    /// Single bidirectional line, transmit.
    OneLineTx = 0xC0,
}

/// Direction of the single bidirectional line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Direction {
    /// Receive.
    Rx = 0x00,
    /// Transmit.
    Tx = 0x01,
}

/// Master or slave operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// Slave mode.
    Slave = 0x00,
    /// Master mode.
    Master = 0x04,
}

/// Slave select management.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Nss {
    /// Hardware NSS pin.
    Hard = 0x00,
    /// Software slave management (SSI bit).
    Soft = 0x02,
}

/// Baud rate prescaler applied to the master clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BaudRatePrescaler {
    /// f_master / 2.
    Div2 = 0x00,
    /// f_master / 4.
    Div4 = 0x08,
    /// f_master / 8.
    Div8 = 0x10,
    /// f_master / 16.
    Div16 = 0x18,
    /// f_master / 32.
    Div32 = 0x20,
    /// f_master / 64.
    Div64 = 0x28,
    /// f_master / 128.
    Div128 = 0x30,
    /// f_master / 256.
    Div256 = 0x38,
}

/// Clock polarity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Cpol {
    /// SCK idles low.
    Low = 0x00,
    /// SCK idles high.
    High = 0x02,
}

/// Clock phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Cpha {
    /// Sample on the first clock edge.
    Edge1 = 0x00,
    /// Sample on the second clock edge.
    Edge2 = 0x01,
}

/// Frame bit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FirstBit {
    /// Most significant bit first.
    Msb = 0x00,
    /// Least significant bit first.
    Lsb = 0x80,
}

/// Status flags (SR bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Flag {
    /// Busy.
    Bsy = 0x80,
    /// Overrun.
    Ovr = 0x40,
    /// Mode fault.
    Modf = 0x20,
    /// Wake-up.
    Wkup = 0x08,
    /// Transmit buffer empty.
    Txe = 0x02,
    /// Receive buffer not empty.
    Rxne = 0x01,
}

/// Interrupt selectors.
///
/// Low nibble: ICR enable-bit position; high nibble: SR flag-bit position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Interrupt {
    /// Wake-up interrupt.
    Wkup = 0x34,
    /// Overrun interrupt (shares the error enable bit).
    Ovr = 0x65,
    /// Mode fault interrupt (shares the error enable bit).
    Modf = 0x55,
    /// Transmit buffer empty interrupt.
    Txe = 0x17,
    /// Receive buffer not empty interrupt.
    Rxne = 0x06,
    /// Error interrupt enable.
    Err = 0x05,
}

/// SPI bus errors reported through the `FullDuplex` interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The receiver dropped a frame.
    Overrun,
    /// Another master drove NSS low.
    ModeFault,
}

/// SPI driver.
pub struct Spi {
    rb: *const spi::RegisterBlock,
}

unsafe impl Send for Spi {}

impl Spi {
    /// Takes ownership of the SPI peripheral.
    pub fn new(_spi: pac::SPI) -> Self {
        Spi { rb: pac::SPI::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const spi::RegisterBlock) -> Self {
        Spi { rb }
    }

    fn rb(&self) -> &spi::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Writes every SPI register back to its post-reset value.
    pub fn deinit(&mut self) {
        let rb = self.rb();
        rb.cr1.write(spi::CR1_RESET);
        rb.cr2.write(spi::CR2_RESET);
        rb.icr.write(spi::ICR_RESET);
        rb.sr.write(spi::SR_RESET);
    }

    /// Applies the full interface configuration.
    ///
    /// CR1 collects bit order, prescaler, polarity and phase; CR2 the
    /// line configuration and slave management. In master mode SSI is
    /// forced high so a software-managed NSS does not fault the master.
    /// The mode bit itself is applied last.
    #[allow(clippy::too_many_arguments)]
    pub fn init(
        &mut self,
        first_bit: FirstBit,
        prescaler: BaudRatePrescaler,
        mode: Mode,
        cpol: Cpol,
        cpha: Cpha,
        direction: DirectionMode,
        nss: Nss,
    ) {
        let rb = self.rb();
        rb.cr1
            .write(first_bit as u8 | prescaler as u8 | cpol as u8 | cpha as u8);
        rb.cr2.write(direction as u8 | nss as u8);
        if mode == Mode::Master {
            rb.cr2.set_bits(spi::CR2_SSI);
        } else {
            rb.cr2.clear_bits(spi::CR2_SSI);
        }
        rb.cr1.set_bits(mode as u8);
    }

    /// Enables the peripheral.
    pub fn enable(&mut self) {
        self.rb().cr1.set_bits(spi::CR1_SPE);
    }

    /// Disables the peripheral.
    pub fn disable(&mut self) {
        self.rb().cr1.clear_bits(spi::CR1_SPE);
    }

    /// Enables the selected interrupt.
    pub fn listen(&mut self, interrupt: Interrupt) {
        self.rb().icr.set_bits(Self::enable_mask(interrupt));
    }

    /// Disables the selected interrupt.
    pub fn unlisten(&mut self, interrupt: Interrupt) {
        self.rb().icr.clear_bits(Self::enable_mask(interrupt));
    }

    fn enable_mask(interrupt: Interrupt) -> u8 {
        1 << ((interrupt as u8) & 0x0F)
    }

    /// Writes one byte to the data register.
    ///
    /// No TXE check is performed; writing while the buffer is full
    /// silently drops data, which is the documented hardware behavior.
    pub fn send(&mut self, data: u8) {
        self.rb().dr.write(data);
    }

    /// Reads one byte from the data register.
    pub fn receive(&self) -> u8 {
        self.rb().dr.read()
    }

    /// Drives the internal slave select bit.
    pub fn nss_internal_software_cmd(&mut self, high: bool) {
        if high {
            self.rb().cr2.set_bits(spi::CR2_SSI);
        } else {
            self.rb().cr2.clear_bits(spi::CR2_SSI);
        }
    }

    /// Selects the drive direction of the single bidirectional line.
    pub fn bidirectional_line_config(&mut self, direction: Direction) {
        if direction != Direction::Rx {
            self.rb().cr2.set_bits(spi::CR2_BDOE);
        } else {
            self.rb().cr2.clear_bits(spi::CR2_BDOE);
        }
    }

    /// Returns `true` if the selected status flag is set.
    pub fn flag_status(&self, flag: Flag) -> bool {
        self.rb().sr.bits_set(flag as u8)
    }

    /// Clears the wake-up flag, the only software-clearable SPI flag.
    ///
    /// OVR and MODF clear through their documented read sequences.
    pub fn clear_flag(&mut self) {
        self.rb().sr.write(!spi::SR_WKUP);
    }

    /// Returns `true` if the selected interrupt is pending and enabled.
    pub fn it_status(&self, interrupt: Interrupt) -> bool {
        let value = interrupt as u8;
        let enable = 1u8 << (value & 0x0F);
        let flag = 1u8 << (value >> 4);
        self.rb().icr.bits_set(enable) && self.rb().sr.bits_set(flag)
    }

    /// Acknowledges the wake-up interrupt.
    pub fn clear_it_pending_bit(&mut self) {
        self.rb().sr.write(!spi::SR_WKUP);
    }
}

impl FullDuplex<u8> for Spi {
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Error> {
        let sr = self.rb().sr.read();
        if sr & spi::SR_OVR != 0 {
            Err(nb::Error::Other(Error::Overrun))
        } else if sr & spi::SR_MODF != 0 {
            Err(nb::Error::Other(Error::ModeFault))
        } else if sr & spi::SR_RXNE != 0 {
            Ok(self.rb().dr.read())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn send(&mut self, byte: u8) -> nb::Result<(), Error> {
        let sr = self.rb().sr.read();
        if sr & spi::SR_MODF != 0 {
            Err(nb::Error::Other(Error::ModeFault))
        } else if sr & spi::SR_TXE != 0 {
            self.rb().dr.write(byte);
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake() -> (&'static spi::RegisterBlock, Spi) {
        let rb: &'static spi::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let spi = unsafe { Spi::from_ptr(rb) };
        (rb, spi)
    }

    #[test]
    fn master_init_register_image() {
        let (rb, mut spi) = fake();
        spi.init(
            FirstBit::Msb,
            BaudRatePrescaler::Div16,
            Mode::Master,
            Cpol::Low,
            Cpha::Edge1,
            DirectionMode::TwoLinesFullDuplex,
            Nss::Soft,
        );
        assert_eq!(rb.cr1.read(), 0x18 | 0x04);
        assert_eq!(rb.cr2.read(), 0x02 | 0x01);
    }

    #[test]
    fn slave_init_clears_ssi() {
        let (rb, mut spi) = fake();
        spi.init(
            FirstBit::Lsb,
            BaudRatePrescaler::Div2,
            Mode::Slave,
            Cpol::High,
            Cpha::Edge2,
            DirectionMode::TwoLinesRxOnly,
            Nss::Soft,
        );
        assert_eq!(rb.cr1.read(), 0x80 | 0x02 | 0x01);
        assert_eq!(rb.cr2.read(), 0x04 | 0x02);
    }

    #[test]
    fn enable_round_trip() {
        let (rb, mut spi) = fake();
        spi.enable();
        assert_eq!(rb.cr1.read(), 0x40);
        spi.disable();
        assert_eq!(rb.cr1.read(), 0x00);
    }

    #[test]
    fn interrupt_encoding_maps_to_icr_bits() {
        let (rb, mut spi) = fake();
        spi.listen(Interrupt::Txe);
        assert_eq!(rb.icr.read(), 0x80);
        spi.listen(Interrupt::Rxne);
        assert_eq!(rb.icr.read(), 0xC0);
        spi.listen(Interrupt::Err);
        assert_eq!(rb.icr.read(), 0xE0);
        spi.listen(Interrupt::Wkup);
        assert_eq!(rb.icr.read(), 0xF0);
        spi.unlisten(Interrupt::Txe);
        assert_eq!(rb.icr.read(), 0x70);
    }

    #[test]
    fn it_status_is_enable_gated() {
        let (rb, spi) = fake();
        rb.sr.write(spi::SR_TXE);
        assert!(spi.flag_status(Flag::Txe));
        assert!(!spi.it_status(Interrupt::Txe));
        rb.icr.write(spi::ICR_TXIE);
        assert!(spi.it_status(Interrupt::Txe));
    }

    #[test]
    fn error_interrupts_share_the_errie_bit() {
        let (rb, spi) = fake();
        rb.icr.write(spi::ICR_ERRIE);
        rb.sr.write(spi::SR_MODF);
        assert!(spi.it_status(Interrupt::Modf));
        assert!(!spi.it_status(Interrupt::Ovr));
        rb.sr.write(spi::SR_OVR | spi::SR_MODF);
        assert!(spi.it_status(Interrupt::Ovr));
    }

    #[test]
    fn clear_flag_writes_wkup_complement() {
        let (rb, mut spi) = fake();
        spi.clear_flag();
        assert_eq!(rb.sr.read(), 0xF7);
    }

    #[test]
    fn full_duplex_paths() {
        use crate::hal::spi::FullDuplex;
        let (rb, mut spi) = fake();
        rb.sr.write(spi::SR_TXE);
        FullDuplex::send(&mut spi, 0x5A).unwrap();
        assert_eq!(rb.dr.read(), 0x5A);
        rb.sr.write(0x00);
        assert!(matches!(FullDuplex::read(&mut spi), Err(nb::Error::WouldBlock)));
        rb.sr.write(spi::SR_RXNE);
        rb.dr.write(0xA5);
        assert_eq!(FullDuplex::read(&mut spi).unwrap(), 0xA5);
        rb.sr.write(spi::SR_OVR);
        assert!(matches!(
            FullDuplex::read(&mut spi),
            Err(nb::Error::Other(Error::Overrun))
        ));
    }
}
