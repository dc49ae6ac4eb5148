//! Inter-integrated circuit interface (I2C)
//!
//! The driver applies configurations and exposes raw status; bus
//! transactions are sequenced entirely by the caller through
//! start/stop/address/data primitives and the event accessors. Several
//! status flags (SB, ADDR, ADD10, BTF, STOPF) clear through documented
//! two-step read sequences; the accessors here perform only the first
//! half and the caller's following register access completes it.

use crate::clk::Clk;
use crate::pac::{self, i2c};

/// Highest standard-mode output clock.
pub const MAX_STANDARD_FREQ: u32 = 100_000;
/// Highest fast-mode output clock.
pub const MAX_FAST_FREQ: u32 = 400_000;

/// Fast-mode duty cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DutyCycle {
    /// t_low / t_high = 2.
    Duty2 = 0x00,
    /// t_low / t_high = 16/9.
    Duty16_9 = 0x40,
}

/// Acknowledge enablement (CR2 ACK bit).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Ack {
    /// No acknowledge returned.
    Disable = 0x00,
    /// Acknowledge after a received byte.
    Enable = 0x04,
}

/// Acknowledge position for two-byte receptions (CR2 POS bit).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AckPosition {
    /// ACK controls the current byte.
    Current = 0x00,
    /// ACK controls the next byte.
    Next = 0x08,
}

/// Own-address width acknowledged in slave mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AcknowledgedAddress {
    /// 7-bit addressing.
    Bits7 = 0x00,
    /// 10-bit addressing.
    Bits10 = 0x80,
}

/// Transfer direction encoded into the address byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Direction {
    /// Master writes to the slave.
    Transmitter = 0x00,
    /// Master reads from the slave.
    Receiver = 0x01,
}

/// Interrupt enable selectors (ITR bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Interrupt {
    /// Error interrupts.
    Err = 0x01,
    /// Event interrupts.
    Evt = 0x02,
    /// Buffer interrupts.
    Buf = 0x04,
}

/// Pending-interrupt selectors.
///
/// Encoding: bits [13:12] status register index (1 = SR1, 2 = SR2),
/// bits [10:8] the ITR enable mask that arms the interrupt, low byte the
/// flag mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum PendingInterrupt {
    /// Transmit buffer empty.
    Txe = 0x1680,
    /// Receive buffer not empty.
    Rxne = 0x1640,
    /// Stop detected (slave mode).
    Stopf = 0x1210,
    /// 10-bit header sent (master mode).
    Add10 = 0x1208,
    /// Byte transfer finished.
    Btf = 0x1204,
    /// Address sent or matched.
    Addr = 0x1202,
    /// Start condition sent (master mode).
    Sb = 0x1201,
    /// Wake-up from halt.
    Wufh = 0x2220,
    /// Overrun or underrun.
    Ovr = 0x2108,
    /// Acknowledge failure.
    Af = 0x2104,
    /// Arbitration lost.
    Arlo = 0x2102,
    /// Bus error.
    Berr = 0x2101,
}

/// Status flags. The high byte selects SR1 (1), SR2 (2) or SR3 (3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Flag {
    /// Transmit buffer empty.
    TxEmpty = 0x0180,
    /// Receive buffer not empty.
    RxNotEmpty = 0x0140,
    /// Stop detected (slave mode).
    StopDetection = 0x0110,
    /// 10-bit header sent (master mode).
    HeaderSent = 0x0108,
    /// Byte transfer finished.
    TransferFinished = 0x0104,
    /// Address sent (master) or matched (slave).
    AddressSentMatched = 0x0102,
    /// Start condition sent (master mode).
    StartDetection = 0x0101,
    /// Wake-up from halt.
    WakeUpFromHalt = 0x0220,
    /// Overrun or underrun.
    OverrunUnderrun = 0x0208,
    /// Acknowledge failure.
    AcknowledgeFailure = 0x0204,
    /// Arbitration lost (master mode).
    ArbitrationLoss = 0x0202,
    /// Bus error.
    BusError = 0x0201,
    /// General call header received (slave mode).
    GeneralCall = 0x0310,
    /// Transmitter (set) or receiver (clear).
    TransmitterReceiver = 0x0304,
    /// Bus busy.
    BusBusy = 0x0302,
    /// Master (set) or slave (clear).
    MasterSlave = 0x0301,
}

/// Bus events: the SR3 image in the high byte, the SR1 image in the low
/// byte, matched as a superset check against the live registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Event {
    /// Own address matched, slave about to transmit.
    SlaveTransmitterAddressMatched = 0x0682,
    /// Own address matched, slave about to receive.
    SlaveReceiverAddressMatched = 0x0202,
    /// General call address matched.
    SlaveGeneralCallAddressMatched = 0x1200,
    /// Slave received a byte.
    SlaveByteReceived = 0x0240,
    /// Slave finished transmitting a byte.
    SlaveByteTransmitted = 0x0684,
    /// Master NACKed the last slave byte.
    SlaveAckFailure = 0x0004,
    /// Stop received by the slave.
    SlaveStopDetected = 0x0010,
    /// Start condition sent, master mode entered.
    MasterModeSelect = 0x0301,
    /// Address sent, master about to transmit.
    MasterTransmitterModeSelected = 0x0782,
    /// Address sent, master about to receive.
    MasterReceiverModeSelected = 0x0302,
    /// 10-bit header sent.
    MasterModeAddress10 = 0x0308,
    /// Master received a byte.
    MasterByteReceived = 0x0340,
    /// Master data register empty.
    MasterByteTransmitting = 0x0380,
    /// Master finished transmitting a byte.
    MasterByteTransmitted = 0x0384,
}

const REGISTER_MASK: u16 = 0x3000;
const REGISTER_SR1_INDEX: u16 = 0x1000;
const ITEN_MASK: u16 = 0x0700;
const FLAG_MASK: u16 = 0x00FF;

/// I2C driver.
pub struct I2c {
    rb: *const i2c::RegisterBlock,
}

unsafe impl Send for I2c {}

impl I2c {
    /// Takes ownership of the I2C peripheral.
    pub fn new(_i2c: pac::I2C) -> Self {
        I2c { rb: pac::I2C::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const i2c::RegisterBlock) -> Self {
        I2c { rb }
    }

    fn rb(&self) -> &i2c::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Writes every I2C register back to its post-reset value.
    pub fn deinit(&mut self) {
        let rb = self.rb();
        rb.cr1.write(i2c::I2C_RESET);
        rb.cr2.write(i2c::I2C_RESET);
        rb.freqr.write(i2c::I2C_RESET);
        rb.oarl.write(i2c::I2C_RESET);
        rb.oarh.write(i2c::I2C_RESET);
        rb.itr.write(i2c::I2C_RESET);
        rb.ccrl.write(i2c::I2C_RESET);
        rb.ccrh.write(i2c::I2C_RESET);
        rb.triser.write(i2c::TRISER_RESET);
    }

    /// Configures the interface timing, own address and acknowledge
    /// behavior, then enables the peripheral.
    ///
    /// The input clock is taken from [`Clk::clock_freq`]. In fast mode
    /// (above 100 kHz) the clock control value is `f_in / (3 * f_out)`
    /// for a 2:1 duty cycle or `f_in / (25 * f_out)` for 16/9, clamped to
    /// at least 1, with a rise time of `f_in_mhz * 3 / 10 + 1`. In
    /// standard mode it is `f_in / (2 * f_out)` clamped to at least 4,
    /// with a rise time of `f_in_mhz + 1`.
    pub fn init(
        &mut self,
        output_clock_hz: u32,
        own_address: u16,
        duty_cycle: DutyCycle,
        ack: Ack,
        acknowledged_address: AcknowledgedAddress,
        clk: &Clk,
    ) {
        debug_assert!(
            output_clock_hz != 0 && output_clock_hz <= MAX_FAST_FREQ,
            "output clock out of range"
        );
        debug_assert!(own_address <= 0x03FF, "own address out of range");

        let rb = self.rb();
        let input_clock = (clk.clock_freq().raw() / 1_000_000) as u8;

        rb.freqr.clear_bits(i2c::FREQR_FREQ);
        rb.freqr.set_bits(input_clock);

        // Timing registers are writable only with the peripheral off.
        rb.cr1.clear_bits(i2c::CR1_PE);

        rb.ccrh
            .clear_bits(i2c::CCRH_FS | i2c::CCRH_DUTY | i2c::CCRH_CCR);
        rb.ccrl.clear_bits(0xFF);

        let input_hz = input_clock as u32 * 1_000_000;
        let mut tmpccrh: u8 = 0;
        let mut result: u32;
        if output_clock_hz > MAX_STANDARD_FREQ {
            tmpccrh = i2c::CCRH_FS;
            if duty_cycle == DutyCycle::Duty2 {
                result = input_hz / (output_clock_hz * 3);
            } else {
                result = input_hz / (output_clock_hz * 25);
                tmpccrh |= i2c::CCRH_DUTY;
            }
            if result < 0x0001 {
                result = 0x0001;
            }
            rb.triser.write((input_clock as u16 * 3 / 10 + 1) as u8);
        } else {
            result = input_hz / (output_clock_hz << 1);
            if result < 0x0004 {
                result = 0x0004;
            }
            rb.triser.write(input_clock + 1);
        }

        rb.ccrl.write(result as u8);
        rb.ccrh
            .write(((result >> 8) as u8 & i2c::CCRH_CCR) | tmpccrh);

        rb.cr1.set_bits(i2c::CR1_PE);

        rb.cr2.clear_bits(i2c::CR2_ACK);
        rb.cr2.set_bits(ack as u8);

        rb.oarl.write(own_address as u8);
        rb.oarh.write(
            (acknowledged_address as u8 | i2c::OARH_ADDCONF) | ((own_address & 0x0300) >> 7) as u8,
        );
    }

    /// Enables the peripheral.
    pub fn enable(&mut self) {
        self.rb().cr1.set_bits(i2c::CR1_PE);
    }

    /// Disables the peripheral.
    pub fn disable(&mut self) {
        self.rb().cr1.clear_bits(i2c::CR1_PE);
    }

    /// Enables or disables response to the general call address.
    pub fn general_call_cmd(&mut self, on: bool) {
        if on {
            self.rb().cr1.set_bits(i2c::CR1_ENGC);
        } else {
            self.rb().cr1.clear_bits(i2c::CR1_ENGC);
        }
    }

    /// Generates (or withdraws) a start condition.
    pub fn generate_start(&mut self, on: bool) {
        if on {
            self.rb().cr2.set_bits(i2c::CR2_START);
        } else {
            self.rb().cr2.clear_bits(i2c::CR2_START);
        }
    }

    /// Generates (or withdraws) a stop condition.
    pub fn generate_stop(&mut self, on: bool) {
        if on {
            self.rb().cr2.set_bits(i2c::CR2_STOP);
        } else {
            self.rb().cr2.clear_bits(i2c::CR2_STOP);
        }
    }

    /// Holds or releases the interface software reset.
    pub fn software_reset_cmd(&mut self, on: bool) {
        if on {
            self.rb().cr2.set_bits(i2c::CR2_SWRST);
        } else {
            self.rb().cr2.clear_bits(i2c::CR2_SWRST);
        }
    }

    /// Enables or disables slave clock stretching (bit is inverted).
    pub fn stretch_clock_cmd(&mut self, on: bool) {
        if on {
            self.rb().cr1.clear_bits(i2c::CR1_NOSTRETCH);
        } else {
            self.rb().cr1.set_bits(i2c::CR1_NOSTRETCH);
        }
    }

    /// Enables or disables acknowledge generation.
    pub fn acknowledge_config(&mut self, on: bool) {
        if on {
            self.rb().cr2.set_bits(i2c::CR2_ACK);
        } else {
            self.rb().cr2.clear_bits(i2c::CR2_ACK);
        }
    }

    /// Selects which byte the acknowledge bit controls.
    pub fn ack_position_config(&mut self, position: AckPosition) {
        self.rb().cr2.clear_bits(i2c::CR2_POS);
        self.rb().cr2.set_bits(position as u8);
    }

    /// Selects the fast-mode duty cycle.
    pub fn fast_mode_duty_cycle_config(&mut self, duty_cycle: DutyCycle) {
        if duty_cycle == DutyCycle::Duty16_9 {
            self.rb().ccrh.set_bits(i2c::CCRH_DUTY);
        } else {
            self.rb().ccrh.clear_bits(i2c::CCRH_DUTY);
        }
    }

    /// Transmits the 7-bit address with the direction bit folded in.
    pub fn send_7bit_address(&mut self, address: u8, direction: Direction) {
        let address = if direction != Direction::Transmitter {
            address | i2c::OARL_ADD0
        } else {
            address & i2c::OARL_ADD
        };
        self.rb().dr.write(address);
    }

    /// Writes one byte to the data register.
    pub fn send(&mut self, data: u8) {
        self.rb().dr.write(data);
    }

    /// Reads one byte from the data register.
    pub fn receive(&self) -> u8 {
        self.rb().dr.read()
    }

    /// Enables the selected interrupt class.
    pub fn listen(&mut self, interrupt: Interrupt) {
        self.rb().itr.set_bits(interrupt as u8);
    }

    /// Disables the selected interrupt class.
    pub fn unlisten(&mut self, interrupt: Interrupt) {
        self.rb().itr.clear_bits(interrupt as u8);
    }

    /// Checks whether the live status matches the given event pattern.
    ///
    /// All flags of the pattern must be set at once; surplus live flags do
    /// not fail the match. The slave-acknowledge-failure event is special
    /// cased to SR2.
    pub fn check_event(&self, event: Event) -> bool {
        let rb = self.rb();
        let last: u16 = if event == Event::SlaveAckFailure {
            (rb.sr2.read() & i2c::SR2_AF) as u16
        } else {
            ((rb.sr3.read() as u16) << 8) | rb.sr1.read() as u16
        };
        (last & event as u16) == event as u16
    }

    /// Returns the raw event image: SR3 in the high byte, SR1 in the low
    /// byte, or the acknowledge-failure pattern when AF is set.
    pub fn last_event(&self) -> u16 {
        let rb = self.rb();
        if rb.sr2.read() & i2c::SR2_AF != 0 {
            Event::SlaveAckFailure as u16
        } else {
            ((rb.sr3.read() as u16) << 8) | rb.sr1.read() as u16
        }
    }

    /// Returns `true` if the selected status flag is set.
    ///
    /// For the SR1 event cluster this read is the first half of the
    /// documented clear sequence.
    pub fn flag_status(&self, flag: Flag) -> bool {
        let value = flag as u16;
        let rb = self.rb();
        let sr = match (value >> 8) as u8 {
            0x01 => rb.sr1.read(),
            0x02 => rb.sr2.read(),
            _ => rb.sr3.read(),
        };
        sr & value as u8 != 0
    }

    /// Clears the selected error flag by writing its complement to SR2.
    ///
    /// Only the SR2 error cluster is software clearable; the SR1 event
    /// flags clear through their documented read sequences.
    pub fn clear_flag(&mut self, flag: Flag) {
        debug_assert!(
            (flag as u16) >> 8 == 0x02,
            "only SR2 flags are software clearable"
        );
        let flagpos = flag as u16 & FLAG_MASK;
        self.rb().sr2.write(!(flagpos as u8));
    }

    /// Returns `true` if the selected interrupt is pending and its ITR
    /// enable class is armed.
    pub fn it_status(&self, interrupt: PendingInterrupt) -> bool {
        let value = interrupt as u16;
        let rb = self.rb();
        let enabled = rb.itr.read() & ((value & ITEN_MASK) >> 8) as u8 != 0;
        let pending = if value & REGISTER_MASK == REGISTER_SR1_INDEX {
            rb.sr1.read() & value as u8 != 0
        } else {
            rb.sr2.read() & value as u8 != 0
        };
        pending && enabled
    }

    /// Acknowledges the selected error interrupt through SR2.
    pub fn clear_it_pending_bit(&mut self, interrupt: PendingInterrupt) {
        debug_assert!(
            (interrupt as u16) & REGISTER_MASK == 0x2000,
            "only SR2 interrupts are software clearable"
        );
        let flagpos = interrupt as u16 & FLAG_MASK;
        self.rb().sr2.write(!(flagpos as u8));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pac::clk;

    fn fake() -> (&'static i2c::RegisterBlock, I2c, Clk) {
        let rb: &'static i2c::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let clk_rb: &'static clk::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let i2c = unsafe { I2c::from_ptr(rb) };
        let clk = unsafe { Clk::from_ptr(clk_rb) };
        (rb, i2c, clk)
    }

    #[test]
    fn standard_mode_100khz_at_16mhz() {
        let (rb, mut i2c, clk) = fake();
        i2c.init(
            100_000,
            0x30,
            DutyCycle::Duty2,
            Ack::Enable,
            AcknowledgedAddress::Bits7,
            &clk,
        );
        assert_eq!(rb.freqr.read(), 16);
        // 16 MHz / (100 kHz * 2) = 80, above the standard-mode minimum.
        assert_eq!(rb.ccrl.read(), 80);
        assert_eq!(rb.ccrh.read(), 0x00);
        assert_eq!(rb.triser.read(), 17);
        assert_eq!(rb.cr1.read(), i2c::CR1_PE);
        assert_eq!(rb.cr2.read(), i2c::CR2_ACK);
        assert_eq!(rb.oarl.read(), 0x30);
        assert_eq!(rb.oarh.read(), i2c::OARH_ADDCONF);
    }

    #[test]
    fn fast_mode_clamps_ccr_to_1() {
        let (rb, mut i2c, _clk) = fake();
        // Divide the master clock down to 2 MHz: 2 MHz / (400 kHz * 25)
        // truncates to zero and must clamp to the silicon minimum of 1.
        let clk_rb: &'static clk::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        clk_rb.ckdivr.write(0x03);
        let clk = unsafe { Clk::from_ptr(clk_rb) };
        i2c.init(
            400_000,
            0x10,
            DutyCycle::Duty16_9,
            Ack::Disable,
            AcknowledgedAddress::Bits7,
            &clk,
        );
        assert_eq!(rb.ccrl.read(), 1);
        assert_eq!(rb.freqr.read(), 2);
    }

    #[test]
    fn fast_mode_duty2_at_16mhz() {
        let (rb, mut i2c, clk) = fake();
        i2c.init(
            400_000,
            0x22,
            DutyCycle::Duty2,
            Ack::Enable,
            AcknowledgedAddress::Bits7,
            &clk,
        );
        // 16 MHz / (400 kHz * 3) = 13
        assert_eq!(rb.ccrl.read(), 13);
        assert_eq!(rb.ccrh.read(), i2c::CCRH_FS);
        // 16 * 3 / 10 + 1 = 5
        assert_eq!(rb.triser.read(), 5);
    }

    #[test]
    fn fast_mode_duty16_9_sets_duty_bit() {
        let (rb, mut i2c, clk) = fake();
        i2c.init(
            400_000,
            0x22,
            DutyCycle::Duty16_9,
            Ack::Enable,
            AcknowledgedAddress::Bits7,
            &clk,
        );
        // 16 MHz / (400 kHz * 25) = 1 (after the fast-mode clamp).
        assert_eq!(rb.ccrl.read(), 1);
        assert_eq!(rb.ccrh.read(), i2c::CCRH_FS | i2c::CCRH_DUTY);
    }

    #[test]
    fn ten_bit_own_address_spills_into_oarh() {
        let (rb, mut i2c, clk) = fake();
        i2c.init(
            100_000,
            0x2A5,
            DutyCycle::Duty2,
            Ack::Enable,
            AcknowledgedAddress::Bits10,
            &clk,
        );
        assert_eq!(rb.oarl.read(), 0xA5);
        // ADDMODE | ADDCONF | bits [9:8] at [2:1]
        assert_eq!(rb.oarh.read(), 0x80 | 0x40 | 0x04);
    }

    #[test]
    fn address_byte_carries_direction() {
        let (rb, mut i2c, _clk) = fake();
        i2c.send_7bit_address(0xA0, Direction::Receiver);
        assert_eq!(rb.dr.read(), 0xA1);
        i2c.send_7bit_address(0xA1, Direction::Transmitter);
        assert_eq!(rb.dr.read(), 0xA0);
    }

    #[test]
    fn check_event_is_a_superset_match() {
        let (rb, i2c, _clk) = fake();
        rb.sr1.write(i2c::SR1_SB);
        rb.sr3.write(i2c::SR3_MSL | i2c::SR3_BUSY);
        assert!(i2c.check_event(Event::MasterModeSelect));
        assert!(!i2c.check_event(Event::MasterTransmitterModeSelected));
        assert_eq!(i2c.last_event(), 0x0301);
    }

    #[test]
    fn ack_failure_event_reads_sr2() {
        let (rb, i2c, _clk) = fake();
        rb.sr2.write(i2c::SR2_AF);
        assert!(i2c.check_event(Event::SlaveAckFailure));
        assert_eq!(i2c.last_event(), 0x0004);
    }

    #[test]
    fn flag_status_routes_across_status_registers() {
        let (rb, i2c, _clk) = fake();
        rb.sr1.write(i2c::SR1_TXE);
        rb.sr2.write(i2c::SR2_ARLO);
        rb.sr3.write(i2c::SR3_BUSY);
        assert!(i2c.flag_status(Flag::TxEmpty));
        assert!(i2c.flag_status(Flag::ArbitrationLoss));
        assert!(i2c.flag_status(Flag::BusBusy));
        assert!(!i2c.flag_status(Flag::MasterSlave));
    }

    #[test]
    fn it_status_is_enable_gated() {
        let (rb, i2c, _clk) = fake();
        rb.sr2.write(i2c::SR2_OVR);
        assert!(!i2c.it_status(PendingInterrupt::Ovr));
        rb.itr.write(i2c::ITR_ITERREN);
        assert!(i2c.it_status(PendingInterrupt::Ovr));

        rb.sr1.write(i2c::SR1_RXNE);
        assert!(!i2c.it_status(PendingInterrupt::Rxne));
        rb.itr.write(i2c::ITR_ITEVTEN | i2c::ITR_ITBUFEN);
        assert!(i2c.it_status(PendingInterrupt::Rxne));
    }

    #[test]
    fn clear_writes_complement_to_sr2() {
        let (rb, mut i2c, _clk) = fake();
        i2c.clear_flag(Flag::AcknowledgeFailure);
        assert_eq!(rb.sr2.read(), 0xFB);
        i2c.clear_it_pending_bit(PendingInterrupt::Berr);
        assert_eq!(rb.sr2.read(), 0xFE);
    }

    #[test]
    fn stretch_clock_bit_is_inverted() {
        let (rb, mut i2c, _clk) = fake();
        i2c.stretch_clock_cmd(false);
        assert_eq!(rb.cr1.read(), i2c::CR1_NOSTRETCH);
        i2c.stretch_clock_cmd(true);
        assert_eq!(rb.cr1.read(), 0x00);
    }
}
