//! Comparator interface (COMP)
//!
//! Two comparators sharing a bias source, an internal/external reference,
//! routable channel switches and an optional connection to the timer
//! capture and break inputs.

use crate::pac::{self, comp};

/// Comparator selection (CR enable bits, combinable in `init`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Selection {
    /// Neither comparator.
    None = 0x00,
    /// First comparator.
    Comp1 = 0x02,
    /// Second comparator.
    Comp2 = 0x04,
    /// Both comparators.
    All = 0x06,
}

/// Output polarity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Polarity {
    /// Output is high when the comparison is true.
    High = 0x00,
    /// Output is inverted.
    Low = 0x10,
}

/// Reference input selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Reference {
    /// Internal reference voltage.
    Internal = 0x00,
    /// External reference pin.
    External = 0x08,
}

/// Interrupt enable bits (CSR).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Interrupt {
    /// First comparator event interrupt.
    Comp1 = 0x20,
    /// Second comparator event interrupt.
    Comp2 = 0x80,
}

/// Event flags (CSR, cleared by writing 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Flag {
    /// First comparator event.
    Comp1 = 0x10,
    /// Second comparator event.
    Comp2 = 0x40,
}

/// Live comparator outputs (CSR, read-only).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Output {
    /// First comparator output.
    Comp1 = 0x01,
    /// Second comparator output.
    Comp2 = 0x02,
}

/// Routing of comparator 1 to TIM2 (CR IC1BK bit).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Tim2Config {
    /// Comparator 1 drives TIM2 input capture 1.
    InputCapture1 = 0x00,
    /// Comparator 1 drives the TIM2 break input.
    Break = 0x80,
}

/// Comparator-to-timer connection matrix (CR CNFTIM field).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TimersConnection {
    /// No connection.
    None = 0x00,
    /// Comparator 1 to TIM2 IC1/break.
    Comp1ToTim2 = 0x20,
    /// Comparator 1 to TIM2 IC1/break, comparator 2 to TIM2 IC2.
    Comp1ToTim2Comp2ToTim2 = 0x40,
    /// Comparator 1 to TIM2 IC1/break, comparator 2 to TIM3 IC2.
    Comp1ToTim2Comp2ToTim3 = 0x60,
}

/// Analog channel switches (CCS register bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Switch {
    /// Comparator 1 channel 1.
    Comp1Ch1 = 0x01,
    /// Comparator 1 channel 2.
    Comp1Ch2 = 0x02,
    /// Comparator 1 channel 3.
    Comp1Ch3 = 0x04,
    /// Comparator 1 channel 4.
    Comp1Ch4 = 0x08,
    /// Comparator 2 channel 1.
    Comp2Ch1 = 0x10,
    /// Comparator 2 channel 2.
    Comp2Ch2 = 0x20,
    /// Comparator 2 channel 3.
    Comp2Ch3 = 0x40,
    /// Comparator 2 channel 4.
    Comp2Ch4 = 0x80,
}

/// Comparator driver.
pub struct Comp {
    rb: *const comp::RegisterBlock,
}

unsafe impl Send for Comp {}

impl Comp {
    /// Takes ownership of the comparator interface.
    pub fn new(_comp: pac::COMP) -> Self {
        Comp { rb: pac::COMP::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const comp::RegisterBlock) -> Self {
        Comp { rb }
    }

    fn rb(&self) -> &comp::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Writes every COMP register back to its post-reset value.
    pub fn deinit(&mut self) {
        let rb = self.rb();
        rb.cr.write(comp::CR_RESET);
        rb.csr.write(comp::CSR_RESET);
        rb.ccs.write(comp::CCS_RESET);
    }

    /// Applies selection, reference and polarity in one clear-then-set
    /// pass over CR.
    pub fn init(&mut self, selection: Selection, reference: Reference, polarity: Polarity) {
        let bits = polarity as u8 | reference as u8 | selection as u8;
        self.rb().cr.clear_bits(bits);
        self.rb().cr.set_bits(bits);
    }

    /// Switches the shared bias source on.
    pub fn enable(&mut self) {
        self.rb().cr.set_bits(comp::CR_BIASEN);
    }

    /// Switches the shared bias source off.
    pub fn disable(&mut self) {
        self.rb().cr.clear_bits(comp::CR_BIASEN);
    }

    /// Enables or disables individual comparators.
    pub fn selection_config(&mut self, selection: Selection, on: bool) {
        if on {
            self.rb().cr.set_bits(selection as u8);
        } else {
            self.rb().cr.clear_bits(selection as u8);
        }
    }

    /// Enables the selected comparator event interrupt.
    pub fn listen(&mut self, interrupt: Interrupt) {
        self.rb().csr.set_bits(interrupt as u8);
    }

    /// Disables the selected comparator event interrupt.
    pub fn unlisten(&mut self, interrupt: Interrupt) {
        self.rb().csr.clear_bits(interrupt as u8);
    }

    /// Routes comparator 1 to TIM2 input capture or break.
    pub fn tim2_config(&mut self, config: Tim2Config) {
        self.rb().cr.clear_bits(comp::CR_IC1BK);
        self.rb().cr.set_bits(config as u8);
    }

    /// Opens or closes one analog channel switch.
    pub fn switch_config(&mut self, switch: Switch, on: bool) {
        if on {
            self.rb().ccs.set_bits(switch as u8);
        } else {
            self.rb().ccs.clear_bits(switch as u8);
        }
    }

    /// Selects the comparator-to-timer connection.
    pub fn tim_connect(&mut self, connection: TimersConnection) {
        self.rb().cr.clear_bits(comp::CR_CNFTIM);
        self.rb().cr.set_bits(connection as u8);
    }

    /// Sets the output polarity.
    pub fn select_polarity(&mut self, polarity: Polarity) {
        self.rb().cr.clear_bits(comp::CR_POL);
        self.rb().cr.set_bits(polarity as u8);
    }

    /// Selects the reference input.
    pub fn set_reference(&mut self, reference: Reference) {
        self.rb().cr.clear_bits(comp::CR_COMPREF);
        self.rb().cr.set_bits(reference as u8);
    }

    /// Returns the live output of the selected comparator.
    pub fn output_status(&self, output: Output) -> bool {
        self.rb().csr.bits_set(output as u8)
    }

    /// Returns `true` if the selected event flag is set.
    pub fn flag_status(&self, flag: Flag) -> bool {
        self.rb().csr.bits_set(flag as u8)
    }

    /// Clears the selected event flag (write 1 through a set cycle).
    pub fn clear_flag(&mut self, flag: Flag) {
        self.rb().csr.set_bits(flag as u8);
    }

    /// Returns `true` if the selected event is pending.
    ///
    /// Unlike most peripherals the comparator reports the raw event flag
    /// here without gating on the interrupt enable bit.
    pub fn it_status(&self, flag: Flag) -> bool {
        self.rb().csr.bits_set(flag as u8)
    }

    /// Acknowledges the selected event.
    pub fn clear_it_pending_bit(&mut self, flag: Flag) {
        self.rb().csr.set_bits(flag as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake() -> (&'static comp::RegisterBlock, Comp) {
        let rb: &'static comp::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let comp = unsafe { Comp::from_ptr(rb) };
        (rb, comp)
    }

    #[test]
    fn init_preserves_unrelated_cr_bits() {
        let (rb, mut comp) = fake();
        rb.cr.write(comp::CR_IC1BK | comp::CR_BIASEN);
        comp.init(Selection::All, Reference::External, Polarity::Low);
        assert_eq!(rb.cr.read(), 0x80 | 0x01 | 0x10 | 0x08 | 0x06);
    }

    #[test]
    fn deinit_restores_reset_values() {
        let (rb, mut comp) = fake();
        rb.cr.write(0xFF);
        rb.csr.write(0xFF);
        rb.ccs.write(0xFF);
        comp.deinit();
        assert_eq!(rb.cr.read(), 0x00);
        assert_eq!(rb.csr.read(), 0x50);
        assert_eq!(rb.ccs.read(), 0x00);
    }

    #[test]
    fn tim_connect_touches_only_cnftim() {
        let (rb, mut comp) = fake();
        rb.cr.write(0x9F);
        comp.tim_connect(TimersConnection::Comp1ToTim2Comp2ToTim3);
        assert_eq!(rb.cr.read(), 0xFF);
        comp.tim_connect(TimersConnection::None);
        assert_eq!(rb.cr.read(), 0x9F);
    }

    #[test]
    fn switches_accumulate() {
        let (rb, mut comp) = fake();
        comp.switch_config(Switch::Comp1Ch2, true);
        comp.switch_config(Switch::Comp2Ch4, true);
        assert_eq!(rb.ccs.read(), 0x82);
        comp.switch_config(Switch::Comp1Ch2, false);
        assert_eq!(rb.ccs.read(), 0x80);
    }

    #[test]
    fn flags_and_outputs() {
        let (rb, mut comp) = fake();
        rb.csr.write(0x51);
        assert!(comp.flag_status(Flag::Comp1));
        assert!(comp.output_status(Output::Comp1));
        assert!(!comp.output_status(Output::Comp2));
        comp.clear_flag(Flag::Comp2);
        assert_eq!(rb.csr.read(), 0x51 | 0x40);
    }
}
