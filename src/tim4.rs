//! 8-bit basic timer (TIM4)
//!
//! A plain upcounter with a 4-bit prescaler field, mainly used as a time
//! base or as master/slave glue for the 16-bit timers. No capture or
//! compare channels.

use crate::pac::{self, tim4};

/// Counter clock prescaler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Prescaler {
    /// Counter clock = timer clock.
    Div1 = 0x00,
    /// Counter clock = timer clock / 2.
    Div2 = 0x01,
    /// Counter clock = timer clock / 4.
    Div4 = 0x02,
    /// Counter clock = timer clock / 8.
    Div8 = 0x03,
    /// Counter clock = timer clock / 16.
    Div16 = 0x04,
    /// Counter clock = timer clock / 32.
    Div32 = 0x05,
    /// Counter clock = timer clock / 64.
    Div64 = 0x06,
    /// Counter clock = timer clock / 128.
    Div128 = 0x07,
}

/// One-pulse mode selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OpMode {
    /// Counter keeps running after an update event.
    Repetitive = 0x00,
    /// Counter stops at the next update event.
    Single = 0x01,
}

/// Which requests raise an update event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum UpdateSource {
    /// Any of overflow, UG bit or trigger reset.
    Global = 0x00,
    /// Counter overflow/underflow only.
    Regular = 0x01,
}

/// When a new prescaler value takes effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PscReloadMode {
    /// At the next update event.
    Update = 0x00,
    /// Immediately, through a software update event.
    Immediate = 0x01,
}

/// Master mode trigger output selection (CR2 MMS field).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TrgoSource {
    /// UG bit as trigger output.
    Reset = 0x00,
    /// Counter enable as trigger output.
    Enable = 0x10,
    /// Update event as trigger output.
    Update = 0x20,
}

/// Slave mode selection (SMCR SMS field).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SlaveMode {
    /// Trigger edge reinitializes the counter.
    Reset = 0x04,
    /// Counter runs while the trigger is high.
    Gated = 0x05,
    /// Trigger edge starts the counter.
    Trigger = 0x06,
    /// Trigger clocks the counter.
    External1 = 0x07,
}

/// Input trigger selection (SMCR TS field).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TrgSelection {
    /// TRGO of TIM3.
    Tim3 = 0x20,
    /// TRGO of TIM2.
    Tim2 = 0x30,
}

/// Software-generated events (EGR bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EventSource {
    /// Update event.
    Update = 0x01,
    /// Trigger event.
    Trigger = 0x40,
}

/// Interrupt enable selectors (IER bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Interrupt {
    /// Update interrupt.
    Update = 0x01,
    /// Trigger interrupt.
    Trigger = 0x40,
}

/// Status flags (SR1 bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Flag {
    /// Update flag.
    Update = 0x01,
    /// Trigger flag.
    Trigger = 0x40,
}

/// TIM4 driver.
pub struct Tim4 {
    rb: *const tim4::RegisterBlock,
}

unsafe impl Send for Tim4 {}

impl Tim4 {
    /// Takes ownership of the timer peripheral.
    pub fn new(_tim: pac::TIM4) -> Self {
        Tim4 { rb: pac::TIM4::PTR }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(rb: *const tim4::RegisterBlock) -> Self {
        Tim4 { rb }
    }

    fn rb(&self) -> &tim4::RegisterBlock {
        unsafe { &*self.rb }
    }

    /// Writes every timer register back to its post-reset value.
    pub fn deinit(&mut self) {
        let rb = self.rb();
        rb.cr1.write(tim4::TIM4_RESET);
        rb.cr2.write(tim4::TIM4_RESET);
        rb.smcr.write(tim4::TIM4_RESET);
        rb.ier.write(tim4::TIM4_RESET);
        rb.cntr.write(tim4::TIM4_RESET);
        rb.pscr.write(tim4::TIM4_RESET);
        rb.arr.write(tim4::ARR_RESET);
        rb.sr1.write(tim4::TIM4_RESET);
    }

    /// Programs prescaler and auto-reload period.
    pub fn time_base_init(&mut self, prescaler: Prescaler, period: u8) {
        self.rb().arr.write(period);
        self.rb().pscr.write(prescaler as u8);
    }

    /// Starts the counter.
    pub fn enable(&mut self) {
        self.rb().cr1.set_bits(tim4::CR1_CEN);
    }

    /// Stops the counter; its value is retained.
    pub fn disable(&mut self) {
        self.rb().cr1.clear_bits(tim4::CR1_CEN);
    }

    /// Returns `true` if the counter is running.
    pub fn is_enabled(&self) -> bool {
        self.rb().cr1.bits_set(tim4::CR1_CEN)
    }

    /// Enables the selected interrupt.
    pub fn listen(&mut self, interrupt: Interrupt) {
        self.rb().ier.set_bits(interrupt as u8);
    }

    /// Disables the selected interrupt.
    pub fn unlisten(&mut self, interrupt: Interrupt) {
        self.rb().ier.clear_bits(interrupt as u8);
    }

    /// Clocks the counter from the internal timer clock.
    pub fn internal_clock_config(&mut self) {
        self.rb().smcr.clear_bits(tim4::SMCR_SMS);
    }

    /// Selects the input trigger source.
    pub fn select_input_trigger(&mut self, trigger: TrgSelection) {
        let rb = self.rb();
        rb.smcr.modify(|r| (r & !tim4::SMCR_TS) | trigger as u8);
    }

    /// Masks or unmasks update event generation.
    pub fn update_disable_config(&mut self, disabled: bool) {
        if disabled {
            self.rb().cr1.set_bits(tim4::CR1_UDIS);
        } else {
            self.rb().cr1.clear_bits(tim4::CR1_UDIS);
        }
    }

    /// Restricts which requests raise an update event.
    pub fn update_request_config(&mut self, source: UpdateSource) {
        if source == UpdateSource::Regular {
            self.rb().cr1.set_bits(tim4::CR1_URS);
        } else {
            self.rb().cr1.clear_bits(tim4::CR1_URS);
        }
    }

    /// Selects repetitive or one-pulse counting.
    pub fn select_one_pulse_mode(&mut self, mode: OpMode) {
        if mode == OpMode::Single {
            self.rb().cr1.set_bits(tim4::CR1_OPM);
        } else {
            self.rb().cr1.clear_bits(tim4::CR1_OPM);
        }
    }

    /// Selects the trigger output routed to the 16-bit timers.
    pub fn select_output_trigger(&mut self, source: TrgoSource) {
        let rb = self.rb();
        rb.cr2.modify(|r| (r & !tim4::CR2_MMS) | source as u8);
    }

    /// Selects the slave mode.
    pub fn select_slave_mode(&mut self, mode: SlaveMode) {
        let rb = self.rb();
        rb.smcr.modify(|r| (r & !tim4::SMCR_SMS) | mode as u8);
    }

    /// Synchronizes the timer with its slaves through TRGO.
    pub fn select_master_slave_mode(&mut self, on: bool) {
        if on {
            self.rb().smcr.set_bits(tim4::SMCR_MSM);
        } else {
            self.rb().smcr.clear_bits(tim4::SMCR_MSM);
        }
    }

    /// Loads a new prescaler value, effective per `reload_mode`.
    pub fn prescaler_config(&mut self, prescaler: Prescaler, reload_mode: PscReloadMode) {
        let rb = self.rb();
        rb.pscr.write(prescaler as u8);
        if reload_mode == PscReloadMode::Immediate {
            rb.egr.set_bits(tim4::EGR_UG);
        } else {
            rb.egr.clear_bits(tim4::EGR_UG);
        }
    }

    /// Enables or disables auto-reload preloading.
    pub fn arr_preload_config(&mut self, on: bool) {
        if on {
            self.rb().cr1.set_bits(tim4::CR1_ARPE);
        } else {
            self.rb().cr1.clear_bits(tim4::CR1_ARPE);
        }
    }

    /// Raises an event by software.
    pub fn generate_event(&mut self, source: EventSource) {
        self.rb().egr.set_bits(source as u8);
    }

    /// Writes the counter.
    pub fn set_counter(&mut self, counter: u8) {
        self.rb().cntr.write(counter);
    }

    /// Writes the auto-reload value.
    pub fn set_autoreload(&mut self, autoreload: u8) {
        self.rb().arr.write(autoreload);
    }

    /// Reads the counter.
    pub fn counter(&self) -> u8 {
        self.rb().cntr.read()
    }

    /// Reads back the programmed prescaler.
    pub fn prescaler(&self) -> Prescaler {
        match self.rb().pscr.read() & 0x07 {
            0x00 => Prescaler::Div1,
            0x01 => Prescaler::Div2,
            0x02 => Prescaler::Div4,
            0x03 => Prescaler::Div8,
            0x04 => Prescaler::Div16,
            0x05 => Prescaler::Div32,
            0x06 => Prescaler::Div64,
            _ => Prescaler::Div128,
        }
    }

    /// Returns `true` if the selected flag is set.
    pub fn flag_status(&self, flag: Flag) -> bool {
        self.rb().sr1.bits_set(flag as u8)
    }

    /// Clears the selected flag.
    pub fn clear_flag(&mut self, flag: Flag) {
        self.rb().sr1.write(!(flag as u8));
    }

    /// Returns `true` if the selected interrupt is pending and enabled.
    pub fn it_status(&self, interrupt: Interrupt) -> bool {
        let rb = self.rb();
        rb.sr1.bits_set(interrupt as u8) && rb.ier.bits_set(interrupt as u8)
    }

    /// Acknowledges the selected interrupt.
    pub fn clear_it_pending_bit(&mut self, interrupt: Interrupt) {
        self.rb().sr1.write(!(interrupt as u8));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake() -> (&'static tim4::RegisterBlock, Tim4) {
        let rb: &'static tim4::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let tim = unsafe { Tim4::from_ptr(rb) };
        (rb, tim)
    }

    #[test]
    fn deinit_restores_reset_values() {
        let (rb, mut tim) = fake();
        rb.cr1.write(0xFF);
        rb.arr.write(0x10);
        rb.pscr.write(0x07);
        tim.deinit();
        assert_eq!(rb.cr1.read(), 0x00);
        assert_eq!(rb.arr.read(), 0xFF);
        assert_eq!(rb.pscr.read(), 0x00);
    }

    #[test]
    fn time_base_and_prescaler_round_trip() {
        let (rb, mut tim) = fake();
        tim.time_base_init(Prescaler::Div32, 0x7F);
        assert_eq!(rb.arr.read(), 0x7F);
        assert_eq!(rb.pscr.read(), 0x05);
        assert_eq!(tim.prescaler(), Prescaler::Div32);
    }

    #[test]
    fn enable_round_trips_cen() {
        let (rb, mut tim) = fake();
        rb.cr1.write(0x80);
        tim.enable();
        assert_eq!(rb.cr1.read(), 0x81);
        assert!(tim.is_enabled());
        tim.disable();
        assert_eq!(rb.cr1.read(), 0x80);
    }

    #[test]
    fn trigger_selection_keeps_other_smcr_bits() {
        let (rb, mut tim) = fake();
        rb.smcr.write(0x87);
        tim.select_input_trigger(TrgSelection::Tim2);
        assert_eq!(rb.smcr.read(), 0x87 & !0x70 | 0x30);
    }

    #[test]
    fn it_status_is_enable_gated() {
        let (rb, mut tim) = fake();
        rb.sr1.write(0x01);
        assert!(tim.flag_status(Flag::Update));
        assert!(!tim.it_status(Interrupt::Update));
        tim.listen(Interrupt::Update);
        assert!(tim.it_status(Interrupt::Update));
    }

    #[test]
    fn prescaler_config_immediate_sets_ug() {
        let (rb, mut tim) = fake();
        tim.prescaler_config(Prescaler::Div128, PscReloadMode::Immediate);
        assert_eq!(rb.pscr.read(), 0x07);
        assert_eq!(rb.egr.read(), 0x01);
    }
}
