//! 16-bit general purpose timers (TIM2, TIM3)
//!
//! Both timers share one register layout and one driver surface, stamped
//! out per instance below. Counters are split into high/low byte pairs;
//! the high byte is always accessed first, which latches the low byte on
//! real silicon.
//!
//! TIM2 additionally carries the LSI measurement routine used to
//! calibrate the AWU and beeper dividers. It is the single blocking
//! function in this crate: it busy-waits on two capture events with no
//! timeout.

use paste::paste;

use crate::pac::{self, tim};
use crate::time::Hertz;

/// Counter clock prescaler (PSCR field, two bits on this family).
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
}

/// Counting direction and alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CounterMode {
    /// Count up.
    Up = 0x00,
    /// Count down.
    Down = 0x10,
    /// Center aligned, compare flags on the way down.
    CenterAligned1 = 0x20,
    /// Center aligned, compare flags on the way up.
    CenterAligned2 = 0x40,
    /// Center aligned, compare flags both ways.
    CenterAligned3 = 0x60,
}

/// Output compare modes (CCMR OCM field).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OcMode {
    /// Frozen output, timing base only.
    Timing = 0x00,
    /// Active on match.
    Active = 0x10,
    /// Inactive on match.
    Inactive = 0x20,
    /// Toggle on match.
    Toggle = 0x30,
    /// PWM mode 1.
    Pwm1 = 0x60,
    /// PWM mode 2.
    Pwm2 = 0x70,
}

/// Forced output compare levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ForcedAction {
    /// Force the reference signal inactive.
    Inactive = 0x40,
    /// Force the reference signal active.
    Active = 0x50,
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

/// Capture/compare channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Channel {
    /// Channel 1.
    Ch1 = 0x00,
    /// Channel 2.
    Ch2 = 0x01,
}

/// Output compare polarity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OcPolarity {
    /// Active high.
    High = 0x00,
    /// Active low.
    Low = 0x22,
}

/// Output level while the main output is idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OcIdleState {
    /// Idle low.
    Reset = 0x00,
    /// Idle high.
    Set = 0x55,
}

/// Input capture polarity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IcPolarity {
    /// Capture on rising edges.
    Rising = 0x00,
    /// Capture on falling edges.
    Falling = 0x44,
}

/// Input capture source routing (CCMR CCxS field).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IcSelection {
    /// Channel input maps to its own timer input.
    DirectTi = 0x01,
    /// Channel input maps to the neighbouring timer input.
    IndirectTi = 0x02,
    /// Channel input maps to the trigger input.
    Trgi = 0x03,
}

/// Input capture event prescaler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IcPrescaler {
    /// Capture every event.
    Div1 = 0x00,
    /// Capture every 2nd event.
    Div2 = 0x04,
    /// Capture every 4th event.
    Div4 = 0x08,
    /// Capture every 8th event.
    Div8 = 0x0C,
}

/// Output channel enablement at init time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputState {
    /// Channel output disabled.
    Disable = 0x00,
    /// Channel output enabled.
    Enable = 0x11,
}

/// Break input enablement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BreakState {
    /// Break input ignored.
    Disable = 0x00,
    /// Break input armed.
    Enable = 0x10,
}

/// Break input polarity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BreakPolarity {
    /// Break on low level.
    Low = 0x00,
    /// Break on high level.
    High = 0x20,
}

/// Automatic main-output re-enable after a break.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AutomaticOutput {
    /// MOE stays down until software sets it.
    Disable = 0x00,
    /// MOE comes back at the next update event.
    Enable = 0x40,
}

/// Write lock applied to the configuration registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum LockLevel {
    /// No protection.
    Off = 0x00,
    /// Lock level 1.
    Level1 = 0x01,
    /// Lock level 2.
    Level2 = 0x02,
    /// Lock level 3.
    Level3 = 0x03,
}

/// Off-state selection for idle mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OssiState {
    /// Outputs disabled when idle.
    Disable = 0x00,
    /// Outputs forced to their idle level when idle.
    Enable = 0x04,
}

/// Software-generated events (EGR bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EventSource {
    /// Update event.
    Update = 0x01,
    /// Capture/compare 1 event.
    Cc1 = 0x02,
    /// Capture/compare 2 event.
    Cc2 = 0x04,
    /// Trigger event.
    Trigger = 0x40,
    /// Break event.
    Break = 0x80,
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

/// Quadrature encoder interface modes (SMCR SMS encodings).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EncoderMode {
    /// Count on TI1 edges only.
    Ti1 = 0x01,
    /// Count on TI2 edges only.
    Ti2 = 0x02,
    /// Count on both TI1 and TI2 edges.
    Ti12 = 0x03,
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
    /// Capture/compare 1 pulse as trigger output.
    Oc1 = 0x30,
    /// OC1REF as trigger output.
    Oc1Ref = 0x40,
    /// OC2REF as trigger output.
    Oc2Ref = 0x50,
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
    /// TRGO of the other 16-bit timer.
    OtherTimer = 0x20,
    /// TRGO of TIM4.
    Tim4 = 0x30,
    /// TI1 edge detector.
    Ti1fEd = 0x40,
    /// Filtered timer input 1.
    Ti1fp1 = 0x50,
    /// Filtered timer input 2.
    Ti2fp2 = 0x60,
    /// Filtered external trigger.
    Etrf = 0x70,
}

/// Timer input used as external clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TixExternalClockSource {
    /// Filtered timer input 1.
    Ti1 = 0x50,
    /// Filtered timer input 2.
    Ti2 = 0x60,
}

/// External trigger prescaler (ETR ETPS field).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ExtTrgPrescaler {
    /// Prescaler off.
    Off = 0x00,
    /// ETR / 2.
    Div2 = 0x10,
    /// ETR / 4.
    Div4 = 0x20,
    /// ETR / 8.
    Div8 = 0x30,
}

/// External trigger polarity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ExtTrgPolarity {
    /// Non-inverted, active high / rising.
    NonInverted = 0x00,
    /// Inverted, active low / falling.
    Inverted = 0x80,
}

/// Interrupt enable selectors (IER bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Interrupt {
    /// Update interrupt.
    Update = 0x01,
    /// Capture/compare 1 interrupt.
    Cc1 = 0x02,
    /// Capture/compare 2 interrupt.
    Cc2 = 0x04,
    /// Trigger interrupt.
    Trigger = 0x40,
    /// Break interrupt.
    Break = 0x80,
}

/// Status flags; the high byte addresses SR2 (overcapture flags).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Flag {
    /// Update flag.
    Update = 0x0001,
    /// Capture/compare 1 flag.
    Cc1 = 0x0002,
    /// Capture/compare 2 flag.
    Cc2 = 0x0004,
    /// Trigger flag.
    Trigger = 0x0040,
    /// Break flag.
    Break = 0x0080,
    /// Capture 1 overcapture flag.
    Cc1Of = 0x0200,
    /// Capture 2 overcapture flag.
    Cc2Of = 0x0400,
}

macro_rules! tim16 {
    ($($TIMX:ident,)+) => { paste! { $(
        #[doc = "Driver for the " $TIMX " 16-bit general purpose timer."]
        pub struct [<$TIMX:camel>] {
            rb: *const tim::RegisterBlock,
        }

        unsafe impl Send for [<$TIMX:camel>] {}

        impl [<$TIMX:camel>] {
            /// Takes ownership of the timer peripheral.
            pub fn new(_tim: pac::$TIMX) -> Self {
                Self { rb: pac::$TIMX::PTR }
            }

            #[cfg(test)]
            pub(crate) const unsafe fn from_ptr(rb: *const tim::RegisterBlock) -> Self {
                Self { rb }
            }

            fn rb(&self) -> &tim::RegisterBlock {
                unsafe { &*self.rb }
            }

            /// Writes every timer register back to its post-reset value.
            ///
            /// The capture/compare channels are parked on a direct input
            /// mapping before CCMR is zeroed so the enable bits accept the
            /// write, and a final UG pulse loads the reset prescaler and
            /// auto-reload values into the active registers.
            pub fn deinit(&mut self) {
                let rb = self.rb();
                rb.cr1.write(tim::TIM_RESET);
                rb.cr2.write(tim::TIM_RESET);
                rb.smcr.write(tim::TIM_RESET);
                rb.etr.write(tim::TIM_RESET);
                rb.ier.write(tim::TIM_RESET);
                rb.sr2.write(tim::TIM_RESET);
                rb.ccer1.write(tim::TIM_RESET);
                rb.ccmr1.write(0x01);
                rb.ccmr2.write(0x01);
                rb.ccer1.write(tim::TIM_RESET);
                rb.ccmr1.write(tim::TIM_RESET);
                rb.ccmr2.write(tim::TIM_RESET);
                rb.cntrh.write(tim::TIM_RESET);
                rb.cntrl.write(tim::TIM_RESET);
                rb.pscr.write(tim::TIM_RESET);
                rb.arrh.write(tim::ARRH_RESET);
                rb.arrl.write(tim::ARRL_RESET);
                rb.ccr1h.write(tim::TIM_RESET);
                rb.ccr1l.write(tim::TIM_RESET);
                rb.ccr2h.write(tim::TIM_RESET);
                rb.ccr2l.write(tim::TIM_RESET);
                rb.oisr.write(tim::TIM_RESET);
                rb.egr.write(0x01);
                rb.bkr.write(tim::TIM_RESET);
                rb.sr1.write(tim::TIM_RESET);
            }

            /// Programs prescaler, counting mode and auto-reload period.
            pub fn time_base_init(
                &mut self,
                prescaler: Prescaler,
                counter_mode: CounterMode,
                period: u16,
            ) {
                let rb = self.rb();
                rb.arrh.write((period >> 8) as u8);
                rb.arrl.write(period as u8);
                rb.pscr.write(prescaler as u8);
                rb.cr1.clear_bits(tim::CR1_CMS | tim::CR1_DIR);
                rb.cr1.set_bits(counter_mode as u8);
            }

            /// Configures output compare channel 1.
            pub fn oc1_init(
                &mut self,
                mode: OcMode,
                output_state: OutputState,
                pulse: u16,
                polarity: OcPolarity,
                idle_state: OcIdleState,
            ) {
                let rb = self.rb();
                rb.ccer1.clear_bits(tim::CCER1_CC1E);
                rb.ccmr1.clear_bits(tim::CCMR_OCM);
                rb.ccmr1.set_bits(mode as u8);
                if output_state == OutputState::Enable {
                    rb.ccer1.set_bits(tim::CCER1_CC1E);
                } else {
                    rb.ccer1.clear_bits(tim::CCER1_CC1E);
                }
                if polarity == OcPolarity::Low {
                    rb.ccer1.set_bits(tim::CCER1_CC1P);
                } else {
                    rb.ccer1.clear_bits(tim::CCER1_CC1P);
                }
                if idle_state == OcIdleState::Set {
                    rb.oisr.set_bits(tim::OISR_OIS1);
                } else {
                    rb.oisr.clear_bits(tim::OISR_OIS1);
                }
                rb.ccr1h.write((pulse >> 8) as u8);
                rb.ccr1l.write(pulse as u8);
            }

            /// Configures output compare channel 2.
            pub fn oc2_init(
                &mut self,
                mode: OcMode,
                output_state: OutputState,
                pulse: u16,
                polarity: OcPolarity,
                idle_state: OcIdleState,
            ) {
                let rb = self.rb();
                rb.ccer1.clear_bits(tim::CCER1_CC2E);
                rb.ccmr2.clear_bits(tim::CCMR_OCM);
                rb.ccmr2.set_bits(mode as u8);
                if output_state == OutputState::Enable {
                    rb.ccer1.set_bits(tim::CCER1_CC2E);
                } else {
                    rb.ccer1.clear_bits(tim::CCER1_CC2E);
                }
                if polarity == OcPolarity::Low {
                    rb.ccer1.set_bits(tim::CCER1_CC2P);
                } else {
                    rb.ccer1.clear_bits(tim::CCER1_CC2P);
                }
                if idle_state == OcIdleState::Set {
                    rb.oisr.set_bits(tim::OISR_OIS2);
                } else {
                    rb.oisr.clear_bits(tim::OISR_OIS2);
                }
                rb.ccr2h.write((pulse >> 8) as u8);
                rb.ccr2l.write(pulse as u8);
            }

            /// Writes the whole break register in one pass.
            pub fn bkr_config(
                &mut self,
                ossi: OssiState,
                lock: LockLevel,
                break_state: BreakState,
                break_polarity: BreakPolarity,
                automatic_output: AutomaticOutput,
            ) {
                self.rb().bkr.write(
                    ossi as u8
                        | lock as u8
                        | break_state as u8
                        | break_polarity as u8
                        | automatic_output as u8,
                );
            }

            /// Configures an input capture channel.
            pub fn ic_init(
                &mut self,
                channel: Channel,
                polarity: IcPolarity,
                selection: IcSelection,
                prescaler: IcPrescaler,
                filter: u8,
            ) {
                if channel == Channel::Ch1 {
                    self.ti1_config(polarity, selection, filter);
                    self.set_ic1_prescaler(prescaler);
                } else {
                    self.ti2_config(polarity, selection, filter);
                    self.set_ic2_prescaler(prescaler);
                }
            }

            /// Configures both channels for PWM input measurement: the
            /// selected channel as given, the twin channel with mirrored
            /// polarity and the opposite input mapping.
            pub fn pwmi_config(
                &mut self,
                channel: Channel,
                polarity: IcPolarity,
                selection: IcSelection,
                prescaler: IcPrescaler,
                filter: u8,
            ) {
                let mirrored_polarity = if polarity == IcPolarity::Rising {
                    IcPolarity::Falling
                } else {
                    IcPolarity::Rising
                };
                let mirrored_selection = if selection == IcSelection::DirectTi {
                    IcSelection::IndirectTi
                } else {
                    IcSelection::DirectTi
                };

                if channel == Channel::Ch1 {
                    self.ti1_config(polarity, selection, filter);
                    self.set_ic1_prescaler(prescaler);
                    self.ti2_config(mirrored_polarity, mirrored_selection, filter);
                    self.set_ic2_prescaler(prescaler);
                } else {
                    self.ti2_config(polarity, selection, filter);
                    self.set_ic2_prescaler(prescaler);
                    self.ti1_config(mirrored_polarity, mirrored_selection, filter);
                    self.set_ic1_prescaler(prescaler);
                }
            }

            /// Starts the counter.
            pub fn enable(&mut self) {
                self.rb().cr1.set_bits(tim::CR1_CEN);
            }

            /// Stops the counter; its value is retained.
            pub fn disable(&mut self) {
                self.rb().cr1.clear_bits(tim::CR1_CEN);
            }

            /// Returns `true` if the counter is running.
            pub fn is_enabled(&self) -> bool {
                self.rb().cr1.bits_set(tim::CR1_CEN)
            }

            /// Drives the main output enable bit.
            pub fn ctrl_pwm_outputs(&mut self, on: bool) {
                if on {
                    self.rb().bkr.set_bits(tim::BKR_MOE);
                } else {
                    self.rb().bkr.clear_bits(tim::BKR_MOE);
                }
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
                self.rb().smcr.clear_bits(tim::SMCR_SMS);
            }

            /// External clock mode 1: the filtered ETR signal feeds the
            /// trigger input and clocks the counter.
            pub fn etr_clock_mode1_config(
                &mut self,
                prescaler: ExtTrgPrescaler,
                polarity: ExtTrgPolarity,
                filter: u8,
            ) {
                self.etr_config(prescaler, polarity, filter);
                let rb = self.rb();
                rb.smcr.clear_bits(tim::SMCR_SMS);
                rb.smcr.set_bits(SlaveMode::External1 as u8);
                rb.smcr.clear_bits(tim::SMCR_TS);
                rb.smcr.set_bits(TrgSelection::Etrf as u8);
            }

            /// External clock mode 2: ETR clocks the counter directly.
            pub fn etr_clock_mode2_config(
                &mut self,
                prescaler: ExtTrgPrescaler,
                polarity: ExtTrgPolarity,
                filter: u8,
            ) {
                self.etr_config(prescaler, polarity, filter);
                self.rb().etr.set_bits(tim::ETR_ECE);
            }

            /// Accumulates prescaler, polarity and filter into ETR.
            pub fn etr_config(
                &mut self,
                prescaler: ExtTrgPrescaler,
                polarity: ExtTrgPolarity,
                filter: u8,
            ) {
                debug_assert!(filter <= 0x0F, "external trigger filter out of range");
                self.rb()
                    .etr
                    .set_bits(prescaler as u8 | polarity as u8 | filter);
            }

            /// Clocks the counter from a filtered timer input.
            pub fn tix_external_clock_config(
                &mut self,
                source: TixExternalClockSource,
                polarity: IcPolarity,
                filter: u8,
            ) {
                if source == TixExternalClockSource::Ti2 {
                    self.ti2_config(polarity, IcSelection::DirectTi, filter);
                } else {
                    self.ti1_config(polarity, IcSelection::DirectTi, filter);
                }
                let rb = self.rb();
                rb.smcr.clear_bits(tim::SMCR_TS);
                rb.smcr.set_bits(source as u8);
                rb.smcr.set_bits(SlaveMode::External1 as u8);
            }

            /// Selects the input trigger source.
            pub fn select_input_trigger(&mut self, trigger: TrgSelection) {
                let rb = self.rb();
                rb.smcr.clear_bits(tim::SMCR_TS);
                rb.smcr.set_bits(trigger as u8);
            }

            /// Masks or unmasks update event generation.
            pub fn update_disable_config(&mut self, disabled: bool) {
                if disabled {
                    self.rb().cr1.set_bits(tim::CR1_UDIS);
                } else {
                    self.rb().cr1.clear_bits(tim::CR1_UDIS);
                }
            }

            /// Restricts which requests raise an update event.
            pub fn update_request_config(&mut self, source: UpdateSource) {
                if source == UpdateSource::Regular {
                    self.rb().cr1.set_bits(tim::CR1_URS);
                } else {
                    self.rb().cr1.clear_bits(tim::CR1_URS);
                }
            }

            /// XORs the timer inputs onto TI1 (hall sensor interface).
            pub fn select_hall_sensor(&mut self, on: bool) {
                if on {
                    self.rb().cr2.set_bits(tim::CR2_TI1S);
                } else {
                    self.rb().cr2.clear_bits(tim::CR2_TI1S);
                }
            }

            /// Selects repetitive or one-pulse counting.
            pub fn select_one_pulse_mode(&mut self, mode: OpMode) {
                if mode == OpMode::Single {
                    self.rb().cr1.set_bits(tim::CR1_OPM);
                } else {
                    self.rb().cr1.clear_bits(tim::CR1_OPM);
                }
            }

            /// Selects the trigger output routed to the slave timers.
            pub fn select_output_trigger(&mut self, source: TrgoSource) {
                let rb = self.rb();
                rb.cr2.modify(|r| (r & !tim::CR2_MMS) | source as u8);
            }

            /// Selects the slave mode.
            pub fn select_slave_mode(&mut self, mode: SlaveMode) {
                let rb = self.rb();
                rb.smcr.modify(|r| (r & !tim::SMCR_SMS) | mode as u8);
            }

            /// Synchronizes the timer with its slaves through TRGO.
            pub fn select_master_slave_mode(&mut self, on: bool) {
                if on {
                    self.rb().smcr.set_bits(tim::SMCR_MSM);
                } else {
                    self.rb().smcr.clear_bits(tim::SMCR_MSM);
                }
            }

            /// Configures the quadrature encoder interface.
            pub fn encoder_interface_config(
                &mut self,
                mode: EncoderMode,
                ic1_polarity: IcPolarity,
                ic2_polarity: IcPolarity,
            ) {
                let rb = self.rb();
                let mut smcr = rb.smcr.read();
                let mut ccmr1 = rb.ccmr1.read();
                let mut ccmr2 = rb.ccmr2.read();

                smcr &= tim::SMCR_MSM | tim::SMCR_TS;
                smcr |= mode as u8;
                ccmr1 = (ccmr1 & !tim::CCMR_CCXS) | tim::CCMR_TIX_DIRECT;
                ccmr2 = (ccmr2 & !tim::CCMR_CCXS) | tim::CCMR_TIX_DIRECT;

                if ic1_polarity == IcPolarity::Falling {
                    rb.ccer1.set_bits(tim::CCER1_CC1P);
                } else {
                    rb.ccer1.clear_bits(tim::CCER1_CC1P);
                }
                if ic2_polarity == IcPolarity::Falling {
                    rb.ccer1.set_bits(tim::CCER1_CC2P);
                } else {
                    rb.ccer1.clear_bits(tim::CCER1_CC2P);
                }

                rb.smcr.write(smcr);
                rb.ccmr1.write(ccmr1);
                rb.ccmr2.write(ccmr2);
            }

            /// Loads a new prescaler value, effective per `reload_mode`.
            pub fn prescaler_config(
                &mut self,
                prescaler: Prescaler,
                reload_mode: PscReloadMode,
            ) {
                let rb = self.rb();
                rb.pscr.write(prescaler as u8);
                if reload_mode == PscReloadMode::Immediate {
                    rb.egr.set_bits(tim::EGR_UG);
                } else {
                    rb.egr.clear_bits(tim::EGR_UG);
                }
            }

            /// Changes the counting mode without touching the other CR1
            /// bits.
            pub fn counter_mode_config(&mut self, mode: CounterMode) {
                let rb = self.rb();
                rb.cr1
                    .modify(|r| (r & !(tim::CR1_CMS | tim::CR1_DIR)) | mode as u8);
            }

            /// Forces the channel 1 reference signal to a fixed level.
            pub fn forced_oc1_config(&mut self, action: ForcedAction) {
                let rb = self.rb();
                rb.ccmr1.modify(|r| (r & !tim::CCMR_OCM) | action as u8);
            }

            /// Forces the channel 2 reference signal to a fixed level.
            pub fn forced_oc2_config(&mut self, action: ForcedAction) {
                let rb = self.rb();
                rb.ccmr2.modify(|r| (r & !tim::CCMR_OCM) | action as u8);
            }

            /// Enables or disables auto-reload preloading.
            pub fn arr_preload_config(&mut self, on: bool) {
                if on {
                    self.rb().cr1.set_bits(tim::CR1_ARPE);
                } else {
                    self.rb().cr1.clear_bits(tim::CR1_ARPE);
                }
            }

            /// Enables or disables compare 1 preloading.
            pub fn oc1_preload_config(&mut self, on: bool) {
                if on {
                    self.rb().ccmr1.set_bits(tim::CCMR_OCXPE);
                } else {
                    self.rb().ccmr1.clear_bits(tim::CCMR_OCXPE);
                }
            }

            /// Enables or disables compare 2 preloading.
            pub fn oc2_preload_config(&mut self, on: bool) {
                if on {
                    self.rb().ccmr2.set_bits(tim::CCMR_OCXPE);
                } else {
                    self.rb().ccmr2.clear_bits(tim::CCMR_OCXPE);
                }
            }

            /// Enables or disables the channel 1 fast compare path.
            pub fn oc1_fast_cmd(&mut self, on: bool) {
                if on {
                    self.rb().ccmr1.set_bits(tim::CCMR_OCXFE);
                } else {
                    self.rb().ccmr1.clear_bits(tim::CCMR_OCXFE);
                }
            }

            /// Enables or disables the channel 2 fast compare path.
            pub fn oc2_fast_cmd(&mut self, on: bool) {
                if on {
                    self.rb().ccmr2.set_bits(tim::CCMR_OCXFE);
                } else {
                    self.rb().ccmr2.clear_bits(tim::CCMR_OCXFE);
                }
            }

            /// Raises an event by software.
            pub fn generate_event(&mut self, source: EventSource) {
                self.rb().egr.set_bits(source as u8);
            }

            /// Sets the channel 1 output polarity.
            pub fn oc1_polarity_config(&mut self, polarity: OcPolarity) {
                if polarity == OcPolarity::Low {
                    self.rb().ccer1.set_bits(tim::CCER1_CC1P);
                } else {
                    self.rb().ccer1.clear_bits(tim::CCER1_CC1P);
                }
            }

            /// Sets the channel 2 output polarity.
            pub fn oc2_polarity_config(&mut self, polarity: OcPolarity) {
                if polarity == OcPolarity::Low {
                    self.rb().ccer1.set_bits(tim::CCER1_CC2P);
                } else {
                    self.rb().ccer1.clear_bits(tim::CCER1_CC2P);
                }
            }

            /// Enables or disables a capture/compare channel.
            pub fn ccx_cmd(&mut self, channel: Channel, on: bool) {
                let mask = if channel == Channel::Ch1 {
                    tim::CCER1_CC1E
                } else {
                    tim::CCER1_CC2E
                };
                if on {
                    self.rb().ccer1.set_bits(mask);
                } else {
                    self.rb().ccer1.clear_bits(mask);
                }
            }

            /// Rewrites the output compare mode of a disabled channel.
            pub fn select_ocxm(&mut self, channel: Channel, mode: OcMode) {
                let rb = self.rb();
                if channel == Channel::Ch1 {
                    rb.ccer1.clear_bits(tim::CCER1_CC1E);
                    rb.ccmr1.modify(|r| (r & !tim::CCMR_OCM) | mode as u8);
                } else {
                    rb.ccer1.clear_bits(tim::CCER1_CC2E);
                    rb.ccmr2.modify(|r| (r & !tim::CCMR_OCM) | mode as u8);
                }
            }

            /// Writes the counter, high byte first.
            pub fn set_counter(&mut self, counter: u16) {
                self.rb().cntrh.write((counter >> 8) as u8);
                self.rb().cntrl.write(counter as u8);
            }

            /// Writes the auto-reload value, high byte first.
            pub fn set_autoreload(&mut self, autoreload: u16) {
                self.rb().arrh.write((autoreload >> 8) as u8);
                self.rb().arrl.write(autoreload as u8);
            }

            /// Writes compare register 1, high byte first.
            pub fn set_compare1(&mut self, compare: u16) {
                self.rb().ccr1h.write((compare >> 8) as u8);
                self.rb().ccr1l.write(compare as u8);
            }

            /// Writes compare register 2, high byte first.
            pub fn set_compare2(&mut self, compare: u16) {
                self.rb().ccr2h.write((compare >> 8) as u8);
                self.rb().ccr2l.write(compare as u8);
            }

            /// Sets the channel 1 capture event prescaler.
            pub fn set_ic1_prescaler(&mut self, prescaler: IcPrescaler) {
                let rb = self.rb();
                rb.ccmr1
                    .modify(|r| (r & !tim::CCMR_ICXPSC) | prescaler as u8);
            }

            /// Sets the channel 2 capture event prescaler.
            pub fn set_ic2_prescaler(&mut self, prescaler: IcPrescaler) {
                let rb = self.rb();
                rb.ccmr2
                    .modify(|r| (r & !tim::CCMR_ICXPSC) | prescaler as u8);
            }

            /// Reads capture register 1, high byte first.
            pub fn capture1(&self) -> u16 {
                let rb = self.rb();
                let high = rb.ccr1h.read();
                let low = rb.ccr1l.read();
                (high as u16) << 8 | low as u16
            }

            /// Reads capture register 2, high byte first.
            pub fn capture2(&self) -> u16 {
                let rb = self.rb();
                let high = rb.ccr2h.read();
                let low = rb.ccr2l.read();
                (high as u16) << 8 | low as u16
            }

            /// Reads the counter, high byte first.
            pub fn counter(&self) -> u16 {
                let rb = self.rb();
                let high = rb.cntrh.read();
                let low = rb.cntrl.read();
                (high as u16) << 8 | low as u16
            }

            /// Reads back the programmed prescaler.
            pub fn prescaler(&self) -> Prescaler {
                match self.rb().pscr.read() & tim::PSCR_PSC {
                    0x00 => Prescaler::Div1,
                    0x01 => Prescaler::Div2,
                    0x02 => Prescaler::Div4,
                    _ => Prescaler::Div8,
                }
            }

            /// Returns `true` if the selected flag is set in SR1/SR2.
            pub fn flag_status(&self, flag: Flag) -> bool {
                let value = flag as u16;
                let rb = self.rb();
                let low = rb.sr1.read() & value as u8;
                let high = rb.sr2.read() & (value >> 8) as u8;
                low | high != 0
            }

            /// Clears the selected flag in both status registers.
            pub fn clear_flag(&mut self, flag: Flag) {
                let value = flag as u16;
                self.rb().sr1.write(!(value as u8));
                self.rb().sr2.write(!((value >> 8) as u8));
            }

            /// Returns `true` if the selected interrupt is pending and
            /// enabled.
            pub fn it_status(&self, interrupt: Interrupt) -> bool {
                let rb = self.rb();
                rb.sr1.bits_set(interrupt as u8) && rb.ier.bits_set(interrupt as u8)
            }

            /// Acknowledges the selected interrupt.
            pub fn clear_it_pending_bit(&mut self, interrupt: Interrupt) {
                self.rb().sr1.write(!(interrupt as u8));
            }

            fn ti1_config(&mut self, polarity: IcPolarity, selection: IcSelection, filter: u8) {
                debug_assert!(filter <= 0x0F, "input capture filter out of range");
                let rb = self.rb();
                rb.ccer1.clear_bits(tim::CCER1_CC1E);
                rb.ccmr1.modify(|r| {
                    (r & !(tim::CCMR_CCXS | tim::CCMR_ICXF)) | selection as u8 | (filter << 4)
                });
                if polarity == IcPolarity::Falling {
                    rb.ccer1.set_bits(tim::CCER1_CC1P);
                } else {
                    rb.ccer1.clear_bits(tim::CCER1_CC1P);
                }
                rb.ccer1.set_bits(tim::CCER1_CC1E);
            }

            fn ti2_config(&mut self, polarity: IcPolarity, selection: IcSelection, filter: u8) {
                debug_assert!(filter <= 0x0F, "input capture filter out of range");
                let rb = self.rb();
                rb.ccer1.clear_bits(tim::CCER1_CC2E);
                rb.ccmr2.modify(|r| {
                    (r & !(tim::CCMR_CCXS | tim::CCMR_ICXF)) | selection as u8 | (filter << 4)
                });
                if polarity == IcPolarity::Falling {
                    rb.ccer1.set_bits(tim::CCER1_CC2P);
                } else {
                    rb.ccer1.clear_bits(tim::CCER1_CC2P);
                }
                rb.ccer1.set_bits(tim::CCER1_CC2E);
            }
        }
    )+ } }
}

tim16! {
    TIM2,
    TIM3,
}

impl Tim2 {
    /// Measures the LSI frequency with capture channel 1.
    ///
    /// The channel captures every 8th LSI edge; the distance between two
    /// successive captures at the given timer clock yields
    /// `8 * timer_clock / (capture2 - capture1)`.
    ///
    /// This routine busy-waits for both capture events with no timeout:
    /// it never returns if the LSI is not routed to the capture input.
    /// The channel is torn down afterwards and the counter is left
    /// disabled.
    pub fn compute_lsi_clock_freq(&mut self, timer_clock_freq: Hertz) -> Hertz {
        self.ic_init(
            Channel::Ch1,
            IcPolarity::Rising,
            IcSelection::DirectTi,
            IcPrescaler::Div8,
            0x0,
        );
        self.listen(Interrupt::Cc1);
        self.enable();

        self.rb().sr1.write(0x00);
        self.rb().sr2.write(0x00);
        self.clear_flag(Flag::Cc1);

        while !self.rb().sr1.bits_set(tim::SR1_CC1IF) {}
        let ic_value1 = self.capture1();
        self.clear_flag(Flag::Cc1);

        while !self.rb().sr1.bits_set(tim::SR1_CC1IF) {}
        let ic_value2 = self.capture1();
        self.clear_flag(Flag::Cc1);

        self.rb().ccer1.clear_bits(tim::CCER1_CC1E);
        self.rb().ccmr1.write(0x00);
        self.disable();

        Hertz::from_raw(lsi_freq(timer_clock_freq.raw(), ic_value1, ic_value2))
    }
}

/// The LSI measurement formula: eight LSI periods elapse between two
/// captures taken with the /8 event prescaler.
fn lsi_freq(timer_clock_freq: u32, ic_value1: u16, ic_value2: u16) -> u32 {
    (8 * timer_clock_freq) / ic_value2.wrapping_sub(ic_value1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake() -> (&'static tim::RegisterBlock, Tim2) {
        let rb: &'static tim::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let tim = unsafe { Tim2::from_ptr(rb) };
        (rb, tim)
    }

    #[test]
    fn deinit_restores_reset_values() {
        let (rb, mut tim) = fake();
        rb.cr1.write(0xFF);
        rb.ccer1.write(0x33);
        rb.ccmr1.write(0x71);
        rb.arrh.write(0x12);
        rb.arrl.write(0x34);
        tim.deinit();
        assert_eq!(rb.cr1.read(), 0x00);
        assert_eq!(rb.ccer1.read(), 0x00);
        assert_eq!(rb.ccmr1.read(), 0x00);
        assert_eq!(rb.arrh.read(), 0xFF);
        assert_eq!(rb.arrl.read(), 0xFF);
        assert_eq!(rb.egr.read(), 0x01);
    }

    #[test]
    fn time_base_init_splits_period() {
        let (rb, mut tim) = fake();
        rb.cr1.write(0x8F);
        tim.time_base_init(Prescaler::Div8, CounterMode::Down, 0x1234);
        assert_eq!(rb.arrh.read(), 0x12);
        assert_eq!(rb.arrl.read(), 0x34);
        assert_eq!(rb.pscr.read(), 0x03);
        // CMS/DIR replaced, foreign CR1 bits kept.
        assert_eq!(rb.cr1.read(), 0x9F);
    }

    #[test]
    fn oc1_init_register_image() {
        let (rb, mut tim) = fake();
        tim.oc1_init(
            OcMode::Pwm1,
            OutputState::Enable,
            0x0ABC,
            OcPolarity::Low,
            OcIdleState::Set,
        );
        assert_eq!(rb.ccmr1.read(), 0x60);
        assert_eq!(rb.ccer1.read(), 0x01 | 0x02);
        assert_eq!(rb.oisr.read(), 0x01);
        assert_eq!(rb.ccr1h.read(), 0x0A);
        assert_eq!(rb.ccr1l.read(), 0xBC);
    }

    #[test]
    fn ic_init_enables_channel_with_filter() {
        let (rb, mut tim) = fake();
        tim.ic_init(
            Channel::Ch2,
            IcPolarity::Falling,
            IcSelection::DirectTi,
            IcPrescaler::Div4,
            0x05,
        );
        assert_eq!(rb.ccmr2.read(), 0x51 | 0x08);
        assert_eq!(rb.ccer1.read(), 0x10 | 0x20);
    }

    #[test]
    fn pwmi_config_mirrors_the_twin_channel() {
        let (rb, mut tim) = fake();
        tim.pwmi_config(
            Channel::Ch1,
            IcPolarity::Rising,
            IcSelection::DirectTi,
            IcPrescaler::Div1,
            0x0,
        );
        // Ch1 direct rising, Ch2 indirect falling.
        assert_eq!(rb.ccmr1.read(), 0x01);
        assert_eq!(rb.ccmr2.read(), 0x02);
        assert_eq!(rb.ccer1.read(), 0x01 | 0x10 | 0x20);
    }

    #[test]
    fn counter_and_captures_are_split_over_two_registers() {
        let (rb, mut tim) = fake();
        tim.set_counter(0xBEEF);
        assert_eq!(rb.cntrh.read(), 0xBE);
        assert_eq!(rb.cntrl.read(), 0xEF);
        assert_eq!(tim.counter(), 0xBEEF);

        rb.ccr1h.write(0x00);
        rb.ccr1l.write(0x64);
        assert_eq!(tim.capture1(), 100);
    }

    #[test]
    fn flag_status_spans_both_status_registers() {
        let (rb, mut tim) = fake();
        rb.sr2.write(tim::SR2_CC1OF);
        assert!(tim.flag_status(Flag::Cc1Of));
        assert!(!tim.flag_status(Flag::Cc1));
        rb.sr1.write(tim::SR1_CC1IF);
        assert!(tim.flag_status(Flag::Cc1));
        tim.clear_flag(Flag::Cc1Of);
        // rc_w0 write image: all-ones to SR1, complement of CC1OF to SR2.
        assert_eq!(rb.sr1.read(), 0xFF);
        assert_eq!(rb.sr2.read(), 0xFD);
    }

    #[test]
    fn it_status_is_enable_gated() {
        let (rb, mut tim) = fake();
        rb.sr1.write(tim::SR1_UIF);
        assert!(!tim.it_status(Interrupt::Update));
        tim.listen(Interrupt::Update);
        assert!(tim.it_status(Interrupt::Update));
        tim.unlisten(Interrupt::Update);
        assert!(!tim.it_status(Interrupt::Update));
    }

    #[test]
    fn encoder_config_clears_slave_mode_and_maps_inputs() {
        let (rb, mut tim) = fake();
        rb.smcr.write(0xFF);
        tim.encoder_interface_config(EncoderMode::Ti12, IcPolarity::Rising, IcPolarity::Falling);
        assert_eq!(rb.smcr.read(), 0xF0 | 0x03);
        assert_eq!(rb.ccmr1.read(), 0x01);
        assert_eq!(rb.ccmr2.read(), 0x01);
        assert_eq!(rb.ccer1.read(), tim::CCER1_CC2P);
    }

    #[test]
    fn lsi_measurement_formula() {
        // Captures 100 and 228 at a 2 MHz timer clock: eight LSI periods
        // over 128 counter ticks.
        assert_eq!(lsi_freq(2_000_000, 100, 228), 125_000);
    }

    #[test]
    fn tim3_shares_the_surface() {
        let rb: &'static tim::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let mut tim = unsafe { Tim3::from_ptr(rb) };
        tim.enable();
        assert!(tim.is_enabled());
        tim.disable();
        assert_eq!(rb.cr1.read(), 0x00);
    }
}
