//! HAL for the STM8L101 low-power microcontrollers
//!
//! Register-level drivers for the peripherals of the STM8L101 family: clock
//! controller, GPIO, external interrupts, timers, SPI, I2C, USART,
//! comparators, auto wake-up, beeper, independent watchdog, wait-for-event
//! controller, interrupt priorities and the flash/EEPROM interface.
//! Where a portable trait exists the drivers also implement the matching
//! [`embedded-hal`] interface.
//!
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal
//!
//! # Design notes
//!
//! Every driver is a thin, non-allocating wrapper over one register block.
//! Functions either apply a configuration with clear-then-set register
//! cycles or report a status bit; there is no queueing, no retry and no
//! policy layer. Blocking is always caller-side polling on a returned
//! status, with one documented exception
//! ([`tim::Tim2::compute_lsi_clock_freq`]).
//!
//! Register read-modify-write sequences are not atomic with respect to
//! interrupts. Reconfiguration that must not be observed half-done (EXTI
//! sensitivity, ITC priorities) requires the caller to mask interrupts
//! around the call, exactly as on bare silicon.
//!
//! Out-of-range numeric parameters (baud rates, addresses, filter values)
//! are caught by `debug_assert!` and are undefined register contents in
//! release builds; enumerated parameters are closed Rust enums carrying the
//! hardware bit patterns and cannot go out of range.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub use embedded_hal as hal;
pub use nb;

pub mod awu;
pub mod beep;
pub mod clk;
pub mod comp;
pub mod exti;
pub mod flash;
pub mod gpio;
pub mod i2c;
pub mod irtim;
pub mod itc;
pub mod iwdg;
pub mod pac;
pub mod rst;
pub mod spi;
pub mod tim;
pub mod tim4;
pub mod time;
pub mod usart;
pub mod wfe;

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Commonly used traits, re-exported in one place.
pub mod prelude {
    pub use crate::hal::digital::v2::{InputPin as _, OutputPin as _, ToggleableOutputPin as _};
    pub use crate::hal::serial::{Read as _, Write as _};
    pub use crate::hal::spi::FullDuplex as _;
    pub use crate::hal::watchdog::Watchdog as _;
    pub use crate::time::U32Ext as _;
}
