//! Register-level access to the STM8L101 peripherals.
//!
//! No svd2rust PAC exists for the STM8 core, so the register blocks are
//! written out by hand: one `#[repr(C)]` block per peripheral, fields in
//! byte-offset order, together with the reset values and bitfield masks
//! from the device reference manual. Addresses are fixed at compile time;
//! the peripheral singletons deref to their block.

use core::marker::PhantomData;
use core::ops::Deref;

use vcell::VolatileCell;

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
pub mod rst;
pub mod spi;
pub mod tim;
pub mod tim4;
pub mod usart;
pub mod wfe;

/// An 8-bit memory-mapped register.
///
/// Every register in this device family is one byte wide. Reads and writes
/// go through a volatile cell; `modify` is a plain read-modify-write and is
/// not atomic with respect to interrupts (see the crate-level notes on
/// caller-side interrupt masking).
#[repr(transparent)]
pub struct Reg {
    cell: VolatileCell<u8>,
}

impl Reg {
    /// Reads the register.
    #[inline(always)]
    pub fn read(&self) -> u8 {
        self.cell.get()
    }

    /// Writes `value` to the register.
    #[inline(always)]
    pub fn write(&self, value: u8) {
        self.cell.set(value);
    }

    /// Read-modify-write cycle.
    #[inline(always)]
    pub fn modify<F: FnOnce(u8) -> u8>(&self, f: F) {
        self.cell.set(f(self.cell.get()));
    }

    /// Sets the bits selected by `mask`, leaving the others untouched.
    #[inline(always)]
    pub fn set_bits(&self, mask: u8) {
        self.modify(|r| r | mask);
    }

    /// Clears the bits selected by `mask`, leaving the others untouched.
    #[inline(always)]
    pub fn clear_bits(&self, mask: u8) {
        self.modify(|r| r & !mask);
    }

    /// Returns `true` if any bit selected by `mask` reads back set.
    #[inline(always)]
    pub fn bits_set(&self, mask: u8) -> bool {
        self.read() & mask != 0
    }
}

macro_rules! periph {
    ($(#[$doc:meta])* $NAME:ident, $block:ty, $addr:expr) => {
        $(#[$doc])*
        pub struct $NAME {
            _marker: PhantomData<*const ()>,
        }

        unsafe impl Send for $NAME {}

        impl $NAME {
            /// Documented base address of this peripheral instance.
            pub const PTR: *const $block = $addr as *const _;

            /// Returns a raw pointer to the register block.
            #[inline(always)]
            pub const fn ptr() -> *const $block {
                Self::PTR
            }
        }

        impl Deref for $NAME {
            type Target = $block;

            #[inline(always)]
            fn deref(&self) -> &Self::Target {
                unsafe { &*Self::PTR }
            }
        }
    };
}

periph!(/** GPIO port A. */ GPIOA, gpio::RegisterBlock, 0x5000);
periph!(/** GPIO port B. */ GPIOB, gpio::RegisterBlock, 0x5005);
periph!(/** GPIO port C. */ GPIOC, gpio::RegisterBlock, 0x500A);
periph!(/** GPIO port D. */ GPIOD, gpio::RegisterBlock, 0x500F);
periph!(/** Flash program and data EEPROM interface. */ FLASH, flash::RegisterBlock, 0x5050);
periph!(/** External interrupt controller. */ EXTI, exti::RegisterBlock, 0x50A0);
periph!(/** Wait-for-event controller. */ WFE, wfe::RegisterBlock, 0x50A6);
periph!(/** Reset controller. */ RST, rst::RegisterBlock, 0x50B0);
periph!(/** Clock controller. */ CLK, clk::RegisterBlock, 0x50C0);
periph!(/** Independent watchdog. */ IWDG, iwdg::RegisterBlock, 0x50E0);
periph!(/** Auto wake-up unit. */ AWU, awu::RegisterBlock, 0x50F0);
periph!(/** Beeper. */ BEEP, beep::RegisterBlock, 0x50F3);
periph!(/** Serial peripheral interface. */ SPI, spi::RegisterBlock, 0x5200);
periph!(/** Inter-integrated circuit interface. */ I2C, i2c::RegisterBlock, 0x5210);
periph!(/** Universal synchronous/asynchronous receiver transmitter. */ USART, usart::RegisterBlock, 0x5230);
periph!(/** 16-bit general purpose timer 2. */ TIM2, tim::RegisterBlock, 0x5250);
periph!(/** 16-bit general purpose timer 3. */ TIM3, tim::RegisterBlock, 0x5280);
periph!(/** 8-bit basic timer. */ TIM4, tim4::RegisterBlock, 0x52E0);
periph!(/** Infrared interface. */ IRTIM, irtim::RegisterBlock, 0x52FF);
periph!(/** Comparator interface. */ COMP, comp::RegisterBlock, 0x5300);
periph!(/** Interrupt software-priority controller. */ ITC, itc::RegisterBlock, 0x7F70);
periph!(/** Option bytes. */ OPT, flash::OptionBytes, 0x4800);

static mut DEVICE_PERIPHERALS: bool = false;

/// All device peripherals, owned exactly once.
#[allow(non_snake_case)]
pub struct Peripherals {
    /// GPIO port A.
    pub GPIOA: GPIOA,
    /// GPIO port B.
    pub GPIOB: GPIOB,
    /// GPIO port C.
    pub GPIOC: GPIOC,
    /// GPIO port D.
    pub GPIOD: GPIOD,
    /// Flash interface.
    pub FLASH: FLASH,
    /// External interrupt controller.
    pub EXTI: EXTI,
    /// Wait-for-event controller.
    pub WFE: WFE,
    /// Reset controller.
    pub RST: RST,
    /// Clock controller.
    pub CLK: CLK,
    /// Independent watchdog.
    pub IWDG: IWDG,
    /// Auto wake-up unit.
    pub AWU: AWU,
    /// Beeper.
    pub BEEP: BEEP,
    /// Serial peripheral interface.
    pub SPI: SPI,
    /// I2C interface.
    pub I2C: I2C,
    /// USART.
    pub USART: USART,
    /// Timer 2.
    pub TIM2: TIM2,
    /// Timer 3.
    pub TIM3: TIM3,
    /// Timer 4.
    pub TIM4: TIM4,
    /// Infrared interface.
    pub IRTIM: IRTIM,
    /// Comparator interface.
    pub COMP: COMP,
    /// Interrupt controller.
    pub ITC: ITC,
    /// Option bytes.
    pub OPT: OPT,
}

impl Peripherals {
    /// Returns all peripherals the first time it is called, `None` on every
    /// call after that.
    pub fn take() -> Option<Self> {
        critical_section::with(|_| {
            if unsafe { DEVICE_PERIPHERALS } {
                None
            } else {
                Some(unsafe { Peripherals::steal() })
            }
        })
    }

    /// Unchecked version of [`Peripherals::take`].
    ///
    /// # Safety
    ///
    /// Each of the returned peripherals must be used at most once in the
    /// whole program.
    pub unsafe fn steal() -> Self {
        DEVICE_PERIPHERALS = true;

        Peripherals {
            GPIOA: GPIOA { _marker: PhantomData },
            GPIOB: GPIOB { _marker: PhantomData },
            GPIOC: GPIOC { _marker: PhantomData },
            GPIOD: GPIOD { _marker: PhantomData },
            FLASH: FLASH { _marker: PhantomData },
            EXTI: EXTI { _marker: PhantomData },
            WFE: WFE { _marker: PhantomData },
            RST: RST { _marker: PhantomData },
            CLK: CLK { _marker: PhantomData },
            IWDG: IWDG { _marker: PhantomData },
            AWU: AWU { _marker: PhantomData },
            BEEP: BEEP { _marker: PhantomData },
            SPI: SPI { _marker: PhantomData },
            I2C: I2C { _marker: PhantomData },
            USART: USART { _marker: PhantomData },
            TIM2: TIM2 { _marker: PhantomData },
            TIM3: TIM3 { _marker: PhantomData },
            TIM4: TIM4 { _marker: PhantomData },
            IRTIM: IRTIM { _marker: PhantomData },
            COMP: COMP { _marker: PhantomData },
            ITC: ITC { _marker: PhantomData },
            OPT: OPT { _marker: PhantomData },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_block_offsets() {
        // Field order must reproduce the documented byte offsets.
        assert_eq!(core::mem::size_of::<gpio::RegisterBlock>(), 5);
        assert_eq!(core::mem::size_of::<clk::RegisterBlock>(), 6);
        assert_eq!(core::mem::size_of::<i2c::RegisterBlock>(), 14);
        assert_eq!(core::mem::size_of::<usart::RegisterBlock>(), 11);
        assert_eq!(core::mem::size_of::<tim::RegisterBlock>(), 22);
        assert_eq!(core::mem::size_of::<tim4::RegisterBlock>(), 9);
        assert_eq!(core::mem::size_of::<itc::RegisterBlock>(), 8);
    }

    #[test]
    fn reg_masked_ops_leave_foreign_bits() {
        let reg: Reg = unsafe { core::mem::zeroed() };
        reg.write(0xA5);
        reg.set_bits(0x0A);
        assert_eq!(reg.read(), 0xAF);
        reg.clear_bits(0x0F);
        assert_eq!(reg.read(), 0xA0);
        assert!(reg.bits_set(0x80));
        assert!(!reg.bits_set(0x01));
    }
}
