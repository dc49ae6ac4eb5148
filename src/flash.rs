//! Flash program memory and data EEPROM interface (FLASH)
//!
//! Programming is gated by the RASS key sequences written to the
//! unprotection registers; the actual byte, word and block operations are
//! direct stores into the memory map which the controller turns into
//! program/erase cycles. Block operations must execute from RAM on real
//! parts, which is the caller's arrangement, not this driver's.

use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

use crate::pac::{self, flash};

/// First program memory address.
pub const FLASH_START_ADDRESS: u16 = 0x8000;
/// Last program memory address.
pub const FLASH_END_ADDRESS: u16 = 0x9FFF;
/// Number of 64-byte blocks.
pub const BLOCK_COUNT: u8 = 0x80;
/// Bytes per block.
pub const BLOCK_SIZE: u8 = 0x40;

/// First RASS key.
pub const RASS_KEY1: u8 = 0x56;
/// Second RASS key.
pub const RASS_KEY2: u8 = 0xAE;
/// Option-byte value that enables read-out protection.
pub const READOUT_PROTECTION_KEY: u8 = 0xAA;

/// Memory areas behind the interface.
///
/// The discriminant doubles as the IAPSR mask that relocks the area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MemType {
    /// Program memory (clears PUL on lock).
    Program = 0xFD,
    /// Data EEPROM area (clears DUL on lock).
    Data = 0xF7,
}

/// Block programming mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ProgramMode {
    /// Erase then program.
    Standard = 0x00,
    /// Program without the preceding erase.
    Fast = 0x10,
}

/// Programming time selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ProgramTime {
    /// Half a programming cycle, skipped when already erased.
    Standard = 0x00,
    /// Fixed full programming time.
    TProg = 0x01,
}

/// Outcome of a programming operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Status {
    /// A write hit a protected page.
    WriteProtectionError = 0x01,
    /// The operation did not complete within the poll budget.
    TimeOut = 0x02,
    /// Operation finished.
    Successful = 0x04,
}

/// Status flags (IAPSR bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Flag {
    /// Data EEPROM unlocked.
    Dul = 0x08,
    /// End of operation.
    Eop = 0x04,
    /// Program memory unlocked.
    Pul = 0x02,
    /// Write attempted on a protected page.
    WrPgDis = 0x01,
}

/// Errors surfaced through the `embedded-storage` traits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Offset or length leaves the memory area.
    OutOfBounds,
    /// Erase bounds not on block boundaries.
    NotAligned,
    /// The controller reported a protection error or timed out.
    Program(Status),
}

impl NorFlashError for Error {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Error::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            Error::NotAligned => NorFlashErrorKind::NotAligned,
            Error::Program(_) => NorFlashErrorKind::Other,
        }
    }
}

const OPERATION_TIMEOUT: u16 = 0xFFFF;

/// Flash interface driver.
pub struct Flash {
    rb: *const flash::RegisterBlock,
    opt: *const flash::OptionBytes,
}

unsafe impl Send for Flash {}

impl Flash {
    /// Takes ownership of the flash interface and the option bytes.
    pub fn new(_flash: pac::FLASH, _opt: pac::OPT) -> Self {
        Flash {
            rb: pac::FLASH::PTR,
            opt: pac::OPT::PTR,
        }
    }

    #[cfg(test)]
    pub(crate) const unsafe fn from_ptr(
        rb: *const flash::RegisterBlock,
        opt: *const flash::OptionBytes,
    ) -> Self {
        Flash { rb, opt }
    }

    fn rb(&self) -> &flash::RegisterBlock {
        unsafe { &*self.rb }
    }

    fn opt(&self) -> &flash::OptionBytes {
        unsafe { &*self.opt }
    }

    /// Writes the control registers back to their post-reset values and
    /// reads IAPSR to discard stale status flags.
    pub fn deinit(&mut self) {
        let rb = self.rb();
        rb.cr1.write(flash::CR1_RESET);
        rb.cr2.write(flash::CR2_RESET);
        let _ = rb.iapsr.read();
    }

    /// Runs the RASS key sequence unlocking the selected area.
    ///
    /// The data area takes the keys in reversed order.
    pub fn unlock(&mut self, mem_type: MemType) {
        let rb = self.rb();
        if mem_type == MemType::Program {
            rb.pukr.write(RASS_KEY1);
            rb.pukr.write(RASS_KEY2);
        } else {
            rb.dukr.write(RASS_KEY2);
            rb.dukr.write(RASS_KEY1);
        }
    }

    /// Relocks the selected area by clearing its unlock flag.
    pub fn lock(&mut self, mem_type: MemType) {
        self.rb().iapsr.clear_bits(!(mem_type as u8));
    }

    /// Reads back the programming time selection.
    pub fn programming_time(&self) -> ProgramTime {
        if self.rb().cr1.bits_set(flash::CR1_FIX) {
            ProgramTime::TProg
        } else {
            ProgramTime::Standard
        }
    }

    /// Selects the programming time.
    pub fn set_programming_time(&mut self, time: ProgramTime) {
        self.rb().cr1.clear_bits(flash::CR1_FIX);
        self.rb().cr1.set_bits(time as u8);
    }

    /// Enables or disables the flash interrupt.
    pub fn it_config(&mut self, on: bool) {
        if on {
            self.rb().cr1.set_bits(flash::CR1_IE);
        } else {
            self.rb().cr1.clear_bits(flash::CR1_IE);
        }
    }

    /// Returns `true` if the selected status flag is set.
    pub fn flag_status(&self, flag: Flag) -> bool {
        self.rb().iapsr.bits_set(flag as u8)
    }

    /// Programs one byte.
    ///
    /// # Safety
    ///
    /// `address` must lie inside the programmable area and the area must
    /// be unlocked; nothing may execute from the block being written.
    pub unsafe fn program_byte(&mut self, address: u16, data: u8) {
        debug_assert!(
            (FLASH_START_ADDRESS..=FLASH_END_ADDRESS).contains(&address),
            "address outside the flash area"
        );
        (address as usize as *mut u8).write_volatile(data);
    }

    /// Erases one byte (programs it to 0x00).
    ///
    /// # Safety
    ///
    /// Same contract as [`Flash::program_byte`].
    pub unsafe fn erase_byte(&mut self, address: u16) {
        debug_assert!(
            (FLASH_START_ADDRESS..=FLASH_END_ADDRESS).contains(&address),
            "address outside the flash area"
        );
        (address as usize as *mut u8).write_volatile(0x00);
    }

    /// Programs one 4-byte word, most significant byte at `address`.
    ///
    /// # Safety
    ///
    /// Same contract as [`Flash::program_byte`], for all four bytes.
    pub unsafe fn program_word(&mut self, address: u16, data: u32) {
        debug_assert!(
            (FLASH_START_ADDRESS..=FLASH_END_ADDRESS).contains(&address),
            "address outside the flash area"
        );
        self.rb().cr2.set_bits(flash::CR2_WPRG);
        let base = address as usize as *mut u8;
        for (i, byte) in data.to_be_bytes().iter().enumerate() {
            base.add(i).write_volatile(*byte);
        }
    }

    /// Reads one byte from the memory map.
    ///
    /// # Safety
    ///
    /// `address` must be a readable location.
    pub unsafe fn read_byte(&self, address: u16) -> u8 {
        (address as usize as *const u8).read_volatile()
    }

    /// Returns the boot area size in bytes (option byte granularity of
    /// 64 bytes).
    pub fn boot_size(&self) -> u16 {
        (self.opt().opt2_bootsize.read() as u16) << 6
    }

    /// Returns the data EEPROM area size in bytes.
    pub fn data_size(&self) -> u16 {
        (self.opt().opt3_datasize.read() as u16) << 6
    }

    /// Returns `true` if read-out protection is active.
    pub fn readout_protection_status(&self) -> bool {
        self.opt().opt0_lockbyte.read() == READOUT_PROTECTION_KEY
    }

    /// Programs a whole 64-byte block.
    ///
    /// # Safety
    ///
    /// The area must be unlocked and the code performing the operation
    /// must execute from RAM on real parts.
    pub unsafe fn program_block(&mut self, block: u8, mode: ProgramMode, buffer: &[u8; 64]) {
        debug_assert!(block < BLOCK_COUNT, "block number out of range");

        if mode == ProgramMode::Standard {
            self.rb().cr2.set_bits(flash::CR2_PRG);
        } else {
            self.rb().cr2.set_bits(flash::CR2_FPRG);
        }

        let base = (FLASH_START_ADDRESS as usize + block as usize * BLOCK_SIZE as usize) as *mut u8;
        for (i, byte) in buffer.iter().enumerate() {
            base.add(i).write_volatile(*byte);
        }
    }

    /// Erases a whole 64-byte block.
    ///
    /// # Safety
    ///
    /// Same contract as [`Flash::program_block`].
    pub unsafe fn erase_block(&mut self, block: u8) {
        debug_assert!(block < BLOCK_COUNT, "block number out of range");

        self.rb().cr2.set_bits(flash::CR2_ERASE);
        let base = (FLASH_START_ADDRESS as usize + block as usize * BLOCK_SIZE as usize) as *mut u8;
        for i in 0..4 {
            base.add(i).write_volatile(0x00);
        }
    }

    /// Polls IAPSR until the running operation finishes, hits a protected
    /// page or the poll budget (0xFFFF reads) runs out.
    pub fn wait_for_last_operation(&mut self) -> Status {
        let mut timeout = OPERATION_TIMEOUT;
        let mut flags = 0u8;
        while flags == 0 && timeout != 0 {
            flags = self.rb().iapsr.read() & (flash::IAPSR_EOP | flash::IAPSR_WR_PG_DIS);
            timeout -= 1;
        }
        if timeout == 0 {
            Status::TimeOut
        } else if flags & flash::IAPSR_EOP != 0 {
            Status::Successful
        } else {
            Status::WriteProtectionError
        }
    }
}

impl ErrorType for Flash {
    type Error = Error;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Error> {
        let end = offset as usize + bytes.len();
        if end > self.capacity() {
            return Err(Error::OutOfBounds);
        }
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = unsafe { self.read_byte(FLASH_START_ADDRESS + offset as u16 + i as u16) };
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        BLOCK_COUNT as usize * BLOCK_SIZE as usize
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = BLOCK_SIZE as usize;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Error> {
        if to as usize > self.capacity() || from > to {
            return Err(Error::OutOfBounds);
        }
        if from % BLOCK_SIZE as u32 != 0 || to % BLOCK_SIZE as u32 != 0 {
            return Err(Error::NotAligned);
        }
        for block in (from / BLOCK_SIZE as u32)..(to / BLOCK_SIZE as u32) {
            unsafe { self.erase_block(block as u8) };
            match self.wait_for_last_operation() {
                Status::Successful => {}
                status => return Err(Error::Program(status)),
            }
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Error> {
        if offset as usize + bytes.len() > self.capacity() {
            return Err(Error::OutOfBounds);
        }
        for (i, byte) in bytes.iter().enumerate() {
            unsafe { self.program_byte(FLASH_START_ADDRESS + offset as u16 + i as u16, *byte) };
            match self.wait_for_last_operation() {
                Status::Successful => {}
                status => return Err(Error::Program(status)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorded {
        rb: &'static flash::RegisterBlock,
        opt: &'static flash::OptionBytes,
    }

    fn fake() -> (Recorded, Flash) {
        let rb: &'static flash::RegisterBlock = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let opt: &'static flash::OptionBytes = Box::leak(Box::new(unsafe { core::mem::zeroed() }));
        let flash = unsafe { Flash::from_ptr(rb, opt) };
        (Recorded { rb, opt }, flash)
    }

    #[test]
    fn program_unlock_writes_keys_in_order() {
        let (regs, mut flash) = fake();
        flash.unlock(MemType::Program);
        // The cell retains the last key of the two-write sequence.
        assert_eq!(regs.rb.pukr.read(), 0xAE);
        assert_eq!(regs.rb.dukr.read(), 0x00);
    }

    #[test]
    fn data_unlock_uses_reversed_keys() {
        let (regs, mut flash) = fake();
        flash.unlock(MemType::Data);
        assert_eq!(regs.rb.dukr.read(), 0x56);
        assert_eq!(regs.rb.pukr.read(), 0x00);
    }

    #[test]
    fn lock_clears_only_the_area_unlock_flag() {
        let (regs, mut flash) = fake();
        regs.rb.iapsr.write(0x4A);
        flash.lock(MemType::Program);
        assert_eq!(regs.rb.iapsr.read(), 0x48);
        flash.lock(MemType::Data);
        assert_eq!(regs.rb.iapsr.read(), 0x40);
    }

    #[test]
    fn programming_time_round_trip() {
        let (regs, mut flash) = fake();
        flash.set_programming_time(ProgramTime::TProg);
        assert_eq!(regs.rb.cr1.read(), 0x01);
        assert_eq!(flash.programming_time(), ProgramTime::TProg);
        flash.set_programming_time(ProgramTime::Standard);
        assert_eq!(flash.programming_time(), ProgramTime::Standard);
    }

    #[test]
    fn option_byte_sizes() {
        let (regs, flash) = fake();
        regs.opt.opt2_bootsize.write(0x02);
        regs.opt.opt3_datasize.write(0x04);
        assert_eq!(flash.boot_size(), 128);
        assert_eq!(flash.data_size(), 256);
        assert!(!flash.readout_protection_status());
        regs.opt.opt0_lockbyte.write(0xAA);
        assert!(flash.readout_protection_status());
    }

    #[test]
    fn wait_reports_protection_error() {
        let (regs, mut flash) = fake();
        regs.rb.iapsr.write(flash::IAPSR_WR_PG_DIS);
        assert_eq!(flash.wait_for_last_operation(), Status::WriteProtectionError);
        regs.rb.iapsr.write(flash::IAPSR_EOP);
        assert_eq!(flash.wait_for_last_operation(), Status::Successful);
    }

    #[test]
    fn wait_times_out_on_silent_hardware() {
        let (_regs, mut flash) = fake();
        assert_eq!(flash.wait_for_last_operation(), Status::TimeOut);
    }

    #[test]
    fn deinit_reads_iapsr() {
        let (regs, mut flash) = fake();
        regs.rb.cr1.write(0x03);
        regs.rb.cr2.write(0x71);
        flash.deinit();
        assert_eq!(regs.rb.cr1.read(), 0x00);
        assert_eq!(regs.rb.cr2.read(), 0x00);
    }
}
