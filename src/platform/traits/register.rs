//! Register access helpers
//!
//! Most sensors expose a register file behind an 8-bit (or, for some ToF
//! parts, 16-bit) register pointer. These helpers wrap the pointer write and
//! data read into single calls on any `I2cInterface`, including trait objects.

use super::i2c::I2cInterface;
use crate::platform::Result;

/// Register-level helpers for I2C devices
pub trait I2cRegisterExt: I2cInterface {
    /// Read one byte from an 8-bit register
    fn read_reg(&mut self, addr: u8, reg: u8) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.write_read(addr, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    /// Read consecutive registers starting at `reg` (auto-increment)
    fn read_regs(&mut self, addr: u8, reg: u8, buffer: &mut [u8]) -> Result<()> {
        self.write_read(addr, &[reg], buffer)
    }

    /// Read a big-endian 16-bit word starting at `reg`
    fn read_reg_u16_be(&mut self, addr: u8, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.write_read(addr, &[reg], &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Write one byte to an 8-bit register
    fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<()> {
        self.write(addr, &[reg, value])
    }

    /// Write a big-endian 16-bit word to an 8-bit register
    fn write_reg_u16_be(&mut self, addr: u8, reg: u8, value: u16) -> Result<()> {
        let [msb, lsb] = value.to_be_bytes();
        self.write(addr, &[reg, msb, lsb])
    }

    /// Read consecutive registers behind a 16-bit register pointer
    fn read_regs16(&mut self, addr: u8, reg: u16, buffer: &mut [u8]) -> Result<()> {
        self.write_read(addr, &reg.to_be_bytes(), buffer)
    }

    /// Write one byte behind a 16-bit register pointer
    fn write_reg16(&mut self, addr: u8, reg: u16, value: u8) -> Result<()> {
        let [hi, lo] = reg.to_be_bytes();
        self.write(addr, &[hi, lo, value])
    }

    /// Write a big-endian 32-bit word behind a 16-bit register pointer
    fn write_reg16_u32_be(&mut self, addr: u8, reg: u16, value: u32) -> Result<()> {
        let [hi, lo] = reg.to_be_bytes();
        let [b0, b1, b2, b3] = value.to_be_bytes();
        self.write(addr, &[hi, lo, b0, b1, b2, b3])
    }
}

impl<T: I2cInterface + ?Sized> I2cRegisterExt for T {}
