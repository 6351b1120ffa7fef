//! Mock I2C bus for testing
//!
//! Simulates a bus with any number of register-file targets. Absent
//! addresses NACK, faulted addresses report a bus error, and every
//! transaction attempt is recorded for test verification.

use crate::platform::{
    error::{I2cError, PlatformError},
    traits::{I2cConfig, I2cInterface},
    Result,
};
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

/// I2C transaction type for logging
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum I2cTransaction {
    /// Write transaction
    Write { addr: u8, data: Vec<u8> },
    /// Read transaction
    Read { addr: u8, len: usize },
    /// Write-Read transaction
    WriteRead {
        addr: u8,
        write_data: Vec<u8>,
        read_len: usize,
    },
}

impl I2cTransaction {
    /// Target address of the transaction
    pub fn addr(&self) -> u8 {
        match self {
            I2cTransaction::Write { addr, .. }
            | I2cTransaction::Read { addr, .. }
            | I2cTransaction::WriteRead { addr, .. } => *addr,
        }
    }
}

/// Simulated chip behind one bus address
///
/// Behaves like a register file with an auto-incrementing pointer. The first
/// byte (or two, for wide pointers) of a write sets the pointer, remaining
/// bytes are stored. Writes that exactly match a programmed command queue the
/// command's response for the next read instead.
#[derive(Debug, Clone, Default)]
pub struct MockTarget {
    registers: BTreeMap<u16, u8>,
    pointer: u16,
    wide_pointer: bool,
    commands: Vec<(Vec<u8>, Vec<u8>)>,
    pending: Vec<u8>,
}

impl MockTarget {
    /// Create a target with an 8-bit register pointer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a target with a 16-bit big-endian register pointer
    pub fn wide() -> Self {
        Self {
            wide_pointer: true,
            ..Self::default()
        }
    }

    /// Preload consecutive registers starting at `start`
    pub fn with_registers(mut self, start: u16, values: &[u8]) -> Self {
        self.set_registers(start, values);
        self
    }

    /// Respond to an exact command write with `response` on the next read
    pub fn with_command(mut self, command: &[u8], response: &[u8]) -> Self {
        self.commands.push((command.to_vec(), response.to_vec()));
        self
    }

    /// Overwrite consecutive registers starting at `start`
    pub fn set_registers(&mut self, start: u16, values: &[u8]) {
        for (offset, value) in values.iter().enumerate() {
            self.registers
                .insert(start.wrapping_add(offset as u16), *value);
        }
    }

    /// Current value of a register (0 if never written)
    pub fn register(&self, reg: u16) -> u8 {
        self.registers.get(&reg).copied().unwrap_or(0)
    }

    fn handle_write(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        if let Some((_, response)) = self.commands.iter().find(|(cmd, _)| cmd == data) {
            self.pending = response.clone();
            return;
        }

        let (pointer, payload) = if self.wide_pointer && data.len() >= 2 {
            (u16::from_be_bytes([data[0], data[1]]), &data[2..])
        } else {
            (u16::from(data[0]), &data[1..])
        };
        self.pointer = pointer;
        self.set_registers(pointer, payload);
    }

    fn handle_read(&mut self, buffer: &mut [u8]) {
        if !self.pending.is_empty() {
            let to_read = core::cmp::min(buffer.len(), self.pending.len());
            buffer[..to_read].copy_from_slice(&self.pending[..to_read]);
            buffer[to_read..].fill(0);
            self.pending.drain(..to_read);
            return;
        }

        for byte in buffer.iter_mut() {
            *byte = self.register(self.pointer);
            self.pointer = self.pointer.wrapping_add(1);
        }
    }
}

/// Mock I2C bus
///
/// Records all transactions for test verification and routes them to the
/// attached targets.
#[derive(Debug, Default)]
pub struct MockI2c {
    config: I2cConfig,
    targets: BTreeMap<u8, MockTarget>,
    faults: BTreeSet<u8>,
    transactions: Vec<I2cTransaction>,
    delayed_us: u64,
}

impl MockI2c {
    /// Create a new mock I2C bus with no targets
    pub fn new(config: I2cConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Attach a simulated chip at `addr`, replacing any previous one
    pub fn attach(&mut self, addr: u8, target: MockTarget) {
        self.targets.insert(addr, target);
    }

    /// Remove the chip at `addr`
    pub fn detach(&mut self, addr: u8) -> Option<MockTarget> {
        self.targets.remove(&addr)
    }

    /// Make every transaction to `addr` fail with a bus error
    pub fn inject_fault(&mut self, addr: u8) {
        self.faults.insert(addr);
    }

    /// Get the chip at `addr`
    pub fn target(&self, addr: u8) -> Option<&MockTarget> {
        self.targets.get(&addr)
    }

    /// Get the chip at `addr` for modification
    pub fn target_mut(&mut self, addr: u8) -> Option<&mut MockTarget> {
        self.targets.get_mut(&addr)
    }

    /// Get transaction log (for test verification)
    pub fn transactions(&self) -> Vec<I2cTransaction> {
        self.transactions.clone()
    }

    /// Clear transaction log
    pub fn clear_transactions(&mut self) {
        self.transactions.clear();
    }

    /// Get current frequency
    pub fn frequency(&self) -> u32 {
        self.config.frequency
    }

    /// Total time requested through `delay_us`
    pub fn delayed_us(&self) -> u64 {
        self.delayed_us
    }

    fn target_for(&mut self, addr: u8) -> Result<&mut MockTarget> {
        if self.faults.contains(&addr) {
            return Err(PlatformError::I2c(I2cError::BusError));
        }
        self.targets
            .get_mut(&addr)
            .ok_or(PlatformError::I2c(I2cError::Nack))
    }
}

impl I2cInterface for MockI2c {
    fn write(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        self.transactions.push(I2cTransaction::Write {
            addr,
            data: data.to_vec(),
        });

        self.target_for(addr)?.handle_write(data);
        Ok(())
    }

    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<()> {
        self.transactions.push(I2cTransaction::Read {
            addr,
            len: buffer.len(),
        });

        self.target_for(addr)?.handle_read(buffer);
        Ok(())
    }

    fn write_read(&mut self, addr: u8, write_data: &[u8], read_buffer: &mut [u8]) -> Result<()> {
        self.transactions.push(I2cTransaction::WriteRead {
            addr,
            write_data: write_data.to_vec(),
            read_len: read_buffer.len(),
        });

        let target = self.target_for(addr)?;
        target.handle_write(write_data);
        target.handle_read(read_buffer);
        Ok(())
    }

    fn set_frequency(&mut self, frequency: u32) -> Result<()> {
        if frequency == 0 {
            return Err(PlatformError::InvalidConfig);
        }
        self.config.frequency = frequency;
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.delayed_us += u64::from(us);
    }
}
