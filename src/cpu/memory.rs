//! PBPU memory subsystem.
//!
//! The PBPU has two separate stores:
//! - a 256-byte program ROM, one instruction per byte
//! - a 128-byte data RAM, addressed as 256 four-bit nibbles
//!
//! Nibble `n` lives in byte `n / 2`; even addresses select the low
//! half-byte and odd addresses the high half-byte.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of bytes in program ROM.
pub const ROM_SIZE: usize = 256;

/// Number of bytes backing the data RAM.
pub const RAM_SIZE: usize = 128;

/// Number of addressable nibbles in RAM.
pub const RAM_NIBBLES: usize = RAM_SIZE * 2;

/// Nibbles `0..SCREEN_NIBBLES` form the visible 4x4 screen, one row each.
pub const SCREEN_NIBBLES: u8 = 4;

/// Read a 4-bit value from a byte buffer at nibble address `addr`.
#[inline]
pub fn read_nibble(buf: &[u8], addr: u8) -> u8 {
    let byte = buf[usize::from(addr / 2)];
    if addr % 2 == 0 {
        byte & 0x0F
    } else {
        (byte >> 4) & 0x0F
    }
}

/// Write a 4-bit value into a byte buffer at nibble address `addr`.
///
/// The other half of the same byte is left untouched.
#[inline]
pub fn write_nibble(buf: &mut [u8], addr: u8, value: u8) {
    let byte = &mut buf[usize::from(addr / 2)];
    if addr % 2 == 0 {
        *byte = (*byte & 0xF0) | (value & 0x0F);
    } else {
        *byte = (*byte & 0x0F) | ((value & 0x0F) << 4);
    }
}

/// Data RAM: 128 bytes seen as 256 nibbles.
///
/// Every `u8` address is valid, so nibble access cannot fail.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Ram {
    bytes: Vec<u8>,
}

impl Ram {
    /// Create a zeroed RAM.
    pub fn new() -> Self {
        Self {
            bytes: vec![0; RAM_SIZE],
        }
    }

    /// Read the nibble at `addr`.
    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        read_nibble(&self.bytes, addr)
    }

    /// Write the nibble at `addr`.
    #[inline]
    pub fn write(&mut self, addr: u8, value: u8) {
        write_nibble(&mut self.bytes, addr, value);
    }

    /// Raw backing bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// All 256 nibbles in address order.
    pub fn nibbles(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).map(move |addr| self.read(addr))
    }

    /// The visible screen as a 4x4 grid of pixels.
    ///
    /// Row `r` is nibble `r`; bit 3 is the leftmost column.
    pub fn screen_rows(&self) -> [[bool; 4]; 4] {
        let mut grid = [[false; 4]; 4];
        for (row, cells) in grid.iter_mut().enumerate() {
            let bits = self.read(row as u8);
            for (col, cell) in cells.iter_mut().enumerate() {
                *cell = (bits >> (3 - col)) & 1 == 1;
            }
        }
        grid
    }

    /// Is `addr` one of the nibbles shown on the screen?
    #[inline]
    pub fn is_screen_addr(addr: u8) -> bool {
        addr < SCREEN_NIBBLES
    }

    /// Zero all of RAM.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.nibbles().filter(|&n| n != 0).count();

        f.debug_struct("Ram")
            .field("non_zero_nibbles", &non_zero)
            .field("total_nibbles", &RAM_NIBBLES)
            .finish()
    }
}

/// Program ROM: 256 instruction bytes, fixed after load.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct Rom {
    bytes: Vec<u8>,
}

impl Rom {
    /// Create an all-NOP ROM.
    pub fn new() -> Self {
        Self {
            bytes: vec![0; ROM_SIZE],
        }
    }

    /// Build a ROM from a program image.
    ///
    /// At most `ROM_SIZE` bytes are taken; the unused tail stays zero.
    pub fn from_program(program: &[u8]) -> Self {
        let mut rom = Self::new();
        let len = program.len().min(ROM_SIZE);
        rom.bytes[..len].copy_from_slice(&program[..len]);
        rom
    }

    /// Fetch the instruction byte at `pc`.
    #[inline]
    pub fn read(&self, pc: u8) -> u8 {
        self.bytes[usize::from(pc)]
    }

    /// Raw program bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the program without its zero-filled tail.
    pub fn used_len(&self) -> usize {
        self.bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1)
    }
}

impl Default for Rom {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Rom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rom")
            .field("used_bytes", &self.used_len())
            .field("total_bytes", &ROM_SIZE)
            .finish()
    }
}

impl TryFrom<Vec<u8>> for Ram {
    type Error = MemoryError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, MemoryError> {
        check_size(&bytes, RAM_SIZE)?;
        Ok(Self { bytes })
    }
}

impl From<Ram> for Vec<u8> {
    fn from(ram: Ram) -> Self {
        ram.bytes
    }
}

impl TryFrom<Vec<u8>> for Rom {
    type Error = MemoryError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, MemoryError> {
        check_size(&bytes, ROM_SIZE)?;
        Ok(Self { bytes })
    }
}

impl From<Rom> for Vec<u8> {
    fn from(rom: Rom) -> Self {
        rom.bytes
    }
}

fn check_size(bytes: &[u8], expected: usize) -> Result<(), MemoryError> {
    if bytes.len() != expected {
        return Err(MemoryError::WrongSize {
            expected,
            found: bytes.len(),
        });
    }
    Ok(())
}

/// Errors from building a memory image out of raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("memory image is {found} bytes, expected {expected}")]
    WrongSize { expected: usize, found: usize },
}
