//! PBPU CPU registers.
//!
//! The PBPU register file:
//! - PC: 8-bit program counter into ROM
//! - TMP_PC: 8-bit jump target, assembled from two nibble writes
//! - LOC: 8-bit nibble address into RAM, assembled from two nibble writes
//! - X, Y, Z: 4-bit ALU registers
//! - carry / use-carry flags

use serde::{Serialize, Deserialize};

/// Mask applied to the ALU registers after every step.
pub const NIBBLE_MASK: u8 = 0x0F;

/// The PBPU register file.
///
/// X, Y and Z are stored widened to `u8` so intermediate results can
/// overflow; `mask()` brings them back to 4 bits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Index into ROM of the next instruction.
    pub pc: u8,
    /// Staging register for JMP.
    pub tmp_pc: u8,
    /// Nibble address into RAM.
    pub loc: u8,
    /// ALU operand.
    pub x: u8,
    /// ALU operand.
    pub y: u8,
    /// ALU result.
    pub z: u8,
    /// Carry (ADD) or not-borrow (SUB) from the last arithmetic op.
    pub carry: bool,
    /// Whether ADD/SUB take `carry` as carry-in.
    pub use_carry: bool,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Carry-in for ADD/SUB: 1 only if carry use is enabled and carry is set.
    #[inline]
    pub fn carry_in(&self) -> u8 {
        u8::from(self.use_carry && self.carry)
    }

    /// WT1: set the high nibble of LOC.
    pub fn set_loc_high(&mut self, imm: u8) {
        self.loc = (self.loc & 0x0F) | ((imm & NIBBLE_MASK) << 4);
    }

    /// WT2: set the low nibble of LOC.
    pub fn set_loc_low(&mut self, imm: u8) {
        self.loc = (self.loc & 0xF0) | (imm & NIBBLE_MASK);
    }

    /// PC1: set the low nibble of TMP_PC.
    ///
    /// Note the order is reversed compared to WT1/WT2.
    pub fn set_tmp_pc_low(&mut self, imm: u8) {
        self.tmp_pc = (self.tmp_pc & 0xF0) | (imm & NIBBLE_MASK);
    }

    /// PC2: set the high nibble of TMP_PC.
    pub fn set_tmp_pc_high(&mut self, imm: u8) {
        self.tmp_pc = (self.tmp_pc & 0x0F) | ((imm & NIBBLE_MASK) << 4);
    }

    /// Truncate X, Y and Z to 4 bits.
    #[inline]
    pub fn mask(&mut self) {
        self.x &= NIBBLE_MASK;
        self.y &= NIBBLE_MASK;
        self.z &= NIBBLE_MASK;
    }

    /// Increment the program counter by 1, wrapping at 256.
    /// Returns the old value.
    #[inline]
    pub fn advance_pc(&mut self) -> u8 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }
}
