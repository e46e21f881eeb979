//! Instruction decoder for the PBPU.
//!
//! Every instruction is one byte: the high nibble selects one of 16
//! opcodes and the low nibble is a 4-bit immediate. Opcodes that take no
//! operand simply ignore the immediate.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The 16 PBPU operations, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// No operation
    Nop,
    /// Z := X + Y (+ carry)
    Add,
    /// Z := X - (Y + carry)
    Sub,
    /// LOC high nibble := imm
    Wt1,
    /// LOC low nibble := imm
    Wt2,
    /// X := imm
    Wtx,
    /// Y := imm
    Wty,
    /// Z := imm
    Wtz,
    /// RAM[LOC] := Z
    Ztr,
    /// Z := RAM[LOC]
    Rtz,
    /// TMP_PC low nibble := imm
    Pc1,
    /// TMP_PC high nibble := imm
    Pc2,
    /// PC := TMP_PC
    Jmp,
    /// X := RAM[LOC]
    Rtx,
    /// Y := RAM[LOC]
    Rty,
    /// Toggle carry use
    Usc,
}

impl Opcode {
    /// All opcodes, indexed by their encoding.
    pub const ALL: [Opcode; 16] = [
        Opcode::Nop,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Wt1,
        Opcode::Wt2,
        Opcode::Wtx,
        Opcode::Wty,
        Opcode::Wtz,
        Opcode::Ztr,
        Opcode::Rtz,
        Opcode::Pc1,
        Opcode::Pc2,
        Opcode::Jmp,
        Opcode::Rtx,
        Opcode::Rty,
        Opcode::Usc,
    ];

    /// Look up an opcode by its 4-bit encoding.
    pub fn from_nibble(value: u8) -> Result<Self, DecodeError> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(DecodeError::UnknownOpcode(value))
    }

    /// The 4-bit encoding of this opcode.
    pub fn to_nibble(self) -> u8 {
        self as u8
    }

    /// Three-letter assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Wt1 => "WT1",
            Opcode::Wt2 => "WT2",
            Opcode::Wtx => "WTX",
            Opcode::Wty => "WTY",
            Opcode::Wtz => "WTZ",
            Opcode::Ztr => "ZTR",
            Opcode::Rtz => "RTZ",
            Opcode::Pc1 => "PC1",
            Opcode::Pc2 => "PC2",
            Opcode::Jmp => "JMP",
            Opcode::Rtx => "RTX",
            Opcode::Rty => "RTY",
            Opcode::Usc => "USC",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// A decoded PBPU instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Low nibble of the instruction byte.
    pub imm: u8,
}

impl Instruction {
    pub fn new(opcode: Opcode, imm: u8) -> Self {
        Self { opcode, imm: imm & 0x0F }
    }

    /// Split a ROM byte into opcode and immediate.
    ///
    /// A byte's high nibble always names one of the 16 opcodes.
    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        Self {
            opcode: Opcode::ALL[usize::from(byte >> 4)],
            imm: byte & 0x0F,
        }
    }
}

/// Decode one instruction byte.
///
/// Cannot fail for any `u8`: all 16 opcode values are defined.
pub fn decode(byte: u8) -> Result<Instruction, DecodeError> {
    let opcode = Opcode::from_nibble(byte >> 4)?;
    Ok(Instruction {
        opcode,
        imm: byte & 0x0F,
    })
}

/// Encode an instruction back to its byte.
pub fn encode(instr: &Instruction) -> u8 {
    (instr.opcode.to_nibble() << 4) | (instr.imm & 0x0F)
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode: {0:#X}")]
    UnknownOpcode(u8),
}
