//! Disassembler for PBPU programs.
//!
//! Converts ROM bytes back to readable assembly.

use crate::cpu::decode::{decode, Instruction};
use crate::cpu::Rom;

/// Disassemble a single instruction byte to text, e.g. `WTX 5`.
pub fn disassemble_byte(byte: u8) -> String {
    match decode(byte) {
        Ok(instr) => format_instruction(&instr),
        Err(_) => format!("ERR {:X}", byte & 0x0F),
    }
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    format!("{} {:X}", instr.opcode.mnemonic(), instr.imm)
}

/// Disassemble a program image into a listing.
pub fn disassemble(program: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; PBPU Disassembly\n");
    output.push_str("; ----------------\n\n");

    for (addr, byte) in program.iter().enumerate() {
        output.push_str(&format!("{:02X}:  {}  ; {:02X}\n", addr, disassemble_byte(*byte), byte));
    }

    output
}

/// One row of the disassembly window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisasmLine {
    /// ROM address, or `None` for a padding row past either end of ROM.
    pub addr: Option<u8>,
    pub text: String,
    pub is_current: bool,
}

impl DisasmLine {
    fn padding() -> Self {
        Self {
            addr: None,
            text: String::new(),
            is_current: false,
        }
    }
}

/// Disassemble `lines` rows of ROM centered on `pc`.
///
/// Addresses outside 0x00..=0xFF are not wrapped; they become padding
/// rows so the current instruction always sits in the middle row.
pub fn window(rom: &Rom, pc: u8, lines: usize) -> Vec<DisasmLine> {
    let half = (lines.saturating_sub(1) / 2) as i32;
    let pc = i32::from(pc);

    (pc - half..=pc + half)
        .map(|addr| match u8::try_from(addr) {
            Ok(addr) => DisasmLine {
                addr: Some(addr),
                text: disassemble_byte(rom.read(addr)),
                is_current: i32::from(addr) == pc,
            },
            Err(_) => DisasmLine::padding(),
        })
        .collect()
}
