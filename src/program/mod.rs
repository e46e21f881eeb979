//! Program images for the PBPU.
//!
//! This module provides:
//! - A loader for raw program files (one instruction per byte)
//! - A disassembler (ROM bytes → readable text)

pub mod loader;
pub mod disasm;

pub use loader::{load_program, program_from_bytes, ProgramError, MAX_PROGRAM_LEN};
pub use disasm::{disassemble, disassemble_byte, format_instruction, window, DisasmLine};
