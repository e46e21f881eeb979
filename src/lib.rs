//! # PBPU Emulator
//!
//! A cycle-by-cycle emulator of the PBPU, a small 4-bit CPU with 16
//! one-byte instructions, a 256-byte program ROM and 256 nibbles of RAM.
//!
//! The first four RAM nibbles double as a 4x4 monochrome screen.

pub mod cpu;
pub mod program;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, DirtyFlags, Instruction, Opcode, Ram, Registers, Rom, Step};
pub use program::{disassemble, disassemble_byte, load_program, ProgramError};
pub use config::{Cli, ConfigError, RunConfig, RunMode};

#[cfg(feature = "tui")]
pub use tui::run_emulator;
