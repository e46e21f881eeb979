//! CPU emulation for the PBPU.
//!
//! This module implements the complete PBPU architecture:
//! - 256-byte program ROM, 128-byte RAM addressed as 256 nibbles
//! - 8-bit PC, TMP_PC and LOC; 4-bit X, Y, Z; carry and use-carry flags
//! - 16-instruction set, one byte per instruction

pub mod memory;
pub mod registers;
pub mod decode;
pub mod dirty;
pub mod execute;

pub use memory::{MemoryError, Ram, Rom, read_nibble, write_nibble};
pub use registers::Registers;
pub use decode::{Instruction, Opcode, DecodeError, decode, encode};
pub use dirty::DirtyFlags;
pub use execute::{Cpu, Step};
