//! WebAssembly bindings for the PBPU emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.

use wasm_bindgen::prelude::*;
use crate::cpu::{Cpu, DirtyFlags};
use crate::program::disasm::{disassemble_byte, format_instruction};
use crate::program::loader::program_from_bytes;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    program: Vec<u8>,
    dirty: DirtyFlags,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            program: Vec::new(),
            dirty: DirtyFlags::CLEAN,
        }
    }

    /// Load a raw program image. Returns the number of bytes loaded.
    #[wasm_bindgen]
    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<usize, JsError> {
        let program = program_from_bytes(bytes)
            .map_err(|e| JsError::new(&format!("{}", e)))?;

        let len = program.len();
        self.cpu = Cpu::with_program(&program);
        self.program = program;
        self.dirty = DirtyFlags::CLEAN;

        Ok(len)
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> String {
        let step = self.cpu.step();
        self.dirty |= step.dirty;
        format_instruction(&step.instruction)
    }

    /// Run `count` instructions. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, count: u32) -> u64 {
        self.dirty |= self.cpu.run_for(u64::from(count));
        self.cpu.cycles
    }

    /// Reset CPU to initial state with the loaded program.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu = Cpu::with_program(&self.program);
        self.dirty = DirtyFlags::CLEAN;
    }

    /// Get cycle count.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> u8 {
        self.cpu.regs.pc
    }

    #[wasm_bindgen]
    pub fn loc(&self) -> u8 {
        self.cpu.regs.loc
    }

    #[wasm_bindgen]
    pub fn x(&self) -> u8 {
        self.cpu.regs.x
    }

    #[wasm_bindgen]
    pub fn y(&self) -> u8 {
        self.cpu.regs.y
    }

    #[wasm_bindgen]
    pub fn z(&self) -> u8 {
        self.cpu.regs.z
    }

    #[wasm_bindgen]
    pub fn carry(&self) -> bool {
        self.cpu.regs.carry
    }

    /// Get all 256 RAM nibbles.
    #[wasm_bindgen]
    pub fn ram_nibbles(&self) -> Vec<u8> {
        self.cpu.ram.nibbles().collect()
    }

    /// Get the 4x4 screen, row-major, 1 for a lit pixel.
    #[wasm_bindgen]
    pub fn screen_bits(&self) -> Vec<u8> {
        self.cpu
            .ram
            .screen_rows()
            .iter()
            .flatten()
            .map(|&lit| u8::from(lit))
            .collect()
    }

    /// Get the dirty flags accumulated since the last call, as JSON.
    ///
    /// Reading them clears them.
    #[wasm_bindgen]
    pub fn dirty_json(&mut self) -> Result<String, JsError> {
        let dirty = std::mem::take(&mut self.dirty);
        serde_json::to_string(&dirty).map_err(|e| JsError::new(&format!("{}", e)))
    }

    /// Get registers and cycle count as JSON.
    #[wasm_bindgen]
    pub fn state_json(&self) -> Result<String, JsError> {
        let state = serde_json::json!({
            "registers": &self.cpu.regs,
            "cycles": self.cpu.cycles,
        });
        serde_json::to_string(&state).map_err(|e| JsError::new(&format!("{}", e)))
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Disassemble a single instruction byte.
#[wasm_bindgen]
pub fn wasm_disassemble(byte: u8) -> String {
    disassemble_byte(byte)
}
